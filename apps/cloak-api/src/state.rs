use std::sync::Arc;

use cloak_backend::BackendClient;
use cloak_service::CloakService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<CloakService>,
}
impl AppState {
	pub fn new(config: cloak_config::Config) -> color_eyre::Result<Self> {
		let backend = BackendClient::new(&config.backend)?;
		let service = CloakService::new(config, Arc::new(backend));

		Ok(Self { service: Arc::new(service) })
	}

	/// Wraps an already-built service; used by tests that wire in doubles.
	pub fn with_service(service: CloakService) -> Self {
		Self { service: Arc::new(service) }
	}
}
