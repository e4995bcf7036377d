pub mod error;
pub mod ownership;
pub mod search;

use std::time::Duration;

use reqwest::header::HeaderMap;

pub use error::{Error, Result};
pub use ownership::EchoedChunk;
pub use search::{SearchHit, SearchRequest};

/// Thin client over the remote chunk store. The store only ever sees sealed
/// bytes and transformed vectors; everything it returns is verified or
/// opened on this side of the wire.
pub struct BackendClient {
	client: reqwest::Client,
	headers: HeaderMap,
	search_url: String,
	ownership_url: String,
}

impl BackendClient {
	pub fn new(cfg: &cloak_config::Backend) -> Result<Self> {
		let client =
			reqwest::Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = cloak_providers::auth_headers(&cfg.api_key, &cfg.default_headers)?;

		Ok(Self {
			client,
			headers,
			search_url: format!("{}{}", cfg.api_base, cfg.search_path),
			ownership_url: format!("{}{}", cfg.api_base, cfg.ownership_path),
		})
	}
}
