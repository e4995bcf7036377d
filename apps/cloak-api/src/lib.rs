pub mod routes;
pub mod state;

use std::net::SocketAddr;

use clap::Parser;
use color_eyre::eyre;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = cloak_cli::VERSION,
	rename_all = "kebab",
	styles = cloak_cli::styles(),
)]
pub struct Args {
	#[command(flatten)]
	pub shared: cloak_cli::SharedArgs,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = cloak_config::load(&args.shared.config)?;

	init_tracing(&config);

	let http_addr: SocketAddr = config.service.http_bind.parse()?;

	if config.security.bind_localhost_only && !http_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"http_bind must be a loopback address when bind_localhost_only is true."
		));
	}

	let token_gate = config.security.api_auth_token.is_some();
	let state = AppState::new(config)?;
	let app = routes::router(state);
	let listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, token_gate, "HTTP server listening.");

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

	tracing::info!("HTTP server stopped.");

	Ok(())
}

async fn shutdown_signal() {
	if signal::ctrl_c().await.is_err() {
		// No signal handler means no clean shutdown path; run until killed.
		std::future::pending::<()>().await;
	}
}

/// `RUST_LOG` wins over the configured level so a session can be turned up
/// without touching the config file.
fn init_tracing(config: &cloak_config::Config) {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(&config.service.log_level))
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
