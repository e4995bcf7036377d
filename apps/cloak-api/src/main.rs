use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = cloak_api::Args::parse();

	cloak_api::run(args).await
}
