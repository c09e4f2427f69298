//! `smart-launch` binary: serves the SMART launch endpoints.

// crates.io
use clap::Parser;
use color_eyre::eyre::Result;
// self
use smart_launch::{config::Config, flows::Launcher, obs, server};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	obs::init_tracing();

	let config = Config::parse();
	let launcher = Launcher::new(&config)?;

	tracing::info!(
		client_id = %config.client_id,
		redirect_uri = %config.redirect_uri,
		state_strategy = %config.state_strategy,
		pkce = config.pkce,
		"starting smart-launch"
	);

	server::serve(launcher, config.listen_addr()).await?;

	Ok(())
}
