mod config;
mod entity;
mod error;
mod plugins;
mod prelude;
mod state;
mod sv;
mod ui;
mod utils;

use anyhow::Context;
use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{config::Config, plugins::App, prelude::*, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "market_admin=debug,teloxide=info,reqwest=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env().context("Invalid configuration")?;

  info!("Starting market admin v{}", env!("CARGO_PKG_VERSION"));
  info!(
    "Backend {}, image bucket {}, {} admin(s)",
    config.api_base_url,
    config.storage_bucket,
    config.admins.len()
  );
  if config.admins.is_empty() {
    warn!("No admins configured, every chat will be ignored");
  }

  let app = Arc::new(AppState::new(config).context("Failed to build clients")?);

  App::new().register(plugins::telegram::Plugin).run(app).await;
  Ok(())
}
