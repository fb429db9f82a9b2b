use std::sync::Arc;

use anyhow::Context;

use rosibot_core::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Arc::new(Config::load().context("loading configuration")?);
    rosibot_core::logging::init("rosibot", cfg.debug)?;

    tracing::info!("Starting RosiBot for {}", cfg.phone_number);
    rosibot_signal::router::run_polling(cfg)
        .await
        .context("signal bot failed")?;

    Ok(())
}
