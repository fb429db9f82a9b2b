use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
///
/// `RUST_LOG` wins when set. Otherwise our own crates log at `info`, or at
/// `debug` when `verbose` is on.
pub fn init(service_name: &str, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name, verbose)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::External(format!("failed to install tracing subscriber: {e}")))
}

fn default_directives(service_name: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("warn,{service_name}={level},rosibot_core={level},rosibot_signal={level}")
}
