//! Logging utilities wrapping `tracing` initialisation.

use tracing_subscriber::EnvFilter;

use crate::config::{ENV_LOG, LoggingOptions};
use crate::error::{Error, Result};

/// Initialise the global tracing subscriber according to the provided
/// logging options.
///
/// `LEDGER_AVAX_LOG` takes precedence over the configured level.
/// Subsequent calls are ignored.
pub fn init(options: &LoggingOptions) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let level = std::env::var(ENV_LOG).unwrap_or_else(|_| options.level.clone());
    let env_filter = filter(&level)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

/// Build an [`EnvFilter`] from a directive string.
pub fn filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| Error::Config(format!("Invalid log level '{level}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_directives() {
        assert!(filter("info").is_ok());
        assert!(filter("ledger_avalanche=trace,warn").is_ok());
    }

    #[test]
    fn rejects_invalid_directive() {
        assert!(matches!(filter("ledger_avalanche=notalevel"), Err(Error::Config(_))));
    }

    #[test]
    fn init_twice_is_noop() {
        let options = LoggingOptions::default();
        assert!(init(&options).is_ok());
        assert!(init(&options).is_ok());
    }
}
