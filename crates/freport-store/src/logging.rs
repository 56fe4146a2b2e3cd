//! Tracing subscriber setup for binaries and tests embedding the store.

use freport_error::{ReportError, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|err| ReportError::config(format!("invalid log filter '{}': {err}", config.filter)))
}

/// Install a global fmt subscriber. `RUST_LOG` overrides `config.filter`.
///
/// Returns `Ok(false)` when a subscriber was already installed, so callers
/// (tests especially) may call this repeatedly.
///
/// # Errors
///
/// [`ReportError::Config`] when the configured filter does not parse.
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;
    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };
    Ok(installed)
}

/// Test-writer subscriber at `info` unless `RUST_LOG` says otherwise.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_test_writer()
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_test_logging();
        let config = LoggingConfig::default();
        assert!(!init_logging(&config).expect("valid filter"));
        assert!(!init_logging(&config).expect("valid filter"));
    }

    #[test]
    fn bad_filter_is_config_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            filter: "store=notalevel".to_owned(),
            json: false,
        };
        let err = init_logging(&config).expect_err("must reject");
        assert!(matches!(err, ReportError::Config { .. }));
    }
}
