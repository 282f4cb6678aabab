//! Logging setup for the board server
//!
//! One `tracing-subscriber` registry per process. The level comes from
//! `RUST_LOG`, then `--log`, then `core.log_level`. Debug builds print pretty
//! lines; release builds emit JSON so storage degradation warnings can be
//! picked out by log shippers.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter directive for a log level.
///
/// Request-level tower/hyper noise stays at `warn` unless `RUST_LOG` says otherwise.
pub fn default_filter(log_level: &str) -> String {
    format!(
        "{},pinboard_engine={},hyper=warn,tower_http=warn",
        log_level, log_level
    )
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false))
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_includes_crate_target() {
        let filter = default_filter("debug");
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("pinboard_engine=debug"));
    }

    #[test]
    fn test_http_layers_stay_quiet_at_debug() {
        let filter = default_filter("debug");
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("tower_http=warn"));
    }

    #[test]
    fn test_repeated_init_does_not_panic() {
        init_telemetry_with_level("info");
        init_telemetry_with_level("debug");
    }
}
