//! Structured logging.
//!
//! JSON lines in release mode, human-readable output in debug mode. The
//! level comes from `RUST_LOG` when set, otherwise from `log_level` in
//! `api.yaml`.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::Mode;

static INIT: Once = Once::new();

/// Install the global subscriber. Later calls are no-ops, so the format is
/// fixed by the first snapshot and survives reloads.
pub fn init_logging(mode: Mode, default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter(default_level)))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let registry = tracing_subscriber::registry().with(filter);
        let installed = match mode {
            Mode::Release => registry.with(fmt::layer().json()).try_init(),
            Mode::Debug => registry.with(fmt::layer()).try_init(),
        };
        if let Err(e) = installed {
            eprintln!("logging already initialized: {e}");
        }
    });
}

fn default_filter(level: &str) -> String {
    format!("caaspay_api={level},tower_http={level},{level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(default_filter("debug")).is_ok());
        assert!(EnvFilter::try_new(default_filter("warn")).is_ok());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(Mode::Debug, "info");
        init_logging(Mode::Release, "debug");
    }
}
