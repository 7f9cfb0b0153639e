//! Tracing setup for binaries embedding Stronghold.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither the caller nor `RUST_LOG` picks one.
pub const DEFAULT_FILTER: &str = "info,stronghold_store=info,stronghold_protocol=warn";

/// Builds the filter: `RUST_LOG` if set and valid, else `default_filter`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs a console subscriber as the global default.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case the existing one is kept.
pub fn init_tracing(default_filter: &str) -> bool {
    let console = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(console)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_uses_default_string() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        let rendered = filter.to_string();
        assert!(rendered.contains("stronghold_store=info"));
        assert!(rendered.contains("stronghold_protocol=warn"));
    }

    #[test]
    fn test_init_tracing_twice_keeps_first() {
        let _ = init_tracing("debug");
        assert!(!init_tracing("info"));
    }
}
