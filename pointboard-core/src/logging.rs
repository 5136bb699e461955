/// Process-wide logger setup.
///
/// The filter comes from `POINTBOARD_LOG` when set (env_logger syntax), else
/// from the level passed in. Safe to call more than once; only the first call
/// installs a logger.
use std::sync::OnceLock;

pub const LOG_ENV_VAR: &str = "POINTBOARD_LOG";

/// Filter installed by the first `init`, `None` if a host logger was already in place.
static INSTALLED: OnceLock<Option<String>> = OnceLock::new();

/// The env_logger filter to use: the environment override if non-empty,
/// otherwise `default_level`.
pub fn resolve_filter(env_value: Option<String>, default_level: &str) -> String {
    env_value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default_level.to_string())
}

/// Install the env_logger backend. Returns whether a logger is active for this
/// crate. Another logger already installed by the host counts as a failure
/// and is left alone.
pub fn init(default_level: &str) -> bool {
    INSTALLED
        .get_or_init(|| {
            let filter = resolve_filter(std::env::var(LOG_ENV_VAR).ok(), default_level);
            let mut builder = env_logger::Builder::new();
            builder.parse_filters(&filter).format_timestamp_millis();
            match builder.try_init() {
                Ok(()) => Some(filter),
                Err(e) => {
                    log::debug!("[pointboard.logging] Logger already installed: {}", e);
                    None
                }
            }
        })
        .is_some()
}

/// Filter of the logger installed by [`init`], if any.
pub fn active_filter() -> Option<&'static str> {
    INSTALLED.get().and_then(|f| f.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_filter_prefers_env() {
        assert_eq!(resolve_filter(None, "info"), "info");
        assert_eq!(resolve_filter(Some("  ".to_string()), "info"), "info");
        assert_eq!(
            resolve_filter(Some("pointboard_core=trace".to_string()), "info"),
            "pointboard_core=trace"
        );
    }

    #[test]
    fn test_init_is_idempotent() {
        // Every init in this test binary uses "debug", so the outcome does not
        // depend on which test runs first.
        let first = init("debug");
        assert_eq!(init("trace"), first);
        if first {
            let expected = resolve_filter(std::env::var(LOG_ENV_VAR).ok(), "debug");
            assert_eq!(active_filter(), Some(expected.as_str()));
        }
    }
}
