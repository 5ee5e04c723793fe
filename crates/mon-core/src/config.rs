//! Dispatch pipeline configuration.

use std::env;

/// Tunables for the dispatcher, read once at startup.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Debug mode: error responses carry the underlying error text.
    pub debug: bool,
    /// Maximum composed-callable cache entries before a drop-all eviction.
    pub callback_cache_max: usize,
    /// Whether paths containing `//` are rejected outright.
    pub reject_double_slash: bool,
    /// Whether controllers are constructed fresh per request instead of
    /// being shared singletons.
    pub fresh_controllers: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            debug: false,
            callback_cache_max: 1024,
            reject_double_slash: false,
            fresh_controllers: false,
        }
    }
}

impl CoreConfig {
    /// Build a config from `MON_*` environment variables, falling back to
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            debug: env_flag("MON_DEBUG").unwrap_or(defaults.debug),
            callback_cache_max: env::var("MON_CALLBACK_CACHE_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.callback_cache_max),
            reject_double_slash: env_flag("MON_REJECT_DOUBLE_SLASH")
                .unwrap_or(defaults.reject_double_slash),
            fresh_controllers: env_flag("MON_FRESH_CONTROLLERS")
                .unwrap_or(defaults.fresh_controllers),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_use_sensible_defaults() {
        let config = CoreConfig::default();
        assert!(!config.debug);
        assert_eq!(config.callback_cache_max, 1024);
        assert!(!config.reject_double_slash);
        assert!(!config.fresh_controllers);
    }

    #[test]
    fn test_should_parse_flag_forms() {
        // Exercise the flag parser directly to stay independent of the
        // process environment.
        unsafe {
            env::set_var("MON_TEST_FLAG_A", "yes");
            env::set_var("MON_TEST_FLAG_B", "0");
            env::set_var("MON_TEST_FLAG_C", "maybe");
        }
        assert_eq!(env_flag("MON_TEST_FLAG_A"), Some(true));
        assert_eq!(env_flag("MON_TEST_FLAG_B"), Some(false));
        assert_eq!(env_flag("MON_TEST_FLAG_C"), None);
        assert_eq!(env_flag("MON_TEST_FLAG_UNSET"), None);
    }
}
