//! Environment variable processing for runtime configuration overrides.
//!
//! Env var prefix: `MTR_OBSERVER_`
//!
//! - `MTR_OBSERVER_PROFILE` - select a `[profiles.<name>]` overlay from the config file
//! - `MTR_OBSERVER_TEXT_LIMIT` - override the per-list summary entry limit
//! - `MTR_OBSERVER_TEST_NAME_LIMIT` - override the display budget per test name
//! - `MTR_OBSERVER_MAX_LINE_LENGTH` - override the chunk splitter line limit (bytes)
//! - `MTR_OBSERVER_RUN_ID` - override the fallback run id

use super::Config;

const PREFIX: &str = "MTR_OBSERVER_";

/// Read the active profile name from `MTR_OBSERVER_PROFILE`.
pub fn get_profile_name() -> Option<String> {
    env_str("PROFILE")
}

/// Apply individual env var overrides to a config.
///
/// Each override is applied only if the env var is set and parses correctly.
/// Invalid values are silently ignored.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(val) = env_parse::<usize>("TEXT_LIMIT") {
        config.summary.text_limit = val;
    }

    if let Some(val) = env_parse::<usize>("TEST_NAME_LIMIT") {
        config.summary.test_name_limit = val;
    }

    if let Some(val) = env_parse::<usize>("MAX_LINE_LENGTH") {
        config.input.max_line_length = val;
    }

    if let Some(val) = env_parse::<u64>("RUN_ID") {
        config.run.id = val;
    }
}

/// Summarize which env var overrides are currently active.
///
/// Returns a list of `(env_var_name, value)` pairs.
pub fn detect_active_overrides() -> Vec<(String, String)> {
    let keys = [
        "PROFILE",
        "TEXT_LIMIT",
        "TEST_NAME_LIMIT",
        "MAX_LINE_LENGTH",
        "RUN_ID",
    ];

    let mut active = Vec::new();
    for key in keys {
        let full = format!("{PREFIX}{key}");
        if let Ok(val) = std::env::var(&full) {
            if !val.is_empty() {
                active.push((full, val));
            }
        }
    }
    active
}

// --- helpers ---

fn env_str(suffix: &str) -> Option<String> {
    std::env::var(format!("{PREFIX}{suffix}"))
        .ok()
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    env_str(suffix).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use std::sync::Mutex;

    // Env vars are process-global, so serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 5] = [
        "MTR_OBSERVER_PROFILE",
        "MTR_OBSERVER_TEXT_LIMIT",
        "MTR_OBSERVER_TEST_NAME_LIMIT",
        "MTR_OBSERVER_MAX_LINE_LENGTH",
        "MTR_OBSERVER_RUN_ID",
    ];

    /// Helper: run a closure with exactly the given env vars set, then restore.
    fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let old: Vec<(&str, Option<String>)> =
            ALL_VARS.iter().map(|&k| (k, std::env::var(k).ok())).collect();
        for k in ALL_VARS {
            // SAFETY: tests are serialized via ENV_LOCK
            unsafe { std::env::remove_var(k) };
        }
        for &(k, v) in vars {
            // SAFETY: tests are serialized via ENV_LOCK
            unsafe { std::env::set_var(k, v) };
        }
        f();
        for (k, prev) in old {
            // SAFETY: tests are serialized via ENV_LOCK
            match prev {
                Some(v) => unsafe { std::env::set_var(k, v) },
                None => unsafe { std::env::remove_var(k) },
            }
        }
    }

    #[test]
    fn test_get_profile_name_set() {
        with_env_vars(&[("MTR_OBSERVER_PROFILE", "ci")], || {
            assert_eq!(get_profile_name(), Some("ci".to_string()));
        });
    }

    #[test]
    fn test_get_profile_name_unset_or_empty() {
        with_env_vars(&[], || {
            assert_eq!(get_profile_name(), None);
        });
        with_env_vars(&[("MTR_OBSERVER_PROFILE", "")], || {
            assert_eq!(get_profile_name(), None);
        });
    }

    #[test]
    fn test_apply_env_overrides_all_fields() {
        with_env_vars(
            &[
                ("MTR_OBSERVER_TEXT_LIMIT", "9"),
                ("MTR_OBSERVER_TEST_NAME_LIMIT", "30"),
                ("MTR_OBSERVER_MAX_LINE_LENGTH", "65536"),
                ("MTR_OBSERVER_RUN_ID", "1234"),
            ],
            || {
                let mut config = Config::default();
                apply_env_overrides(&mut config);
                assert_eq!(config.summary.text_limit, 9);
                assert_eq!(config.summary.test_name_limit, 30);
                assert_eq!(config.input.max_line_length, 65536);
                assert_eq!(config.run.id, 1234);
            },
        );
    }

    #[test]
    fn test_apply_env_overrides_invalid_values_ignored() {
        with_env_vars(
            &[
                ("MTR_OBSERVER_TEXT_LIMIT", "lots"),
                ("MTR_OBSERVER_RUN_ID", "-1"),
            ],
            || {
                let mut config = Config::default();
                apply_env_overrides(&mut config);
                assert_eq!(config.summary.text_limit, 5);
                assert_eq!(config.run.id, 0);
            },
        );
    }

    #[test]
    fn test_detect_active_overrides() {
        with_env_vars(&[("MTR_OBSERVER_RUN_ID", "5")], || {
            let active = detect_active_overrides();
            assert_eq!(
                active,
                vec![("MTR_OBSERVER_RUN_ID".to_string(), "5".to_string())]
            );
        });
    }

    #[test]
    fn test_loader_applies_profile_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mtr-observer.toml");
        std::fs::write(
            &path,
            r#"
[summary]
text-limit = 3

[profiles.ci.summary]
text-limit = 10
test-name-limit = 32
"#,
        )
        .unwrap();

        with_env_vars(
            &[
                ("MTR_OBSERVER_PROFILE", "ci"),
                ("MTR_OBSERVER_TEST_NAME_LIMIT", "20"),
            ],
            || {
                let config = ConfigLoader::new().config_file(&path).load().unwrap();
                assert_eq!(config.summary.text_limit, 10);
                assert_eq!(config.summary.test_name_limit, 20);
            },
        );
    }

    #[test]
    fn test_loader_unknown_profile_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mtr-observer.toml");
        std::fs::write(&path, "[profiles.ci.run]\nid = 1\n").unwrap();

        with_env_vars(&[("MTR_OBSERVER_PROFILE", "nightly")], || {
            let err = ConfigLoader::new().config_file(&path).load().unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("profile 'nightly' not found"));
            assert!(msg.contains("ci"));
        });
    }
}
