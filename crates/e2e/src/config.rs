//! Environment-provided configuration
//!
//! Credentials and endpoints are never committed; they come from the
//! environment. Missing credentials make the scenario a skip, not a
//! failure, so CI lanes without secrets stay green.

use std::time::Duration;

/// Everything the scenario needs to run
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Base URL of the admin UI
    pub ui_base_url: String,

    /// Base URL of the REST API
    pub api_base_url: String,

    /// Admin login email
    pub admin_email: String,

    /// Admin login password
    pub admin_password: String,

    /// Run the browser headless
    pub headless: bool,

    /// Viewport dimensions
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Default timeout for UI visibility expectations
    pub ui_timeout: Duration,

    /// Bounded poll for quota activation
    pub activation_poll_attempts: u32,
    pub activation_poll_delay: Duration,
}

/// Result of reading the environment
#[derive(Debug, Clone)]
pub enum ConfigOutcome {
    Ready(ScenarioConfig),
    Skip { reason: String },
}

/// Environment variable names, matching the deployment's .env contract
pub const ENV_UI_URL: &str = "E2E_URL_ADMIN_OPERACIONAL";
pub const ENV_API_URL: &str = "E2E_API_URL";
pub const ENV_ADMIN_EMAIL: &str = "E2E_ADMIN_EMAIL";
pub const ENV_ADMIN_PASSWORD: &str = "E2E_ADMIN_PASSWORD";

const DEFAULT_UI_URL: &str = "http://localhost:5173";

impl ScenarioConfig {
    /// Read configuration from the environment
    pub fn from_env() -> ConfigOutcome {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an injected lookup (testable)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigOutcome {
        let admin_email = lookup(ENV_ADMIN_EMAIL).filter(|v| !v.is_empty());
        let admin_password = lookup(ENV_ADMIN_PASSWORD).filter(|v| !v.is_empty());

        let (admin_email, admin_password) = match (admin_email, admin_password) {
            (Some(e), Some(p)) => (e, p),
            _ => {
                return ConfigOutcome::Skip {
                    reason: format!(
                        "set {} and {} in the environment before running the scenario",
                        ENV_ADMIN_EMAIL, ENV_ADMIN_PASSWORD
                    ),
                };
            }
        };

        let Some(api_base_url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) else {
            return ConfigOutcome::Skip {
                reason: format!("set {} to the REST API base URL", ENV_API_URL),
            };
        };

        let ui_base_url = lookup(ENV_UI_URL)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_UI_URL.to_string());

        ConfigOutcome::Ready(ScenarioConfig {
            ui_base_url,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            admin_email,
            admin_password,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            ui_timeout: Duration::from_secs(5),
            activation_poll_attempts: 5,
            activation_poll_delay: Duration::from_secs(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_credentials_skip() {
        let vars = env(&[(ENV_API_URL, "http://api.local")]);
        let outcome = ScenarioConfig::from_lookup(|n| vars.get(n).cloned());
        match outcome {
            ConfigOutcome::Skip { reason } => {
                assert!(reason.contains(ENV_ADMIN_EMAIL));
            }
            ConfigOutcome::Ready(_) => panic!("expected skip without credentials"),
        }
    }

    #[test_case::test_case(ENV_ADMIN_EMAIL; "email absent")]
    #[test_case::test_case(ENV_ADMIN_PASSWORD; "password absent")]
    #[test_case::test_case(ENV_API_URL; "api url absent")]
    fn test_any_required_var_absent_skips(absent: &str) {
        let mut vars = env(&[
            (ENV_ADMIN_EMAIL, "admin@consorcio.dev"),
            (ENV_ADMIN_PASSWORD, "secret"),
            (ENV_API_URL, "http://api.local"),
        ]);
        vars.remove(absent);
        let outcome = ScenarioConfig::from_lookup(|n| vars.get(n).cloned());
        assert!(matches!(outcome, ConfigOutcome::Skip { .. }));
    }

    #[test]
    fn test_empty_password_counts_as_absent() {
        let vars = env(&[
            (ENV_ADMIN_EMAIL, "admin@consorcio.dev"),
            (ENV_ADMIN_PASSWORD, ""),
            (ENV_API_URL, "http://api.local"),
        ]);
        let outcome = ScenarioConfig::from_lookup(|n| vars.get(n).cloned());
        assert!(matches!(outcome, ConfigOutcome::Skip { .. }));
    }

    #[test]
    fn test_ready_with_defaults() {
        let vars = env(&[
            (ENV_ADMIN_EMAIL, "admin@consorcio.dev"),
            (ENV_ADMIN_PASSWORD, "secret"),
            (ENV_API_URL, "http://api.local/"),
        ]);
        let outcome = ScenarioConfig::from_lookup(|n| vars.get(n).cloned());
        let config = match outcome {
            ConfigOutcome::Ready(c) => c,
            ConfigOutcome::Skip { reason } => panic!("unexpected skip: {}", reason),
        };
        assert_eq!(config.ui_base_url, "http://localhost:5173");
        assert_eq!(config.api_base_url, "http://api.local");
        assert!(config.headless);
        assert_eq!(config.activation_poll_attempts, 5);
    }
}
