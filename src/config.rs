//! Configuration constants and defaults for fluent requests
//!
//! Every new request starts from a [`RequestDefaults`]; the environment can
//! override individual values for a whole test run.

use std::time::Duration;

/// Default `Content-Type` of serialized request bodies
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Default `Accept` header
pub const DEFAULT_ACCEPTED_CONTENT_TYPE: &str = "application/json";

/// Default `Accept-Language` / `Lang` header
pub const DEFAULT_CULTURE: &str = "en,en-GB;q=0.9,en-US";

/// Default `User-Agent` header
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36 fluent-client/",
    env!("CARGO_PKG_VERSION")
);

pub const USER_AGENT_ENV_VAR: &str = "FLUENT_CLIENT_USER_AGENT";
pub const CULTURE_ENV_VAR: &str = "FLUENT_CLIENT_CULTURE";
pub const ACCEPT_ENV_VAR: &str = "FLUENT_CLIENT_ACCEPT";
pub const CONTENT_TYPE_ENV_VAR: &str = "FLUENT_CLIENT_CONTENT_TYPE";
/// Per-request timeout in milliseconds
pub const TIMEOUT_ENV_VAR: &str = "FLUENT_CLIENT_TIMEOUT_MS";

/// Values copied into every [`crate::RequestSpec`] created by a client
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDefaults {
    pub content_type: String,
    pub accepted_content_type: String,
    pub culture: String,
    pub user_agent: String,
    /// `None` defers to the transport's own timeout
    pub timeout: Option<Duration>,
    /// Path used when a request is sent without one
    pub path: Option<String>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            accepted_content_type: DEFAULT_ACCEPTED_CONTENT_TYPE.to_string(),
            culture: DEFAULT_CULTURE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            path: None,
        }
    }
}

impl RequestDefaults {
    /// Built-in defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut defaults = Self::default();

        if let Some(value) = env_string(USER_AGENT_ENV_VAR) {
            defaults.user_agent = value;
        }
        if let Some(value) = env_string(CULTURE_ENV_VAR) {
            defaults.culture = value;
        }
        if let Some(value) = env_string(ACCEPT_ENV_VAR) {
            defaults.accepted_content_type = value;
        }
        if let Some(value) = env_string(CONTENT_TYPE_ENV_VAR) {
            defaults.content_type = value;
        }
        if let Some(value) = env_string(TIMEOUT_ENV_VAR) {
            match value.parse::<u64>() {
                Ok(ms) => defaults.timeout = Some(Duration::from_millis(ms)),
                Err(_) => {
                    tracing::warn!("Ignoring {TIMEOUT_ENV_VAR}={value}: not a number of milliseconds")
                }
            }
        }

        defaults
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var_os(name)
        .and_then(|val| val.into_string().ok())
        .filter(|val| !val.trim().is_empty())
}
