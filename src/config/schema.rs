use crate::error::Result;
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PollerConfig {
    #[serde(default = "default_name")]
    #[validate(length(min = 1))]
    pub name: String,

    /// Base URL of the backend serving the status payload
    #[serde(default = "default_api_url")]
    #[validate(url)]
    pub api_url: String,

    #[serde(default = "default_status_path")]
    #[validate(length(min = 1))]
    pub status_path: String,

    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Start the session with live view already on. Unset inherits from the
    /// parent config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_view: Option<bool>,

    /// Fetch once before the session starts and seed the poller with it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefetch: Option<bool>,

    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console,
    Json { path: String },
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            api_url: default_api_url(),
            status_path: default_status_path(),
            timeout_ms: default_timeout(),
            user_agent: default_user_agent(),
            live_view: None,
            prefetch: None,
            output: None,
            extends: None,
        }
    }
}

impl PollerConfig {
    /// Full URL of the status route. `status_path` is appended to whatever
    /// path `api_url` already carries, so a prefixed base keeps its prefix.
    pub fn endpoint(&self) -> Result<Url> {
        let mut url = Url::parse(&self.api_url)?;
        let path = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            self.status_path.trim_start_matches('/')
        );
        url.set_path(&path);
        Ok(url)
    }

    pub fn starts_live(&self) -> bool {
        self.live_view.unwrap_or(false)
    }

    pub fn prefetches(&self) -> bool {
        self.prefetch.unwrap_or(false)
    }
}

pub(crate) fn default_name() -> String {
    "backend".to_string()
}

pub(crate) fn default_api_url() -> String {
    "http://localhost:4000".to_string()
}

pub(crate) fn default_status_path() -> String {
    "/api/info".to_string()
}

pub(crate) fn default_timeout() -> u64 {
    10_000
}

pub(crate) fn default_user_agent() -> String {
    "Status-Poller/0.1".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_is_api_info() {
        let config = PollerConfig::default();
        assert_eq!(
            config.endpoint().unwrap().as_str(),
            "http://localhost:4000/api/info"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let mut config = PollerConfig {
            api_url: "http://host:4000/backend".to_string(),
            ..PollerConfig::default()
        };
        assert_eq!(config.endpoint().unwrap().as_str(), "http://host:4000/backend/api/info");

        config.api_url = "http://host:4000/backend/".to_string();
        config.status_path = "health".to_string();
        assert_eq!(config.endpoint().unwrap().as_str(), "http://host:4000/backend/health");
    }

    #[test]
    fn rejects_zero_timeout_and_bad_url() {
        let config = PollerConfig {
            api_url: "not a url".to_string(),
            timeout_ms: 0,
            ..PollerConfig::default()
        };
        let errors = config.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("api_url"));
        assert!(fields.contains_key("timeout_ms"));
    }

    #[test]
    fn output_is_internally_tagged() {
        let out: OutputConfig = serde_json::from_str(r#"{"type":"json","path":"a.json"}"#).unwrap();
        assert_eq!(out, OutputConfig::Json { path: "a.json".to_string() });
    }
}
