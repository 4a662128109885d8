use crate::config::schema::PollerConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Something that can be asked for the current status payload.
///
/// Implementations make exactly one attempt per call: no retry, backoff
/// or auth is layered on top by the poller.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<Value>;

    fn describe(&self) -> String {
        "status source".to_string()
    }
}

pub struct HttpStatusSource {
    client: Client,
    endpoint: Url,
}

impl HttpStatusSource {
    pub fn new(endpoint: Url, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &PollerConfig) -> Result<Self> {
        Self::new(
            config.endpoint()?,
            Duration::from_millis(config.timeout_ms),
            &config.user_agent,
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(&self) -> Result<Value> {
        log::debug!("GET {}", self.endpoint);

        let res = self.client.get(self.endpoint.clone()).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        let body = res.bytes().await?;
        let payload = serde_json::from_slice(&body)?;
        Ok(payload)
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}
