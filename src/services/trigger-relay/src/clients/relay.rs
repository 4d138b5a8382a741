//! Outbound webhook client using HTTP POST

use crate::clients::RelayClient;
use crate::config::RelayClientConfig;
use crate::error::RelayError;
use crate::models::OutboundPayload;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Relay client posting JSON payloads to merchant webhooks
#[derive(Clone)]
pub struct HttpRelayClient {
    client: Client,
}

impl HttpRelayClient {
    pub fn new(config: &RelayClientConfig) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn post_json(&self, url: &str, payload: &OutboundPayload) -> Result<u16, RelayError> {
        debug!(url = %url, "Posting relay payload");

        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(RelayError::Status {
                status: status.as_u16(),
            })
        }
    }
}
