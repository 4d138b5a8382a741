//! Store REST API client
//!
//! Documents are read from `{base_url}/{resource}/{id}.json` with the store id
//! in `X-Store-ID`. Application settings come from
//! `{base_url}/applications/{application_id}.json`, where `hidden_data` is
//! merged over `data`.

use crate::clients::{AppDataProvider, ResourceFetcher};
use crate::config::StoreApiConfig;
use crate::error::StoreApiError;
use crate::models::{AppData, StoreId};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

pub struct StoreApiClient {
    client: Client,
    base_url: String,
    application_id: String,
    my_id: Option<String>,
    access_token: Option<String>,
    merge_hidden_data: bool,
}

impl StoreApiClient {
    pub fn new(config: &StoreApiConfig) -> Result<Self, StoreApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("trigger-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            application_id: config.application_id.clone(),
            my_id: config.my_id.clone(),
            access_token: config.access_token.clone(),
            merge_hidden_data: config.merge_hidden_data,
        })
    }

    async fn get_json(&self, store_id: StoreId, path: &str) -> Result<Value, StoreApiError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(store_id = %store_id, url = %url, "Store API request");

        let mut request = self
            .client
            .get(&url)
            .header("X-Store-ID", store_id.to_string());
        if let Some(my_id) = &self.my_id {
            request = request.header("X-My-ID", my_id);
        }
        if let Some(token) = &self.access_token {
            request = request.header("X-Access-Token", token);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreApiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Settings object of an application document
    fn settings_from(&self, mut application: Value) -> Map<String, Value> {
        let mut settings = match application.get_mut("data").map(Value::take) {
            Some(Value::Object(data)) => data,
            _ => Map::new(),
        };

        if self.merge_hidden_data {
            if let Some(Value::Object(hidden)) = application.get_mut("hidden_data").map(Value::take)
            {
                settings.extend(hidden);
            }
        }

        settings
    }
}

#[async_trait]
impl AppDataProvider for StoreApiClient {
    async fn fetch_app_data(&self, store_id: StoreId) -> Result<AppData, StoreApiError> {
        let path = format!("applications/{}.json", self.application_id);
        let application = self.get_json(store_id, &path).await?;
        let settings = self.settings_from(application);

        Ok(serde_json::from_value(Value::Object(settings))?)
    }
}

#[async_trait]
impl ResourceFetcher for StoreApiClient {
    async fn fetch_resource(
        &self,
        store_id: StoreId,
        resource: &str,
        id: &str,
    ) -> Result<Value, StoreApiError> {
        self.get_json(store_id, &format!("{}/{}.json", resource, id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(merge_hidden_data: bool) -> StoreApiClient {
        let config = StoreApiConfig {
            base_url: "https://api.example.test/v1/".to_string(),
            application_id: "app-1".to_string(),
            merge_hidden_data,
            ..StoreApiConfig::default()
        };
        StoreApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client(true).base_url, "https://api.example.test/v1");
    }

    #[test]
    fn test_hidden_data_merged_over_data() {
        let settings = client(true).settings_from(json!({
            "data": { "cart_delay": 5, "ni_webhook_uri": "https://public.test" },
            "hidden_data": { "ni_webhook_uri": "https://hidden.test" }
        }));

        assert_eq!(settings["cart_delay"], json!(5));
        assert_eq!(settings["ni_webhook_uri"], json!("https://hidden.test"));
    }

    #[test]
    fn test_hidden_data_left_out_when_disabled() {
        let settings = client(false).settings_from(json!({
            "data": { "cart_delay": 5 },
            "hidden_data": { "ni_webhook_uri": "https://hidden.test" }
        }));

        assert!(settings.get("ni_webhook_uri").is_none());
    }

    #[test]
    fn test_missing_data_gives_empty_settings() {
        let settings = client(true).settings_from(json!({ "_id": "app-1" }));
        assert!(settings.is_empty());
    }
}
