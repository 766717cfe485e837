//! Allow-list fetcher.
//!
//! Pulls the custom integration domains and the OS board identifiers from
//! their JSON endpoints. Both are fetched concurrently; either failing fails
//! the whole fetch.

use domain::models::AllowLists;
use domain::services::{AllowListError, AllowListSource};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::EndpointsConfig;

/// Body of the integration domains endpoint.
#[derive(Debug, Deserialize)]
struct DomainsResponse {
    #[serde(default)]
    custom: Vec<String>,
}

/// Fetches allow-lists over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAllowListSource {
    client: Client,
    domains_url: String,
    os_versions_url: String,
}

impl HttpAllowListSource {
    pub fn new(config: &EndpointsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            domains_url: config.domains_url.clone(),
            os_versions_url: config.os_versions_url.clone(),
        })
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, AllowListError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AllowListError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AllowListError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AllowListError::Malformed(e.to_string()))
    }

    async fn fetch_custom_integrations(&self) -> Result<Vec<String>, AllowListError> {
        let body = self.fetch_json(&self.domains_url).await?;
        let parsed: DomainsResponse = serde_json::from_value(body)
            .map_err(|e| AllowListError::Malformed(e.to_string()))?;
        Ok(parsed.custom)
    }

    async fn fetch_os_boards(&self) -> Result<Vec<String>, AllowListError> {
        let body = self.fetch_json(&self.os_versions_url).await?;
        board_keys(&body)
    }
}

/// Board identifiers are the keys of the `hassos` object, or of the document
/// itself when it has no such object.
fn board_keys(body: &Value) -> Result<Vec<String>, AllowListError> {
    let boards: &Map<String, Value> = match body.get("hassos") {
        Some(Value::Object(boards)) => boards,
        Some(_) => {
            return Err(AllowListError::Malformed(
                "hassos is not an object".to_string(),
            ))
        }
        None => body.as_object().ok_or_else(|| {
            AllowListError::Malformed("OS versions document is not an object".to_string())
        })?,
    };
    Ok(boards.keys().cloned().collect())
}

#[async_trait::async_trait]
impl AllowListSource for HttpAllowListSource {
    async fn fetch(&self) -> Result<AllowLists, AllowListError> {
        let (custom, boards) =
            tokio::try_join!(self.fetch_custom_integrations(), self.fetch_os_boards())?;

        debug!(
            custom_integrations = custom.len(),
            os_boards = boards.len(),
            "Fetched allow-lists"
        );

        Ok(AllowLists::new(custom, boards))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoints(server: &mockito::ServerGuard) -> EndpointsConfig {
        EndpointsConfig {
            domains_url: format!("{}/domains.json", server.url()),
            os_versions_url: format!("{}/dev.json", server.url()),
            rebuild_hook_url: String::new(),
            http_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_fetch_allow_lists() {
        let mut server = mockito::Server::new_async().await;
        let domains = server
            .mock("GET", "/domains.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"core":["hue"],"custom":["custom_valid"]}"#)
            .create_async()
            .await;
        let os = server
            .mock("GET", "/dev.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"core":"2024.1.0","hassos":{"rpi4":"11.4","ova":"11.4"}}"#)
            .create_async()
            .await;

        let source = HttpAllowListSource::new(&endpoints(&server)).unwrap();
        let lists = source.fetch().await.unwrap();

        assert!(lists.is_custom_integration("custom_valid"));
        assert!(!lists.is_custom_integration("hue"));
        assert!(lists.is_os_board("rpi4"));
        assert!(lists.is_os_board("ova"));
        assert!(!lists.is_os_board("core"));

        domains.assert_async().await;
        os.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_fails_when_either_endpoint_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/domains.json")
            .with_status(200)
            .with_body(r#"{"core":[],"custom":[]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/dev.json")
            .with_status(502)
            .create_async()
            .await;

        let source = HttpAllowListSource::new(&endpoints(&server)).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, AllowListError::Status(502)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/domains.json")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;
        server
            .mock("GET", "/dev.json")
            .with_status(200)
            .with_body(r#"{"hassos":{}}"#)
            .create_async()
            .await;

        let source = HttpAllowListSource::new(&endpoints(&server)).unwrap();
        assert!(matches!(
            source.fetch().await,
            Err(AllowListError::Malformed(_))
        ));
    }

    #[test]
    fn test_board_keys_without_hassos() {
        let boards = board_keys(&json!({"rpi": "", "odroid-n2": ""})).unwrap();
        assert_eq!(boards.len(), 2);
        assert!(board_keys(&json!({"hassos": []})).is_err());
        assert!(board_keys(&json!([1, 2])).is_err());
    }
}
