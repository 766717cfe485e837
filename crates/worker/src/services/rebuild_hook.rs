//! Site rebuild hook.

use domain::services::{RebuildHookError, RebuildTrigger};
use reqwest::Client;
use std::time::Duration;
use tracing::info;

/// Triggers the downstream rebuild with an empty POST.
#[derive(Debug, Clone)]
pub struct HttpRebuildTrigger {
    client: Client,
    url: String,
}

impl HttpRebuildTrigger {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl RebuildTrigger for HttpRebuildTrigger {
    async fn trigger(&self) -> Result<(), RebuildHookError> {
        let response = self
            .client
            .post(&self.url)
            .send()
            .await
            .map_err(|e| RebuildHookError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RebuildHookError::Status(status.as_u16()));
        }

        info!(status = status.as_u16(), "Triggered site rebuild");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_posts_to_hook() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(200)
            .create_async()
            .await;

        let hook = HttpRebuildTrigger::new(format!("{}/hook", server.url()), 5).unwrap();
        hook.trigger().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_trigger_non_success_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let hook = HttpRebuildTrigger::new(format!("{}/hook", server.url()), 5).unwrap();
        let err = hook.trigger().await.unwrap_err();
        assert!(matches!(err, RebuildHookError::Status(500)));
    }

    #[tokio::test]
    async fn test_trigger_unreachable_is_error() {
        let hook = HttpRebuildTrigger::new("http://127.0.0.1:9/hook", 1).unwrap();
        assert!(matches!(
            hook.trigger().await,
            Err(RebuildHookError::Request(_))
        ));
    }
}
