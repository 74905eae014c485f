use crate::browser::stealth::NETWORK_CAPTURE_SCRIPT;
use crate::PageSession;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use fantoccini::Client;
use std::time::Duration;

/// A single WebDriver session acting as one isolated page.
pub struct AumPage {
    client: Client,
    capture_network: bool,
    closed: bool,
}

impl AumPage {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            capture_network: false,
            closed: false,
        }
    }
}

#[async_trait]
impl PageSession for AumPage {
    // WebDriver exposes no network domain; resource timings are collected
    // in-page once each navigation lands.
    async fn enable_network_events(&mut self) -> Result<()> {
        self.capture_network = true;
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.client.goto(url)).await {
            Ok(res) => res.map_err(anyhow::Error::from)?,
            Err(_) => {
                return Err(anyhow!(
                    "navigation to {url} timed out after {}s",
                    timeout.as_secs()
                ))
            }
        }
        if self.capture_network {
            self.client.execute(NETWORK_CAPTURE_SCRIPT, vec![]).await?;
        }
        Ok(())
    }

    async fn execute(&mut self, script: &str) -> Result<serde_json::Value> {
        self.client
            .execute(script, vec![])
            .await
            .map_err(anyhow::Error::from)
    }

    async fn content(&mut self) -> Result<String> {
        self.client.source().await.map_err(anyhow::Error::from)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.client.clone().close().await?;
        Ok(())
    }
}
