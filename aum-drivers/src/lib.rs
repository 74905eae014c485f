//! Browser automation capability used by discovery and scraping.
//!
//! - [`BrowserSession`] / [`PageSession`]: the capability the pipeline depends on
//! - [`browser::driver::AumDriver`]: WebDriver implementation (`fantoccini`)
//! - [`browser::behavioral::BehavioralEngine`]: randomized pacing
//! - [`browser::stealth`] and [`browser::fingerprint`]: launch arguments and UA pool
pub mod browser;

use async_trait::async_trait;
use std::time::Duration;

pub use browser::behavioral::BehavioralEngine;
pub use browser::driver::AumDriver;

/// A browser that can hand out isolated page contexts.
///
/// One session is shared by every concurrent unit of a phase; each unit opens
/// and closes its own page.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn open_page(&self) -> anyhow::Result<Box<dyn PageSession>>;
}

/// One isolated page context.
#[async_trait]
pub trait PageSession: Send {
    /// Start capturing network activity for the page.
    async fn enable_network_events(&mut self) -> anyhow::Result<()>;

    /// Navigate to `url`; exceeding `timeout` is an error.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> anyhow::Result<()>;

    async fn execute(&mut self, script: &str) -> anyhow::Result<serde_json::Value>;

    /// Fully rendered markup of the current document.
    async fn content(&mut self) -> anyhow::Result<String>;

    async fn close(&mut self) -> anyhow::Result<()>;
}
