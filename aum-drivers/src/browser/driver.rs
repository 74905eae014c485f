use crate::browser::{
    fingerprint::UserAgentManager, page::AumPage, stealth::build_browser_arguments,
};
use crate::{BrowserSession, PageSession};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::ClientBuilder;
use serde_json::json;
use webdriver::capabilities::Capabilities;

/// Handle on a running WebDriver service (Chromedriver by default).
///
/// Every [`open_page`](BrowserSession::open_page) starts its own WebDriver
/// session, so concurrent units never share a window handle.
pub struct AumDriver {
    webdriver_url: String,
    headless: bool,
    user_agents: UserAgentManager,
}

impl AumDriver {
    pub fn new(webdriver_url: impl Into<String>, headless: bool) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            headless,
            user_agents: UserAgentManager::new(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        let profile = self.user_agents.pick();
        let args = build_browser_arguments(self.headless, &profile);
        let mut caps = Capabilities::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        caps
    }
}

#[async_trait]
impl BrowserSession for AumDriver {
    async fn open_page(&self) -> Result<Box<dyn PageSession>> {
        let client = ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(&self.webdriver_url)
            .await
            .with_context(|| format!("webdriver connect failed: {}", self.webdriver_url))?;
        tracing::debug!(webdriver = %self.webdriver_url, "browser.page.opened");
        Ok(Box::new(AumPage::new(client)))
    }
}
