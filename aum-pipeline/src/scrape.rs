//! Scrape Orchestrator: priority-ordered fetching with one log per attempt.
use crate::discovery::DiscoveredUrls;
use aum_config::PipelineConfig;
use aum_drivers::{BehavioralEngine, BrowserSession, PageSession};
use aum_store::{Category, Company, NewScrapeLog, Repository};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Fetch order: higher-value sources first.
pub const PRIORITY: [Category; 7] = [
    Category::Reports,
    Category::Corporate,
    Category::News,
    Category::Linkedin,
    Category::Facebook,
    Category::Instagram,
    Category::Twitter,
];

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Rendered markup of one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPage {
    pub url: String,
    pub category: Category,
    pub content: String,
}

/// Flatten the discovery map into a fetch queue in [`PRIORITY`] order.
pub fn fetch_queue(discovered: &DiscoveredUrls) -> Vec<(String, Category)> {
    PRIORITY
        .iter()
        .flat_map(|category| {
            discovered
                .get(category)
                .into_iter()
                .flatten()
                .map(move |url| (url.clone(), *category))
        })
        .collect()
}

pub struct ScrapeOrchestrator {
    browser: Arc<dyn BrowserSession>,
    repo: Arc<dyn Repository>,
    pacing: BehavioralEngine,
    settings: PipelineConfig,
}

impl ScrapeOrchestrator {
    pub fn new(
        browser: Arc<dyn BrowserSession>,
        repo: Arc<dyn Repository>,
        settings: PipelineConfig,
    ) -> Self {
        Self {
            browser,
            repo,
            pacing: BehavioralEngine::new(),
            settings,
        }
    }

    async fn render(&self, page: &mut dyn PageSession, url: &str, category: Category) -> anyhow::Result<String> {
        page.enable_network_events().await?;
        page.navigate(url, Duration::from_secs(self.settings.page_timeout_secs))
            .await?;
        let (lo, hi) = self.settings.scrape_settle_ms;
        self.pacing.random_delay(lo, hi).await;

        if category.is_social_feed() {
            for _ in 0..self.settings.scroll_cycles {
                page.execute(SCROLL_TO_BOTTOM).await?;
                tokio::time::sleep(Duration::from_millis(self.settings.scroll_pause_ms)).await;
            }
        }
        page.content().await
    }

    async fn fetch(&self, page: &mut dyn PageSession, url: &str, category: Category) -> anyhow::Result<String> {
        let rendered = self.render(page, url, category).await;
        if let Err(e) = page.close().await {
            debug!(url, error = %e, "scrape.page.close_failed");
        }
        rendered
    }

    async fn scrape_one(
        &self,
        limiter: &Semaphore,
        company: &Company,
        url: &str,
        category: Category,
    ) -> (Option<String>, NewScrapeLog) {
        let Ok(_permit) = limiter.acquire().await else {
            return (None, NewScrapeLog::failure(company.id, url, "scrape limiter closed"));
        };
        info!(url, %category, "scrape.fetch.start");

        let outcome = match self.browser.open_page().await {
            Ok(mut page) => self.fetch(page.as_mut(), url, category).await,
            Err(e) => Err(e),
        };

        let result = match outcome {
            Ok(content) => {
                info!(url, %category, length = content.len(), "scrape.fetch.ok");
                let log = NewScrapeLog::success(company.id, url, &content);
                (Some(content), log)
            }
            Err(e) => {
                let error = format!("{e:#}");
                warn!(url, %category, error = %error, "scrape.fetch.failed");
                (None, NewScrapeLog::failure(company.id, url, &error))
            }
        };

        tokio::time::sleep(Duration::from_millis(self.settings.unit_cooldown_ms)).await;
        result
    }

    /// Fetch every discovered URL and batch-commit one log per attempt.
    ///
    /// Failed fetches are left out of the returned pages; their FAILED log
    /// is the only trace. Pages come back in fetch-queue order.
    pub async fn scrape(
        &self,
        discovered: &DiscoveredUrls,
        company: &Company,
    ) -> anyhow::Result<Vec<ScrapedPage>> {
        let queue = fetch_queue(discovered);
        let limiter = Semaphore::new(self.settings.scrape_concurrency.max(1));

        let outcomes = join_all(
            queue
                .iter()
                .map(|(url, category)| self.scrape_one(&limiter, company, url, *category)),
        )
        .await;

        let mut logs = Vec::with_capacity(outcomes.len());
        let mut pages = Vec::new();
        for ((url, category), (content, log)) in queue.into_iter().zip(outcomes) {
            logs.push(log);
            if let Some(content) = content.filter(|c| !c.is_empty()) {
                pages.push(ScrapedPage {
                    url,
                    category,
                    content,
                });
            }
        }

        self.repo.commit_scrape_logs(logs).await?;
        info!(company = %company.name, pages = pages.len(), "scrape.completed");
        Ok(pages)
    }
}
