//! Persistence for the AUM pipeline.
//!
//! [`Repository`] is the capability the pipeline writes through;
//! [`sqlite::SqliteRepository`] implements it on SQLite. Batch writes
//! (`commit_discovery`, `commit_scrape_logs`) each run in one transaction.
pub mod models;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub use models::*;
pub use sqlite::SqliteRepository;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_company(&self, id: Uuid) -> Result<Option<Company>>;

    async fn find_company_by_name(&self, name: &str) -> Result<Option<Company>>;

    async fn insert_company(&self, name: &str) -> Result<Company>;

    /// True when any company already owns a link with this URL.
    async fn link_exists(&self, url: &str) -> Result<bool>;

    async fn links_for_company(&self, company_id: Uuid) -> Result<Vec<CompanyLink>>;

    async fn search_results_for_company(&self, company_id: Uuid) -> Result<Vec<SearchResult>>;

    /// Persist raw search hits and new links in one commit. Returns the number
    /// of links actually inserted.
    async fn commit_discovery(
        &self,
        results: Vec<NewSearchResult>,
        links: Vec<NewCompanyLink>,
    ) -> Result<u64>;

    async fn commit_scrape_logs(&self, logs: Vec<NewScrapeLog>) -> Result<()>;

    async fn scrape_logs_for_company(&self, company_id: Uuid) -> Result<Vec<ScrapeLog>>;

    async fn insert_snapshot(&self, snapshot: NewAumSnapshot) -> Result<AumSnapshot>;

    async fn snapshots_for_company(&self, company_id: Uuid) -> Result<Vec<AumSnapshot>>;

    /// Append one entry to the token usage ledger.
    async fn record_usage(
        &self,
        company_id: Option<Uuid>,
        operation: &str,
        tokens: i64,
    ) -> Result<UsageRecord>;

    async fn usage_for_company(&self, company_id: Uuid) -> Result<Vec<UsageRecord>>;

    /// Tokens spent since 00:00 UTC today.
    async fn today_usage(&self) -> Result<i64>;

    /// Today's ledger entries, newest first.
    async fn today_usage_details(&self) -> Result<Vec<UsageDetail>>;
}
