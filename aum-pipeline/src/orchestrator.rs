//! One unit of work: discovery → scrape → extract for a single company.
use crate::discovery::{DiscoveryEngine, SearchProvider};
use crate::extract::{ExtractionAgent, ExtractionParams};
use crate::scrape::ScrapeOrchestrator;
use aum_common::{AumError, Result};
use aum_config::PipelineConfig;
use aum_drivers::BrowserSession;
use aum_llm::tokenizer::Tokenizer;
use aum_llm::traits::LlmClient;
use aum_store::{AumSnapshot, Repository};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// One full run for one company, as seen by the job queue. Implementors
/// report only through persisted rows and logs.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn process_company(&self, company_id: Uuid);
}

pub struct Pipeline {
    repo: Arc<dyn Repository>,
    discovery: DiscoveryEngine,
    scraper: ScrapeOrchestrator,
    agent: ExtractionAgent,
}

impl Pipeline {
    pub fn new(
        repo: Arc<dyn Repository>,
        browser: Arc<dyn BrowserSession>,
        search: Arc<dyn SearchProvider>,
        llm: Arc<dyn LlmClient + Send + Sync>,
        tokenizer: Arc<dyn Tokenizer>,
        settings: PipelineConfig,
        params: ExtractionParams,
    ) -> Self {
        Self {
            discovery: DiscoveryEngine::new(search, repo.clone(), settings.clone()),
            scraper: ScrapeOrchestrator::new(browser, repo.clone(), settings),
            agent: ExtractionAgent::new(llm, tokenizer, repo.clone(), params),
            repo,
        }
    }

    /// Run the three phases and return the snapshot stored, if any.
    pub async fn run(&self, company_id: Uuid) -> Result<Option<AumSnapshot>> {
        let company = self
            .repo
            .get_company(company_id)
            .await?
            .ok_or(AumError::CompanyNotFound(company_id))?;

        info!(company = %company.name, step = "discovery", "pipeline.step");
        let discovered = self.discovery.discover(&company).await?;

        info!(company = %company.name, step = "scrape", "pipeline.step");
        let pages = self.scraper.scrape(&discovered, &company).await?;

        info!(company = %company.name, step = "extract", "pipeline.step");
        let snapshot = self.agent.extract(&company, &pages).await?;

        info!(company = %company.name, stored = snapshot.is_some(), "pipeline.completed");
        Ok(snapshot)
    }

    /// Entry point for the job queue. Outcomes surface only as persisted rows
    /// and logs; nothing is returned to the dispatcher.
    pub async fn process_company(&self, company_id: Uuid) {
        match self.run(company_id).await {
            Ok(_) => {}
            Err(AumError::CompanyNotFound(id)) => {
                error!(company_id = %id, "pipeline.company_not_found");
            }
            Err(e) => {
                warn!(company_id = %company_id, error = %e, "pipeline.failed");
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for Pipeline {
    async fn process_company(&self, company_id: Uuid) {
        Pipeline::process_company(self, company_id).await
    }
}
