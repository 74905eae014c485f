use anyhow::Result;
use aum_actors::{spawn_workers, Builder, JobQueue};
use aum_config::{AumConfig, LlmConfig};
use aum_drivers::{AumDriver, BrowserSession};
use aum_llm::{ensure_llm_ready, tokenizer::BpeTokenizer};
use aum_pipeline::{DuckDuckGoSearch, ExtractionParams, JobSink, Pipeline, UnitOfWork};
use aum_store::{Repository, SqliteRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Everything the `run` and `rescrape` commands need after startup.
pub struct Tether {
    builder: Builder,
    repo: Arc<dyn Repository>,
    queue: JobQueue,
}

pub async fn open_repository(cfg: &AumConfig) -> Result<Arc<dyn Repository>> {
    let repo = SqliteRepository::connect(&cfg.database.url).await?;
    Ok(Arc::new(repo))
}

fn extraction_params(cfg: &AumConfig) -> ExtractionParams {
    let LlmConfig::Openai {
        temperature,
        max_tokens,
        ..
    } = &cfg.llm;
    ExtractionParams {
        max_tokens: *max_tokens,
        temperature: *temperature,
        token_budget: cfg.pipeline.token_budget,
    }
}

impl Tether {
    pub fn build(cfg: &AumConfig, repo: Arc<dyn Repository>) -> Result<Self> {
        let llm = ensure_llm_ready(&cfg.llm)?;
        let tokenizer = Arc::new(BpeTokenizer::for_gpt4o()?);

        // Sessions are opened per page, so nothing connects here.
        let browser: Arc<dyn BrowserSession> = Arc::new(AumDriver::new(
            cfg.browser.webdriver_url.clone(),
            cfg.browser.headless,
        ));
        let search = Arc::new(DuckDuckGoSearch::new(
            browser.clone(),
            Duration::from_secs(cfg.pipeline.search_timeout_secs),
        ));

        let pipeline: Arc<dyn UnitOfWork> = Arc::new(Pipeline::new(
            repo.clone(),
            browser,
            search,
            llm,
            tokenizer,
            cfg.pipeline.clone(),
            extraction_params(cfg),
        ));

        let mut builder = Builder::new();
        let queue = spawn_workers(&mut builder, cfg.worker.count, cfg.worker.mailbox, pipeline);
        info!(workers = queue.len(), "app.ready");

        Ok(Self {
            builder,
            repo,
            queue,
        })
    }

    pub fn repo(&self) -> &dyn Repository {
        self.repo.as_ref()
    }

    pub fn queue(&self) -> &dyn JobSink {
        &self.queue
    }

    /// Wait for every queued run, or stop early on CTRL-C.
    pub async fn run(self) -> Result<()> {
        let Tether { builder, queue, .. } = self;
        drop(queue);
        builder.run_until_drained_or_ctrl_c().await?;
        info!("app.done");
        Ok(())
    }
}
