//! Company intake: registering names, re-running a company, usage report.
use aum_common::{AumError, Result};
use aum_store::{Repository, UsageDetail};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Hands one company id to whatever runs the pipeline.
#[async_trait]
pub trait JobSink: Send + Sync {
    async fn enqueue(&self, company_id: Uuid) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(Uuid),
    Name(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub total_tokens_today: i64,
    pub details: Vec<UsageDetail>,
}

/// Create every unseen company and queue one run for each.
///
/// Blank names are skipped and existing companies are not queued again.
/// Returns how many runs were dispatched.
pub async fn register_companies<I, S>(
    repo: &dyn Repository,
    queue: &dyn JobSink,
    names: I,
) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut dispatched = 0;
    for name in names {
        let name = name.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        if repo.find_company_by_name(name).await?.is_some() {
            continue;
        }
        let company = repo.insert_company(name).await?;
        queue.enqueue(company.id).await?;
        dispatched += 1;
    }
    info!(dispatched, "intake.companies.queued");
    Ok(dispatched)
}

/// Queue a fresh run for an existing company.
pub async fn requeue_company(
    repo: &dyn Repository,
    queue: &dyn JobSink,
    lookup: Lookup,
) -> Result<Uuid> {
    let company = match &lookup {
        Lookup::Id(id) => repo.get_company(*id).await?,
        Lookup::Name(name) => repo.find_company_by_name(name).await?,
    };
    let company = company.ok_or(match lookup {
        Lookup::Id(id) => AumError::CompanyNotFound(id),
        Lookup::Name(name) => AumError::UnknownCompanyName(name),
    })?;
    queue.enqueue(company.id).await?;
    info!(company = %company.name, "intake.company.requeued");
    Ok(company.id)
}

pub async fn today_usage_report(repo: &dyn Repository) -> Result<UsageReport> {
    let details = repo.today_usage_details().await?;
    let total_tokens_today = repo.today_usage().await?;
    Ok(UsageReport {
        total_tokens_today,
        details,
    })
}
