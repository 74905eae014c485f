//! Job-queue consumer: one pipeline run per queued company id.
use crate::actor::{Actor, Addr, Context};
use crate::builder::Builder;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aum_pipeline::{JobSink, UnitOfWork};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub const WORKER_PREFIX: &str = "pipeline-worker-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMsg {
    ProcessCompany(Uuid),
}

pub struct PipelineWorker {
    id: usize,
    work: Arc<dyn UnitOfWork>,
    processed: u64,
}

impl PipelineWorker {
    pub fn new(id: usize, work: Arc<dyn UnitOfWork>) -> Self {
        Self {
            id,
            work,
            processed: 0,
        }
    }
}

#[async_trait]
impl Actor for PipelineWorker {
    type Msg = JobMsg;

    /// Never fails: a bad run is logged by the pipeline and the worker moves
    /// on to the next message.
    async fn handle(&mut self, msg: JobMsg, _ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            JobMsg::ProcessCompany(company_id) => {
                info!(worker = self.id, %company_id, "worker.job.start");
                self.work.process_company(company_id).await;
                self.processed += 1;
                debug!(worker = self.id, %company_id, processed = self.processed, "worker.job.done");
            }
        }
        Ok(())
    }
}

/// Round-robin dispatcher over the worker mailboxes.
#[derive(Clone)]
pub struct JobQueue {
    workers: Arc<Vec<Addr<PipelineWorker>>>,
    next: Arc<AtomicUsize>,
}

impl JobQueue {
    pub fn new(workers: Vec<Addr<PipelineWorker>>) -> Self {
        Self {
            workers: Arc::new(workers),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub async fn enqueue(&self, company_id: Uuid) -> Result<()> {
        if self.workers.is_empty() {
            return Err(anyhow!("no pipeline workers running"));
        }
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.workers[slot]
            .send(JobMsg::ProcessCompany(company_id))
            .await
            .map_err(|_| anyhow!("pipeline worker {slot} has stopped"))?;
        debug!(%company_id, worker = slot, "queue.enqueued");
        Ok(())
    }
}

#[async_trait]
impl JobSink for JobQueue {
    async fn enqueue(&self, company_id: Uuid) -> Result<()> {
        JobQueue::enqueue(self, company_id).await
    }
}

/// Spawn `count` workers sharing `work` and return a queue over them.
pub fn spawn_workers(
    builder: &mut Builder,
    count: usize,
    mailbox: usize,
    work: Arc<dyn UnitOfWork>,
) -> JobQueue {
    let count = count.max(1);
    for id in 0..count {
        let work = work.clone();
        builder.spawn(&format!("{WORKER_PREFIX}{id}"), mailbox, move || {
            PipelineWorker::new(id, work)
        });
    }
    info!(count, mailbox, "worker.pool.started");
    JobQueue::new(
        builder
            .registry()
            .addrs_with_prefix::<PipelineWorker>(WORKER_PREFIX),
    )
}
