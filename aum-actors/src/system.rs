//! Task tracking and cooperative shutdown for the worker pool.
//!
//! Workers subscribe to the broadcast channel; the `JoinSet` owns their
//! tasks so teardown can await every one of them.
use anyhow::Result;
use tokio::{sync::broadcast, task::JoinSet};
use tracing::error;

#[derive(Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    pub fn signal(&self) {
        let _ = self.tx.send(());
    }
}

pub struct ActorSystem {
    joinset: JoinSet<Result<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSystem {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(32);
        Self {
            joinset: JoinSet::new(),
            shutdown_tx,
        }
    }

    pub fn shutdown_notifier(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    pub fn track(&mut self, fut: impl std::future::Future<Output = Result<()>> + Send + 'static) {
        self.joinset.spawn(fut);
    }

    /// Number of tracked tasks still running or not yet joined.
    pub fn len(&self) -> usize {
        self.joinset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joinset.is_empty()
    }

    /// Await every tracked task without signalling; returns once all
    /// mailboxes have closed and drained. A failed task does not stop the
    /// wait for the others; the first failure is returned at the end.
    pub async fn join_all(&mut self) -> Result<()> {
        let mut first_err = None;
        while let Some(res) = self.joinset.join_next().await {
            if let Err(e) = res.map_err(anyhow::Error::from).and_then(|r| r) {
                error!(error = %e, remaining = self.joinset.len(), "actors.task.failed");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub async fn graceful_shutdown(mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        self.join_all().await
    }
}
