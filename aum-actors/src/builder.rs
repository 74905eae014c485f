use crate::actor::{spawn_actor_with_shutdown, Actor, ActorHandle, Addr};
use crate::registry::Registry;
use crate::system::{ActorSystem, ShutdownHandle};
use anyhow::Result;
use tracing::info;

/// Spawns named actors, tracks their tasks and owns teardown.
pub struct Builder {
    sys: ActorSystem,
    reg: Registry,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            sys: ActorSystem::new(),
            reg: Registry::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.reg
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.sys.shutdown_handle()
    }

    /// Spawn an actor and publish its `Addr` under `name`.
    pub fn spawn<A, F>(&mut self, name: &str, mailbox: usize, new: F) -> &mut Self
    where
        A: Actor,
        F: FnOnce() -> A,
        Addr<A>: Send + Sync,
    {
        let shutdown_rx = self.sys.shutdown_notifier();
        let h: ActorHandle<A> = spawn_actor_with_shutdown(new(), mailbox, Some(shutdown_rx));
        self.reg.insert_addr::<A>(name, h.addr);
        self.sys.track(async move {
            h.task.await??;
            Ok(())
        });
        self
    }

    /// Typed address published under `name`.
    pub fn addr<A: Actor>(&self, name: &str) -> Option<Addr<A>>
    where
        Addr<A>: Send + Sync,
    {
        self.reg.get_addr::<A>(name)
    }

    pub async fn graceful_shutdown(self) -> Result<()> {
        self.reg.clear();
        self.sys.graceful_shutdown().await
    }

    /// Release the published addresses and wait for every actor to finish
    /// its queued messages. Callers must drop their own `Addr` copies first.
    pub async fn run_until_drained(mut self) -> Result<()> {
        self.reg.clear();
        self.sys.join_all().await
    }

    /// Like [`run_until_drained`](Self::run_until_drained), but CTRL-C (or a
    /// signal on the shutdown handle) stops the actors after their current
    /// message.
    pub async fn run_until_drained_or_ctrl_c(mut self) -> Result<()> {
        self.reg.clear();
        let mut shutdown_rx = self.sys.shutdown_notifier();
        tokio::select! {
            res = self.sys.join_all() => return res,
            _ = tokio::signal::ctrl_c() => {
                info!("actors.ctrl_c");
            }
            _ = shutdown_rx.recv() => {}
        }
        self.sys.graceful_shutdown().await
    }
}
