use anyhow::Result;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

/// Minimal actor trait. `Self: Sized` avoids object-safety issues when using `Context<Self>`.
#[async_trait::async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;

    /// Handle a single message. Return `Err` to stop the actor.
    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()>;
}

/// Runtime context for an actor instance.
///
/// The context only keeps a weak sender, so an actor never holds its own
/// mailbox open: once every [`Addr`] is dropped the actor drains what is
/// queued and exits.
pub struct Context<A: Actor> {
    addr: mpsc::WeakSender<A::Msg>,
    pub stop: bool,
}

impl<A: Actor> Context<A> {
    /// A fresh `Addr` to this actor, while anyone else still holds one.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use aum_actors::actor::{self, Actor, Context};
    /// # struct SelfPing;
    /// # #[async_trait]
    /// # impl Actor for SelfPing {
    /// #     type Msg = u8;
    /// #     async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
    /// #         if msg == 0 {
    /// #             ctx.addr().unwrap().try_send(1).unwrap();
    /// #         } else {
    /// #             ctx.stop();
    /// #         }
    /// #         Ok(())
    /// #     }
    /// # }
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let actor::ActorHandle { addr, task } = actor::spawn_actor(SelfPing, 2);
    ///     addr.send(0).await.unwrap();
    ///     task.await.unwrap().unwrap();
    /// });
    /// ```
    pub fn addr(&self) -> Option<Addr<A>> {
        self.addr.upgrade().map(Addr)
    }

    /// Request a graceful stop after processing the current message.
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

/// Address for sending messages to an actor.
pub struct Addr<A: Actor>(mpsc::Sender<A::Msg>);

/// Manual Clone to avoid unnecessary bounds on `A`/`A::Msg`.
impl<A: Actor> Clone for Addr<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Addr<A> {
    /// Async send; awaits backpressure. Returns the message if the actor is gone.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use aum_actors::actor::{self, Actor, Context};
    /// # struct Counter(u8);
    /// # #[async_trait]
    /// # impl Actor for Counter {
    /// #     type Msg = u8;
    /// #     async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
    /// #         self.0 += msg;
    /// #         Ok(())
    /// #     }
    /// # }
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let actor::ActorHandle { addr, task } = actor::spawn_actor(Counter(0), 4);
    ///     addr.send(1).await.unwrap();
    ///     addr.send(2).await.unwrap();
    ///     drop(addr);
    ///     task.await.unwrap().unwrap();
    /// });
    /// ```
    pub async fn send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.send(msg).await.map_err(|e| e.0)
    }

    /// Try to send without waiting. Returns the message if the mailbox is full or closed.
    pub fn try_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.try_send(msg).map_err(|e| e.into_inner())
    }

    /// Bounded mailbox capacity.
    pub fn capacity(&self) -> usize {
        self.0.max_capacity()
    }

    /// Messages queued and not yet handled.
    pub fn pending(&self) -> usize {
        self.0.max_capacity() - self.0.capacity()
    }
}

/// Handle to a running actor task.
pub struct ActorHandle<A: Actor> {
    pub addr: Addr<A>,
    pub task: JoinHandle<anyhow::Result<()>>,
}

/// Spawn an actor with a bounded mailbox.
///
/// Stop conditions:
/// - `handle` returns `Err`
/// - every `Addr` is dropped and the mailbox is empty
/// - `ctx.stop()` is called
pub fn spawn_actor<A: Actor>(actor: A, capacity: usize) -> ActorHandle<A> {
    spawn_actor_with_shutdown(actor, capacity, None)
}

/// Like [`spawn_actor`], but also stops when `shutdown` fires, leaving any
/// queued messages unhandled.
pub fn spawn_actor_with_shutdown<A: Actor>(
    actor: A,
    capacity: usize,
    shutdown: Option<broadcast::Receiver<()>>,
) -> ActorHandle<A> {
    let (tx, rx) = mpsc::channel::<A::Msg>(capacity.max(1));
    let ctx = Context {
        addr: tx.downgrade(),
        stop: false,
    };
    let task = tokio::spawn(run_mailbox(actor, ctx, rx, shutdown));
    ActorHandle {
        addr: Addr(tx),
        task,
    }
}

async fn handle_one<A: Actor>(actor: &mut A, msg: A::Msg, ctx: &mut Context<A>) -> Result<bool> {
    if let Err(e) = actor.handle(msg, ctx).await {
        tracing::error!(target: "aum-actors", error = ?e, "actor.failed");
        return Err(e);
    }
    Ok(ctx.stop)
}

async fn run_mailbox<A: Actor>(
    mut actor: A,
    mut ctx: Context<A>,
    mut rx: mpsc::Receiver<A::Msg>,
    shutdown: Option<broadcast::Receiver<()>>,
) -> Result<()> {
    match shutdown {
        Some(mut shutdown_rx) => loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                maybe_msg = rx.recv() => match maybe_msg {
                    Some(msg) => {
                        if handle_one(&mut actor, msg, &mut ctx).await? {
                            break;
                        }
                    }
                    None => break,
                },
            }
        },
        None => {
            while let Some(msg) = rx.recv().await {
                if handle_one(&mut actor, msg, &mut ctx).await? {
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Tally(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl Actor for Tally {
        type Msg = usize;
        async fn handle(&mut self, msg: usize, _ctx: &mut Context<Self>) -> Result<()> {
            if msg == 0 {
                anyhow::bail!("zero is not allowed");
            }
            self.0.fetch_add(msg, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn drains_mailbox_after_last_addr_drops() {
        let seen = Arc::new(AtomicUsize::new(0));
        let ActorHandle { addr, task } = spawn_actor(Tally(seen.clone()), 8);
        for _ in 0..5 {
            addr.send(2).await.unwrap();
        }
        drop(addr);
        task.await.unwrap().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn handler_error_stops_the_actor() {
        let seen = Arc::new(AtomicUsize::new(0));
        let ActorHandle { addr, task } = spawn_actor(Tally(seen), 8);
        addr.send(0).await.unwrap();
        assert!(task.await.unwrap().is_err());
        assert!(addr.send(1).await.is_err());
    }

    #[tokio::test]
    async fn shutdown_signal_ends_the_loop() {
        let (tx, rx) = broadcast::channel(1);
        let ActorHandle { addr, task } =
            spawn_actor_with_shutdown(Tally(Arc::new(AtomicUsize::new(0))), 4, Some(rx));
        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(addr.capacity(), 4);
    }
}
