//! Actor runtime and the job-queue consumer for pipeline runs.
//!
//! - [`actor`]: `Actor` trait, bounded mailbox `Addr`, spawn helpers
//! - [`system`] / [`builder`]: task tracking, draining and shutdown
//! - [`registry`]: typed addresses by name (`dashmap`)
//! - [`worker`]: [`worker::PipelineWorker`] and the round-robin [`worker::JobQueue`]
pub mod actor;
pub mod builder;
pub mod registry;
pub mod system;
pub mod worker;

pub use builder::Builder;
pub use worker::{spawn_workers, JobMsg, JobQueue, PipelineWorker};
