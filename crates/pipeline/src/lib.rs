//! Deferred world-mutation pipeline.
//!
//! Worker threads build [`UpdateCommand`] values and push them through an
//! [`UpdateSender`]. Once per tick, the [`Dispatcher`] on the world-owning
//! thread drains the [`UpdateQueue`], resolves duplicates and competing
//! commands under one [`MergePolicy`], and applies the survivors through a
//! [`WorldAccess`](movequeue_common::WorldAccess) facade.
//!
//! # Invariants
//! - Only the dispatcher's owning thread ever calls `apply`.
//! - Every enqueued command ends up applied, failed, or dropped as a
//!   duplicate/superseded entry in exactly one tick.
//! - One failing command never stops the rest of its batch.

mod command;
mod config;
mod dispatcher;
mod merge;
mod queue;
mod stats;

pub use command::{Target, UpdateCommand};
pub use config::PipelineConfig;
pub use dispatcher::{DispatchReport, Dispatcher, FailedUpdate};
pub use merge::{MergePolicy, ParsePolicyError, Resolved, resolve};
pub use queue::{EnqueueError, QueueConfig, UpdateQueue, UpdateSender};
pub use stats::{TickSample, TickTimer};
