// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-stage persistent work queues for sharesync.
//!
//! Assets move through `Fetch -> Encrypt -> Upload -> Fetch -> Share`. Every
//! hand-off is a write to the next queue followed by a removal from the
//! current one, so a crash between stages re-runs at most one step. Failures
//! are recorded in the failed queues and reported through
//! [`PipelineDelegate`].

pub mod context;
pub mod delegate;
pub mod items;
pub mod pipeline;
pub mod processing;
pub mod runner;
pub mod scheduler;
pub mod stage;
pub mod stages;

pub use context::StageContext;
pub use delegate::{PipelineDelegate, PipelineDelegates};
pub use items::{AssetRequest, FetchRequest, QueueItem, QueueRecord, ShareTarget};
pub use pipeline::Pipeline;
pub use processing::{ProcessingGuard, ProcessingRegistry};
pub use runner::{PipelineRunner, StageCaps, StageDrain};
pub use scheduler::PeriodicScheduler;
pub use stage::{MAX_CONCURRENT_ITEMS, QueueStage};
