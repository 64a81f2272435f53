//! Attachment sync pipeline
//!
//! Pages of source records flow through the [`controller`]; each record is
//! matched to a target record and its files copied by the [`processor`].
//! Everything a run needs is carried by [`RunContext`].

pub mod controller;
pub mod dispatch;
pub mod extract;
pub mod filter;
pub mod matcher;
pub mod processor;
pub mod transfer;
pub mod validate;

pub use controller::{run, ControllerState, PageState, RetryPolicy, RunSummary};
pub use dispatch::DispatchPolicy;
pub use matcher::{MatchResult, RecordMatcher};
pub use processor::{CheckpointStatus, RecordOutcome, RecordProcessor, RecordStatus};
pub use transfer::{TransferExecutor, TransferFailure, TransferRequest, TransferStage};
pub use validate::{validate_run, ResolvedCheckpoint, ValidationReport};

use crate::api::RecordService;
use crate::config::{RunOptions, TransferConfig};
use std::sync::Arc;
use tracing::Dispatch;

/// Configuration, services and log sink for one run
pub struct RunContext {
    pub config: TransferConfig,
    /// Resolved checkpoint flag; `None` disables checkpointing
    pub checkpoint: Option<ResolvedCheckpoint>,
    pub source: Arc<dyn RecordService>,
    pub target: Arc<dyn RecordService>,
    pub options: RunOptions,
    /// Where the run's events go
    pub log: Dispatch,
}

impl RunContext {
    pub fn new(
        config: TransferConfig,
        source: Arc<dyn RecordService>,
        target: Arc<dyn RecordService>,
        options: RunOptions,
    ) -> Self {
        Self {
            config,
            checkpoint: None,
            source,
            target,
            options,
            log: Dispatch::none(),
        }
    }

    pub fn with_checkpoint(mut self, checkpoint: Option<ResolvedCheckpoint>) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn with_log(mut self, log: Dispatch) -> Self {
        self.log = log;
        self
    }
}
