//! Per-record processing
//!
//! Match the source record to a target record, copy every eligible file of
//! every mapped attachment field, then flag the source record as processed.
//! Nothing is retried at this level; each file succeeds or fails on its own.

use crate::api::RecordUpdate;
use crate::sync::extract::transferable_file_ids;
use crate::sync::matcher::{MatchResult, RecordMatcher};
use crate::sync::transfer::{TransferExecutor, TransferRequest};
use crate::sync::RunContext;
use attachsync_common::types::{FieldMapping, FieldValue, Record, RecordFieldValue, RecordId};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// How a record was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Processed,
    /// The match field was not returned for the record
    SkippedNoMatchValue,
    SkippedNoMatch,
    SkippedAmbiguous,
    /// The match lookup itself failed
    SkippedMatchFailed,
}

/// Result of the checkpoint flag update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStatus {
    NotConfigured,
    Updated,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub record_id: RecordId,
    pub status: RecordStatus,
    pub target_record_id: Option<RecordId>,
    pub files_transferred: usize,
    pub files_failed: usize,
    pub checkpoint: CheckpointStatus,
}

impl RecordOutcome {
    fn skipped(record_id: RecordId, status: RecordStatus) -> Self {
        Self {
            record_id,
            status,
            target_record_id: None,
            files_transferred: 0,
            files_failed: 0,
            checkpoint: CheckpointStatus::NotConfigured,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct FileCounts {
    transferred: usize,
    failed: usize,
}

impl std::ops::Add for FileCounts {
    type Output = FileCounts;

    fn add(self, other: FileCounts) -> FileCounts {
        FileCounts {
            transferred: self.transferred + other.transferred,
            failed: self.failed + other.failed,
        }
    }
}

/// Processes source records against a run's configuration
pub struct RecordProcessor<'a> {
    ctx: &'a RunContext,
}

impl<'a> RecordProcessor<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    pub async fn process(&self, record: &Record) -> RecordOutcome {
        let span = info_span!("record", record_id = record.record_id, app_id = record.app_id);
        self.process_record(record).instrument(span).await
    }

    async fn process_record(&self, record: &Record) -> RecordOutcome {
        let config = &self.ctx.config;
        info!("Processing source record");

        let Some(match_value) = record.field_value(config.source_match_field) else {
            warn!(
                field_id = config.source_match_field,
                "Source record has no value in the match field; skipping"
            );
            return RecordOutcome::skipped(record.record_id, RecordStatus::SkippedNoMatchValue);
        };

        let match_value = match_value.canonicalize();
        let matcher = RecordMatcher::new(
            self.ctx.target.as_ref(),
            config.target_app_id,
            config.target_match_field,
        );

        let target_record_id = match matcher.resolve(&match_value).await {
            Ok(MatchResult::Matched(id)) => id,
            Ok(MatchResult::NoMatch) => {
                return RecordOutcome::skipped(record.record_id, RecordStatus::SkippedNoMatch)
            },
            Ok(MatchResult::Ambiguous { .. }) => {
                return RecordOutcome::skipped(record.record_id, RecordStatus::SkippedAmbiguous)
            },
            Err(e) => {
                error!(
                    target_app_id = config.target_app_id,
                    match_value = %match_value,
                    error = %e,
                    "Failed to look up the matching target record; skipping"
                );
                return RecordOutcome::skipped(record.record_id, RecordStatus::SkippedMatchFailed);
            },
        };

        let counts = self
            .ctx
            .options
            .dispatch
            .run(config.mappings.iter(), |mapping| {
                self.process_field(record, target_record_id, *mapping)
            })
            .await
            .into_iter()
            .fold(FileCounts::default(), |total, counts| total + counts);

        let checkpoint = self.update_checkpoint(record).await;

        info!(
            target_record_id,
            files_transferred = counts.transferred,
            files_failed = counts.failed,
            "Finished processing source record"
        );

        RecordOutcome {
            record_id: record.record_id,
            status: RecordStatus::Processed,
            target_record_id: Some(target_record_id),
            files_transferred: counts.transferred,
            files_failed: counts.failed,
            checkpoint,
        }
    }

    async fn process_field(
        &self,
        record: &Record,
        target_record_id: RecordId,
        mapping: FieldMapping,
    ) -> FileCounts {
        let Some(value) = record.field_value(mapping.source) else {
            warn!(
                field_id = mapping.source,
                "Source record has no data in attachment field; skipping field"
            );
            return FileCounts::default();
        };

        let file_ids = transferable_file_ids(value);
        debug!(
            field_id = mapping.source,
            files = file_ids.len(),
            "Transferring attachment field"
        );

        let executor = TransferExecutor::new(self.ctx.source.as_ref(), self.ctx.target.as_ref());

        self.ctx
            .options
            .dispatch
            .run(file_ids, |file_id| {
                executor.transfer(TransferRequest {
                    source_record_id: record.record_id,
                    source_field_id: mapping.source,
                    file_id,
                    target_record_id,
                    target_field_id: mapping.target,
                })
            })
            .await
            .into_iter()
            .fold(FileCounts::default(), |counts, result| match result {
                Ok(_) => FileCounts {
                    transferred: counts.transferred + 1,
                    ..counts
                },
                Err(_) => FileCounts {
                    failed: counts.failed + 1,
                    ..counts
                },
            })
    }

    async fn update_checkpoint(&self, record: &Record) -> CheckpointStatus {
        let Some(checkpoint) = &self.ctx.checkpoint else {
            return CheckpointStatus::NotConfigured;
        };

        let update = RecordUpdate {
            app_id: self.ctx.config.source_app_id,
            record_id: record.record_id,
            fields: vec![RecordFieldValue {
                field_id: checkpoint.flag_field_id,
                value: FieldValue::Guid(Some(checkpoint.processed_value_id)),
            }],
        };

        match self.ctx.source.save_record(&update).await {
            Ok(_) => {
                debug!(
                    field_id = checkpoint.flag_field_id,
                    "Flagged source record as processed"
                );
                CheckpointStatus::Updated
            },
            Err(e) => {
                warn!(
                    field_id = checkpoint.flag_field_id,
                    error = %e,
                    "Failed to flag source record as processed; it will be picked up again on the next run"
                );
                CheckpointStatus::Failed
            },
        }
    }
}
