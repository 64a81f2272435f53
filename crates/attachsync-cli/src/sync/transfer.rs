//! Single file transfer from a source attachment field to a target field

use crate::api::{ApiError, FileRef, RecordService, SaveFileRequest};
use attachsync_common::types::{FieldId, FileId, RecordId};
use thiserror::Error;
use tracing::{info, warn};

/// Step of a transfer that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    FileInfo,
    FileContent,
    Save,
}

impl std::fmt::Display for TransferStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStage::FileInfo => write!(f, "fetching file info"),
            TransferStage::FileContent => write!(f, "fetching file content"),
            TransferStage::Save => write!(f, "saving file to target"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Transfer failed while {stage}: {error}")]
pub struct TransferFailure {
    pub stage: TransferStage,
    pub error: ApiError,
}

/// Where a file comes from and where it goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub source_record_id: RecordId,
    pub source_field_id: FieldId,
    pub file_id: FileId,
    pub target_record_id: RecordId,
    pub target_field_id: FieldId,
}

/// Copies files between the two instances
pub struct TransferExecutor<'a> {
    source: &'a dyn RecordService,
    target: &'a dyn RecordService,
}

impl<'a> TransferExecutor<'a> {
    pub fn new(source: &'a dyn RecordService, target: &'a dyn RecordService) -> Self {
        Self { source, target }
    }

    /// Copy one file, returning the id assigned by the target
    pub async fn transfer(&self, request: TransferRequest) -> Result<FileId, TransferFailure> {
        let result = self.copy(request).await;

        match &result {
            Ok(target_file_id) => info!(
                source_record_id = request.source_record_id,
                source_field_id = request.source_field_id,
                file_id = request.file_id,
                target_record_id = request.target_record_id,
                target_field_id = request.target_field_id,
                target_file_id,
                "Transferred file"
            ),
            Err(failure) => warn!(
                source_record_id = request.source_record_id,
                source_field_id = request.source_field_id,
                file_id = request.file_id,
                target_record_id = request.target_record_id,
                target_field_id = request.target_field_id,
                stage = ?failure.stage,
                error = %failure.error,
                "File could not be transferred"
            ),
        }

        result
    }

    async fn copy(&self, request: TransferRequest) -> Result<FileId, TransferFailure> {
        let file = FileRef {
            record_id: request.source_record_id,
            field_id: request.source_field_id,
            file_id: request.file_id,
        };

        let info = self
            .source
            .get_file_info(file)
            .await
            .map_err(|error| TransferFailure {
                stage: TransferStage::FileInfo,
                error,
            })?;

        let content = self
            .source
            .get_file(file)
            .await
            .map_err(|error| TransferFailure {
                stage: TransferStage::FileContent,
                error,
            })?;

        let save = SaveFileRequest {
            record_id: request.target_record_id,
            field_id: request.target_field_id,
            file_name: info.name,
            content_type: content.content_type,
            notes: info.notes.unwrap_or_default(),
            bytes: content.bytes,
        };

        self.target
            .save_file(save)
            .await
            .map_err(|error| TransferFailure {
                stage: TransferStage::Save,
                error,
            })
    }
}
