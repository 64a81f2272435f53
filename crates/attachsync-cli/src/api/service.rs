//! Record service abstraction
//!
//! The sync pipeline talks to both sides through [`RecordService`]. Each
//! instance is bound to one remote instance (base URL and API key) when it is
//! constructed, so none of the operations take credentials.

use async_trait::async_trait;
use attachsync_common::types::{
    AppId, FieldDefinition, FieldId, FileId, Record, RecordFieldValue, RecordId,
};
use thiserror::Error;

/// Result type alias for record service calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure of a single record service call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The remote entity does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success status or a transport-level failure
    #[error("Request failed{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" with status {}", code))
        .unwrap_or_default()
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn transport(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }

        match err.status() {
            Some(status) if status == reqwest::StatusCode::NOT_FOUND => {
                Self::NotFound(err.to_string())
            },
            status => Self::Transport {
                status: status.map(|s| s.as_u16()),
                message: err.to_string(),
            },
        }
    }
}

/// Which records and fields a query returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub app_id: AppId,
    pub field_ids: Vec<FieldId>,
    /// Filter expression, see [`crate::sync::filter`]
    pub filter: Option<String>,
}

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl PagingRequest {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_records: u32,
    pub records: Vec<Record>,
}

/// Address of one file inside an attachment field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRef {
    pub record_id: RecordId,
    pub field_id: FieldId,
    pub file_id: FileId,
}

/// File metadata
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub name: String,
    pub notes: Option<String>,
    pub content_type: Option<String>,
}

/// File bytes with their content type
#[derive(Debug, Clone, PartialEq)]
pub struct FileContent {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Upload of one file into an attachment field
#[derive(Debug, Clone, PartialEq)]
pub struct SaveFileRequest {
    pub record_id: RecordId,
    pub field_id: FieldId,
    pub file_name: String,
    pub content_type: String,
    pub notes: String,
    pub bytes: Vec<u8>,
}

/// Partial update of an existing record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub app_id: AppId,
    pub record_id: RecordId,
    pub fields: Vec<RecordFieldValue>,
}

/// Operations the sync pipeline needs from one remote instance
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Fetch a field definition
    async fn get_field(&self, field_id: FieldId) -> ApiResult<FieldDefinition>;

    /// Fetch one page of records
    async fn query_records(&self, query: &RecordQuery, paging: PagingRequest)
        -> ApiResult<RecordPage>;

    /// Fetch a file's metadata
    async fn get_file_info(&self, file: FileRef) -> ApiResult<FileInfo>;

    /// Fetch a file's content
    async fn get_file(&self, file: FileRef) -> ApiResult<FileContent>;

    /// Upload a file, returning the id the remote assigned to it
    async fn save_file(&self, request: SaveFileRequest) -> ApiResult<FileId>;

    /// Update fields on an existing record
    async fn save_record(&self, update: &RecordUpdate) -> ApiResult<RecordId>;
}
