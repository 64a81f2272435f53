//! Error types for the attachsync CLI
//!
//! This module provides user-friendly error types with clear, actionable messages
//! that help users understand what went wrong and how to fix it.

use crate::api::ApiError;
use attachsync_common::types::FieldId;
use attachsync_common::CommonError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit status for a successful run
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status for invalid configuration and other startup failures
pub const EXIT_INVALID_CONFIG: i32 = 1;
/// Exit status when a match field cannot be used
pub const EXIT_INVALID_MATCH_FIELD: i32 = 2;
/// Exit status when the checkpoint flag field or its values cannot be used
pub const EXIT_INVALID_FLAG_FIELD: i32 = 3;
/// Exit status when the run aborted after repeated page fetch failures
pub const EXIT_RUN_ABORTED: i32 = 4;

/// Comprehensive error type for CLI operations
///
/// All errors are designed to be user-facing with clear messages and suggestions.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check the config file and ATTACHSYNC_* environment variables.")]
    Config(String),

    /// Configuration file does not exist
    #[error("Config file not found: '{0}'. Verify the path exists and you have read permissions.")]
    ConfigNotFound(String),

    /// A match field is missing or has a type that cannot link records
    #[error("Invalid match field {field_id} in the {side} app: {reason}. Match fields must be text, number, date, auto-number or non-list formula fields.")]
    InvalidMatchField {
        side: &'static str,
        field_id: FieldId,
        reason: String,
    },

    /// The checkpoint flag field or one of its values cannot be used
    #[error("Invalid flag field {field_id}: {reason}. The flag field must be a list field containing both the process and processed values.")]
    InvalidFlagField { field_id: FieldId, reason: String },

    /// Page fetching failed too many times in a row
    #[error("Run aborted on page {page_number} after {attempts} failed attempts to fetch records. Check connectivity to the source instance and re-run; processed records are skipped when a flag field is configured.")]
    RunAborted { page_number: u32, attempts: u32 },

    /// A remote API call failed
    #[error("API error: {0}. Verify the API URL and key for this instance.")]
    Api(#[from] ApiError),

    /// Shared parsing failed
    #[error("{0}")]
    Common(#[from] CommonError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP client setup failed
    #[error("Network request failed: {0}. Check your internet connection and API URL.")]
    Http(#[from] reqwest::Error),

    /// YAML parsing failed
    #[error("Failed to parse YAML: {0}. Check the file syntax at the indicated line/column.")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}. Check the file syntax.")]
    JsonParse(#[from] serde_json::Error),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid match field error
    pub fn invalid_match_field(
        side: &'static str,
        field_id: FieldId,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidMatchField {
            side,
            field_id,
            reason: reason.into(),
        }
    }

    /// Create an invalid flag field error
    pub fn invalid_flag_field(field_id: FieldId, reason: impl Into<String>) -> Self {
        Self::InvalidFlagField {
            field_id,
            reason: reason.into(),
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidMatchField { .. } => EXIT_INVALID_MATCH_FIELD,
            Self::InvalidFlagField { .. } => EXIT_INVALID_FLAG_FIELD,
            Self::RunAborted { .. } => EXIT_RUN_ABORTED,
            _ => EXIT_INVALID_CONFIG,
        }
    }
}
