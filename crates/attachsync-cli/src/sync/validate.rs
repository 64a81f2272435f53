//! Pre-run validation against the live instances
//!
//! Match fields must exist in their app and be able to link records. When a
//! checkpoint flag is configured, the flag field must be a list field and both
//! configured values must resolve to options of that list.

use crate::api::{ApiError, RecordService};
use crate::config::{CheckpointConfig, TransferConfig};
use crate::error::{CliError, Result};
use attachsync_common::types::{AppId, FieldDefinition, FieldId, FieldType};
use tracing::{error, info};
use uuid::Uuid;

/// Checkpoint flag with its values resolved to list option ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCheckpoint {
    pub flag_field_id: FieldId,
    pub process_value_id: Uuid,
    pub processed_value_id: Uuid,
}

/// Field definitions confirmed before a run
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub source_match_field: FieldDefinition,
    pub target_match_field: FieldDefinition,
    pub checkpoint: Option<ResolvedCheckpoint>,
}

/// Check the configuration against both instances
pub async fn validate_run(
    config: &TransferConfig,
    source: &dyn RecordService,
    target: &dyn RecordService,
) -> Result<ValidationReport> {
    let source_match_field = validate_match_field(
        source,
        "source",
        config.source_match_field,
        config.source_app_id,
    )
    .await?;

    let target_match_field = validate_match_field(
        target,
        "target",
        config.target_match_field,
        config.target_app_id,
    )
    .await?;

    let checkpoint = match &config.checkpoint {
        Some(checkpoint) => Some(resolve_checkpoint(source, checkpoint).await?),
        None => None,
    };

    info!(
        source_match_field = %source_match_field.name,
        target_match_field = %target_match_field.name,
        checkpoint = checkpoint.is_some(),
        "Configuration validated"
    );

    Ok(ValidationReport {
        source_match_field,
        target_match_field,
        checkpoint,
    })
}

async fn validate_match_field(
    service: &dyn RecordService,
    side: &'static str,
    field_id: FieldId,
    app_id: AppId,
) -> Result<FieldDefinition> {
    let field = service.get_field(field_id).await.map_err(|e| match e {
        ApiError::NotFound(_) => CliError::invalid_match_field(side, field_id, "field was not found"),
        other => CliError::Api(other),
    })?;

    let problem = if field.app_id != app_id {
        Some(format!(
            "field belongs to app {} rather than app {}",
            field.app_id, app_id
        ))
    } else if !field.is_valid_match_field() {
        Some(format!("fields of type {} cannot be used", describe_type(&field)))
    } else {
        None
    };

    match problem {
        Some(reason) => {
            error!(side, field_id, reason = %reason, "Invalid match field");
            Err(CliError::invalid_match_field(side, field_id, reason))
        },
        None => Ok(field),
    }
}

fn describe_type(field: &FieldDefinition) -> String {
    match (&field.field_type, &field.output_type) {
        (FieldType::Formula, Some(output)) => {
            format!("Formula ({})", String::from(output.clone()))
        },
        (field_type, _) => field_type.to_string(),
    }
}

async fn resolve_checkpoint(
    source: &dyn RecordService,
    checkpoint: &CheckpointConfig,
) -> Result<ResolvedCheckpoint> {
    let field_id = checkpoint.flag_field_id;

    let field = source.get_field(field_id).await.map_err(|e| match e {
        ApiError::NotFound(_) => CliError::invalid_flag_field(field_id, "field was not found"),
        other => CliError::Api(other),
    })?;

    if !field.is_list() {
        error!(field_id, field_type = %field.field_type, "Flag field is not a list field");
        return Err(CliError::invalid_flag_field(
            field_id,
            format!("fields of type {} cannot be used", field.field_type),
        ));
    }

    let resolve = |key: &str| {
        field.find_list_value(key).map(|value| value.id).ok_or_else(|| {
            error!(field_id, value = key, "Flag field value not found");
            CliError::invalid_flag_field(
                field_id,
                format!("'{}' is not a value of list field '{}'", key, field.name),
            )
        })
    };

    Ok(ResolvedCheckpoint {
        flag_field_id: field_id,
        process_value_id: resolve(&checkpoint.process_value)?,
        processed_value_id: resolve(&checkpoint.processed_value)?,
    })
}
