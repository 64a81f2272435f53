//! Attachment reference extraction

use attachsync_common::types::{FieldValue, FileId};

/// File ids in `value` that can be transferred, in their original order.
///
/// File lists are taken whole. Attachment lists keep only internally stored
/// files; externally hosted content has no bytes to fetch. Any other value
/// yields nothing.
pub fn transferable_file_ids(value: &FieldValue) -> Vec<FileId> {
    match value {
        FieldValue::FileList(ids) => ids.clone(),
        FieldValue::AttachmentList(entries) => entries
            .iter()
            .filter(|entry| entry.is_internal())
            .map(|entry| entry.file_id)
            .collect(),
        FieldValue::String(_)
        | FieldValue::Integer(_)
        | FieldValue::Decimal(_)
        | FieldValue::Date(_)
        | FieldValue::TimeSpan(_)
        | FieldValue::Guid(_)
        | FieldValue::StringList(_)
        | FieldValue::IntegerList(_)
        | FieldValue::GuidList(_)
        | FieldValue::ScoringGroupList(_)
        | FieldValue::Unsupported { .. } => Vec::new(),
    }
}
