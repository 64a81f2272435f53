//! API endpoint URL builders
//!
//! Helper functions to construct API endpoint URLs. `base_url` may carry a
//! trailing slash.

use attachsync_common::types::{FieldId, FileId, RecordId};

fn base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Build field definition URL
pub fn field_url(base_url: &str, field_id: FieldId) -> String {
    format!("{}/Fields/id/{}", base(base_url), field_id)
}

/// Build record query URL
pub fn query_records_url(base_url: &str, page_number: u32, page_size: u32) -> String {
    format!(
        "{}/Records/Query?PageNumber={}&PageSize={}",
        base(base_url),
        page_number,
        page_size
    )
}

/// Build record save URL
pub fn records_url(base_url: &str) -> String {
    format!("{}/Records", base(base_url))
}

/// Build file info URL
pub fn file_info_url(
    base_url: &str,
    record_id: RecordId,
    field_id: FieldId,
    file_id: FileId,
) -> String {
    format!(
        "{}/Files/recordId/{}/fieldId/{}/fileId/{}",
        base(base_url),
        record_id,
        field_id,
        file_id
    )
}

/// Build file content URL
pub fn file_content_url(
    base_url: &str,
    record_id: RecordId,
    field_id: FieldId,
    file_id: FileId,
) -> String {
    format!("{}/file", file_info_url(base_url, record_id, field_id, file_id))
}

/// Build file upload URL
pub fn files_url(base_url: &str) -> String {
    format!("{}/Files", base(base_url))
}
