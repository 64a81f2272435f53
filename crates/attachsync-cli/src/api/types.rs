//! API request and response types
//!
//! Matches the remote REST API's JSON shapes.

use crate::api::service::{FileInfo, RecordPage};
use attachsync_common::types::{AppId, FieldId, FieldValue, RecordId, WireRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Records are always requested in raw form so list values come back as ids
pub const RAW_DATA_FORMAT: &str = "Raw";

/// Body of `POST /Records/Query`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecordsRequest<'a> {
    pub app_id: AppId,
    pub field_ids: &'a [FieldId],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<&'a str>,
    pub data_format: &'static str,
}

/// Response of `POST /Records/Query`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedRecordsResponse {
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_records: u32,
    #[serde(default)]
    pub items: Vec<WireRecord>,
}

impl From<PagedRecordsResponse> for RecordPage {
    fn from(response: PagedRecordsResponse) -> Self {
        RecordPage {
            page_number: response.page_number,
            page_size: response.page_size,
            total_pages: response.total_pages,
            total_records: response.total_records,
            records: response.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response of `GET /Files/recordId/{r}/fieldId/{f}/fileId/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoResponse {
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub modified_date: Option<String>,
    #[serde(default)]
    pub file_href: Option<String>,
}

impl From<FileInfoResponse> for FileInfo {
    fn from(response: FileInfoResponse) -> Self {
        FileInfo {
            name: response.name,
            notes: response.notes,
            content_type: response.content_type,
        }
    }
}

/// Response carrying the id of a created or updated entity
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedWithIdResponse {
    pub id: i32,
}

/// Body of `PUT /Records`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecordRequest {
    pub app_id: AppId,
    pub record_id: RecordId,
    /// Field id (as a string key) to raw value
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Raw JSON form of a value written back to a record
pub fn raw_value(value: &FieldValue) -> serde_json::Value {
    use serde_json::Value;

    match value {
        FieldValue::String(s) => s.as_deref().map_or(Value::Null, Value::from),
        FieldValue::Integer(n) => n.map_or(Value::Null, Value::from),
        FieldValue::Decimal(d) => d.map_or(Value::Null, |d| Value::from(d.to_string())),
        FieldValue::Date(d) => d.map_or(Value::Null, |d| Value::from(d.to_rfc3339())),
        FieldValue::Guid(g) => g.map_or(Value::Null, |g| Value::from(g.to_string())),
        FieldValue::StringList(values) => Value::from(values.clone()),
        FieldValue::IntegerList(values) => Value::from(values.clone()),
        FieldValue::GuidList(values) => {
            Value::from(values.iter().map(ToString::to_string).collect::<Vec<_>>())
        },
        FieldValue::FileList(values) => Value::from(values.clone()),
        FieldValue::TimeSpan(data) => serde_json::to_value(data).unwrap_or(Value::Null),
        FieldValue::AttachmentList(_)
        | FieldValue::ScoringGroupList(_)
        | FieldValue::Unsupported { .. } => Value::Null,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_query_request_shape() {
        let field_ids = [1, 2];
        let request = QueryRecordsRequest {
            app_id: 100,
            field_ids: &field_ids,
            filter: Some("30 contains 'abc'"),
            data_format: RAW_DATA_FORMAT,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "appId": 100,
                "fieldIds": [1, 2],
                "filter": "30 contains 'abc'",
                "dataFormat": "Raw"
            })
        );
    }

    #[test]
    fn test_paged_response_into_page() {
        let response: PagedRecordsResponse = serde_json::from_value(json!({
            "pageNumber": 2,
            "pageSize": 50,
            "totalPages": 3,
            "totalRecords": 120,
            "items": [{"appId": 100, "recordId": 7, "fieldData": []}]
        }))
        .unwrap();

        let page = RecordPage::from(response);
        assert_eq!(page.page_number, 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].record_id, 7);
    }

    #[test]
    fn test_raw_value_for_checkpoint_guid() {
        let id = Uuid::from_u128(2);
        assert_eq!(
            raw_value(&FieldValue::Guid(Some(id))),
            json!("00000000-0000-0000-0000-000000000002")
        );
        assert_eq!(raw_value(&FieldValue::Integer(None)), json!(null));
    }
}
