//! Records returned by record queries

use super::{AppId, FieldId, FieldValue, RecordId};
use serde::{Deserialize, Serialize};

/// A record with the subset of field values that were requested
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub app_id: AppId,
    pub record_id: RecordId,
    pub field_data: Vec<RecordFieldValue>,
}

/// Value of one field on a record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFieldValue {
    pub field_id: FieldId,
    pub value: FieldValue,
}

impl Record {
    pub fn new(app_id: AppId, record_id: RecordId) -> Self {
        Self {
            app_id,
            record_id,
            field_data: Vec::new(),
        }
    }

    /// Builder-style helper for attaching a field value
    pub fn with_field(mut self, field_id: FieldId, value: FieldValue) -> Self {
        self.field_data.push(RecordFieldValue { field_id, value });
        self
    }

    /// Value of `field_id`, or `None` if the field was not returned.
    ///
    /// A field that was returned with a null payload is `Some`.
    pub fn field_value(&self, field_id: FieldId) -> Option<&FieldValue> {
        self.field_data
            .iter()
            .find(|data| data.field_id == field_id)
            .map(|data| &data.value)
    }
}

/// Wire shape of a field value: `{"type": ..., "fieldId": ..., "value": ...}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFieldValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub field_id: FieldId,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl From<WireFieldValue> for RecordFieldValue {
    fn from(wire: WireFieldValue) -> Self {
        RecordFieldValue {
            field_id: wire.field_id,
            value: FieldValue::from_wire(&wire.kind, wire.value),
        }
    }
}

/// Wire shape of a record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub app_id: AppId,
    pub record_id: RecordId,
    #[serde(default)]
    pub field_data: Vec<WireFieldValue>,
}

impl From<WireRecord> for Record {
    fn from(wire: WireRecord) -> Self {
        Record {
            app_id: wire.app_id,
            record_id: wire.record_id,
            field_data: wire.field_data.into_iter().map(Into::into).collect(),
        }
    }
}
