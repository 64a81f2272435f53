//! Typed record field values and their canonical string form
//!
//! The remote API reports every field value as a `{type, fieldId, value}`
//! triple. [`FieldValue::from_wire`] turns the loosely typed payload into a
//! closed enum, and [`FieldValue::canonicalize`] renders any variant as the
//! string used to build match filters.

use super::FileId;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use tracing::warn;
use uuid::Uuid;

/// Separator used when rendering list values
pub const LIST_SEPARATOR: &str = ", ";

/// A single field value as returned by a record query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    String(Option<String>),
    Integer(Option<i64>),
    Decimal(Option<Decimal>),
    Date(Option<DateTime<Utc>>),
    TimeSpan(TimeSpanData),
    Guid(Option<Uuid>),
    StringList(Vec<String>),
    IntegerList(Vec<i64>),
    GuidList(Vec<Uuid>),
    AttachmentList(Vec<AttachmentEntry>),
    ScoringGroupList(Vec<ScoringGroup>),
    FileList(Vec<FileId>),
    /// A wire type this crate does not understand, or a payload that did not
    /// decode as its declared type
    Unsupported { kind: String },
}

/// Recurrence descriptor carried by time span fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSpanData {
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub increment: Option<String>,
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_by_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_after_occurrences: Option<i64>,
}

/// One file referenced by an attachment field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentEntry {
    pub file_id: FileId,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub storage_location: StorageLocation,
}

impl AttachmentEntry {
    /// Whether the file bytes can be fetched through the file API
    pub fn is_internal(&self) -> bool {
        self.storage_location == StorageLocation::Internal
    }
}

/// Where an attachment's bytes live
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageLocation {
    #[default]
    Internal,
    /// Externally hosted content (cloud drives and the like)
    External(String),
}

impl From<String> for StorageLocation {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("internal") {
            StorageLocation::Internal
        } else {
            StorageLocation::External(value)
        }
    }
}

impl From<StorageLocation> for String {
    fn from(value: StorageLocation) -> Self {
        match value {
            StorageLocation::Internal => "Internal".to_string(),
            StorageLocation::External(name) => name,
        }
    }
}

/// Score for one group of a scoring field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringGroup {
    pub list_value_id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub score: Option<Decimal>,
    #[serde(default)]
    pub maximum_score: Option<Decimal>,
}

impl FieldValue {
    /// Decode a wire value given its declared type name.
    ///
    /// Never fails: unknown type names and payloads that do not match their
    /// declared type become [`FieldValue::Unsupported`].
    pub fn from_wire(kind: &str, value: serde_json::Value) -> Self {
        let decoded = match kind {
            "String" => decode::<Option<String>>(value).map(FieldValue::String),
            "Integer" => decode::<Option<i64>>(value).map(FieldValue::Integer),
            "Decimal" => decode::<Option<Decimal>>(value).map(FieldValue::Decimal),
            "Date" => match value {
                serde_json::Value::Null => Some(FieldValue::Date(None)),
                serde_json::Value::String(ref s) => parse_date(s).map(|d| FieldValue::Date(Some(d))),
                _ => None,
            },
            "TimeSpan" => decode_or_default::<TimeSpanData>(value).map(FieldValue::TimeSpan),
            "Guid" => decode::<Option<Uuid>>(value).map(FieldValue::Guid),
            "StringList" => decode_or_default::<Vec<String>>(value).map(FieldValue::StringList),
            "IntegerList" => decode_or_default::<Vec<i64>>(value).map(FieldValue::IntegerList),
            "GuidList" => decode_or_default::<Vec<Uuid>>(value).map(FieldValue::GuidList),
            "AttachmentList" => {
                decode_or_default::<Vec<AttachmentEntry>>(value).map(FieldValue::AttachmentList)
            },
            "ScoringGroupList" => {
                decode_or_default::<Vec<ScoringGroup>>(value).map(FieldValue::ScoringGroupList)
            },
            "FileList" => decode_or_default::<Vec<FileId>>(value).map(FieldValue::FileList),
            _ => {
                return FieldValue::Unsupported {
                    kind: kind.to_string(),
                }
            },
        };

        decoded.unwrap_or_else(|| {
            warn!(kind, "Field value did not decode as its declared type");
            FieldValue::Unsupported {
                kind: kind.to_string(),
            }
        })
    }

    /// Name of the variant as the remote API spells it
    pub fn kind(&self) -> &str {
        match self {
            FieldValue::String(_) => "String",
            FieldValue::Integer(_) => "Integer",
            FieldValue::Decimal(_) => "Decimal",
            FieldValue::Date(_) => "Date",
            FieldValue::TimeSpan(_) => "TimeSpan",
            FieldValue::Guid(_) => "Guid",
            FieldValue::StringList(_) => "StringList",
            FieldValue::IntegerList(_) => "IntegerList",
            FieldValue::GuidList(_) => "GuidList",
            FieldValue::AttachmentList(_) => "AttachmentList",
            FieldValue::ScoringGroupList(_) => "ScoringGroupList",
            FieldValue::FileList(_) => "FileList",
            FieldValue::Unsupported { kind } => kind,
        }
    }

    /// Render the value as the deterministic string used for matching.
    ///
    /// Null scalars render as the empty string. Lists keep their original
    /// order, so the same elements in a different order produce a different
    /// string.
    pub fn canonicalize(&self) -> String {
        match self {
            FieldValue::String(value) => value.clone().unwrap_or_default(),
            FieldValue::Integer(value) => optional(value),
            FieldValue::Decimal(value) => optional(value),
            FieldValue::Date(value) => value.as_ref().map(format_date).unwrap_or_default(),
            FieldValue::TimeSpan(data) => format!(
                "Quantity: {}, Increment: {}, Recurrence: {}, EndByDate: {}, EndAfterOccurrences: {}",
                optional(&data.quantity),
                optional(&data.increment),
                optional(&data.recurrence),
                data.end_by_date.as_ref().map(format_date).unwrap_or_default(),
                optional(&data.end_after_occurrences),
            ),
            FieldValue::Guid(value) => optional(value),
            FieldValue::StringList(values) => values.join(LIST_SEPARATOR),
            FieldValue::IntegerList(values) => join(values.iter()),
            FieldValue::GuidList(values) => join(values.iter()),
            FieldValue::AttachmentList(entries) => join(entries.iter().map(|entry| {
                format!(
                    "FileId: {}, FileName: {}, Notes: {}",
                    entry.file_id,
                    optional(&entry.file_name),
                    optional(&entry.notes),
                )
            })),
            FieldValue::ScoringGroupList(groups) => join(groups.iter().map(|group| {
                format!(
                    "ListValueId: {}, Name: {}, Score: {}, MaximumScore: {}",
                    group.list_value_id,
                    optional(&group.name),
                    optional(&group.score),
                    optional(&group.maximum_score),
                )
            })),
            FieldValue::FileList(_) | FieldValue::Unsupported { .. } => {
                format!("Unsupported field value type: {}", self.kind())
            },
        }
    }
}

fn optional<T: Display>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn join<T: Display>(values: impl Iterator<Item = T>) -> String {
    values
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

fn decode_or_default<T: DeserializeOwned + Default>(value: serde_json::Value) -> Option<T> {
    if value.is_null() {
        return Some(T::default());
    }
    decode(value)
}

/// Parse an RFC 3339 timestamp, falling back to an offset-less timestamp
/// interpreted as UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date))
}
