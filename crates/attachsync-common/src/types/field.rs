//! Field definitions as reported by the remote API

use super::{AppId, FieldId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Number,
    Date,
    AutoNumber,
    Formula,
    List,
    Attachment,
    Image,
    Reference,
    TimeSpan,
    Other(String),
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Text" => FieldType::Text,
            "Number" => FieldType::Number,
            "Date" => FieldType::Date,
            "AutoNumber" => FieldType::AutoNumber,
            "Formula" => FieldType::Formula,
            "List" => FieldType::List,
            "Attachment" => FieldType::Attachment,
            "Image" => FieldType::Image,
            "Reference" => FieldType::Reference,
            "TimeSpan" => FieldType::TimeSpan,
            _ => FieldType::Other(value),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Text => write!(f, "Text"),
            FieldType::Number => write!(f, "Number"),
            FieldType::Date => write!(f, "Date"),
            FieldType::AutoNumber => write!(f, "AutoNumber"),
            FieldType::Formula => write!(f, "Formula"),
            FieldType::List => write!(f, "List"),
            FieldType::Attachment => write!(f, "Attachment"),
            FieldType::Image => write!(f, "Image"),
            FieldType::Reference => write!(f, "Reference"),
            FieldType::TimeSpan => write!(f, "TimeSpan"),
            FieldType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Output type of a formula field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormulaOutputType {
    Text,
    Numeric,
    DateAndTime,
    ListValues,
    Other(String),
}

impl From<String> for FormulaOutputType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Text" => FormulaOutputType::Text,
            "Numeric" => FormulaOutputType::Numeric,
            "DateAndTime" => FormulaOutputType::DateAndTime,
            "ListValues" | "List" => FormulaOutputType::ListValues,
            _ => FormulaOutputType::Other(value),
        }
    }
}

impl From<FormulaOutputType> for String {
    fn from(value: FormulaOutputType) -> Self {
        match value {
            FormulaOutputType::Text => "Text".to_string(),
            FormulaOutputType::Numeric => "Numeric".to_string(),
            FormulaOutputType::DateAndTime => "DateAndTime".to_string(),
            FormulaOutputType::ListValues => "ListValues".to_string(),
            FormulaOutputType::Other(name) => name,
        }
    }
}

/// One selectable option of a list field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListValue {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: FieldId,
    pub app_id: AppId,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Only reported for formula fields
    #[serde(default)]
    pub output_type: Option<FormulaOutputType>,
    /// Only reported for list fields
    #[serde(default)]
    pub values: Vec<ListValue>,
    #[serde(default)]
    pub multiplicity: Option<String>,
}

impl FieldDefinition {
    /// Whether this field can link source and target records.
    ///
    /// Text, number, date and auto-number fields qualify, as do formula fields
    /// whose output is not a list.
    pub fn is_valid_match_field(&self) -> bool {
        match self.field_type {
            FieldType::Text | FieldType::Number | FieldType::Date | FieldType::AutoNumber => true,
            FieldType::Formula => !matches!(self.output_type, Some(FormulaOutputType::ListValues)),
            _ => false,
        }
    }

    pub fn is_list(&self) -> bool {
        self.field_type == FieldType::List
    }

    /// Find a list option by its literal id or, failing that, by name
    /// (case-insensitive).
    pub fn find_list_value(&self, key: &str) -> Option<&ListValue> {
        let key = key.trim();

        if let Ok(id) = Uuid::parse_str(key) {
            if let Some(value) = self.values.iter().find(|v| v.id == id) {
                return Some(value);
            }
        }

        self.values
            .iter()
            .find(|v| v.name.trim().eq_ignore_ascii_case(key))
    }
}
