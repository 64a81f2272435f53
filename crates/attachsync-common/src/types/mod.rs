//! Domain types shared across attachsync
//!
//! Ids are plain integers scoped to one remote instance; nothing here ties a
//! source id to a target id.

mod field;
mod mapping;
mod record;
mod value;

pub use field::{FieldDefinition, FieldType, FormulaOutputType, ListValue};
pub use mapping::{parse_id, FieldMapping, FieldMappings};
pub use record::{Record, RecordFieldValue, WireFieldValue, WireRecord};
pub use value::{
    parse_date, AttachmentEntry, FieldValue, ScoringGroup, StorageLocation, TimeSpanData,
    LIST_SEPARATOR,
};

pub type AppId = i32;
pub type RecordId = i32;
pub type FieldId = i32;
pub type FileId = i32;
