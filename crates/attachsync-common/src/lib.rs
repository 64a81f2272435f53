//! attachsync common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging and error handling for the attachsync workspace.
//!
//! # Overview
//!
//! - **Types**: field definitions, typed field values and their canonical
//!   string form, records and attachment field mappings
//! - **Logging**: per-run console and JSON file logging
//! - **Error Handling**: error and result types for shared parsing
//!
//! # Example
//!
//! ```
//! use attachsync_common::types::{FieldMappings, FieldValue};
//!
//! let mappings: FieldMappings = "1001|2001,1002|2002".parse().unwrap();
//! assert_eq!(mappings.source_field_ids(), vec![1001, 1002]);
//!
//! let value = FieldValue::Integer(Some(42));
//! assert_eq!(value.canonicalize(), "42");
//! ```

pub mod error;
pub mod logging;
pub mod types;

pub use error::{CommonError, Result};
