//! API client module
//!
//! The [`RecordService`] abstraction used by the sync pipeline and its HTTP
//! implementation.

pub mod client;
pub mod endpoints;
pub mod service;
pub mod types;

pub use client::ApiClient;
pub use service::*;
