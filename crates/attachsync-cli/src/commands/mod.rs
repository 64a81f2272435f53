//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod estimate;
pub mod run;
pub mod validate;

use crate::api::{ApiClient, RecordService};
use crate::config::TransferConfig;
use crate::error::Result;
use std::sync::Arc;

/// API clients for the source and target instances of `config`
pub fn connect(config: &TransferConfig) -> Result<(Arc<dyn RecordService>, Arc<dyn RecordService>)> {
    let source = ApiClient::new(config.source.api_url.clone(), &config.source.api_key)?;
    let target = ApiClient::new(config.target.api_url.clone(), &config.target.api_key)?;

    Ok((Arc::new(source), Arc::new(target)))
}
