//! HTTP API client for the remote record API
//!
//! One [`ApiClient`] is bound to one instance: its base URL and API key are
//! fixed at construction and sent with every request.

use crate::api::service::{
    ApiError, ApiResult, FileContent, FileInfo, FileRef, PagingRequest, RecordPage, RecordQuery,
    RecordService, RecordUpdate, SaveFileRequest,
};
use crate::api::{endpoints, types::*};
use crate::error::{CliError, Result};
use async_trait::async_trait;
use attachsync_common::types::{FieldDefinition, FieldId, FileId, RecordId};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Can be overridden via ATTACHSYNC_API_TIMEOUT_SECS environment variable.
/// Set to 5 minutes to accommodate large file transfers.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 300;

/// Default API base URL when the configuration does not name one.
pub const DEFAULT_API_URL: &str = "https://api.onspring.com";

/// Header carrying the instance API key
pub const API_KEY_HEADER: &str = "x-apikey";

/// Header selecting the API version
pub const API_VERSION_HEADER: &str = "x-api-version";

/// API version this client speaks
pub const API_VERSION: &str = "2";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// API client for one remote instance
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client bound to `api_key`
    pub fn new(base_url: impl Into<String>, api_key: &str) -> Result<Self> {
        let timeout_secs = std::env::var("ATTACHSYNC_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let mut key = HeaderValue::from_str(api_key).map_err(|_| {
            CliError::config("API key contains characters that are not allowed in an HTTP header")
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .user_agent(concat!("attachsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RecordService for ApiClient {
    async fn get_field(&self, field_id: FieldId) -> ApiResult<FieldDefinition> {
        let url = endpoints::field_url(&self.base_url, field_id);
        debug!(field_id, "Fetching field definition");

        let response = self.client.get(&url).send().await?.error_for_status()?;

        Ok(response.json().await?)
    }

    async fn query_records(
        &self,
        query: &RecordQuery,
        paging: PagingRequest,
    ) -> ApiResult<RecordPage> {
        let url = endpoints::query_records_url(&self.base_url, paging.page_number, paging.page_size);
        debug!(
            app_id = query.app_id,
            page_number = paging.page_number,
            page_size = paging.page_size,
            filter = query.filter.as_deref().unwrap_or(""),
            "Querying records"
        );

        let request = QueryRecordsRequest {
            app_id: query.app_id,
            field_ids: &query.field_ids,
            filter: query.filter.as_deref(),
            data_format: RAW_DATA_FORMAT,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let page: PagedRecordsResponse = response.json().await?;

        Ok(page.into())
    }

    async fn get_file_info(&self, file: FileRef) -> ApiResult<FileInfo> {
        let url = endpoints::file_info_url(&self.base_url, file.record_id, file.field_id, file.file_id);
        debug!(
            record_id = file.record_id,
            field_id = file.field_id,
            file_id = file.file_id,
            "Fetching file info"
        );

        let response = self.client.get(&url).send().await?.error_for_status()?;

        let info: FileInfoResponse = response.json().await?;

        Ok(info.into())
    }

    async fn get_file(&self, file: FileRef) -> ApiResult<FileContent> {
        let url =
            endpoints::file_content_url(&self.base_url, file.record_id, file.field_id, file.file_id);

        let response = self.client.get(&url).send().await?.error_for_status()?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let bytes = response.bytes().await?.to_vec();

        debug!(
            record_id = file.record_id,
            field_id = file.field_id,
            file_id = file.file_id,
            bytes = bytes.len(),
            "Fetched file content"
        );

        Ok(FileContent {
            content_type,
            bytes,
        })
    }

    async fn save_file(&self, request: SaveFileRequest) -> ApiResult<FileId> {
        let url = endpoints::files_url(&self.base_url);
        debug!(
            record_id = request.record_id,
            field_id = request.field_id,
            file_name = %request.file_name,
            bytes = request.bytes.len(),
            "Uploading file"
        );

        let part = Part::bytes(request.bytes)
            .file_name(request.file_name)
            .mime_str(&request.content_type)
            .map_err(|e| {
                ApiError::transport(
                    None,
                    format!("Invalid content type '{}': {}", request.content_type, e),
                )
            })?;

        let form = Form::new()
            .text("RecordId", request.record_id.to_string())
            .text("FieldId", request.field_id.to_string())
            .text("Notes", request.notes)
            .part("File", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let created: CreatedWithIdResponse = response.json().await?;

        Ok(created.id)
    }

    async fn save_record(&self, update: &RecordUpdate) -> ApiResult<RecordId> {
        let url = endpoints::records_url(&self.base_url);
        debug!(
            app_id = update.app_id,
            record_id = update.record_id,
            fields = update.fields.len(),
            "Saving record"
        );

        let fields: BTreeMap<String, serde_json::Value> = update
            .fields
            .iter()
            .map(|field| (field.field_id.to_string(), raw_value(&field.value)))
            .collect();

        let request = SaveRecordRequest {
            app_id: update.app_id,
            record_id: update.record_id,
            fields,
        };

        let response = self
            .client
            .put(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let saved: CreatedWithIdResponse = response.json().await?;

        Ok(saved.id)
    }
}
