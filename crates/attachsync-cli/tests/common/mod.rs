//! Shared fixtures for attachsync integration tests
//!
//! [`FakeService`] is an in-memory record service. It understands the two
//! filter forms the pipeline sends, records every call, and can be told to
//! fail specific operations.

#![allow(dead_code)]

use async_trait::async_trait;
use attachsync_cli::api::{
    ApiError, ApiResult, FileContent, FileInfo, FileRef, PagingRequest, RecordPage, RecordQuery,
    RecordService, RecordUpdate, SaveFileRequest,
};
use attachsync_cli::config::{ConfigFile, RunOptions, TransferConfig};
use attachsync_cli::sync::{DispatchPolicy, ResolvedCheckpoint, RetryPolicy, RunContext};
use attachsync_common::types::{
    AppId, AttachmentEntry, FieldDefinition, FieldId, FieldValue, FileId, Record, RecordId,
    StorageLocation,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const SOURCE_APP: AppId = 100;
pub const TARGET_APP: AppId = 200;
pub const SOURCE_MATCH_FIELD: FieldId = 1001;
pub const TARGET_MATCH_FIELD: FieldId = 2001;
pub const SOURCE_FILES_A: FieldId = 1002;
pub const TARGET_FILES_A: FieldId = 2002;
pub const SOURCE_FILES_B: FieldId = 1003;
pub const TARGET_FILES_B: FieldId = 2003;
pub const FLAG_FIELD: FieldId = 1004;

pub fn process_value() -> Uuid {
    Uuid::from_u128(1)
}

pub fn processed_value() -> Uuid {
    Uuid::from_u128(2)
}

#[derive(Debug, Clone)]
struct StoredFile {
    name: String,
    notes: Option<String>,
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct Calls {
    queries: Vec<(RecordQuery, PagingRequest)>,
    file_info: Vec<FileRef>,
    file_content: Vec<FileRef>,
    saved_files: Vec<SaveFileRequest>,
    record_updates: Vec<RecordUpdate>,
}

#[derive(Default)]
struct Failures {
    field_lookups: bool,
    queries_remaining: u32,
    file_info: HashSet<FileId>,
    file_content: HashSet<FileId>,
    save_file: bool,
    record_updates: bool,
}

/// In-memory record service for one side of a transfer
pub struct FakeService {
    app_id: AppId,
    records: Mutex<Vec<Record>>,
    fields: HashMap<FieldId, FieldDefinition>,
    files: HashMap<(RecordId, FieldId, FileId), StoredFile>,
    failures: Mutex<Failures>,
    calls: Mutex<Calls>,
    next_file_id: Mutex<FileId>,
}

impl FakeService {
    pub fn new(app_id: AppId) -> Self {
        Self {
            app_id,
            records: Mutex::new(Vec::new()),
            fields: HashMap::new(),
            files: HashMap::new(),
            failures: Mutex::new(Failures::default()),
            calls: Mutex::new(Calls::default()),
            next_file_id: Mutex::new(5000),
        }
    }

    pub fn with_record(self, record: Record) -> Self {
        self.records.lock().unwrap().push(record);
        self
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.id, field);
        self
    }

    pub fn with_file(
        mut self,
        record_id: RecordId,
        field_id: FieldId,
        file_id: FileId,
        name: &str,
        notes: Option<&str>,
    ) -> Self {
        self.files.insert(
            (record_id, field_id, file_id),
            StoredFile {
                name: name.to_string(),
                notes: notes.map(str::to_string),
                content_type: "application/pdf".to_string(),
                bytes: format!("contents of {}", name).into_bytes(),
            },
        );
        self
    }

    pub fn fail_field_lookups(&self) {
        self.failures.lock().unwrap().field_lookups = true;
    }

    pub fn fail_next_queries(&self, count: u32) {
        self.failures.lock().unwrap().queries_remaining = count;
    }

    pub fn fail_file_info(&self, file_id: FileId) {
        self.failures.lock().unwrap().file_info.insert(file_id);
    }

    pub fn fail_file_content(&self, file_id: FileId) {
        self.failures.lock().unwrap().file_content.insert(file_id);
    }

    pub fn fail_file_saves(&self) {
        self.failures.lock().unwrap().save_file = true;
    }

    pub fn fail_record_updates(&self) {
        self.failures.lock().unwrap().record_updates = true;
    }

    pub fn queries(&self) -> Vec<(RecordQuery, PagingRequest)> {
        self.calls.lock().unwrap().queries.clone()
    }

    pub fn file_info_fetches(&self) -> Vec<FileRef> {
        self.calls.lock().unwrap().file_info.clone()
    }

    pub fn file_content_fetches(&self) -> Vec<FileRef> {
        self.calls.lock().unwrap().file_content.clone()
    }

    pub fn saved_files(&self) -> Vec<SaveFileRequest> {
        self.calls.lock().unwrap().saved_files.clone()
    }

    pub fn record_updates(&self) -> Vec<RecordUpdate> {
        self.calls.lock().unwrap().record_updates.clone()
    }

    pub fn record(&self, record_id: RecordId) -> Option<Record> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.record_id == record_id)
            .cloned()
    }

    fn matches_filter(record: &Record, filter: Option<&str>) -> bool {
        let Some(filter) = filter else {
            return true;
        };

        let (field, rest) = filter.split_once(' ').expect("filter has a field id");
        let field_id: FieldId = field.parse().expect("filter field id is numeric");
        let (operator, quoted) = rest.split_once(' ').expect("filter has an operator");
        let value = quoted.trim_matches('\'');

        let Some(actual) = record.field_value(field_id) else {
            return false;
        };
        let actual = actual.canonicalize();

        match operator {
            "eq" => actual == value,
            "contains" => actual.contains(value),
            other => panic!("unexpected filter operator {}", other),
        }
    }
}

#[async_trait]
impl RecordService for FakeService {
    async fn get_field(&self, field_id: FieldId) -> ApiResult<FieldDefinition> {
        if self.failures.lock().unwrap().field_lookups {
            return Err(ApiError::transport(Some(502), "bad gateway"));
        }

        self.fields
            .get(&field_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("field {}", field_id)))
    }

    async fn query_records(
        &self,
        query: &RecordQuery,
        paging: PagingRequest,
    ) -> ApiResult<RecordPage> {
        self.calls
            .lock()
            .unwrap()
            .queries
            .push((query.clone(), paging));

        {
            let mut failures = self.failures.lock().unwrap();
            if failures.queries_remaining > 0 {
                failures.queries_remaining -= 1;
                return Err(ApiError::transport(Some(503), "service unavailable"));
            }
        }

        assert_eq!(query.app_id, self.app_id, "query sent to the wrong app");

        let matching: Vec<Record> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| Self::matches_filter(record, query.filter.as_deref()))
            .cloned()
            .collect();

        let page_size = paging.page_size as usize;
        let total_records = matching.len() as u32;
        let total_pages = matching.len().div_ceil(page_size) as u32;
        let start = (paging.page_number as usize - 1) * page_size;

        let records = matching
            .into_iter()
            .skip(start)
            .take(page_size)
            .map(|mut record| {
                record
                    .field_data
                    .retain(|data| query.field_ids.contains(&data.field_id));
                record
            })
            .collect();

        Ok(RecordPage {
            page_number: paging.page_number,
            page_size: paging.page_size,
            total_pages,
            total_records,
            records,
        })
    }

    async fn get_file_info(&self, file: FileRef) -> ApiResult<FileInfo> {
        self.calls.lock().unwrap().file_info.push(file);

        if self.failures.lock().unwrap().file_info.contains(&file.file_id) {
            return Err(ApiError::transport(Some(500), "file info unavailable"));
        }

        let stored = self.stored_file(file)?;
        Ok(FileInfo {
            name: stored.name,
            notes: stored.notes,
            content_type: Some(stored.content_type),
        })
    }

    async fn get_file(&self, file: FileRef) -> ApiResult<FileContent> {
        self.calls.lock().unwrap().file_content.push(file);

        if self.failures.lock().unwrap().file_content.contains(&file.file_id) {
            return Err(ApiError::transport(Some(500), "file content unavailable"));
        }

        let stored = self.stored_file(file)?;
        Ok(FileContent {
            content_type: stored.content_type,
            bytes: stored.bytes,
        })
    }

    async fn save_file(&self, request: SaveFileRequest) -> ApiResult<FileId> {
        if self.failures.lock().unwrap().save_file {
            return Err(ApiError::transport(Some(500), "save failed"));
        }

        self.calls.lock().unwrap().saved_files.push(request);

        let mut next = self.next_file_id.lock().unwrap();
        *next += 1;
        Ok(*next)
    }

    async fn save_record(&self, update: &RecordUpdate) -> ApiResult<RecordId> {
        self.calls.lock().unwrap().record_updates.push(update.clone());

        if self.failures.lock().unwrap().record_updates {
            return Err(ApiError::transport(Some(500), "record update failed"));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.record_id == update.record_id)
            .ok_or_else(|| ApiError::not_found(format!("record {}", update.record_id)))?;

        for change in &update.fields {
            match record
                .field_data
                .iter_mut()
                .find(|data| data.field_id == change.field_id)
            {
                Some(existing) => existing.value = change.value.clone(),
                None => record.field_data.push(change.clone()),
            }
        }

        Ok(update.record_id)
    }
}

impl FakeService {
    fn stored_file(&self, file: FileRef) -> ApiResult<StoredFile> {
        self.files
            .get(&(file.record_id, file.field_id, file.file_id))
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("file {}", file.file_id)))
    }
}

// ============================================================================
// Record and configuration builders
// ============================================================================

pub fn internal(file_id: FileId) -> AttachmentEntry {
    AttachmentEntry {
        file_id,
        file_name: Some(format!("file-{}.pdf", file_id)),
        notes: None,
        storage_location: StorageLocation::Internal,
    }
}

pub fn external(file_id: FileId) -> AttachmentEntry {
    AttachmentEntry {
        file_id,
        file_name: Some(format!("link-{}", file_id)),
        notes: None,
        storage_location: StorageLocation::External("GoogleDrive".to_string()),
    }
}

pub fn text(value: &str) -> FieldValue {
    FieldValue::String(Some(value.to_string()))
}

pub fn source_record(record_id: RecordId, key: &str, files: Vec<AttachmentEntry>) -> Record {
    Record::new(SOURCE_APP, record_id)
        .with_field(SOURCE_MATCH_FIELD, text(key))
        .with_field(SOURCE_FILES_A, FieldValue::AttachmentList(files))
}

pub fn target_record(record_id: RecordId, key: &str) -> Record {
    Record::new(TARGET_APP, record_id).with_field(TARGET_MATCH_FIELD, text(key))
}

/// Configuration mapping field A, or fields A and B when `two_fields`
pub fn transfer_config(two_fields: bool) -> TransferConfig {
    let mappings = if two_fields {
        format!(
            "{}|{},{}|{}",
            SOURCE_FILES_A, TARGET_FILES_A, SOURCE_FILES_B, TARGET_FILES_B
        )
    } else {
        format!("{}|{}", SOURCE_FILES_A, TARGET_FILES_A)
    };

    let json = serde_json::json!({
        "SourceInstanceKey": "source-key",
        "TargetInstanceKey": "target-key",
        "SourceAppId": SOURCE_APP,
        "TargetAppId": TARGET_APP,
        "SourceMatchField": SOURCE_MATCH_FIELD,
        "TargetMatchField": TARGET_MATCH_FIELD,
        "AttachmentFieldMappings": mappings,
    });

    TransferConfig::validate(ConfigFile::from_json(&json.to_string()).unwrap()).unwrap()
}

pub fn resolved_checkpoint() -> ResolvedCheckpoint {
    ResolvedCheckpoint {
        flag_field_id: FLAG_FIELD,
        process_value_id: process_value(),
        processed_value_id: processed_value(),
    }
}

pub fn run_options(dispatch: DispatchPolicy) -> RunOptions {
    RunOptions {
        page_size: 50,
        page_limit: None,
        dispatch,
        retry: RetryPolicy::with_base_delay(Duration::ZERO),
    }
}

pub fn context(
    source: &Arc<FakeService>,
    target: &Arc<FakeService>,
    config: TransferConfig,
    options: RunOptions,
    checkpoint: Option<ResolvedCheckpoint>,
) -> RunContext {
    let source: Arc<dyn RecordService> = source.clone();
    let target: Arc<dyn RecordService> = target.clone();
    RunContext::new(config, source, target, options).with_checkpoint(checkpoint)
}
