//! Run configuration
//!
//! A run is described by a JSON (or YAML) file with PascalCase keys. API keys
//! may come from the environment instead of the file.

use crate::api::client::DEFAULT_API_URL;
use crate::error::{CliError, Result};
use crate::sync::{DispatchPolicy, RetryPolicy};
use attachsync_common::types::{parse_id, AppId, FieldId, FieldMappings};
use serde::{Deserialize, Deserializer};
use std::path::Path;

// ============================================================================
// Run Configuration Constants
// ============================================================================

/// Default number of source records fetched per page
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size the record API accepts
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Environment variable overriding the source API key
pub const SOURCE_API_KEY_ENV: &str = "ATTACHSYNC_SOURCE_API_KEY";

/// Environment variable overriding the target API key
pub const TARGET_API_KEY_ENV: &str = "ATTACHSYNC_TARGET_API_KEY";

/// Raw contents of a configuration file, before validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigFile {
    #[serde(default)]
    pub source_instance_key: Option<String>,
    #[serde(default)]
    pub target_instance_key: Option<String>,
    #[serde(default)]
    pub source_api_url: Option<String>,
    #[serde(default)]
    pub target_api_url: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub source_app_id: Option<AppId>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub target_app_id: Option<AppId>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub source_match_field: Option<FieldId>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub target_match_field: Option<FieldId>,
    #[serde(default)]
    pub attachment_field_mappings: Option<FieldMappings>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub flag_field_id: Option<FieldId>,
    #[serde(default)]
    pub process_value: Option<String>,
    #[serde(default)]
    pub processed_value: Option<String>,
}

/// Ids may be written as numbers or numeric strings
fn flexible_id<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(n)) => i32::try_from(n)
            .ok()
            .filter(|id| *id > 0)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("'{}' is not a valid id", n))),
        Some(RawId::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawId::Text(text)) => parse_id(&text).map(Some).map_err(serde::de::Error::custom),
    }
}

impl ConfigFile {
    /// Parse a JSON configuration document
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Parse a YAML configuration document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Read a configuration file, choosing the format by extension
    /// (`.yaml`/`.yml` for YAML, anything else for JSON)
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::ConfigNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::from_yaml(&contents)
            },
            _ => Self::from_json(&contents),
        }
    }

    /// Apply API key overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply API key overrides from `lookup`; empty values are ignored
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(SOURCE_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.source_instance_key = Some(key);
        }

        if let Some(key) = lookup(TARGET_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.target_instance_key = Some(key);
        }

        self
    }
}

/// Connection settings for one remote instance
#[derive(Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub api_key: String,
    pub api_url: String,
}

impl std::fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Checkpoint flag settings
///
/// Values are list option names or literal option ids; they are resolved
/// against the flag field before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointConfig {
    pub flag_field_id: FieldId,
    pub process_value: String,
    pub processed_value: String,
}

/// Validated, immutable configuration for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub source: InstanceConfig,
    pub target: InstanceConfig,
    pub source_app_id: AppId,
    pub target_app_id: AppId,
    pub source_match_field: FieldId,
    pub target_match_field: FieldId,
    pub mappings: FieldMappings,
    pub checkpoint: Option<CheckpointConfig>,
}

impl TransferConfig {
    /// Read, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        Self::validate(ConfigFile::read(path)?.apply_env())
    }

    /// Check that every required setting is present and consistent
    pub fn validate(file: ConfigFile) -> Result<Self> {
        let source = InstanceConfig {
            api_key: required_text(file.source_instance_key, "SourceInstanceKey")?,
            api_url: api_url(file.source_api_url),
        };
        let target = InstanceConfig {
            api_key: required_text(file.target_instance_key, "TargetInstanceKey")?,
            api_url: api_url(file.target_api_url),
        };

        let checkpoint = match (file.flag_field_id, file.process_value, file.processed_value) {
            (None, None, None) => None,
            (Some(flag_field_id), Some(process_value), Some(processed_value)) => {
                Some(CheckpointConfig {
                    flag_field_id,
                    process_value: required_text(Some(process_value), "ProcessValue")?,
                    processed_value: required_text(Some(processed_value), "ProcessedValue")?,
                })
            },
            _ => {
                return Err(CliError::config(
                    "FlagFieldId, ProcessValue and ProcessedValue must all be set, or all be omitted",
                ))
            },
        };

        Ok(Self {
            source,
            target,
            source_app_id: required(file.source_app_id, "SourceAppId")?,
            target_app_id: required(file.target_app_id, "TargetAppId")?,
            source_match_field: required(file.source_match_field, "SourceMatchField")?,
            target_match_field: required(file.target_match_field, "TargetMatchField")?,
            mappings: required(file.attachment_field_mappings, "AttachmentFieldMappings")?,
            checkpoint,
        })
    }

    /// Source fields requested for every record: the match field followed by
    /// the mapped attachment fields
    pub fn source_field_ids(&self) -> Vec<FieldId> {
        let mut ids = vec![self.source_match_field];
        ids.extend(
            self.mappings
                .source_field_ids()
                .into_iter()
                .filter(|id| *id != self.source_match_field),
        );
        ids
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| CliError::config(format!("{} is required", name)))
}

fn required_text(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(CliError::config(format!("{} is required", name))),
    }
}

fn api_url(value: Option<String>) -> String {
    value
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Options controlling how a run is driven
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub page_size: u32,
    /// Stop after this many pages
    pub page_limit: Option<u32>,
    pub dispatch: DispatchPolicy,
    pub retry: RetryPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_limit: None,
            dispatch: DispatchPolicy::Sequential,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL_CONFIG: &str = r#"{
        "SourceInstanceKey": "source-key",
        "TargetInstanceKey": "target-key",
        "SourceAppId": 100,
        "TargetAppId": "200",
        "SourceMatchField": 1001,
        "TargetMatchField": "2001",
        "AttachmentFieldMappings": "1002|2002, 1003|2003",
        "FlagFieldId": 1004,
        "ProcessValue": "Process",
        "ProcessedValue": "Processed"
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config = TransferConfig::validate(ConfigFile::from_json(FULL_CONFIG).unwrap()).unwrap();

        assert_eq!(config.source.api_key, "source-key");
        assert_eq!(config.source.api_url, DEFAULT_API_URL);
        assert_eq!(config.target_app_id, 200);
        assert_eq!(config.target_match_field, 2001);
        assert!(config
            .mappings
            .iter()
            .any(|m| m.source == 1003 && m.target == 2003));
        assert_eq!(
            config.checkpoint,
            Some(CheckpointConfig {
                flag_field_id: 1004,
                process_value: "Process".into(),
                processed_value: "Processed".into(),
            })
        );
        assert_eq!(config.source_field_ids(), vec![1001, 1002, 1003]);
    }

    #[test]
    fn test_mappings_as_object_list() {
        let file = ConfigFile::from_json(
            r#"{
                "SourceInstanceKey": "s", "TargetInstanceKey": "t",
                "SourceAppId": 1, "TargetAppId": 2,
                "SourceMatchField": 10, "TargetMatchField": 20,
                "AttachmentFieldMappings": [{"Source": 11, "Target": 21}]
            }"#,
        )
        .unwrap();

        let config = TransferConfig::validate(file).unwrap();
        assert_eq!(config.mappings.len(), 1);
        assert!(config.checkpoint.is_none());
    }

    #[test]
    fn test_duplicate_source_mapping_rejected() {
        let result = ConfigFile::from_json(r#"{"AttachmentFieldMappings": "1|10,1|20"}"#);
        assert!(matches!(result, Err(CliError::JsonParse(_))));
    }

    #[test]
    fn test_partial_checkpoint_rejected() {
        let mut file = ConfigFile::from_json(FULL_CONFIG).unwrap();
        file.processed_value = None;

        let err = TransferConfig::validate(file).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("FlagFieldId"));
    }

    #[test]
    fn test_missing_required_values() {
        let mut file = ConfigFile::from_json(FULL_CONFIG).unwrap();
        file.source_instance_key = Some("  ".into());
        assert!(TransferConfig::validate(file).is_err());

        let mut file = ConfigFile::from_json(FULL_CONFIG).unwrap();
        file.attachment_field_mappings = None;
        let err = TransferConfig::validate(file).unwrap_err();
        assert!(err.to_string().contains("AttachmentFieldMappings"));
    }

    #[test]
    fn test_invalid_ids_rejected() {
        assert!(ConfigFile::from_json(r#"{"SourceAppId": "abc"}"#).is_err());
        assert!(ConfigFile::from_json(r#"{"SourceAppId": -4}"#).is_err());
        assert!(ConfigFile::from_json(r#"{"SourceAppId": 99999999999}"#).is_err());
    }

    #[test]
    fn test_env_overrides_keys() {
        let file = ConfigFile::from_json(FULL_CONFIG)
            .unwrap()
            .apply_overrides(|name| match name {
                SOURCE_API_KEY_ENV => Some("from-env".into()),
                TARGET_API_KEY_ENV => Some("".into()),
                _ => None,
            });

        assert_eq!(file.source_instance_key.as_deref(), Some("from-env"));
        assert_eq!(file.target_instance_key.as_deref(), Some("target-key"));
    }

    #[test]
    fn test_read_yaml_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transfer.yaml");
        let mut handle = std::fs::File::create(&path).unwrap();
        writeln!(
            handle,
            "SourceInstanceKey: s\nTargetInstanceKey: t\nSourceApiUrl: https://source.example.com\n\
             SourceAppId: 1\nTargetAppId: 2\nSourceMatchField: 10\nTargetMatchField: 20\n\
             AttachmentFieldMappings: \"11|21\""
        )
        .unwrap();

        let config = TransferConfig::validate(ConfigFile::read(&path).unwrap()).unwrap();
        assert_eq!(config.source.api_url, "https://source.example.com");
        assert_eq!(config.target.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigFile::read(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound(_)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = TransferConfig::validate(ConfigFile::from_json(FULL_CONFIG).unwrap()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("source-key"));
        assert!(debug.contains("<redacted>"));
    }
}
