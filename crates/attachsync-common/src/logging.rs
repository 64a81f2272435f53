//! Logging Configuration and Initialization
//!
//! Every run gets its own log sink: a console layer for the operator and a
//! JSON file layer that keeps the full run log at a stable path. The sink is
//! handed to the run as a [`tracing::Dispatch`] instead of being installed as
//! the global default, so library code logs through whatever sink the caller
//! scoped it to.
//!
//! # Log levels
//!
//! - `debug!`: per-request detail (queries issued, bytes fetched)
//! - `info!`: run, page and record progress, successful transfers
//! - `warn!`: skipped records, fields and files that need manual follow-up
//! - `error!`: failures that end the run or a whole record
//!
//! Attach ids as structured fields rather than formatting them into the
//! message:
//!
//! ```rust
//! use tracing::warn;
//!
//! let (record_id, field_id, file_id) = (7, 1001, 3);
//! warn!(record_id, field_id, file_id, "File could not be saved");
//! ```
//!
//! # Example
//!
//! ```no_run
//! use attachsync_common::logging::{LogConfig, LogOutput, LogSink};
//! use tracing::info;
//!
//! let config = LogConfig::builder().output(LogOutput::Both).log_dir("./logs").build();
//! let sink = LogSink::new(&config).unwrap();
//! tracing::dispatcher::with_default(sink.dispatch(), || info!("Run started"));
//! println!("Log written to {}", sink.log_path().unwrap().display());
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{Dispatch, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

/// Default file name of the run log inside the run directory
pub const DEFAULT_LOG_FILE_NAME: &str = "log.json";

/// Severity threshold for a log layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Accepts the tracing names plus the `verbose`, `information` and `fatal`
/// spellings used by older run configurations
impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "trace" | "verbose" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" | "information" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" | "fatal" => LogLevel::Error,
            _ => return Err(anyhow!("Invalid log level: {}", s)),
        })
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.to_tracing_level().as_str().to_ascii_lowercase();
        f.write_str(&name)
    }
}

/// Where a run's events are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    Console,
    File,
    #[default]
    Both,
}

impl LogOutput {
    fn console(self) -> bool {
        self != LogOutput::File
    }

    fn file(self) -> bool {
        self != LogOutput::Console
    }
}

impl FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "console" | "stdout" => LogOutput::Console,
            "file" => LogOutput::File,
            "both" | "all" => LogOutput::Both,
            _ => return Err(anyhow!("Invalid log output: {}", s)),
        })
    }
}

/// Console log format. The file log is always JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => LogFormat::Text,
            "json" => LogFormat::Json,
            _ => return Err(anyhow!("Invalid log format: {}", s)),
        })
    }
}

/// Settings for one run's [`LogSink`]
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Console threshold; `RUST_LOG` directives are applied on top
    pub level: LogLevel,
    /// File threshold
    pub file_level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,
    pub log_dir: PathBuf,
    pub log_file_name: String,
    /// Extra console directives, comma separated (`reqwest=warn,hyper=warn`)
    pub filter_directives: Option<String>,
    pub include_location: bool,
    pub include_thread_ids: bool,
    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file_level: LogLevel::Debug,
            output: LogOutput::Both,
            format: LogFormat::Text,
            log_dir: PathBuf::from("."),
            log_file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            filter_directives: None,
            include_location: false,
            include_thread_ids: false,
            include_targets: false,
        }
    }
}

impl LogConfig {
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }

    /// Override settings from `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`,
    /// `LOG_DIR`, `LOG_FILTER` and the `LOG_INCLUDE_LOCATION`,
    /// `LOG_INCLUDE_THREAD_IDS` and `LOG_INCLUDE_TARGETS` switches.
    ///
    /// Unparseable levels, outputs and formats are errors; unparseable
    /// switches are treated as `false`.
    pub fn merge_env(self) -> Result<Self> {
        self.merge_from(|name| std::env::var(name).ok())
    }

    fn merge_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(level) = parse_var(&lookup, "LOG_LEVEL")? {
            self.level = level;
        }
        if let Some(output) = parse_var(&lookup, "LOG_OUTPUT")? {
            self.output = output;
        }
        if let Some(format) = parse_var(&lookup, "LOG_FORMAT")? {
            self.format = format;
        }
        if let Some(dir) = lookup("LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(filter) = lookup("LOG_FILTER") {
            self.filter_directives = Some(filter);
        }

        let switch = |name: &str| lookup(name).map(|value| value.trim().eq_ignore_ascii_case("true"));
        self.include_location = switch("LOG_INCLUDE_LOCATION").unwrap_or(self.include_location);
        self.include_thread_ids = switch("LOG_INCLUDE_THREAD_IDS").unwrap_or(self.include_thread_ids);
        self.include_targets = switch("LOG_INCLUDE_TARGETS").unwrap_or(self.include_targets);

        Ok(self)
    }

    /// Full path of the run log file
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_file_name)
    }
}

#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn file_level(mut self, level: LogLevel) -> Self {
        self.config.file_level = level;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn filter_directives(mut self, filter: impl Into<String>) -> Self {
        self.config.filter_directives = Some(filter.into());
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr<Err = anyhow::Error>,
{
    lookup(name)
        .map(|value| value.parse::<T>())
        .transpose()
        .with_context(|| format!("Invalid value in {}", name))
}

/// Directory for one run's output, named after the minute the run started
/// (e.g. `./logs/202401021504-output`)
pub fn run_output_dir(base: &Path, started_at: DateTime<Local>) -> PathBuf {
    base.join(format!("{}-output", started_at.format("%Y%m%d%H%M")))
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// A configured logging sink for one run
///
/// Owns the file appender's worker guard; dropping the sink flushes any
/// buffered file output.
pub struct LogSink {
    dispatch: Dispatch,
    log_path: Option<PathBuf>,
    _guard: Option<WorkerGuard>,
}

impl LogSink {
    /// Build the console and file layers described by `config`
    pub fn new(config: &LogConfig) -> Result<Self> {
        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut log_path = None;
        let mut guard = None;

        if config.output.console() {
            layers.push(console_layer(config)?);
        }

        if config.output.file() {
            std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;

            let file_appender =
                tracing_appender::rolling::never(&config.log_dir, &config.log_file_name);
            let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_ansi(false)
                .with_filter(LevelFilter::from_level(config.file_level.to_tracing_level()))
                .boxed();

            layers.push(file_layer);
            log_path = Some(config.log_path());
            guard = Some(worker_guard);
        }

        let subscriber = tracing_subscriber::registry().with(layers);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            log_path,
            _guard: guard,
        })
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Path of the run log file, if file output is enabled
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }
}

fn console_layer(config: &LogConfig) -> Result<BoxedLayer> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());

    if let Some(ref directives) = config.filter_directives {
        for directive in directives.split(',') {
            filter = filter.add_directive(
                directive
                    .parse()
                    .context("Failed to parse filter directive")?,
            );
        }
    }

    let layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(config.include_targets)
        .with_thread_ids(config.include_thread_ids)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    Ok(match config.format {
        LogFormat::Text => layer.with_filter(filter).boxed(),
        LogFormat::Json => layer.json().with_filter(filter).boxed(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Information".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("ERROR".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("invalid".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_output_from_str() {
        assert_eq!("console".parse::<LogOutput>().unwrap(), LogOutput::Console);
        assert_eq!("file".parse::<LogOutput>().unwrap(), LogOutput::File);
        assert_eq!("both".parse::<LogOutput>().unwrap(), LogOutput::Both);
        assert!("invalid".parse::<LogOutput>().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = LogConfig::builder()
            .level(LogLevel::Warn)
            .file_level(LogLevel::Trace)
            .output(LogOutput::File)
            .format(LogFormat::Json)
            .log_dir("/var/log/attachsync")
            .build();

        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.file_level, LogLevel::Trace);
        assert_eq!(config.output, LogOutput::File);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_path(), PathBuf::from("/var/log/attachsync/log.json"));
    }

    #[test]
    fn test_run_output_dir_is_named_by_start_minute() {
        let started = Local.with_ymd_and_hms(2024, 1, 2, 15, 4, 59).unwrap();
        let dir = run_output_dir(Path::new("logs"), started);
        assert_eq!(dir, PathBuf::from("logs/202401021504-output"));
    }

    #[test]
    fn test_file_sink_writes_structured_json() {
        let temp = tempfile::tempdir().unwrap();
        let config = LogConfig::builder()
            .output(LogOutput::File)
            .log_dir(temp.path())
            .build();

        let sink = LogSink::new(&config).unwrap();
        let log_path = sink.log_path().unwrap().to_path_buf();
        assert_eq!(log_path, temp.path().join(DEFAULT_LOG_FILE_NAME));

        tracing::dispatcher::with_default(sink.dispatch(), || {
            tracing::debug!(record_id = 7, "Transferred file");
        });
        drop(sink);

        let contents = std::fs::read_to_string(log_path).unwrap();
        assert!(contents.contains("Transferred file"));
        assert!(contents.contains("\"record_id\":7"));
    }

    #[test]
    fn test_env_overrides() {
        let env = |name: &str| match name {
            "LOG_LEVEL" => Some("warning".to_string()),
            "LOG_OUTPUT" => Some("console".to_string()),
            "LOG_INCLUDE_TARGETS" => Some("TRUE".to_string()),
            _ => None,
        };

        let config = LogConfig::default().merge_from(env).unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.output, LogOutput::Console);
        assert_eq!(config.format, LogFormat::Text);
        assert!(config.include_targets);
        assert!(!config.include_location);
    }

    #[test]
    fn test_env_override_rejects_unknown_level() {
        let env = |name: &str| (name == "LOG_LEVEL").then(|| "loud".to_string());
        let err = LogConfig::default().merge_from(env).unwrap_err();
        assert!(err.to_string().contains("LOG_LEVEL"));
    }

    #[test]
    fn test_level_display_round_trips() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    }
}
