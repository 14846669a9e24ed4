//! Configuration module
//!
//! Everything the workflow engine needs is captured in an immutable [`WorkflowConfig`] that
//! is handed to the engine at construction. Backend wiring (which object store, database and
//! queue to talk to) lives in [`BackendConfig`]. Both are loaded from the environment by
//! [`Config::from_env`].

use std::env;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::models::FileProcessingStatus;
use crate::validation::FileValidator;

// Defaults
const CONTAINER_NAME: &str = "files";
const QUEUE_NAME: &str = "file-uploads";
const TABLE_NAME: &str = "file_processing";
const AUDIT_TABLE_NAME: &str = "file_audit";
const IN_FOLDER: &str = "in";
const OUT_FOLDER: &str = "out";
const ARCHIVE_FOLDER: &str = "archive";
const COPY_POLL_INITIAL_INTERVAL_MS: u64 = 200;
const COPY_POLL_MAX_INTERVAL_MS: u64 = 5_000;
const COPY_POLL_MAX_WAIT_SECS: u64 = 300;
const LIST_PAGE_SIZE: usize = 500;
const DB_MAX_CONNECTIONS: u32 = 10;

/// Bounds on the wait for a server-side copy to settle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyPollConfig {
    /// First poll delay; doubles after every pending poll.
    pub initial_interval: Duration,
    /// Upper bound on a single poll delay.
    pub max_interval: Duration,
    /// Total time allowed before the copy is reported as timed out.
    pub max_wait: Duration,
}

impl Default for CopyPollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(COPY_POLL_INITIAL_INTERVAL_MS),
            max_interval: Duration::from_millis(COPY_POLL_MAX_INTERVAL_MS),
            max_wait: Duration::from_secs(COPY_POLL_MAX_WAIT_SECS),
        }
    }
}

impl CopyPollConfig {
    /// Delay to use after `current`, doubled and capped at `max_interval`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval)
    }
}

/// Immutable settings of the file workflow engine.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowConfig {
    pub container_name: String,
    pub queue_name: String,
    pub table_name: String,
    pub audit_table_name: String,
    pub in_folder: String,
    pub out_folder: String,
    pub archive_folder: String,
    pub allowed_content_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
    pub max_file_size_bytes: Option<u64>,
    pub copy_poll: CopyPollConfig,
    pub list_page_size: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            container_name: CONTAINER_NAME.to_string(),
            queue_name: QUEUE_NAME.to_string(),
            table_name: TABLE_NAME.to_string(),
            audit_table_name: AUDIT_TABLE_NAME.to_string(),
            in_folder: IN_FOLDER.to_string(),
            out_folder: OUT_FOLDER.to_string(),
            archive_folder: ARCHIVE_FOLDER.to_string(),
            allowed_content_types: Vec::new(),
            allowed_extensions: Vec::new(),
            max_file_size_bytes: None,
            copy_poll: CopyPollConfig::default(),
            list_page_size: LIST_PAGE_SIZE,
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> Self {
        Self {
            container_name: env_or("STORAGE_CONTAINER_NAME", CONTAINER_NAME),
            queue_name: env_or("STORAGE_QUEUE_NAME", QUEUE_NAME),
            table_name: env_or("STORAGE_TABLE_NAME", TABLE_NAME),
            audit_table_name: env_or("STORAGE_AUDIT_TABLE_NAME", AUDIT_TABLE_NAME),
            in_folder: env_or("STORAGE_IN_FOLDER", IN_FOLDER),
            out_folder: env_or("STORAGE_OUT_FOLDER", OUT_FOLDER),
            archive_folder: env_or("STORAGE_ARCHIVE_FOLDER", ARCHIVE_FOLDER),
            allowed_content_types: env_list("STORAGE_ALLOWED_CONTENT_TYPES"),
            allowed_extensions: env_list("STORAGE_ALLOWED_EXTENSIONS"),
            max_file_size_bytes: env::var("STORAGE_MAX_FILE_SIZE_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&max| max > 0),
            copy_poll: CopyPollConfig {
                initial_interval: Duration::from_millis(env_parse(
                    "COPY_POLL_INITIAL_INTERVAL_MS",
                    COPY_POLL_INITIAL_INTERVAL_MS,
                )),
                max_interval: Duration::from_millis(env_parse(
                    "COPY_POLL_MAX_INTERVAL_MS",
                    COPY_POLL_MAX_INTERVAL_MS,
                )),
                max_wait: Duration::from_secs(env_parse(
                    "COPY_POLL_MAX_WAIT_SECS",
                    COPY_POLL_MAX_WAIT_SECS,
                )),
            },
            list_page_size: env_parse("LIST_PAGE_SIZE", LIST_PAGE_SIZE).max(1),
        }
    }

    /// Folder a record with `status` belongs to.
    ///
    /// This is the single place the status/folder coupling is decided.
    pub fn folder_for_status(&self, status: FileProcessingStatus) -> &str {
        match status {
            FileProcessingStatus::Initial
            | FileProcessingStatus::Uploaded
            | FileProcessingStatus::Processing => &self.in_folder,
            FileProcessingStatus::Processed => &self.out_folder,
            FileProcessingStatus::Archived => &self.archive_folder,
        }
    }

    /// Upload validator built from the configured allow-lists and size ceiling.
    pub fn validator(&self) -> FileValidator {
        FileValidator::new(
            self.allowed_extensions.clone(),
            self.allowed_content_types.clone(),
            self.max_file_size_bytes,
        )
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for (var, name) in [
            ("STORAGE_TABLE_NAME", &self.table_name),
            ("STORAGE_AUDIT_TABLE_NAME", &self.audit_table_name),
        ] {
            if !is_sql_identifier(name) {
                return Err(anyhow::anyhow!(
                    "{} must be a plain SQL identifier, got '{}'",
                    var,
                    name
                ));
            }
        }

        if self.table_name.eq_ignore_ascii_case(&self.audit_table_name) {
            return Err(anyhow::anyhow!(
                "STORAGE_TABLE_NAME and STORAGE_AUDIT_TABLE_NAME must differ"
            ));
        }

        for (var, folder) in [
            ("STORAGE_IN_FOLDER", &self.in_folder),
            ("STORAGE_OUT_FOLDER", &self.out_folder),
            ("STORAGE_ARCHIVE_FOLDER", &self.archive_folder),
        ] {
            if folder.trim().is_empty() || folder.contains('/') {
                return Err(anyhow::anyhow!(
                    "{} must be a non-empty name without '/', got '{}'",
                    var,
                    folder
                ));
            }
        }

        if self.container_name.trim().is_empty()
            || self.container_name.contains("..")
            || self.container_name.contains('/')
        {
            return Err(anyhow::anyhow!(
                "STORAGE_CONTAINER_NAME must be a single path segment"
            ));
        }

        if self.queue_name.trim().is_empty() {
            return Err(anyhow::anyhow!("STORAGE_QUEUE_NAME must not be empty"));
        }

        if self.copy_poll.initial_interval.is_zero()
            || self.copy_poll.max_interval < self.copy_poll.initial_interval
        {
            return Err(anyhow::anyhow!(
                "COPY_POLL_MAX_INTERVAL_MS must be >= COPY_POLL_INITIAL_INTERVAL_MS > 0"
            ));
        }

        Ok(())
    }
}

/// Object store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::S3 => "s3",
            StorageBackend::Local => "local",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

/// Notification queue implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Sqs,
    Channel,
}

impl FromStr for QueueBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqs" => Ok(QueueBackend::Sqs),
            "channel" => Ok(QueueBackend::Channel),
            _ => Err(anyhow::anyhow!("Invalid queue backend: {}", s)),
        }
    }
}

/// Where the object store, tables and queue live.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub aws_region: Option<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub queue_backend: QueueBackend,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::Local,
        };
        let queue_backend = match env::var("QUEUE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => QueueBackend::Channel,
        };

        Ok(Self {
            storage_backend,
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            aws_region: env_opt("AWS_REGION"),
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            queue_backend,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.database_url.starts_with("postgres://")
            || self.database_url.starts_with("postgresql://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub log_json: bool,
    pub backends: BackendConfig,
    pub workflow: WorkflowConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = Config {
            environment: env_or("FILEFLOW_ENVIRONMENT", "development"),
            log_json: env_parse("FILEFLOW_LOG_JSON", false),
            backends: BackendConfig::from_env()?,
            workflow: WorkflowConfig::from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.backends.validate()?;
        self.workflow.validate()
    }
}

static SQL_IDENTIFIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// True if `name` can be spliced into SQL as an unquoted identifier.
pub fn is_sql_identifier(name: &str) -> bool {
    SQL_IDENTIFIER
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_opt(var: &str) -> Option<String> {
    env::var(var).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr + Copy>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|s| s.trim().to_lowercase().parse().ok())
        .unwrap_or(default)
}

fn env_list(var: &str) -> Vec<String> {
    env::var(var)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
