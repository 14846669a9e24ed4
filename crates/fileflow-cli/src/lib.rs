//! Wiring and output helpers for the `fileflow` binary.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use fileflow_core::models::FileProcessingStatus;
use fileflow_core::{AppError, Config, ErrorMetadata};
use fileflow_db::{PostgresAuditLog, PostgresStatusTable};
use fileflow_infra::create_queue;
use fileflow_services::FileWorkflowService;
use fileflow_storage::create_storage;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;

/// Build the engine over the configured backends.
pub async fn build_service(config: &Config) -> anyhow::Result<FileWorkflowService> {
    let workflow = config.workflow.clone();

    let storage = create_storage(&config.backends, &workflow.container_name)
        .await
        .map_err(AppError::from)
        .context("Failed to initialize storage")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.backends.db_max_connections)
        .connect(&config.backends.database_url)
        .await
        .context("Failed to connect to database")?;

    let status_table = PostgresStatusTable::new(pool.clone(), &workflow.table_name)?;
    let audit_log = PostgresAuditLog::new(pool, &workflow.audit_table_name)?;

    let queue = create_queue(&config.backends, &workflow.queue_name)
        .await
        .map_err(AppError::from)
        .context("Failed to initialize notification queue")?;

    tracing::debug!(
        storage_backend = config.backends.storage_backend.as_str(),
        queue_backend = ?config.backends.queue_backend,
        container = %workflow.container_name,
        "Workflow engine wired"
    );

    Ok(FileWorkflowService::new(
        storage,
        Arc::new(status_table),
        Arc::new(audit_log),
        queue,
        workflow,
    ))
}

/// Token cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            trigger.cancel();
        }
    });
    token
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Name to store an uploaded file under: the explicit name, else the file's own name.
pub fn upload_name(path: &Path, name: Option<String>) -> Result<String, AppError> {
    if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
        return Ok(name);
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::InvalidInput(format!("Cannot derive a file name from {}", path.display()))
        })
}

pub fn parse_status(value: &str) -> Result<FileProcessingStatus, AppError> {
    value
        .parse()
        .map_err(|e: anyhow::Error| AppError::InvalidInput(e.to_string()))
}

/// One-line error report: the error code, then the message with its cause chain.
pub fn error_report(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AppError>() {
        Some(app_error) => format!(
            "error[{}]: {}",
            app_error.error_code(),
            app_error.detailed_message()
        ),
        None => format!("error[INTERNAL_ERROR]: {:#}", err),
    }
}
