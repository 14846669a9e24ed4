#![allow(dead_code)]

pub mod faults;

use fileflow_core::{CopyPollConfig, WorkflowConfig};
use fileflow_db::{InMemoryAuditLog, InMemoryStatusTable, StatusTable};
use fileflow_infra::{ChannelQueue, NotificationQueue};
use fileflow_services::FileWorkflowService;
use fileflow_storage::{ByteReader, CopyStatus, LocalStorage, Storage};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

use faults::{FailingQueue, ScriptedCopyStorage};

/// Engine wired to local storage in a temp dir, in-memory tables and a channel queue.
pub struct TestWorkflow {
    pub service: FileWorkflowService,
    pub storage: Arc<dyn Storage>,
    pub status_table: InMemoryStatusTable,
    pub audit_log: InMemoryAuditLog,
    pub queue_rx: Option<mpsc::Receiver<String>>,
    pub scripted: Option<Arc<ScriptedCopyStorage>>,
    pub _temp_dir: TempDir,
}

/// Knobs for [`setup_workflow_with`].
pub struct TestOptions {
    pub config: WorkflowConfig,
    /// Copy statuses reported for copy destinations, one per poll; the last one repeats.
    pub copy_script: Option<Vec<CopyStatus>>,
    pub failing_queue: bool,
    /// Replaces the status table handed to the engine; `status_table` then stays unused.
    pub status_table: Option<Arc<dyn StatusTable>>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            config: test_config(),
            copy_script: None,
            failing_queue: false,
            status_table: None,
        }
    }
}

/// Default config with fast copy polling and small listing pages.
pub fn test_config() -> WorkflowConfig {
    WorkflowConfig {
        copy_poll: CopyPollConfig {
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(20),
            max_wait: Duration::from_secs(2),
        },
        list_page_size: 2,
        ..WorkflowConfig::default()
    }
}

pub async fn setup_workflow() -> TestWorkflow {
    setup_workflow_with(TestOptions::default()).await
}

pub async fn setup_workflow_with(options: TestOptions) -> TestWorkflow {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let local = LocalStorage::new(temp_dir.path(), &options.config.container_name)
        .await
        .expect("Failed to create local storage");

    let scripted = options
        .copy_script
        .map(|script| Arc::new(ScriptedCopyStorage::new(Arc::new(local.clone()), script)));
    let storage: Arc<dyn Storage> = match &scripted {
        Some(scripted) => scripted.clone(),
        None => Arc::new(local),
    };

    let status_table = InMemoryStatusTable::new();
    let audit_log = InMemoryAuditLog::new();

    let (queue, queue_rx): (Arc<dyn NotificationQueue>, _) = if options.failing_queue {
        (Arc::new(FailingQueue), None)
    } else {
        let (queue, rx) = ChannelQueue::new(options.config.queue_name.clone(), 64);
        (Arc::new(queue), Some(rx))
    };

    let engine_table: Arc<dyn StatusTable> = options
        .status_table
        .unwrap_or_else(|| Arc::new(status_table.clone()));

    let service = FileWorkflowService::new(
        storage.clone(),
        engine_table,
        Arc::new(audit_log.clone()),
        queue,
        options.config,
    );

    TestWorkflow {
        service,
        storage,
        status_table,
        audit_log,
        queue_rx,
        scripted,
        _temp_dir: temp_dir,
    }
}

/// Upload content for tests.
pub fn content(data: &[u8]) -> ByteReader {
    Box::pin(std::io::Cursor::new(data.to_vec()))
}
