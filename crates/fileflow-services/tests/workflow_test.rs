#[path = "helpers/mod.rs"]
mod helpers;

use fileflow_core::constants::STATUS_PARTITION;
use fileflow_core::models::{
    ArchiveRequest, AuditQuery, FileActionType, FileProcessingStatus, FileUploadedEvent,
    StatusRecord, UploadRequest,
};
use fileflow_core::AppError;
use fileflow_db::{InMemoryStatusTable, StatusTable};
use fileflow_storage::CopyStatus;
use futures::TryStreamExt;
use helpers::faults::LockstepStatusTable;
use helpers::{content, setup_workflow, setup_workflow_with, test_config, TestOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn upload_request(file_name: &str) -> UploadRequest {
    UploadRequest {
        content_type: Some("text/plain".to_string()),
        correlation_id: Some("corr-1".to_string()),
        ..UploadRequest::new(file_name)
    }
}

#[tokio::test]
async fn test_upload_then_download_round_trips() {
    let app = setup_workflow().await;

    let path = app
        .service
        .upload(upload_request("report.txt"), content(b"quarterly numbers"))
        .await
        .unwrap();
    assert_eq!(path, "in/report.txt");

    let mut sink = Vec::new();
    let written = app
        .service
        .download("report.txt", Some("in"), &mut sink)
        .await
        .unwrap();

    assert_eq!(written, 17);
    assert_eq!(sink, b"quarterly numbers");
}

#[tokio::test]
async fn test_upload_records_status_event_and_single_audit() {
    let mut app = setup_workflow().await;

    app.service
        .upload(upload_request("a.txt"), content(b"abc"))
        .await
        .unwrap();

    let record = app
        .status_table
        .get(STATUS_PARTITION, "in:a.txt")
        .await
        .unwrap()
        .expect("status record should exist");
    assert_eq!(record.value.status, FileProcessingStatus::Uploaded);
    assert_eq!(record.value.folder, "in");
    assert_eq!(record.value.file_name, "a.txt");
    assert_eq!(record.value.content_type.as_deref(), Some("text/plain"));
    assert_eq!(record.value.content_length, 3);
    assert_eq!(record.value.correlation_id.as_deref(), Some("corr-1"));

    let entries = app.audit_log.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, FileActionType::Upload);
    assert_eq!(entries[0].status, FileProcessingStatus::Uploaded);
    assert_eq!(entries[0].blob_name, "in/a.txt");

    let message = app
        .queue_rx
        .as_mut()
        .unwrap()
        .try_recv()
        .expect("upload should be announced");
    let event = FileUploadedEvent::from_message(&message).unwrap();
    assert_eq!(event.blob_name, "in/a.txt");
    assert_eq!(event.container_name, "files");
    assert_eq!(event.folder.as_deref(), Some("in"));
    assert_eq!(event.content_length, 3);
}

#[tokio::test]
async fn test_upload_status_folder_follows_status_not_request() {
    let app = setup_workflow().await;

    let request = UploadRequest {
        folder: Some("out".to_string()),
        ..upload_request("late.csv")
    };
    let path = app.service.upload(request, content(b"1,2,3")).await.unwrap();
    assert_eq!(path, "out/late.csv");

    let record = app
        .status_table
        .get(STATUS_PARTITION, "out:late.csv")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.value.folder, "in");
}

#[tokio::test]
async fn test_reupload_overwrites_status_unconditionally() {
    let app = setup_workflow().await;

    app.service
        .upload(upload_request("a.txt"), content(b"one"))
        .await
        .unwrap();
    app.service
        .update_status("a.txt", FileProcessingStatus::Processed, Some("in"))
        .await
        .unwrap();
    app.service
        .upload(upload_request("a.txt"), content(b"second"))
        .await
        .unwrap();

    let record = app
        .status_table
        .get(STATUS_PARTITION, "in:a.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.value.status, FileProcessingStatus::Uploaded);
    assert_eq!(record.value.content_length, 6);
}

#[tokio::test]
async fn test_upload_survives_queue_failure() {
    let app = setup_workflow_with(TestOptions {
        failing_queue: true,
        ..TestOptions::default()
    })
    .await;

    let path = app
        .service
        .upload(upload_request("a.txt"), content(b"abc"))
        .await
        .unwrap();
    assert_eq!(path, "in/a.txt");

    assert!(app.storage.exists("in/a.txt").await.unwrap());
    assert!(app
        .status_table
        .get(STATUS_PARTITION, "in:a.txt")
        .await
        .unwrap()
        .is_some());
    assert_eq!(app.audit_log.entries().await.len(), 1);
}

#[tokio::test]
async fn test_upload_rejects_blank_file_name() {
    let app = setup_workflow().await;

    let result = app.service.upload(upload_request("  "), content(b"abc")).await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert!(app.audit_log.entries().await.is_empty());
}

#[tokio::test]
async fn test_download_missing_blob_is_not_found() {
    let app = setup_workflow().await;

    let mut sink = Vec::new();
    let result = app.service.download("ghost.txt", Some("in"), &mut sink).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(app.audit_log.entries().await.is_empty());
}

#[tokio::test]
async fn test_download_audits_current_status_without_changing_it() {
    let app = setup_workflow().await;

    app.service
        .upload(upload_request("a.txt"), content(b"abc"))
        .await
        .unwrap();
    app.service
        .update_status("a.txt", FileProcessingStatus::Processing, Some("in"))
        .await
        .unwrap();

    let mut sink = Vec::new();
    app.service.download("in/a.txt", None, &mut sink).await.unwrap();

    let entries = app.audit_log.entries().await;
    let download = entries.last().unwrap();
    assert_eq!(download.action, FileActionType::Download);
    assert_eq!(download.status, FileProcessingStatus::Processing);
    assert_eq!(download.folder.as_deref(), Some("in"));

    let record = app
        .status_table
        .get(STATUS_PARTITION, "in:a.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.value.status, FileProcessingStatus::Processing);
}

#[tokio::test]
async fn test_archive_missing_source_is_not_found() {
    let app = setup_workflow().await;

    let request = ArchiveRequest {
        from_folder: Some("in".to_string()),
        ..ArchiveRequest::new("ghost.txt")
    };
    let result = app.service.archive(request, &CancellationToken::new()).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(app.audit_log.entries().await.is_empty());
    assert!(app.status_table.is_empty().await);
}

#[tokio::test]
async fn test_archive_moves_file_and_records_it() {
    let app = setup_workflow().await;

    app.service
        .upload(upload_request("a.txt"), content(b"keep me"))
        .await
        .unwrap();

    let request = ArchiveRequest {
        from_folder: Some("in".to_string()),
        correlation_id: Some("corr-2".to_string()),
        comment: Some("done".to_string()),
        ..ArchiveRequest::new("a.txt")
    };
    let destination = app
        .service
        .archive(request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(destination, "archive/a.txt");

    assert!(!app.storage.exists("in/a.txt").await.unwrap());
    assert_eq!(app.storage.download("archive/a.txt").await.unwrap(), b"keep me");

    let record = app
        .status_table
        .get(STATUS_PARTITION, "archive:a.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.value.status, FileProcessingStatus::Archived);
    assert_eq!(record.value.folder, "archive");

    let archives: Vec<_> = app
        .audit_log
        .entries()
        .await
        .into_iter()
        .filter(|e| e.action == FileActionType::Archive)
        .collect();
    assert_eq!(archives.len(), 1);
    assert_eq!(archives[0].blob_name, "archive/a.txt");
    assert_eq!(archives[0].status, FileProcessingStatus::Archived);
    assert_eq!(archives[0].content_length, 7);
    assert_eq!(archives[0].comment.as_deref(), Some("done"));
}

#[tokio::test]
async fn test_archive_waits_for_pending_copy() {
    let app = setup_workflow_with(TestOptions {
        copy_script: Some(vec![
            CopyStatus::Pending,
            CopyStatus::Pending,
            CopyStatus::Success,
        ]),
        ..TestOptions::default()
    })
    .await;

    app.service
        .upload(upload_request("slow.bin"), content(b"payload"))
        .await
        .unwrap();
    let destination = app
        .service
        .archive(
            ArchiveRequest::new("in/slow.bin"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(destination, "archive/slow.bin");
    assert_eq!(app.scripted.as_ref().unwrap().polls(), 3);
    assert!(!app.storage.exists("in/slow.bin").await.unwrap());
}

#[tokio::test]
async fn test_archive_failed_copy_keeps_source() {
    let app = setup_workflow_with(TestOptions {
        copy_script: Some(vec![CopyStatus::Pending, CopyStatus::Failed]),
        ..TestOptions::default()
    })
    .await;

    app.service
        .upload(upload_request("a.txt"), content(b"abc"))
        .await
        .unwrap();
    let result = app
        .service
        .archive(ArchiveRequest::new("in/a.txt"), &CancellationToken::new())
        .await;

    match result {
        Err(AppError::CopyFailed { destination, status }) => {
            assert_eq!(destination, "archive/a.txt");
            assert_eq!(status, "Failed");
        }
        other => panic!("expected CopyFailed, got {:?}", other),
    }
    assert!(app.storage.exists("in/a.txt").await.unwrap());
    assert!(app
        .audit_log
        .entries()
        .await
        .iter()
        .all(|e| e.action != FileActionType::Archive));

    let record = app
        .status_table
        .get(STATUS_PARTITION, "in:a.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.value.status, FileProcessingStatus::Uploaded);
}

#[tokio::test]
async fn test_archive_times_out_on_stuck_copy() {
    let mut config = test_config();
    config.copy_poll.max_wait = Duration::from_millis(60);

    let app = setup_workflow_with(TestOptions {
        config,
        copy_script: Some(vec![CopyStatus::Pending]),
        ..TestOptions::default()
    })
    .await;

    app.service
        .upload(upload_request("a.txt"), content(b"abc"))
        .await
        .unwrap();
    let result = app
        .service
        .archive(ArchiveRequest::new("in/a.txt"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AppError::CopyTimedOut { .. })));
    assert!(app.storage.exists("in/a.txt").await.unwrap());
}

#[tokio::test]
async fn test_archive_wait_honors_cancellation() {
    let mut config = test_config();
    config.copy_poll.max_wait = Duration::from_secs(30);

    let app = setup_workflow_with(TestOptions {
        config,
        copy_script: Some(vec![CopyStatus::Pending]),
        ..TestOptions::default()
    })
    .await;

    app.service
        .upload(upload_request("a.txt"), content(b"abc"))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let result = app
        .service
        .archive(ArchiveRequest::new("in/a.txt"), &cancel)
        .await;

    assert!(matches!(result, Err(AppError::Cancelled(_))));
    assert!(app.storage.exists("in/a.txt").await.unwrap());
}

#[tokio::test]
async fn test_file_type_counts() {
    let app = setup_workflow().await;

    for name in ["a.txt", "b.TXT", "c.png"] {
        app.service
            .upload(upload_request(name), content(b"x"))
            .await
            .unwrap();
    }
    let elsewhere = UploadRequest {
        folder: Some("out".to_string()),
        ..upload_request("d.png")
    };
    app.service.upload(elsewhere, content(b"x")).await.unwrap();

    let counts = app
        .service
        .file_type_counts(Some("in"), CancellationToken::new())
        .await
        .unwrap();
    let summary: Vec<_> = counts
        .iter()
        .map(|c| (c.file_type.as_str(), c.count))
        .collect();
    assert_eq!(summary, vec![("txt", 2), ("png", 1)]);

    let all = app
        .service
        .file_type_counts(None, CancellationToken::new())
        .await
        .unwrap();
    let summary: Vec<_> = all.iter().map(|c| (c.file_type.as_str(), c.count)).collect();
    assert_eq!(summary, vec![("png", 2), ("txt", 2)]);
}

#[tokio::test]
async fn test_file_type_counts_bucket_names_without_extension() {
    let app = setup_workflow().await;

    for name in ["README", "Makefile", "notes.md"] {
        app.service
            .upload(upload_request(name), content(b"x"))
            .await
            .unwrap();
    }

    let counts = app
        .service
        .file_type_counts(Some("in/"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(counts[0].file_type, "(none)");
    assert_eq!(counts[0].count, 2);
    assert_eq!(counts[1].file_type, "md");
}

#[tokio::test]
async fn test_list_files_pages_through_folder() {
    let app = setup_workflow().await;

    for name in ["e.txt", "a.txt", "d.txt", "b.txt", "c.txt"] {
        app.service
            .upload(upload_request(name), content(b"hello"))
            .await
            .unwrap();
    }
    let elsewhere = UploadRequest {
        folder: Some("out".to_string()),
        ..upload_request("z.txt")
    };
    app.service.upload(elsewhere, content(b"x")).await.unwrap();

    let items: Vec<_> = app
        .service
        .list_files(Some("in"), CancellationToken::new())
        .try_collect()
        .await
        .unwrap();
    let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"]);
    assert!(items.iter().all(|i| i.folder == "in"));
    assert!(items.iter().all(|i| i.content_length == 5));
    assert!(items.iter().all(|i| i.content_type == "text/plain"));

    let everything: Vec<_> = app
        .service
        .list_files(None, CancellationToken::new())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(everything.len(), 6);
}

#[tokio::test]
async fn test_list_files_stops_when_cancelled() {
    let app = setup_workflow().await;
    app.service
        .upload(upload_request("a.txt"), content(b"x"))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result: Result<Vec<_>, _> = app.service.list_files(None, cancel).try_collect().await;

    assert!(matches!(result, Err(AppError::Cancelled(_))));
}

#[tokio::test]
async fn test_update_status_creates_missing_record() {
    let app = setup_workflow().await;

    app.service
        .update_status("new.txt", FileProcessingStatus::Processed, Some("in"))
        .await
        .unwrap();

    let record = app
        .status_table
        .get(STATUS_PARTITION, "in:new.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.value.status, FileProcessingStatus::Processed);
    assert_eq!(record.value.folder, "out");
    assert_eq!(record.value.file_name, "new.txt");
}

#[tokio::test]
async fn test_concurrent_status_updates_conflict() {
    let inner = InMemoryStatusTable::new();
    inner
        .insert(&StatusRecord::new(
            "in:a.txt",
            "a.txt",
            "files",
            "in",
            FileProcessingStatus::Uploaded,
        ))
        .await
        .unwrap();

    let lockstep = Arc::new(LockstepStatusTable::new(Arc::new(inner.clone()), 2));
    let app = setup_workflow_with(TestOptions {
        status_table: Some(lockstep),
        ..TestOptions::default()
    })
    .await;

    let (first, second) = tokio::join!(
        app.service
            .update_status("a.txt", FileProcessingStatus::Processing, Some("in")),
        app.service
            .update_status("a.txt", FileProcessingStatus::Processed, Some("in")),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| matches!(r, Err(AppError::Conflict(_))))
            .count(),
        1
    );

    let record = inner.get(STATUS_PARTITION, "in:a.txt").await.unwrap().unwrap();
    assert_ne!(record.value.status, FileProcessingStatus::Uploaded);
}

#[tokio::test]
async fn test_audit_query_by_exact_name() {
    let app = setup_workflow().await;

    app.service
        .upload(upload_request("a.txt"), content(b"abc"))
        .await
        .unwrap();
    app.service
        .upload(upload_request("b.txt"), content(b"abc"))
        .await
        .unwrap();
    let mut sink = Vec::new();
    app.service
        .download("a.txt", Some("in"), &mut sink)
        .await
        .unwrap();

    let entries = app
        .service
        .audit(AuditQuery {
            blob_name: Some("a.txt".to_string()),
            folder: Some("in".to_string()),
            take: None,
        })
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.blob_name == "in/a.txt"));
    assert_eq!(entries[0].action, FileActionType::Download);
    assert_eq!(entries[1].action, FileActionType::Upload);
    assert!(entries[0].timestamp > entries[1].timestamp);
}

#[tokio::test]
async fn test_audit_query_by_folder_ignores_case_and_truncates() {
    let app = setup_workflow().await;

    for name in ["a.txt", "b.txt", "c.txt"] {
        app.service
            .upload(upload_request(name), content(b"abc"))
            .await
            .unwrap();
    }
    app.service
        .archive(ArchiveRequest::new("in/a.txt"), &CancellationToken::new())
        .await
        .unwrap();

    let entries = app
        .service
        .audit(AuditQuery {
            blob_name: None,
            folder: Some("IN".to_string()),
            take: Some(2),
        })
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.folder.as_deref() == Some("in")));
    assert_eq!(entries[0].blob_name, "in/c.txt");
    assert_eq!(entries[1].blob_name, "in/b.txt");

    let everything = app.service.audit(AuditQuery::default()).await.unwrap();
    assert_eq!(everything.len(), 4);
    assert_eq!(everything[0].action, FileActionType::Archive);
}

#[tokio::test]
async fn test_archive_of_folder_name_is_not_found() {
    let app = setup_workflow().await;

    app.service
        .upload(upload_request("a.txt"), content(b"abc"))
        .await
        .unwrap();
    let result = app
        .service
        .archive(ArchiveRequest::new("in"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(app.storage.exists("in/a.txt").await.unwrap());
    assert!(app
        .audit_log
        .entries()
        .await
        .iter()
        .all(|e| e.action != FileActionType::Archive));
}

#[tokio::test]
async fn test_archive_rejects_file_already_archived() {
    let app = setup_workflow().await;

    let request = UploadRequest {
        folder: Some("archive".to_string()),
        ..upload_request("x.txt")
    };
    app.service.upload(request, content(b"old")).await.unwrap();

    let result = app
        .service
        .archive(ArchiveRequest::new("archive/x.txt"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert_eq!(app.storage.download("archive/x.txt").await.unwrap(), b"old");
    assert!(app
        .audit_log
        .entries()
        .await
        .iter()
        .all(|e| e.action != FileActionType::Archive));
}

#[tokio::test]
async fn test_audit_query_by_exact_name_respects_take() {
    let app = setup_workflow().await;

    app.service
        .upload(upload_request("a.txt"), content(b"abc"))
        .await
        .unwrap();
    for _ in 0..2 {
        let mut sink = Vec::new();
        app.service
            .download("a.txt", Some("in"), &mut sink)
            .await
            .unwrap();
    }

    let entries = app
        .service
        .audit(AuditQuery {
            blob_name: Some("a.txt".to_string()),
            folder: Some("in".to_string()),
            take: Some(2),
        })
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|e| e.action == FileActionType::Download));
    assert!(entries[0].timestamp > entries[1].timestamp);
}

#[tokio::test]
async fn test_upload_folder_trailing_slash_is_normalized() {
    let mut app = setup_workflow().await;

    let request = UploadRequest {
        folder: Some("in/".to_string()),
        ..upload_request("a.txt")
    };
    let path = app.service.upload(request, content(b"abc")).await.unwrap();
    assert_eq!(path, "in/a.txt");

    let entries = app
        .service
        .audit(AuditQuery {
            blob_name: None,
            folder: Some("in".to_string()),
            take: None,
        })
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].folder.as_deref(), Some("in"));

    let message = app.queue_rx.as_mut().unwrap().try_recv().unwrap();
    let event = FileUploadedEvent::from_message(&message).unwrap();
    assert_eq!(event.folder.as_deref(), Some("in"));
}
