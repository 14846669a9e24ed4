//! Fileflow CLI: drive the file workflow engine from the command line.
//!
//! Backends come from the environment (see `Config::from_env`); a `.env` file is honored.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fileflow_cli::{
    build_service, cancel_on_ctrl_c, error_report, parse_status, print_json, upload_name,
};
use fileflow_core::models::{ArchiveRequest, AuditQuery, UploadRequest};
use fileflow_core::Config;
use fileflow_infra::init_telemetry;
use fileflow_services::FileWorkflowService;
use futures::TryStreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Parser)]
#[command(name = "fileflow", about = "File workflow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file
    Upload {
        /// Path to the file to upload
        path: PathBuf,
        /// Name to store the file under (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,
        /// Target folder (defaults to the inbound folder)
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        correlation_id: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Download a file to disk or stdout
    Download {
        blob: String,
        #[arg(long)]
        folder: Option<String>,
        /// Write here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Move a file into the archive folder
    Archive {
        blob: String,
        #[arg(long)]
        from_folder: Option<String>,
        #[arg(long)]
        correlation_id: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Set the processing status of a file
    Status {
        blob: String,
        /// Initial, Uploaded, Processing, Processed or Archived
        status: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// List files, optionally under one folder
    List {
        #[arg(long)]
        folder: Option<String>,
    },
    /// Count files by extension
    TypeCounts {
        #[arg(long)]
        folder: Option<String>,
    },
    /// Query the audit log, newest first
    Audit {
        #[arg(long)]
        blob: Option<String>,
        #[arg(long)]
        folder: Option<String>,
        /// Maximum number of entries
        #[arg(long)]
        take: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", error_report(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_telemetry(config.log_json, &config.environment)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let service = build_service(&config).await?;

    match cli.command {
        Commands::Upload {
            path,
            name,
            folder,
            content_type,
            correlation_id,
            comment,
        } => {
            let file_name = upload_name(&path, name)?;
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let length = file.metadata().await?.len();

            service
                .config()
                .validator()
                .validate(&file_name, content_type.as_deref(), length)
                .map_err(fileflow_core::AppError::from)?;

            let request = UploadRequest {
                folder,
                content_type,
                correlation_id,
                comment,
                ..UploadRequest::new(file_name)
            };
            let stored = service.upload(request, Box::pin(file)).await?;
            print_json(&serde_json::json!({ "path": stored, "size_bytes": length }))?;
        }
        Commands::Download {
            blob,
            folder,
            output,
        } => download(&service, &blob, folder.as_deref(), output).await?,
        Commands::Archive {
            blob,
            from_folder,
            correlation_id,
            comment,
        } => {
            let cancel = cancel_on_ctrl_c();
            let request = ArchiveRequest {
                from_folder,
                correlation_id,
                comment,
                ..ArchiveRequest::new(blob)
            };
            let destination = service.archive(request, &cancel).await?;
            print_json(&serde_json::json!({ "path": destination }))?;
        }
        Commands::Status {
            blob,
            status,
            folder,
        } => {
            let status = parse_status(&status)?;
            service
                .update_status(&blob, status, folder.as_deref())
                .await?;
            print_json(&serde_json::json!({ "blob": blob, "status": status.to_string() }))?;
        }
        Commands::List { folder } => {
            let items: Vec<_> = service
                .list_files(folder.as_deref(), cancel_on_ctrl_c())
                .try_collect()
                .await?;
            print_json(&items)?;
        }
        Commands::TypeCounts { folder } => {
            let counts = service
                .file_type_counts(folder.as_deref(), cancel_on_ctrl_c())
                .await?;
            print_json(&counts)?;
        }
        Commands::Audit { blob, folder, take } => {
            let entries = service
                .audit(AuditQuery {
                    blob_name: blob,
                    folder,
                    take,
                })
                .await?;
            print_json(&entries)?;
        }
    }

    Ok(())
}

async fn download(
    service: &FileWorkflowService,
    blob: &str,
    folder: Option<&str>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut sink: Box<dyn AsyncWrite + Unpin + Send> = match &output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let written = service.download(blob, folder, &mut *sink).await?;
    sink.flush().await?;

    // Keep stdout clean when it carries the file itself.
    if let Some(path) = output {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "size_bytes": written,
        }))?;
    }
    Ok(())
}
