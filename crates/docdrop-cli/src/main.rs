//! docdrop: upload a file through a signed URL and browse upload records.
//!
//! Configuration comes from the environment (or `.env`); see `DOCDROP_API_URL`,
//! `DOCDROP_AUTH_MODE`, `DOCDROP_API_KEY`, `DOCDROP_TOKEN` and `DOCDROP_RECORDS`.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use docdrop_cli::{build_workflow, format_record_table, init_tracing, load_selection, record_store};
use docdrop_core::{ClientConfig, RecordStore, UploadRecord};
use docdrop_services::RecordFeedObserver;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docdrop", about = "Direct-to-storage uploads via signed URLs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Content type to send (guessed from the extension by default)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// List recent uploads, most recent first
    List {
        /// Maximum number of records
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Follow the upload records until interrupted
    Watch {
        /// Maximum number of records
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn print_records(records: &[UploadRecord], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let out = serde_json::to_string_pretty(records).context("Serialize records")?;
            println!("{}", out);
        }
        OutputFormat::Table => print!("{}", format_record_table(records)),
    }
    Ok(())
}

async fn require_store(config: &ClientConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    record_store(config)
        .await?
        .context("No record store configured. Set DOCDROP_RECORDS=postgres (or memory)")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Upload { file, content_type } => {
            let selection = load_selection(&file, content_type.as_deref()).await?;
            let workflow = build_workflow(&config).await?;

            let mut progress = workflow.subscribe_status();
            let reporter = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let status = progress.borrow_and_update().clone();
                    if !status.is_terminal() && !status.to_string().is_empty() {
                        eprintln!("{}", status);
                    }
                }
            });

            workflow.select_file(selection);
            let status = workflow.submit_upload().await;
            workflow.shutdown();
            reporter.abort();

            println!("{}", status);
            if let Some(reason) = status.failure_reason() {
                anyhow::bail!("Upload failed: {}", reason);
            }
        }
        Commands::List { limit, format } => {
            let store = require_store(&config).await?;
            let records = store
                .list_recent(limit.unwrap_or(config.record_feed_limit))
                .await
                .context("Failed to list upload records")?;
            print_records(&records, format)?;
        }
        Commands::Watch { limit } => {
            let store = require_store(&config).await?;
            let observer =
                RecordFeedObserver::spawn(store, limit.unwrap_or(config.record_feed_limit));
            let mut snapshots = observer.subscribe();

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let records = snapshots.borrow_and_update().clone();
                        print_records(&records, OutputFormat::Table)?;
                        println!();
                    }
                }
            }

            observer.shutdown();
        }
    }

    Ok(())
}
