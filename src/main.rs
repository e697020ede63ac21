use anyhow::Context;
use bridge_http::ReqwestHttpClient;
use bridge_traits::NullNotifier;
use clap::{Parser, Subcommand};
use core_ingest::{CsvWorkbookReader, SpreadsheetIngestor, DEFAULT_SHEET_CANDIDATES};
use core_sync::{
    ChangeSyncEngine, EngineOptions, EventCursor, FileCursorStore, JobPoller, RunPostProcessor,
    SyncError, TracingObserver, UploadOrchestrator,
};
use provider_datavault::DataVaultConnector;
use provider_filecloud::FileCloudConnector;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vaultsync", version, about = "Assay file to vault sync pipeline")]
struct Cli {
    /// File-storage API domain (e.g. files.example.com)
    #[arg(long, env = "STORAGE_DOMAIN")]
    storage_domain: String,

    /// File-storage API access token
    #[arg(long, env = "STORAGE_TOKEN", hide_env_values = true)]
    storage_token: String,

    /// Vault API base URL, up to and excluding the vault id
    #[arg(long, env = "VAULT_BASE_URL")]
    vault_base_url: String,

    /// Vault id
    #[arg(long, env = "VAULT_ID")]
    vault_id: String,

    /// Vault API token
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    vault_token: String,

    /// Vault project submissions are filed under
    #[arg(long, env = "VAULT_PROJECT")]
    project: String,

    /// Custom-metadata namespace carrying pipeline state
    #[arg(long, default_value = core_sync::DEFAULT_NAMESPACE)]
    namespace: String,

    /// Report changes and validation without submitting or writing back
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run sync passes over the change feed
    Sync {
        /// Folder the change feed is scoped to
        #[arg(long, default_value = "/Shared")]
        base_folder: String,

        /// Path of the persisted event cursor file
        #[arg(long, default_value = "vaultsync.cursor")]
        cursor_path: String,

        /// Events fetched per feed request
        #[arg(long, default_value_t = core_sync::DEFAULT_PAGE_SIZE)]
        page_size: u32,

        /// Repeat the pass every N seconds instead of running once
        #[arg(long)]
        every: Option<u64>,
    },
    /// Post-process completed vault runs (attach sources, mark processed)
    ProcessRuns {
        /// Hours of run history to consider
        #[arg(long, default_value_t = core_sync::DEFAULT_RUN_LOOKBACK_HOURS)]
        lookback_hours: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let http = Arc::new(ReqwestHttpClient::new().context("building HTTP client")?);
    let storage = Arc::new(
        FileCloudConnector::new(http.clone(), &cli.storage_domain, &cli.storage_token)
            .with_correlation_section(&cli.namespace, core_sync::metadata::CORRELATION_ID_KEY),
    );
    let vault = Arc::new(DataVaultConnector::new(
        http,
        &cli.vault_base_url,
        &cli.vault_id,
        &cli.vault_token,
    ));

    let token = CancellationToken::new();
    spawn_signal_handler(token.clone());

    match cli.command {
        Commands::Sync {
            base_folder,
            cursor_path,
            page_size,
            every,
        } => {
            let reader = Arc::new(CsvWorkbookReader::new(DEFAULT_SHEET_CANDIDATES[0]));
            let ingestor = SpreadsheetIngestor::new(storage.clone(), reader);
            let uploader = UploadOrchestrator::new(
                vault.clone(),
                storage.clone(),
                JobPoller::default(),
                &cli.project,
                &cli.namespace,
                cli.dry_run,
            );
            let cursor = EventCursor::load(Arc::new(FileCursorStore::new(&cursor_path))).await;
            let mut engine = ChangeSyncEngine::new(
                storage.clone(),
                storage.clone(),
                vault,
                ingestor,
                uploader,
                cursor,
                Arc::new(TracingObserver::default()),
                EngineOptions {
                    base_folder,
                    namespace: cli.namespace.clone(),
                    page_size,
                    dry_run: cli.dry_run,
                },
            );

            loop {
                match engine.run_pass(&token).await {
                    Ok(report) => {
                        info!(
                            events = report.events_seen,
                            ingested = report.files_ingested,
                            skipped = report.files_skipped,
                            submitted = report.groups_submitted,
                            failures = report.failures.len(),
                            through = ?report.through_event_id,
                            "sync pass finished"
                        );
                        for failure in &report.failures {
                            warn!(scope = %failure.scope, "{}", failure.message);
                        }
                    }
                    Err(SyncError::Cancelled) => {
                        info!("sync cancelled, exiting");
                        break;
                    }
                    Err(e) => {
                        // A pass-level error (feed or cursor) is fatal for a
                        // one-shot run but only skips an iteration in loop
                        // mode; the next pass replays the window.
                        if every.is_none() {
                            return Err(e.into());
                        }
                        error!("sync pass failed: {}", e);
                    }
                }

                let Some(secs) = every else { break };
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                }
            }
        }
        Commands::ProcessRuns { lookback_hours } => {
            let processor = RunPostProcessor::new(
                vault,
                storage.clone(),
                storage,
                Arc::new(NullNotifier),
                &cli.project,
                &cli.namespace,
                cli.dry_run,
            )
            .with_lookback(chrono::Duration::hours(lookback_hours));

            let report = processor.process_runs().await?;
            info!(
                runs_seen = report.runs_seen,
                runs_processed = report.runs_processed,
                files_attached = report.files_attached,
                "run post-processing finished"
            );
        }
    }

    Ok(())
}

fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install SIGINT handler: {}", e);
            return;
        }
        info!("shutdown requested");
        token.cancel();
    });
}
