mod jira;
mod scheduler;
mod trigger;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use strata_config::{init_tracing, AppConfig, SchedulerConfig};
use strata_db::jira::pg_repository::PgJiraRepository;
use strata_db::sync::pg_repository::PgSyncRepository;

use crate::jira::client::{JiraClient, JiraClientConfig};
use crate::jira::orchestrator::SyncOrchestrator;
use crate::scheduler::Scheduler;
use crate::trigger::SyncTriggers;

#[derive(Debug, Parser)]
#[command(name = "strata-ingest", version, about = "Mirror Jira boards, sprints and issues into Postgres")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the scheduler until interrupted (default)
    Serve,
    /// Run one full synchronization and exit
    Sync,
    /// Refresh board metadata only and exit
    SyncBoards,
    /// Synchronize sprints and issues of one board and exit
    SyncBoard {
        /// Jira board id
        #[arg(long)]
        board_id: i64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config = AppConfig::from_env()?;
    init_tracing(&app_config.log_level);
    let scheduler_config = SchedulerConfig::from_env()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(scheduler_config.worker_threads)
        .thread_name("strata-sync")
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run(cli, app_config, scheduler_config))
}

async fn run(
    cli: Cli,
    app_config: AppConfig,
    scheduler_config: SchedulerConfig,
) -> anyhow::Result<()> {
    tracing::info!(service = "strata-ingest", "starting");

    let jira_config = JiraClientConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("jira configuration error")?
        .context("JIRA_BASE_URL is not set, nothing to synchronize")?;
    tracing::info!(base_url = %jira_config.base_url, credential = ?jira_config.credential, "jira connector configured");

    let pool = strata_db::create_pool(&app_config.database_url, app_config.db_max_connections)
        .await
        .context("failed to connect to database")?;
    strata_db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let client = Arc::new(JiraClient::new(jira_config).context("failed to create jira client")?);
    let store = Arc::new(PgJiraRepository::new(pool.clone()));
    let ledger = PgSyncRepository::new(pool);
    let orchestrator = Arc::new(SyncOrchestrator::new(client, store, ledger));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let scheduler = Scheduler::start(orchestrator, &scheduler_config);
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
            tracing::info!("shutdown signal received");
            scheduler.shutdown();
        }
        Command::Sync => {
            let summary = orchestrator.run_full_sync().await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if !summary.success {
                anyhow::bail!(summary.message);
            }
        }
        Command::SyncBoards => {
            let boards = orchestrator.run_board_only_sync().await;
            println!("{}", serde_json::json!({ "boardCount": boards }));
        }
        Command::SyncBoard { board_id } => {
            let summary = orchestrator.run_sync_for_board(board_id).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if !summary.success {
                anyhow::bail!(summary.message);
            }
        }
    }

    tracing::info!("ingest service finished");
    Ok(())
}
