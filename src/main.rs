mod state;

use crate::state::app_settings::AppSettings;
use crate::state::messages::{RefreshRequest, RefreshResponse};
use crate::state::partition::PartitionKind;
use crate::state::refresher::PeriodicRefresher;
use crate::state::scheduler::{RefreshOutcome, TieredScheduler};
use crate::state::snapshot::Snapshot;
use crate::state::store::Store;
use crate::state::worker::RefreshWorker;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use prospect_api::client::DraftApi;
use prospect_api::merge;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "prospect-watch", version)]
#[command(about = "Track NCAA games featuring top NBA draft prospects", long_about = None)]
struct Cli {
    /// Data directory (overrides PROSPECT_WATCH_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh stale partitions once and exit (for cron)
    Refresh {
        #[arg(long, value_enum, default_value_t = PartitionArg::All)]
        partition: PartitionArg,
        /// Refresh even if the partition is still fresh
        #[arg(long)]
        force: bool,
    },
    /// Stay running and refresh partitions as they go stale
    Watch,
    /// Print per-partition freshness as JSON
    Status,
    /// Print a merged view of the persisted data as JSON
    Show {
        #[arg(value_enum)]
        view: View,
        /// Restrict game views to one date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PartitionArg {
    Today,
    NearFuture,
    FarFuture,
    Roster,
    All,
}

impl PartitionArg {
    fn kinds(self) -> Vec<PartitionKind> {
        match self {
            PartitionArg::Today => vec![PartitionKind::Today],
            PartitionArg::NearFuture => vec![PartitionKind::NearFuture],
            PartitionArg::FarFuture => vec![PartitionKind::FarFuture],
            PartitionArg::Roster => vec![PartitionKind::Roster],
            PartitionArg::All => PartitionKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    Board,
    Matchups,
    Games,
    Schools,
}

#[derive(Debug, Serialize)]
struct OutcomeReport {
    partition: PartitionKind,
    outcome: &'static str,
    records: Option<usize>,
    error: Option<String>,
}

impl OutcomeReport {
    fn new(partition: PartitionKind, outcome: &RefreshOutcome) -> Self {
        let (label, records, error) = match outcome {
            RefreshOutcome::Skipped => ("skipped", None, None),
            RefreshOutcome::Updated(n) => ("updated", Some(*n), None),
            RefreshOutcome::Failed(e) => ("failed", None, Some(e.to_string())),
        };
        Self { partition, outcome: label, records, error }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    better_panic::install();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    let mut settings = AppSettings::load();
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    let store = Arc::new(Store::open(&settings.data_dir, settings.backups)?);

    match cli.command {
        Commands::Refresh { partition, force } => refresh_once(&settings, store, partition.kinds(), force).await,
        Commands::Watch => watch(&settings, store).await,
        Commands::Status => print_status(&settings, &store),
        Commands::Show { view, date } => print_view(&settings, &store, view, date),
    }
}

fn build_scheduler(settings: &AppSettings, store: Arc<Store>) -> TieredScheduler<DraftApi> {
    let api = DraftApi::new()
        .with_urls(settings.draft_url.clone(), settings.schedule_url.clone())
        .with_timeout(settings.timeout);
    TieredScheduler::new(api, store, settings.policy.clone())
}

async fn refresh_once(
    settings: &AppSettings,
    store: Arc<Store>,
    kinds: Vec<PartitionKind>,
    force: bool,
) -> anyhow::Result<()> {
    let scheduler = build_scheduler(settings, store);
    let outcomes = scheduler.refresh_all(&kinds, Utc::now(), force).await;

    let reports: Vec<OutcomeReport> = outcomes.iter().map(|(k, o)| OutcomeReport::new(*k, o)).collect();
    println!("{}", serde_json::to_string_pretty(&reports)?);

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} partition refreshes failed", reports.len());
    }
    Ok(())
}

async fn watch(settings: &AppSettings, store: Arc<Store>) -> anyhow::Result<()> {
    let scheduler = Arc::new(build_scheduler(settings, store));

    let (refresh_req_tx, refresh_req_rx) = mpsc::channel::<RefreshRequest>(100);
    let (refresh_resp_tx, mut refresh_resp_rx) = mpsc::channel::<RefreshResponse>(100);

    let worker = RefreshWorker::new(scheduler, refresh_req_rx, refresh_resp_tx);
    let worker_task = tokio::spawn(worker.run());

    let periodic_refresher = PeriodicRefresher::new(refresh_req_tx.clone(), settings.tick);
    let periodic_task = tokio::spawn(periodic_refresher.run());

    // Catch up on anything that went stale while we were not running.
    refresh_req_tx
        .send(RefreshRequest::Refresh { partitions: PartitionKind::ALL.to_vec(), force: false })
        .await?;
    info!("watching {} (tick every {:?})", settings.data_dir.display(), settings.tick);

    loop {
        tokio::select! {
            response = refresh_resp_rx.recv() => match response {
                Some(RefreshResponse::Completed { outcomes }) => log_outcomes(&outcomes),
                None => {
                    warn!("refresh worker stopped");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    periodic_task.abort();
    worker_task.abort();
    Ok(())
}

fn log_outcomes(outcomes: &[(PartitionKind, RefreshOutcome)]) {
    for (kind, outcome) in outcomes {
        match outcome {
            RefreshOutcome::Skipped => log::debug!("{kind}: fresh"),
            RefreshOutcome::Updated(n) => info!("{kind}: {n} records"),
            RefreshOutcome::Failed(e) => warn!("{kind}: kept previous data ({e})"),
        }
    }
}

fn print_status(settings: &AppSettings, store: &Store) -> anyhow::Result<()> {
    let snapshot = Snapshot::load(store, &settings.policy, Utc::now());
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn print_view(settings: &AppSettings, store: &Store, view: View, date: Option<NaiveDate>) -> anyhow::Result<()> {
    let snapshot = Snapshot::load(store, &settings.policy, Utc::now());
    if snapshot.is_degraded() {
        warn!("showing possibly stale data; run `prospect-watch status` for details");
    }

    let json = match view {
        View::Board => serde_json::to_string_pretty(&snapshot.draft_board())?,
        View::Matchups => serde_json::to_string_pretty(&on_date(&snapshot.super_matchups(), date))?,
        View::Games => serde_json::to_string_pretty(&merge::group_by_date(on_date(&snapshot.games_by_date(), date)))?,
        View::Schools => serde_json::to_string_pretty(&snapshot.school_counts())?,
    };
    println!("{json}");
    Ok(())
}

fn on_date(rows: &[merge::GameWithPlayers], date: Option<NaiveDate>) -> Vec<&merge::GameWithPlayers> {
    match date {
        Some(day) => merge::games_on(rows, day),
        None => rows.iter().collect(),
    }
}
