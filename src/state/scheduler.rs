use crate::state::partition::{Partition, PartitionKind};
use crate::state::store::{PartitionMeta, PartitionRows, Store};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures_util::StreamExt;
use futures_util::future::join_all;
use futures_util::stream;
use log::{debug, error, info, warn};
use prospect_api::client::{ApiError, ApiResult, DraftApi};
use prospect_api::{GameKey, GameRecord, Prospect, eastern_today};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One fetch per unit of work: the whole roster, or one schedule day.
pub trait SourceFetcher: Send + Sync {
    fn fetch_roster(&self) -> impl Future<Output = ApiResult<Vec<Prospect>>> + Send;
    fn fetch_schedule_day(&self, day: NaiveDate) -> impl Future<Output = ApiResult<Vec<GameRecord>>> + Send;
}

impl SourceFetcher for DraftApi {
    fn fetch_roster(&self) -> impl Future<Output = ApiResult<Vec<Prospect>>> + Send {
        DraftApi::fetch_roster(self)
    }

    fn fetch_schedule_day(&self, day: NaiveDate) -> impl Future<Output = ApiResult<Vec<GameRecord>>> + Send {
        DraftApi::fetch_schedule_day(self, day)
    }
}

/// Why a partition refresh was rejected. Prior data is kept in every case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("unexpected page structure: {0}")]
    Parse(String),
    #[error("no data")]
    EmptyResult,
    #[error("only {found} records, expected at least {minimum}")]
    Validation { found: usize, minimum: usize },
    #[error("storage: {0}")]
    Storage(String),
}

impl From<&ApiError> for RefreshError {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Parse { .. } => RefreshError::Parse(err.to_string()),
            _ => RefreshError::SourceUnavailable(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Skipped,
    Updated(usize),
    Failed(RefreshError),
}

/// Intervals, horizon and thresholds for all partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub today_interval: Duration,
    pub near_future_interval: Duration,
    pub far_future_interval: Duration,
    pub roster_interval: Duration,
    /// Minimum wait after a rejected refresh before a non-forced retry,
    /// capped at the partition's own interval.
    pub retry_backoff: Duration,
    pub horizon_days: i64,
    pub concurrency: usize,
    pub min_prospects: usize,
    /// Applied to the far-future partition only; the shorter windows can
    /// legitimately hold a handful of games.
    pub min_season_games: usize,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            today_interval: Duration::minutes(30),
            near_future_interval: Duration::hours(6),
            far_future_interval: Duration::hours(24),
            roster_interval: Duration::hours(24),
            retry_backoff: Duration::minutes(15),
            horizon_days: 98,
            concurrency: 10,
            min_prospects: 30,
            min_season_games: 100,
        }
    }
}

impl RefreshPolicy {
    pub fn partition(&self, kind: PartitionKind) -> Partition {
        let refresh_interval = match kind {
            PartitionKind::Today => self.today_interval,
            PartitionKind::NearFuture => self.near_future_interval,
            PartitionKind::FarFuture => self.far_future_interval,
            PartitionKind::Roster => self.roster_interval,
        };
        Partition { kind, refresh_interval, horizon_days: self.horizon_days }
    }

    fn minimum_rows(&self, kind: PartitionKind) -> usize {
        match kind {
            PartitionKind::Roster => self.min_prospects,
            PartitionKind::FarFuture => self.min_season_games,
            _ => 0,
        }
    }
}

/// Refreshes partitions independently. Refreshes of the same partition are
/// serialized; different partitions run without coordination.
pub struct TieredScheduler<F> {
    fetcher: F,
    store: Arc<Store>,
    policy: RefreshPolicy,
    locks: [Mutex<()>; 4],
}

impl<F: SourceFetcher> TieredScheduler<F> {
    pub fn new(fetcher: F, store: Arc<Store>, policy: RefreshPolicy) -> Self {
        Self { fetcher, store, policy, locks: Default::default() }
    }

    pub async fn refresh_if_stale(&self, kind: PartitionKind, now: DateTime<Utc>) -> RefreshOutcome {
        self.refresh(kind, now, false).await
    }

    /// Refresh regardless of staleness.
    pub async fn force_refresh(&self, kind: PartitionKind, now: DateTime<Utc>) -> RefreshOutcome {
        self.refresh(kind, now, true).await
    }

    /// Run several partitions concurrently. Outcomes are in input order.
    pub async fn refresh_all(
        &self,
        kinds: &[PartitionKind],
        now: DateTime<Utc>,
        force: bool,
    ) -> Vec<(PartitionKind, RefreshOutcome)> {
        let outcomes = join_all(kinds.iter().map(|kind| self.refresh(*kind, now, force))).await;
        kinds.iter().copied().zip(outcomes).collect()
    }

    async fn refresh(&self, kind: PartitionKind, now: DateTime<Utc>, force: bool) -> RefreshOutcome {
        // Staleness is read under the lock so a queued duplicate sees the
        // timestamp written by the refresh it waited on.
        let _guard = self.locks[kind as usize].lock().await;
        let partition = self.policy.partition(kind);

        let meta = match self.store.metadata() {
            Ok(meta) => meta.partition(kind),
            Err(e) => return self.fail(kind, RefreshError::Storage(e.to_string()), now),
        };
        if !force {
            let last = meta.last_refreshed_at;
            if !partition.is_stale(last, now) {
                debug!("{kind}: fresh (last refreshed {last:?})");
                return RefreshOutcome::Skipped;
            }
            if let Some(retry_at) = self.retry_at(&partition, &meta).filter(|at| now < *at) {
                debug!("{kind}: last attempt failed, next retry after {retry_at}");
                return RefreshOutcome::Skipped;
            }
        }

        let fetched = match kind {
            PartitionKind::Roster => self.fetch_roster().await,
            _ => self.fetch_schedule(&partition, eastern_today(now)).await,
        };

        let rows = match fetched.and_then(|rows| self.validate(kind, rows)) {
            Ok(rows) => rows,
            Err(e) => return self.fail(kind, e, now),
        };

        let count = rows.len();
        match self.store.replace_partition(kind, &rows, now) {
            Ok(()) => {
                info!("{kind}: updated with {count} records");
                RefreshOutcome::Updated(count)
            }
            Err(e) => self.fail(kind, RefreshError::Storage(e.to_string()), now),
        }
    }

    /// Earliest time a stale partition whose last attempt was rejected may be
    /// retried without `force`.
    fn retry_at(&self, partition: &Partition, meta: &PartitionMeta) -> Option<DateTime<Utc>> {
        meta.last_error.as_ref()?;
        let backoff = self.policy.retry_backoff.min(partition.refresh_interval);
        meta.last_attempt_at.map(|at| at + backoff)
    }

    fn fail(&self, kind: PartitionKind, err: RefreshError, now: DateTime<Utc>) -> RefreshOutcome {
        warn!("{kind}: refresh rejected: {err}");
        if let Err(e) = self.store.record_failure(kind, &err.to_string(), now) {
            warn!("{kind}: could not record failure: {e}");
        }
        RefreshOutcome::Failed(err)
    }

    fn validate(&self, kind: PartitionKind, rows: PartitionRows) -> Result<PartitionRows, RefreshError> {
        if rows.is_empty() {
            return Err(RefreshError::EmptyResult);
        }
        let found = rows.len();
        let minimum = self.policy.minimum_rows(kind);
        if found < minimum {
            return Err(RefreshError::Validation { found, minimum });
        }
        Ok(rows)
    }

    async fn fetch_roster(&self) -> Result<PartitionRows, RefreshError> {
        let prospects = self.fetcher.fetch_roster().await.map_err(|e| {
            if !e.is_transient() {
                error!("roster: {e}");
            }
            RefreshError::from(&e)
        })?;
        Ok(PartitionRows::Prospects(prospects))
    }

    /// Fetch every day of the partition's current range on a bounded pool.
    ///
    /// A failed day is dropped rather than failing the partition; whatever
    /// the previous version of this partition held for that day is carried
    /// forward. Only when every day fails is the refresh rejected.
    async fn fetch_schedule(&self, partition: &Partition, today: NaiveDate) -> Result<PartitionRows, RefreshError> {
        let Some(range) = partition.date_range(today) else {
            return Err(RefreshError::EmptyResult);
        };
        let days = range.days();
        let kind = partition.kind;

        let results: Vec<(NaiveDate, ApiResult<Vec<GameRecord>>)> = stream::iter(days.iter().copied())
            .map(|day| async move { (day, self.fetcher.fetch_schedule_day(day).await) })
            .buffer_unordered(self.policy.concurrency.max(1))
            .collect()
            .await;

        let mut merged: BTreeMap<GameKey, GameRecord> = BTreeMap::new();
        let mut failed_days = BTreeSet::new();
        let mut first_error = None;
        for (day, result) in results {
            match result {
                Ok(games) => {
                    debug!("{kind}: {day} returned {} games", games.len());
                    for game in games {
                        merged.entry(game.key()).or_insert(game);
                    }
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!("{kind}: dropping {day}: {e}");
                    } else {
                        error!("{kind}: dropping {day}, not retryable: {e}");
                    }
                    first_error.get_or_insert_with(|| RefreshError::from(&e));
                    failed_days.insert(day);
                }
            }
        }

        if failed_days.len() == days.len() {
            return Err(first_error.unwrap_or(RefreshError::EmptyResult));
        }

        if !failed_days.is_empty() {
            let carried = self.previous_games(kind, &failed_days);
            debug!("{kind}: carrying {} games forward for {} failed days", carried.len(), failed_days.len());
            for game in carried {
                merged.entry(game.key()).or_insert(game);
            }
        }

        Ok(PartitionRows::Games { range, games: merged.into_values().collect() })
    }

    fn previous_games(&self, kind: PartitionKind, days: &BTreeSet<NaiveDate>) -> Vec<GameRecord> {
        match self.store.load_partition(kind) {
            Ok((PartitionRows::Games { games, .. }, _)) => games.into_iter().filter(|g| days.contains(&g.date)).collect(),
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!("{kind}: previous rows unavailable: {e}");
                Vec::new()
            }
        }
    }
}
