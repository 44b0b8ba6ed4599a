use crate::state::partition::{DateRange, PartitionKind};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};
use prospect_api::{GameRecord, Prospect};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub const SCHEMA_VERSION: u32 = 1;

const METADATA_FILE: &str = "metadata.json";
const PROSPECTS_FILE: &str = "prospects.json";
const GAMES_DIR: &str = "games";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unreadable data in {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("data written by a newer version (schema {found}, this build reads {})", SCHEMA_VERSION)]
    Schema { found: u32 },
}

pub type StoreResult<T> = Result<T, StoreError>;

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io { path: path.to_owned(), source }
}

// ---------------------------------------------------------------------------
// On-disk records
// ---------------------------------------------------------------------------

/// Freshness bookkeeping for one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMeta {
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub record_count: usize,
    pub range: Option<DateRange>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Reason the most recent attempt was rejected; cleared on success.
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub schema_version: u32,
    #[serde(default)]
    pub partitions: BTreeMap<PartitionKind, PartitionMeta>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self { schema_version: SCHEMA_VERSION, partitions: BTreeMap::new() }
    }
}

impl Metadata {
    pub fn partition(&self, kind: PartitionKind) -> PartitionMeta {
        self.partitions.get(&kind).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScheduleFile {
    range: DateRange,
    refreshed_at: DateTime<Utc>,
    games: Vec<GameRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RosterFile {
    refreshed_at: DateTime<Utc>,
    prospects: Vec<Prospect>,
}

/// Rows owned by one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionRows {
    Games { range: DateRange, games: Vec<GameRecord> },
    Prospects(Vec<Prospect>),
}

impl PartitionRows {
    pub fn len(&self) -> usize {
        match self {
            PartitionRows::Games { games, .. } => games.len(),
            PartitionRows::Prospects(prospects) => prospects.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn range(&self) -> Option<DateRange> {
        match self {
            PartitionRows::Games { range, .. } => Some(*range),
            PartitionRows::Prospects(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// JSON files under one data directory.
///
/// Each partition owns its own data file, so writers of different partitions
/// never touch the same path. The shared metadata file is the only contended
/// resource and is updated under `meta_lock`. Every file is replaced by
/// write-to-temp + rename, so readers see either the old or the new version.
#[derive(Debug)]
pub struct Store {
    root: PathBuf,
    backups: bool,
    meta_lock: Mutex<()>,
}

impl Store {
    pub fn open(root: impl Into<PathBuf>, backups: bool) -> StoreResult<Self> {
        let root = root.into();
        let games = root.join(GAMES_DIR);
        fs::create_dir_all(&games).map_err(io_err(&games))?;
        Ok(Self { root, backups, meta_lock: Mutex::new(()) })
    }

    fn partition_path(&self, kind: PartitionKind) -> PathBuf {
        match kind {
            PartitionKind::Roster => self.root.join(PROSPECTS_FILE),
            schedule => self.root.join(GAMES_DIR).join(format!("{}.json", schedule.as_str())),
        }
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn metadata(&self) -> StoreResult<Metadata> {
        let meta: Metadata = read_json(&self.metadata_path())?.unwrap_or_default();
        if meta.schema_version > SCHEMA_VERSION {
            return Err(StoreError::Schema { found: meta.schema_version });
        }
        Ok(meta)
    }

    fn update_metadata(&self, kind: PartitionKind, apply: impl FnOnce(&mut PartitionMeta)) -> StoreResult<()> {
        let _guard = self.meta_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut meta = self.metadata()?;
        meta.schema_version = SCHEMA_VERSION;
        apply(meta.partitions.entry(kind).or_default());
        write_json(&self.metadata_path(), &meta, self.backups)
    }

    /// Rows of one partition plus its last successful refresh time.
    pub fn load_partition(&self, kind: PartitionKind) -> StoreResult<(PartitionRows, Option<DateTime<Utc>>)> {
        let last = self.metadata()?.partition(kind).last_refreshed_at;
        let path = self.partition_path(kind);
        let rows = match kind {
            PartitionKind::Roster => {
                let file: Option<RosterFile> = read_json(&path)?;
                PartitionRows::Prospects(file.map(|f| f.prospects).unwrap_or_default())
            }
            _ => match read_json::<ScheduleFile>(&path)? {
                Some(file) => PartitionRows::Games { range: file.range, games: file.games },
                None => PartitionRows::Games { range: empty_range(), games: Vec::new() },
            },
        };
        Ok((rows, last))
    }

    /// Atomically replace one partition's rows and stamp its metadata.
    pub fn replace_partition(
        &self,
        kind: PartitionKind,
        rows: &PartitionRows,
        refreshed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let path = self.partition_path(kind);
        match rows {
            PartitionRows::Prospects(prospects) => {
                let file = RosterFile { refreshed_at, prospects: prospects.clone() };
                write_json(&path, &file, self.backups)?;
            }
            PartitionRows::Games { range, games } => {
                let file = ScheduleFile { range: *range, refreshed_at, games: games.clone() };
                write_json(&path, &file, self.backups)?;
            }
        }

        let count = rows.len();
        let range = rows.range();
        self.update_metadata(kind, |meta| {
            meta.last_refreshed_at = Some(refreshed_at);
            meta.last_attempt_at = Some(refreshed_at);
            meta.record_count = count;
            meta.range = range;
            meta.last_error = None;
        })?;
        debug!("{kind}: stored {count} rows at {}", path.display());
        Ok(())
    }

    /// Note a rejected refresh without touching the partition's data or its
    /// last successful refresh time.
    pub fn record_failure(&self, kind: PartitionKind, reason: &str, attempted_at: DateTime<Utc>) -> StoreResult<()> {
        self.update_metadata(kind, |meta| {
            meta.last_attempt_at = Some(attempted_at);
            meta.last_error = Some(reason.to_owned());
        })
    }

    pub fn load_roster(&self) -> StoreResult<(Vec<Prospect>, Option<DateTime<Utc>>)> {
        match self.load_partition(PartitionKind::Roster)? {
            (PartitionRows::Prospects(prospects), last) => Ok((prospects, last)),
            (PartitionRows::Games { .. }, last) => Ok((Vec::new(), last)),
        }
    }

    /// All persisted games from `today` on.
    ///
    /// Partition ranges slide daily, so two files can both claim a date (e.g.
    /// yesterday's near-future file and today's today file). Each date is read
    /// from the most recently refreshed file whose stored range covers it.
    pub fn load_schedule(&self, today: NaiveDate) -> StoreResult<Vec<GameRecord>> {
        let mut files = Vec::new();
        for kind in PartitionKind::SCHEDULE {
            if let Some(file) = read_json::<ScheduleFile>(&self.partition_path(kind))? {
                files.push(file);
            }
        }
        files.sort_by(|a, b| b.refreshed_at.cmp(&a.refreshed_at));

        let mut claimed: Vec<DateRange> = Vec::new();
        let mut games = Vec::new();
        for file in files {
            games.extend(file.games.into_iter().filter(|g| {
                g.date >= today && file.range.contains(g.date) && !claimed.iter().any(|r| r.contains(g.date))
            }));
            claimed.push(file.range);
        }
        games.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(games)
    }
}

fn empty_range() -> DateRange {
    DateRange { start: NaiveDate::MAX, end: NaiveDate::MIN }
}

// ---------------------------------------------------------------------------
// File primitives
// ---------------------------------------------------------------------------

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// Read and decode `path`; `None` when it does not exist. A file that fails to
/// decode is replaced by its backup when the backup decodes.
fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path)(e)),
    };

    match serde_json::from_str(&text) {
        Ok(value) => Ok(Some(value)),
        Err(source) => {
            let bak = backup_path(path);
            let recovered = fs::read_to_string(&bak)
                .ok()
                .and_then(|text| serde_json::from_str(&text).ok());
            match recovered {
                Some(value) => {
                    warn!("{} is unreadable ({source}); using {}", path.display(), bak.display());
                    Ok(Some(value))
                }
                None => Err(StoreError::Corrupt { path: path.to_owned(), source }),
            }
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T, backup: bool) -> StoreResult<()> {
    let payload = serde_json::to_vec_pretty(value)
        .map_err(|source| StoreError::Corrupt { path: path.to_owned(), source })?;
    if backup {
        backup_existing(path)?;
    }
    write_atomic(path, &payload)
}

fn backup_existing(path: &Path) -> StoreResult<()> {
    match fs::copy(path, backup_path(path)) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(path)(e)),
    }
}

fn write_atomic(path: &Path, payload: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp = path.with_file_name(format!(
        ".{name}.{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let written = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(payload)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp, path));

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(path)(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, TimeZone};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, day).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 8, hour, 0, 0).unwrap()
    }

    fn game(day: u32, away: &str, home: &str) -> GameRecord {
        GameRecord { date: d(day), away: away.into(), home: home.into(), time: "7:00 PM".into(), tv: String::new() }
    }

    fn games(range: DateRange, rows: Vec<GameRecord>) -> PartitionRows {
        PartitionRows::Games { range, games: rows }
    }

    fn range(start: u32, end: u32) -> DateRange {
        DateRange { start: d(start), end: d(end) }
    }

    #[test]
    fn replace_then_load_round_trips_with_timestamp() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), true).unwrap();
        let rows = games(range(8, 8), vec![game(8, "Kansas", "Duke")]);

        store.replace_partition(PartitionKind::Today, &rows, at(12)).unwrap();

        let (loaded, last) = store.load_partition(PartitionKind::Today).unwrap();
        assert_eq!(loaded, rows);
        assert_eq!(last, Some(at(12)));
        let meta = store.metadata().unwrap();
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert_eq!(meta.partition(PartitionKind::Today).record_count, 1);
    }

    #[test]
    fn metadata_survives_reopening() {
        let dir = tempdir().unwrap();
        {
            let store = Store::open(dir.path(), false).unwrap();
            let roster = PartitionRows::Prospects(vec![Prospect {
                rank: 1,
                team: "*Utah".into(),
                player: "AJ Dybantsa".into(),
                school: "BYU".into(),
            }]);
            store.replace_partition(PartitionKind::Roster, &roster, at(6)).unwrap();
        }
        let store = Store::open(dir.path(), false).unwrap();
        let (prospects, last) = store.load_roster().unwrap();
        assert_eq!(prospects.len(), 1);
        assert_eq!(last, Some(at(6)));
    }

    #[test]
    fn previous_version_is_kept_as_backup() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), true).unwrap();
        store
            .replace_partition(PartitionKind::Today, &games(range(8, 8), vec![game(8, "A", "B")]), at(10))
            .unwrap();
        store
            .replace_partition(PartitionKind::Today, &games(range(8, 8), vec![game(8, "C", "D")]), at(11))
            .unwrap();

        let bak = dir.path().join("games").join("today.json.bak");
        let previous: ScheduleFile = serde_json::from_str(&fs::read_to_string(bak).unwrap()).unwrap();
        assert_eq!(previous.games[0].away, "A");
    }

    #[test]
    fn corrupt_file_falls_back_to_backup() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), true).unwrap();
        store
            .replace_partition(PartitionKind::Today, &games(range(8, 8), vec![game(8, "A", "B")]), at(10))
            .unwrap();
        store
            .replace_partition(PartitionKind::Today, &games(range(8, 8), vec![game(8, "C", "D")]), at(11))
            .unwrap();
        fs::write(dir.path().join("games").join("today.json"), "{\"range\": ").unwrap();

        let (rows, _) = store.load_partition(PartitionKind::Today).unwrap();
        assert_eq!(rows, games(range(8, 8), vec![game(8, "A", "B")]));
    }

    #[test]
    fn corrupt_file_without_backup_is_an_error() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), false).unwrap();
        fs::write(dir.path().join("prospects.json"), "not json").unwrap();
        assert!(matches!(store.load_roster(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn failure_is_recorded_without_touching_data() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), false).unwrap();
        let rows = games(range(8, 8), vec![game(8, "Kansas", "Duke")]);
        store.replace_partition(PartitionKind::Today, &rows, at(10)).unwrap();

        store.record_failure(PartitionKind::Today, "no data", at(11)).unwrap();

        let (loaded, last) = store.load_partition(PartitionKind::Today).unwrap();
        assert_eq!(loaded, rows);
        assert_eq!(last, Some(at(10)));
        let meta = store.metadata().unwrap().partition(PartitionKind::Today);
        assert_eq!(meta.last_error.as_deref(), Some("no data"));
        assert_eq!(meta.last_attempt_at, Some(at(11)));
    }

    #[test]
    fn newer_schema_is_rejected() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), false).unwrap();
        fs::write(dir.path().join("metadata.json"), r#"{"schema_version": 99, "partitions": {}}"#).unwrap();
        assert!(matches!(store.metadata(), Err(StoreError::Schema { found: 99 })));
    }

    #[test]
    fn schedule_read_prefers_the_freshest_covering_file() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), false).unwrap();

        // Written yesterday: covered the 8th..14th.
        store
            .replace_partition(
                PartitionKind::NearFuture,
                &games(range(8, 14), vec![game(8, "Old", "Game"), game(9, "Army", "Navy")]),
                at(1) - Duration::days(1),
            )
            .unwrap();
        // Written today: covers only the 8th.
        store
            .replace_partition(PartitionKind::Today, &games(range(8, 8), vec![game(8, "Kansas", "Duke")]), at(12))
            .unwrap();

        let schedule = store.load_schedule(d(8)).unwrap();
        let aways: Vec<&str> = schedule.iter().map(|g| g.away.as_str()).collect();
        assert_eq!(aways, vec!["Kansas", "Army"]);

        // Past dates are dropped.
        let later = store.load_schedule(d(9)).unwrap();
        assert_eq!(later.len(), 1);
    }

    #[test]
    fn concurrent_writers_of_different_partitions_leave_both_intact() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), true).unwrap());

        let writers: Vec<_> = [(PartitionKind::Today, range(8, 8)), (PartitionKind::NearFuture, range(9, 15))]
            .into_iter()
            .map(|(kind, range)| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for round in 0..25u32 {
                        let rows: Vec<GameRecord> = (0..=round)
                            .map(|i| game(range.start.day(), &format!("Away {i}"), "Home"))
                            .collect();
                        store.replace_partition(kind, &games(range, rows), at(round % 24)).unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        for kind in [PartitionKind::Today, PartitionKind::NearFuture] {
            let (rows, last) = store.load_partition(kind).unwrap();
            assert_eq!(rows.len(), 25, "{kind} should hold the last full write");
            assert_eq!(last, Some(at(0)));
            assert_eq!(store.metadata().unwrap().partition(kind).record_count, 25);
        }

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("games"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
