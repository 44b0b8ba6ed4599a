use crate::state::partition::PartitionKind;
use crate::state::scheduler::RefreshPolicy;
use crate::state::store::{Metadata, Store};
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use prospect_api::client::fallback_roster;
use prospect_api::merge::{self, DraftBoardRow, GameWithPlayers, SchoolCount};
use prospect_api::{GameRecord, Prospect, eastern_today};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RosterSource {
    Persisted,
    /// Nothing usable on disk; the board compiled into the binary is shown.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionFreshness {
    pub partition: PartitionKind,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub record_count: usize,
    pub stale: bool,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// The last good persisted state, as the display layer sees it.
///
/// Loading never fails: unreadable pieces are replaced by the embedded roster
/// or an empty schedule and reported in `problems`.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Clock the snapshot was taken at; game status is judged against it.
    pub generated_at: DateTime<Utc>,
    pub today: NaiveDate,
    pub roster_source: RosterSource,
    pub freshness: Vec<PartitionFreshness>,
    pub problems: Vec<String>,
    #[serde(skip)]
    pub prospects: Vec<Prospect>,
    #[serde(skip)]
    pub games: Vec<GameRecord>,
}

impl Snapshot {
    pub fn load(store: &Store, policy: &RefreshPolicy, now: DateTime<Utc>) -> Self {
        let today = eastern_today(now);
        let mut problems = Vec::new();

        let metadata = store.metadata().unwrap_or_else(|e| {
            problems.push(format!("metadata: {e}"));
            Metadata::default()
        });

        let (prospects, roster_source) = match store.load_roster() {
            Ok((prospects, _)) if !prospects.is_empty() => (prospects, RosterSource::Persisted),
            Ok(_) => (embedded_roster(&mut problems), RosterSource::Fallback),
            Err(e) => {
                problems.push(format!("roster: {e}"));
                (embedded_roster(&mut problems), RosterSource::Fallback)
            }
        };

        let games = store.load_schedule(today).unwrap_or_else(|e| {
            problems.push(format!("schedule: {e}"));
            Vec::new()
        });

        let freshness = PartitionKind::ALL
            .into_iter()
            .map(|kind| {
                let meta = metadata.partition(kind);
                PartitionFreshness {
                    partition: kind,
                    stale: policy.partition(kind).is_stale(meta.last_refreshed_at, now),
                    last_refreshed_at: meta.last_refreshed_at,
                    record_count: meta.record_count,
                    last_attempt_at: meta.last_attempt_at,
                    last_error: meta.last_error,
                }
            })
            .collect();

        for problem in &problems {
            warn!("snapshot degraded: {problem}");
        }
        Self { generated_at: now, today, roster_source, freshness, problems, prospects, games }
    }

    /// Stale data, a fallback roster or unreadable files: show with a warning.
    pub fn is_degraded(&self) -> bool {
        self.roster_source == RosterSource::Fallback
            || !self.problems.is_empty()
            || self.freshness.iter().any(|f| f.stale)
    }

    pub fn draft_board(&self) -> Vec<DraftBoardRow> {
        merge::build_draft_board(&self.prospects, &self.games)
    }

    pub fn games_by_date(&self) -> Vec<GameWithPlayers> {
        let mut rows = merge::build_games_by_date(&self.prospects, &self.games);
        merge::stamp_status(&mut rows, self.generated_at);
        rows
    }

    pub fn super_matchups(&self) -> Vec<GameWithPlayers> {
        merge::build_super_matchups(&self.prospects, &self.games_by_date())
    }

    pub fn school_counts(&self) -> Vec<SchoolCount> {
        merge::school_counts(&self.prospects)
    }
}

fn embedded_roster(problems: &mut Vec<String>) -> Vec<Prospect> {
    fallback_roster().unwrap_or_else(|e| {
        problems.push(format!("embedded roster: {e}"));
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::partition::DateRange;
    use crate::state::store::PartitionRows;
    use chrono::{Duration, TimeZone};
    use prospect_api::status::GameStatus;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 8, 17, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, 8).unwrap()
    }

    #[test]
    fn empty_store_uses_the_embedded_roster_and_reports_staleness() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), false).unwrap();
        let snapshot = Snapshot::load(&store, &RefreshPolicy::default(), now());

        assert_eq!(snapshot.roster_source, RosterSource::Fallback);
        assert_eq!(snapshot.prospects.len(), 60);
        assert!(snapshot.games.is_empty());
        assert!(snapshot.freshness.iter().all(|f| f.stale && f.last_refreshed_at.is_none()));
        assert!(snapshot.is_degraded());
        assert_eq!(snapshot.draft_board().len(), 60);
    }

    #[test]
    fn persisted_data_feeds_the_views() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), false).unwrap();
        let prospects = vec![
            Prospect { rank: 1, team: "*Utah".into(), player: "Cameron Boozer".into(), school: "Duke".into() },
            Prospect { rank: 2, team: "Brooklyn".into(), player: "Bryce Hopkins".into(), school: "St. John's".into() },
        ];
        store
            .replace_partition(PartitionKind::Roster, &PartitionRows::Prospects(prospects), now())
            .unwrap();
        let game = GameRecord {
            date: today(),
            away: "St. Johns".into(),
            home: "Duke 5".into(),
            time: "7:00 PM".into(),
            tv: "FOX".into(),
        };
        store
            .replace_partition(
                PartitionKind::Today,
                &PartitionRows::Games { range: DateRange { start: today(), end: today() }, games: vec![game] },
                now() - Duration::minutes(5),
            )
            .unwrap();

        let snapshot = Snapshot::load(&store, &RefreshPolicy::default(), now());

        assert_eq!(snapshot.roster_source, RosterSource::Persisted);
        let supers = snapshot.super_matchups();
        assert_eq!(supers.len(), 1);
        assert_eq!(supers[0].players, "Duke-#1 Cameron Boozer, Saint Johns-#2 Bryce Hopkins");
        // Noon in New York, tip-off at 7.
        assert_eq!(supers[0].status, Some(GameStatus::Today("7:00 PM".into())));
        assert_eq!(supers[0].game_time, "Nov 8, 7:00 PM");

        let board = snapshot.draft_board();
        assert!(board[0].provisional);
        assert_eq!(board[0].nba_team, "Utah");
        assert!(!board[1].provisional);

        let today_fresh = snapshot.freshness.iter().find(|f| f.partition == PartitionKind::Today).unwrap();
        assert!(!today_fresh.stale);
        assert_eq!(today_fresh.record_count, 1);
    }

    #[test]
    fn unreadable_roster_degrades_to_fallback() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path(), false).unwrap();
        std::fs::write(dir.path().join("prospects.json"), "{").unwrap();

        let snapshot = Snapshot::load(&store, &RefreshPolicy::default(), now());

        assert_eq!(snapshot.roster_source, RosterSource::Fallback);
        assert_eq!(snapshot.problems.len(), 1);
        assert!(!snapshot.prospects.is_empty());
    }
}
