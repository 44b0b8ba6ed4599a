//! Joins the draft board against the schedule.
//!
//! Everything here is a pure function of `(prospects, games)`; views are
//! recomputed on every read and never persisted. Live status depends on the
//! clock and is stamped separately by [`stamp_status`].

use crate::status::{self, GameStatus};
use crate::{GameKey, GameRecord, Prospect, TeamKey};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// One prospect with the earliest game their school plays, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftBoardRow {
    #[serde(flatten)]
    pub prospect: Prospect,
    /// Destination team without the projected-pick marker.
    pub nba_team: String,
    pub provisional: bool,
    pub team_logo_url: Option<&'static str>,
    pub next_game: Option<GameRecord>,
    /// The other side of `next_game`, as the schedule printed it.
    pub opponent: Option<String>,
    /// "Nov 8, 7:00 PM" for `next_game`.
    pub game_time: Option<String>,
}

/// A game annotated with every prospect playing in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameWithPlayers {
    #[serde(flatten)]
    pub game: GameRecord,
    /// `"{school}-#{rank} {player}"` entries, rank ascending, comma separated.
    /// Empty when neither side has a prospect.
    pub players: String,
    /// "Nov 8, 7:00 PM" in Eastern time.
    pub game_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GameStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolCount {
    pub school: String,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Indexes
// ---------------------------------------------------------------------------

/// Games with duplicate identity keys collapsed, ordered by (date, away, home).
fn unique_games(games: &[GameRecord]) -> BTreeMap<GameKey, &GameRecord> {
    let mut unique = BTreeMap::new();
    for game in games {
        unique.entry(game.key()).or_insert(game);
    }
    unique
}

/// Prospects grouped by school key, rank ascending. Blank schools are left out.
fn prospects_by_school(prospects: &[Prospect]) -> HashMap<TeamKey, Vec<&Prospect>> {
    let mut index: HashMap<TeamKey, Vec<&Prospect>> = HashMap::new();
    for prospect in prospects {
        let key = prospect.school_key();
        if !key.is_empty() {
            index.entry(key).or_default().push(prospect);
        }
    }
    for group in index.values_mut() {
        group.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.player.cmp(&b.player)));
    }
    index
}

fn player_label(prospect: &Prospect) -> String {
    format!("{}-#{} {}", prospect.school_display(), prospect.rank, prospect.player)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Left join of the board onto each school's earliest game.
///
/// Rows repeating (rank, player, school) are kept once. Order is rank, then
/// game date with game-less rows last.
pub fn build_draft_board(prospects: &[Prospect], games: &[GameRecord]) -> Vec<DraftBoardRow> {
    let mut first_game: HashMap<TeamKey, &GameRecord> = HashMap::new();
    for game in unique_games(games).into_values() {
        for key in [game.away_key(), game.home_key()] {
            if !key.is_empty() {
                first_game.entry(key).or_insert(game);
            }
        }
    }

    let mut seen = HashSet::new();
    let mut rows: Vec<DraftBoardRow> = prospects
        .iter()
        .filter(|p| seen.insert((p.rank, p.player.clone(), p.school.clone())))
        .map(|prospect| {
            let key = prospect.school_key();
            let game = first_game.get(&key).copied();
            DraftBoardRow {
                nba_team: prospect.team_label().to_owned(),
                provisional: prospect.is_provisional(),
                team_logo_url: prospect.team_logo_url(),
                opponent: game.and_then(|g| g.opponent_of(&key)).map(str::to_owned),
                game_time: game.map(|g| status::format_game_time(g.date, &g.time)),
                next_game: game.cloned(),
                prospect: prospect.clone(),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        let date = |r: &DraftBoardRow| r.next_game.as_ref().map(|g| g.date);
        a.prospect
            .rank
            .cmp(&b.prospect.rank)
            .then_with(|| date(a).is_none().cmp(&date(b).is_none()))
            .then_with(|| date(a).cmp(&date(b)))
            .then_with(|| a.prospect.player.cmp(&b.prospect.player))
    });
    rows
}

/// Every unique game, ordered by date, with the prospects from both sides.
pub fn build_games_by_date(prospects: &[Prospect], games: &[GameRecord]) -> Vec<GameWithPlayers> {
    let by_school = prospects_by_school(prospects);

    unique_games(games)
        .into_values()
        .map(|game| {
            let mut playing: Vec<&Prospect> = Vec::new();
            let mut sides = vec![game.away_key()];
            let home = game.home_key();
            if sides[0] != home {
                sides.push(home);
            }
            for key in &sides {
                if let Some(group) = by_school.get(key) {
                    playing.extend(group.iter().copied());
                }
            }
            playing.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.player.cmp(&b.player)));
            playing.dedup_by(|a, b| a.rank == b.rank && a.player == b.player);

            GameWithPlayers {
                game: game.clone(),
                players: playing.iter().map(|p| player_label(p)).collect::<Vec<_>>().join(", "),
                game_time: status::format_game_time(game.date, &game.time),
                status: None,
            }
        })
        .collect()
}

/// Rows of `games_by_date` where both teams have at least one prospect.
pub fn build_super_matchups(prospects: &[Prospect], games_by_date: &[GameWithPlayers]) -> Vec<GameWithPlayers> {
    let schools: HashSet<TeamKey> = prospects
        .iter()
        .map(Prospect::school_key)
        .filter(|k| !k.is_empty())
        .collect();

    let mut seen = HashSet::new();
    games_by_date
        .iter()
        .filter(|row| schools.contains(&row.game.away_key()) && schools.contains(&row.game.home_key()))
        .filter(|row| seen.insert(row.game.key()))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers for the display layer
// ---------------------------------------------------------------------------

/// Label every row as live, final, later today or upcoming as of `now`.
pub fn stamp_status(rows: &mut [GameWithPlayers], now: DateTime<Utc>) {
    for row in rows {
        row.status = Some(status::classify(row.game.date, &row.game.time, now));
    }
}

pub fn group_by_date<'a>(
    rows: impl IntoIterator<Item = &'a GameWithPlayers>,
) -> BTreeMap<NaiveDate, Vec<&'a GameWithPlayers>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&'a GameWithPlayers>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.game.date).or_default().push(row);
    }
    grouped
}

pub fn games_on(rows: &[GameWithPlayers], date: NaiveDate) -> Vec<&GameWithPlayers> {
    rows.iter().filter(|r| r.game.date == date).collect()
}

/// Prospects per school, most represented first, ties by name.
pub fn school_counts(prospects: &[Prospect]) -> Vec<SchoolCount> {
    let mut counts: HashMap<TeamKey, (String, BTreeSet<(u32, &str)>)> = HashMap::new();
    for p in prospects {
        let key = p.school_key();
        if key.is_empty() {
            continue;
        }
        counts
            .entry(key)
            .or_insert_with(|| (p.school_display(), BTreeSet::new()))
            .1
            .insert((p.rank, p.player.as_str()));
    }

    let mut out: Vec<SchoolCount> = counts
        .into_values()
        .map(|(school, players)| SchoolCount { school, count: players.len() })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.school.cmp(&b.school)));
    out
}
