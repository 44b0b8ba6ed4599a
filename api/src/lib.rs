pub mod client;
pub mod espn;
pub mod merge;
pub mod nbadraft;
pub mod normalize;
pub mod status;
pub mod teams;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub use normalize::{TeamKey, canonical_name, normalize};

/// Every schedule date is interpreted in this zone, regardless of where the
/// process runs.
pub const REFERENCE_TZ: Tz = chrono_tz::America::New_York;

/// The current calendar date in the reference zone.
pub fn eastern_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&REFERENCE_TZ).date_naive()
}

// ---------------------------------------------------------------------------
// Domain types, independent of the scraped HTML
// ---------------------------------------------------------------------------

/// One ranked entry of a mock draft board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prospect {
    pub rank: u32,
    /// Destination NBA team. A leading `*` marks a projected pick.
    pub team: String,
    pub player: String,
    /// School or country, exactly as the board printed it.
    pub school: String,
}

impl Prospect {
    pub fn school_key(&self) -> TeamKey {
        normalize(&self.school)
    }

    /// School name with the normalizer's spelling fixes applied, casing kept.
    pub fn school_display(&self) -> String {
        canonical_name(&self.school)
    }

    pub fn is_provisional(&self) -> bool {
        self.team.trim_start().starts_with('*')
    }

    /// Destination team without provisional markers.
    pub fn team_label(&self) -> &str {
        self.team.trim().trim_matches('*').trim()
    }

    pub fn team_logo_url(&self) -> Option<&'static str> {
        teams::logo_url(self.team_label())
    }
}

/// One scheduled NCAA game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub date: NaiveDate,
    pub away: String,
    pub home: String,
    /// Free text: a clock time such as "7:00 PM", "TBD" or "LIVE".
    pub time: String,
    /// Free text, may be empty.
    pub tv: String,
}

/// Upsert identity of a game: (date, away raw name, home raw name).
pub type GameKey = (NaiveDate, String, String);

impl GameRecord {
    pub fn key(&self) -> GameKey {
        (self.date, self.away.clone(), self.home.clone())
    }

    pub fn away_key(&self) -> TeamKey {
        normalize(&self.away)
    }

    pub fn home_key(&self) -> TeamKey {
        normalize(&self.home)
    }

    pub fn involves(&self, key: &TeamKey) -> bool {
        !key.is_empty() && (&self.away_key() == key || &self.home_key() == key)
    }

    /// Opponent of `key` in this game, by raw name.
    pub fn opponent_of(&self, key: &TeamKey) -> Option<&str> {
        if key.is_empty() {
            None
        } else if &self.home_key() == key {
            Some(self.away.as_str())
        } else if &self.away_key() == key {
            Some(self.home.as_str())
        } else {
            None
        }
    }
}

/// A page did not have the structure its parser expects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MarkupError(pub String);

/// One consensus-board table row before rank parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProspectRow {
    pub rank: String,
    pub team: String,
    pub player: String,
    pub school: String,
}

/// One schedule table row: away, home, time and TV cells already extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGameRow {
    pub away: String,
    pub home: String,
    pub time: String,
    pub tv: String,
}
