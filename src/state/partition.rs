use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The independently refreshed slices of the dataset.
///
/// The three schedule partitions are anchored on "today" in the reference
/// zone: today, then +1..+7, then +8..+horizon. They never overlap and leave
/// no gaps, so every date inside the horizon has exactly one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionKind {
    Today,
    NearFuture,
    FarFuture,
    Roster,
}

pub const NEAR_FUTURE_LAST_DAY: i64 = 7;
/// Upper bound on the far-future window; larger horizons are clamped.
pub const MAX_HORIZON_DAYS: i64 = 366;

impl PartitionKind {
    pub const ALL: [PartitionKind; 4] = [
        PartitionKind::Today,
        PartitionKind::NearFuture,
        PartitionKind::FarFuture,
        PartitionKind::Roster,
    ];

    pub const SCHEDULE: [PartitionKind; 3] =
        [PartitionKind::Today, PartitionKind::NearFuture, PartitionKind::FarFuture];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Today => "today",
            PartitionKind::NearFuture => "near-future",
            PartitionKind::FarFuture => "far-future",
            PartitionKind::Roster => "roster",
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartitionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown partition {s:?}"))
    }
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        self.start.iter_days().take_while(|d| *d <= self.end).collect()
    }
}

/// Refresh policy for one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub kind: PartitionKind,
    pub refresh_interval: Duration,
    /// Last day of the far-future window, in days after today.
    pub horizon_days: i64,
}

impl Partition {
    /// Dates covered as of `today`; `None` for the roster.
    pub fn date_range(&self, today: NaiveDate) -> Option<DateRange> {
        let offset = |days: i64| today + Duration::days(days);
        match self.kind {
            PartitionKind::Today => Some(DateRange { start: today, end: today }),
            PartitionKind::NearFuture => Some(DateRange { start: offset(1), end: offset(NEAR_FUTURE_LAST_DAY) }),
            PartitionKind::FarFuture => Some(DateRange {
                start: offset(NEAR_FUTURE_LAST_DAY + 1),
                end: offset(self.horizon_days.clamp(NEAR_FUTURE_LAST_DAY + 1, MAX_HORIZON_DAYS)),
            }),
            PartitionKind::Roster => None,
        }
    }

    /// Never refreshed, or refreshed longer ago than the interval.
    pub fn is_stale(&self, last_refreshed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_refreshed_at {
            None => true,
            Some(last) => now - last > self.refresh_interval,
        }
    }
}
