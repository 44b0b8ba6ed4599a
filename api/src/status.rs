//! Display status for a scheduled game, judged against the reference clock.
//!
//! The schedule only carries a free-text tip-off ("7:00 PM", "TBD", "LIVE"), so
//! anything past tip-off is inferred: a game is considered live from 15 minutes
//! before tip-off until three hours after, and final afterwards.

use crate::REFERENCE_TZ;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

const LIVE_LEAD_MINUTES: i64 = 15;
const LIVE_WINDOW_MINUTES: i64 = 180;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "label", rename_all = "kebab-case")]
pub enum GameStatus {
    Live,
    Final,
    /// Later today; carries the tip-off text.
    Today(String),
    /// Another day; carries a "Nov 8, 7:00 PM" label.
    Upcoming(String),
    Tbd,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Live => f.write_str("Live"),
            GameStatus::Final => f.write_str("Final"),
            GameStatus::Today(time) => write!(f, "Today, {time}"),
            GameStatus::Upcoming(label) => f.write_str(label),
            GameStatus::Tbd => f.write_str("TBD"),
        }
    }
}

pub fn classify(date: NaiveDate, time: &str, now: DateTime<Utc>) -> GameStatus {
    let time = time.trim().to_uppercase();
    if time == "LIVE" {
        return GameStatus::Live;
    }
    if is_unscheduled(&time) {
        return GameStatus::Tbd;
    }

    let local_now = now.with_timezone(&REFERENCE_TZ);
    if date != local_now.date_naive() {
        return GameStatus::Upcoming(format_game_time(date, &time));
    }

    let Some(tip_off) = tip_off(date, &time) else {
        return GameStatus::Today(time);
    };
    let elapsed = now.signed_duration_since(tip_off);
    if elapsed > Duration::minutes(LIVE_WINDOW_MINUTES) {
        GameStatus::Final
    } else if elapsed >= Duration::minutes(-LIVE_LEAD_MINUTES) {
        GameStatus::Live
    } else {
        GameStatus::Today(time)
    }
}

/// "Nov 8, 9:00 PM"; unscheduled times render as "Nov 8, TBD".
pub fn format_game_time(date: NaiveDate, time: &str) -> String {
    let day = date.format("%b %-d");
    let time = time.trim();
    if is_unscheduled(&time.to_uppercase()) {
        format!("{day}, TBD")
    } else {
        format!("{day}, {time}")
    }
}

fn is_unscheduled(time: &str) -> bool {
    matches!(time, "" | "TBD" | "TBA")
}

/// Tip-off instant, when the text is a clock time that exists on that date.
fn tip_off(date: NaiveDate, time: &str) -> Option<DateTime<Utc>> {
    let clock = NaiveTime::parse_from_str(time, "%I:%M %p").ok()?;
    REFERENCE_TZ
        .from_local_datetime(&date.and_time(clock))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nov(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, day).unwrap()
    }

    // 7:30 PM Eastern on Nov 8 (EST, UTC-5).
    fn evening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 9, 0, 30, 0).unwrap()
    }

    #[test]
    fn explicit_live_marker() {
        assert_eq!(classify(nov(20), "live", evening()), GameStatus::Live);
    }

    #[test]
    fn unscheduled_times_are_tbd() {
        assert_eq!(classify(nov(8), "TBD", evening()), GameStatus::Tbd);
        assert_eq!(classify(nov(8), " tba ", evening()), GameStatus::Tbd);
        assert_eq!(classify(nov(8), "", evening()), GameStatus::Tbd);
    }

    #[test]
    fn window_around_tip_off_today() {
        assert_eq!(classify(nov(8), "7:00 PM", evening()), GameStatus::Live);
        assert_eq!(classify(nov(8), "7:40 PM", evening()), GameStatus::Live);
        assert_eq!(classify(nov(8), "9:00 PM", evening()), GameStatus::Today("9:00 PM".into()));
        assert_eq!(classify(nov(8), "3:00 PM", evening()), GameStatus::Final);
    }

    #[test]
    fn unparseable_time_today_keeps_text() {
        assert_eq!(classify(nov(8), "Noon", evening()), GameStatus::Today("NOON".into()));
    }

    #[test]
    fn other_days_get_a_dated_label() {
        let status = classify(nov(9), "9:00 PM", evening());
        assert_eq!(status, GameStatus::Upcoming("Nov 9, 9:00 PM".into()));
        assert_eq!(status.to_string(), "Nov 9, 9:00 PM");
    }

    #[test]
    fn formatted_label() {
        assert_eq!(format_game_time(nov(8), "9:00 PM"), "Nov 8, 9:00 PM");
        assert_eq!(format_game_time(nov(8), "tbd"), "Nov 8, TBD");
    }
}
