use crate::state::partition::MAX_HORIZON_DAYS;
use crate::state::scheduler::RefreshPolicy;
use chrono::Duration;
use log::warn;
use prospect_api::client::{ESPN_SCHEDULE_URL, NBADRAFT_MOCK_URL};
use std::ops::RangeInclusive;
use std::path::PathBuf;

const ENV_PREFIX: &str = "PROSPECT_WATCH_";
/// Longest accepted refresh interval or retry backoff: 30 days.
const MAX_INTERVAL_HOURS: i64 = 30 * 24;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub data_dir: PathBuf,
    pub draft_url: String,
    pub schedule_url: String,
    pub timeout: std::time::Duration,
    /// How often `watch` re-evaluates staleness.
    pub tick: std::time::Duration,
    pub backups: bool,
    pub policy: RefreshPolicy,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            draft_url: NBADRAFT_MOCK_URL.to_owned(),
            schedule_url: ESPN_SCHEDULE_URL.to_owned(),
            timeout: std::time::Duration::from_secs(10),
            tick: std::time::Duration::from_secs(60),
            backups: true,
            policy: RefreshPolicy::default(),
        }
    }
}

impl AppSettings {
    /// Defaults overridden by `PROSPECT_WATCH_*` environment variables.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let bounded =
            |name: &str, range: RangeInclusive<i64>| get(name).and_then(|raw| parse_in_range(name, &raw, range));
        let interval_hours = 1..=MAX_INTERVAL_HOURS;
        let interval_minutes = 1..=MAX_INTERVAL_HOURS * 60;

        let mut settings = Self::default();
        if let Some(dir) = get("DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("DRAFT_URL") {
            settings.draft_url = url;
        }
        if let Some(url) = get("SCHEDULE_URL") {
            settings.schedule_url = url;
        }
        if let Some(secs) = bounded("TIMEOUT_SECS", 1..=600) {
            settings.timeout = std::time::Duration::from_secs(secs.unsigned_abs());
        }
        if let Some(secs) = bounded("TICK_SECS", 1..=86_400) {
            settings.tick = std::time::Duration::from_secs(secs.unsigned_abs());
        }
        if let Some(flag) = get("BACKUPS") {
            settings.backups = !matches!(flag.to_lowercase().as_str(), "0" | "false" | "no" | "off");
        }

        let policy = &mut settings.policy;
        if let Some(days) = bounded("HORIZON_DAYS", 1..=MAX_HORIZON_DAYS) {
            policy.horizon_days = days;
        }
        if let Some(n) = bounded("CONCURRENCY", 1..=64) {
            policy.concurrency = n as usize;
        }
        if let Some(mins) = bounded("TODAY_MINS", interval_minutes.clone()) {
            policy.today_interval = Duration::minutes(mins);
        }
        if let Some(hours) = bounded("NEAR_HOURS", interval_hours.clone()) {
            policy.near_future_interval = Duration::hours(hours);
        }
        if let Some(hours) = bounded("FAR_HOURS", interval_hours.clone()) {
            policy.far_future_interval = Duration::hours(hours);
        }
        if let Some(hours) = bounded("ROSTER_HOURS", interval_hours) {
            policy.roster_interval = Duration::hours(hours);
        }
        if let Some(mins) = bounded("RETRY_MINS", interval_minutes) {
            policy.retry_backoff = Duration::minutes(mins);
        }
        if let Some(n) = bounded("MIN_PROSPECTS", 0..=1_000) {
            policy.min_prospects = n as usize;
        }
        if let Some(n) = bounded("MIN_SEASON_GAMES", 0..=100_000) {
            policy.min_season_games = n as usize;
        }
        settings
    }
}

fn parse_in_range(name: &str, raw: &str, range: RangeInclusive<i64>) -> Option<i64> {
    let Ok(value) = raw.parse::<i64>() else {
        warn!("ignoring {ENV_PREFIX}{name}={raw:?}: not a number");
        return None;
    };
    if !range.contains(&value) {
        warn!("ignoring {ENV_PREFIX}{name}={value}: outside {}..={}", range.start(), range.end());
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> AppSettings {
        let env: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let s = settings(&[]);
        assert_eq!(s.data_dir, PathBuf::from("data"));
        assert_eq!(s.policy, RefreshPolicy::default());
        assert_eq!(s.timeout, std::time::Duration::from_secs(10));
        assert!(s.backups);
    }

    #[test]
    fn overrides_are_applied() {
        let s = settings(&[
            ("PROSPECT_WATCH_DATA_DIR", "/var/lib/prospects"),
            ("PROSPECT_WATCH_HORIZON_DAYS", "30"),
            ("PROSPECT_WATCH_TODAY_MINS", "15"),
            ("PROSPECT_WATCH_CONCURRENCY", "4"),
            ("PROSPECT_WATCH_BACKUPS", "off"),
        ]);
        assert_eq!(s.data_dir, PathBuf::from("/var/lib/prospects"));
        assert_eq!(s.policy.horizon_days, 30);
        assert_eq!(s.policy.today_interval, Duration::minutes(15));
        assert_eq!(s.policy.concurrency, 4);
        assert!(!s.backups);
    }

    #[test]
    fn malformed_or_non_positive_values_keep_defaults() {
        let s = settings(&[
            ("PROSPECT_WATCH_HORIZON_DAYS", "ninety"),
            ("PROSPECT_WATCH_CONCURRENCY", "0"),
            ("PROSPECT_WATCH_TICK_SECS", "  "),
        ]);
        assert_eq!(s.policy.horizon_days, 98);
        assert_eq!(s.policy.concurrency, 10);
        assert_eq!(s.tick, std::time::Duration::from_secs(60));
    }

    #[test]
    fn out_of_range_values_keep_defaults() {
        let s = settings(&[
            ("PROSPECT_WATCH_TODAY_MINS", "9223372036854775807"),
            ("PROSPECT_WATCH_FAR_HOURS", "100000000000"),
            ("PROSPECT_WATCH_HORIZON_DAYS", "1000000000"),
            ("PROSPECT_WATCH_TIMEOUT_SECS", "-5"),
        ]);
        assert_eq!(s.policy.today_interval, Duration::minutes(30));
        assert_eq!(s.policy.far_future_interval, Duration::hours(24));
        assert_eq!(s.policy.horizon_days, 98);
        assert_eq!(s.timeout, std::time::Duration::from_secs(10));
    }

    #[test]
    fn bounds_are_inclusive() {
        let s = settings(&[
            ("PROSPECT_WATCH_HORIZON_DAYS", "366"),
            ("PROSPECT_WATCH_ROSTER_HOURS", "720"),
            ("PROSPECT_WATCH_RETRY_MINS", "1"),
        ]);
        assert_eq!(s.policy.horizon_days, MAX_HORIZON_DAYS);
        assert_eq!(s.policy.roster_interval, Duration::hours(720));
        assert_eq!(s.policy.retry_backoff, Duration::minutes(1));
    }
}
