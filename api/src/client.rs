use crate::{GameRecord, MarkupError, Prospect, RawGameRow, RawProspectRow, espn, nbadraft};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const NBADRAFT_MOCK_URL: &str = "https://www.nbadraft.net/nba-mock-drafts/?year-mock=2026";
pub const ESPN_SCHEDULE_URL: &str = "https://www.espn.com/mens-college-basketball/schedule/_/date";
const FALLBACK_ROSTER_JSON: &str = include_str!("../../2026_mock_draft.json");

/// Scraping client for the mock draft board and the daily schedule pages.
#[derive(Debug, Clone)]
pub struct DraftApi {
    client: Client,
    timeout: Duration,
    draft_url: String,
    schedule_base_url: String,
}

impl Default for DraftApi {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .user_agent("Mozilla/5.0 (X11; Linux x86_64) prospect-watch/0.1")
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_secs(10),
            draft_url: NBADRAFT_MOCK_URL.to_owned(),
            schedule_base_url: ESPN_SCHEDULE_URL.to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("source unavailable at {url}: {source}")]
    SourceUnavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },
    #[error("unexpected page structure at {url}: {message}")]
    Parse { url: String, message: String },
}

impl ApiError {
    /// Transport-level failures are worth retrying on the next tick; a page
    /// that changed shape is not.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::SourceUnavailable { .. } => true,
            ApiError::Status { status, .. } => status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS,
            ApiError::Parse { .. } => false,
        }
    }

    fn parse(url: &str, err: MarkupError) -> Self {
        ApiError::Parse { url: url.to_owned(), message: err.0 }
    }
}

impl DraftApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at other hosts (mirrors, test servers).
    pub fn with_urls(mut self, draft_url: impl Into<String>, schedule_base_url: impl Into<String>) -> Self {
        self.draft_url = draft_url.into();
        self.schedule_base_url = schedule_base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the consensus mock draft, ranked ascending.
    pub async fn fetch_roster(&self) -> ApiResult<Vec<Prospect>> {
        let html = self.get_html(&self.draft_url).await?;
        let rows = nbadraft::parse_mock_draft(&html).map_err(|e| ApiError::parse(&self.draft_url, e))?;
        Ok(map_roster(rows))
    }

    /// Fetch one day's schedule. A day without a schedule table is an empty
    /// day, not an error.
    pub async fn fetch_schedule_day(&self, day: NaiveDate) -> ApiResult<Vec<GameRecord>> {
        let url = self.schedule_url(day);
        let html = self.get_html(&url).await?;
        let rows = espn::parse_schedule_day(&html).map_err(|e| ApiError::parse(&url, e))?;
        log::debug!("{day}: {} games", rows.len());
        Ok(rows.into_iter().map(|row| map_game(day, row)).collect())
    }

    pub fn schedule_url(&self, day: NaiveDate) -> String {
        format!("{}/{}", self.schedule_base_url, day.format("%Y%m%d"))
    }

    async fn get_html(&self, url: &str) -> ApiResult<String> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::SourceUnavailable { url: url.to_owned(), source: e })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url: url.to_owned(), status });
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::SourceUnavailable { url: url.to_owned(), source: e })
    }
}

// ---------------------------------------------------------------------------
// Mapping: scraped table rows → clean domain types
// ---------------------------------------------------------------------------

/// Parse ranks, drop rows without one, and keep the first row for each rank.
/// Output is sorted by rank.
fn map_roster(rows: Vec<RawProspectRow>) -> Vec<Prospect> {
    let mut by_rank: BTreeMap<u32, Prospect> = BTreeMap::new();
    for row in rows {
        let Some(rank) = parse_rank(&row.rank) else {
            log::debug!("skipping board row without a rank: {row:?}");
            continue;
        };
        let player = row.player.trim().to_owned();
        if player.is_empty() {
            continue;
        }
        match by_rank.entry(rank) {
            Entry::Occupied(kept) => {
                if kept.get().player != player {
                    log::warn!("rank {rank} listed twice; keeping {:?}, dropping {player:?}", kept.get().player);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Prospect {
                    rank,
                    team: row.team.trim().to_owned(),
                    player,
                    school: row.school.trim().to_owned(),
                });
            }
        }
    }
    by_rank.into_values().collect()
}

fn parse_rank(raw: &str) -> Option<u32> {
    let digits: String = raw.trim().trim_end_matches('.').chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|r| *r > 0)
}

fn map_game(date: NaiveDate, row: RawGameRow) -> GameRecord {
    GameRecord { date, away: row.away, home: row.home, time: row.time, tv: row.tv }
}

// ---------------------------------------------------------------------------
// Embedded roster snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RosterSnapshot {
    prospects: Vec<Prospect>,
}

/// The roster compiled into the binary, used when nothing has been persisted.
pub fn fallback_roster() -> ApiResult<Vec<Prospect>> {
    let raw: RosterSnapshot = serde_json::from_str(FALLBACK_ROSTER_JSON).map_err(|e| ApiError::Parse {
        url: "embedded:2026_mock_draft.json".into(),
        message: e.to_string(),
    })?;
    Ok(raw.prospects)
}
