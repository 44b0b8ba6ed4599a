//! nbadraft.net consensus mock draft parsing.
//! Page: https://www.nbadraft.net/nba-mock-drafts/?year-mock={year}
//!
//! The board is split across two tables (picks 1–30 and 31–60). Column order is
//! taken from the header row when there is one; otherwise the short layout
//! (rank, team, player, school) is assumed, or the long one (rank, team,
//! player, height, weight, position, school, conference) for 8+ cells.
use crate::espn::{cell_text, selector};
use crate::{MarkupError, RawProspectRow};
use scraper::{ElementRef, Html};

pub const CONSENSUS_TABLE_IDS: [&str; 2] = ["nba_mock_consensus_table", "nba_mock_consensus_table2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    rank: usize,
    team: usize,
    player: usize,
    school: Option<usize>,
}

const SHORT_LAYOUT: Columns = Columns { rank: 0, team: 1, player: 2, school: Some(3) };
const LONG_LAYOUT: Columns = Columns { rank: 0, team: 1, player: 2, school: Some(6) };

/// Parse both consensus tables, in board order.
///
/// Fails when neither table is present: the page changed shape (or we were
/// served something else) and the caller should keep its previous roster.
pub fn parse_mock_draft(html: &str) -> Result<Vec<RawProspectRow>, MarkupError> {
    let document = Html::parse_document(html);

    let mut tables = Vec::new();
    for id in CONSENSUS_TABLE_IDS {
        let sel = selector(&format!("table#{id}"))?;
        match document.select(&sel).next() {
            Some(table) => tables.push(table),
            None => log::debug!("consensus table {id} not found"),
        }
    }

    if tables.is_empty() {
        return Err(MarkupError(format!(
            "none of the consensus tables ({}) are present",
            CONSENSUS_TABLE_IDS.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for table in tables {
        rows.extend(parse_table(&table)?);
    }
    Ok(rows)
}

fn parse_table(table: &ElementRef) -> Result<Vec<RawProspectRow>, MarkupError> {
    let row_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;

    let header = table
        .select(&row_sel)
        .find(|row| row.select(&td_sel).next().is_none() && row.select(&th_sel).next().is_some())
        .map(|row| row.select(&th_sel).map(|c| cell_text(&c).to_lowercase()).collect::<Vec<_>>());
    let from_header = header.as_deref().and_then(columns_from_header);

    let mut out = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<String> = row.select(&td_sel).map(|c| cell_text(&c)).collect();
        if cells.is_empty() {
            continue;
        }
        let cols = from_header.unwrap_or(if cells.len() >= 8 { LONG_LAYOUT } else { SHORT_LAYOUT });
        let get = |i: usize| cells.get(i).cloned().unwrap_or_default();

        if cells.len() <= cols.player {
            continue;
        }
        out.push(RawProspectRow {
            rank: get(cols.rank),
            team: get(cols.team),
            player: get(cols.player),
            school: cols.school.map(get).unwrap_or_default(),
        });
    }
    Ok(out)
}

fn columns_from_header(header: &[String]) -> Option<Columns> {
    let find = |names: &[&str]| header.iter().position(|h| names.contains(&h.as_str()));
    Some(Columns {
        rank: find(&["rank", "pick", "#", "no."]).unwrap_or(0),
        team: find(&["team", "nba team"])?,
        player: find(&["player", "name"])?,
        school: find(&["school", "school/country", "college", "school / country"]),
    })
}
