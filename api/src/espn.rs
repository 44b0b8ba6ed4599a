//! ESPN schedule page parsing: one day's men's college basketball table.
//! Page: https://www.espn.com/mens-college-basketball/schedule/_/date/{yyyymmdd}
//!
//! Column contract: away team, home team (prefixed "@"), time, TV network, then
//! columns we ignore (tickets, location, odds). Older layouts put the whole
//! matchup in the first cell as "Away @ Home", followed by time and TV.
use crate::{MarkupError, RawGameRow};
use scraper::{ElementRef, Html, Selector};

/// Alt texts at least this long are treated as descriptions, not network names.
const MAX_ALT_LEN: usize = 20;

/// Alt/src values that are inline image payloads rather than labels.
const PLACEHOLDER_PREFIXES: [&str; 3] = ["YH5", "R0lGOD", "data:"];

pub(crate) fn selector(css: &str) -> Result<Selector, MarkupError> {
    Selector::parse(css).map_err(|e| MarkupError(format!("invalid selector {css:?}: {e:?}")))
}

/// Parse the first schedule table on the page.
///
/// A page with no table is a day without games and yields an empty list.
/// Rows that do not carry two distinct team names are skipped.
pub fn parse_schedule_day(html: &str) -> Result<Vec<RawGameRow>, MarkupError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let Some(table) = document.select(&table_sel).next() else {
        return Ok(Vec::new());
    };

    let mut games = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if let Some(game) = parse_row(&cells)? {
            games.push(game);
        }
    }
    Ok(games)
}

fn parse_row(cells: &[ElementRef]) -> Result<Option<RawGameRow>, MarkupError> {
    let first = match cells.first() {
        Some(c) => cell_text(c),
        None => return Ok(None),
    };

    let (away, home, rest) = match first.split_once(" @ ") {
        Some((away, home)) => (away.trim().to_owned(), home.trim().to_owned(), &cells[1..]),
        None if cells.len() >= 3 => (first, cell_text(&cells[1]), &cells[2..]),
        None => return Ok(None),
    };

    if away.is_empty() || home.is_empty() || away == home {
        return Ok(None);
    }

    let time = rest.first().map(cell_text).unwrap_or_default();
    let tv = match rest.get(1) {
        Some(cell) => extract_cell_content(cell)?,
        None => String::new(),
    };

    Ok(Some(RawGameRow {
        away,
        home,
        time: if time.is_empty() { "TBD".into() } else { time },
        tv,
    }))
}

/// Best-effort label for a cell that may render as an icon, text or both.
///
/// Precedence: a short, non-placeholder `alt` on an embedded image; a name
/// derived from a network image path; the cell's own text.
pub fn extract_cell_content(cell: &ElementRef) -> Result<String, MarkupError> {
    let img_sel = selector("img")?;
    if let Some(img) = cell.select(&img_sel).next() {
        let alt = img.value().attr("alt").unwrap_or("").trim();
        if !alt.is_empty() && alt.len() < MAX_ALT_LEN && !is_placeholder(alt) {
            return Ok(alt.to_owned());
        }
        if let Some(name) = img.value().attr("src").and_then(network_from_src) {
            return Ok(name);
        }
    }
    Ok(cell_text(cell))
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDER_PREFIXES.iter().any(|p| value.starts_with(p))
}

/// "https://a.espncdn.com/i/network/espn_plus.png?w=40" → "ESPN PLUS"
fn network_from_src(src: &str) -> Option<String> {
    if is_placeholder(src) || !src.contains("network") {
        return None;
    }
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let file = path.rsplit('/').next()?;
    let stem = file
        .trim_end_matches(".png")
        .trim_end_matches(".jpg")
        .trim_end_matches(".svg")
        .replace(['_', '-'], " ");
    let name = stem.trim().to_uppercase();
    (!name.is_empty()).then_some(name)
}

pub(crate) fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_td(fragment: &str) -> String {
        let doc = Html::parse_document(&format!("<table><tr>{fragment}</tr></table>"));
        let td = selector("td").unwrap();
        let cell = doc.select(&td).next().expect("td");
        extract_cell_content(&cell).unwrap()
    }

    #[test]
    fn short_alt_text_wins() {
        assert_eq!(first_td(r#"<td><img alt="ESPN2" src="/i/network/espn2.png">ignored</td>"#), "ESPN2");
    }

    #[test]
    fn placeholder_alt_falls_back_to_src_name() {
        assert_eq!(
            first_td(r#"<td><img alt="YH5BAEAAAAALAAAAAABAAEAAAIBRAA7" src="https://a.espncdn.com/i/network/espn_plus.png?w=40"></td>"#),
            "ESPN PLUS"
        );
    }

    #[test]
    fn long_alt_without_network_path_uses_text() {
        assert_eq!(
            first_td(r#"<td><img alt="A very long descriptive caption" src="/logo.png"> SEC Network </td>"#),
            "SEC Network"
        );
    }

    #[test]
    fn plain_text_cell() {
        assert_eq!(first_td("<td>  CBS \n Sports </td>"), "CBS Sports");
    }

    #[test]
    fn separate_away_and_home_columns() {
        let html = r#"
            <table>
              <thead><tr><th>Matchup</th><th></th><th>Time</th><th>TV</th></tr></thead>
              <tbody>
                <tr><td><span>5</span> <a>Duke</a></td><td>@ <a>St. John's</a></td><td>7:00 PM</td><td><img alt="FOX"></td></tr>
                <tr><td>Kansas</td><td>@ Kentucky</td><td></td><td>ESPN+</td></tr>
              </tbody>
            </table>"#;
        let games = parse_schedule_day(html).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].away, "5 Duke");
        assert_eq!(games[0].home, "@ St. John's");
        assert_eq!(games[0].time, "7:00 PM");
        assert_eq!(games[0].tv, "FOX");
        assert_eq!(games[1].time, "TBD");
        assert_eq!(games[1].tv, "ESPN+");
    }

    #[test]
    fn combined_matchup_cell() {
        let html = r#"<table><tr><td>Gonzaga @ UCLA</td><td>10:30 PM</td><td>ESPN</td></tr></table>"#;
        let games = parse_schedule_day(html).unwrap();
        assert_eq!(
            games,
            vec![RawGameRow {
                away: "Gonzaga".into(),
                home: "UCLA".into(),
                time: "10:30 PM".into(),
                tv: "ESPN".into(),
            }]
        );
    }

    #[test]
    fn page_without_table_has_no_games() {
        let games = parse_schedule_day("<html><body><p>No games scheduled</p></body></html>").unwrap();
        assert!(games.is_empty());
    }

    #[test]
    fn rows_without_two_teams_are_skipped() {
        let html = r#"<table>
            <tr><td colspan="4">No games</td></tr>
            <tr><td>Duke</td><td>Duke</td><td>7:00 PM</td></tr>
        </table>"#;
        assert!(parse_schedule_day(html).unwrap().is_empty());
    }
}
