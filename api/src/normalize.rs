//! Team/school name canonicalization.
//!
//! The schedule and the draft board spell the same school differently
//! ("Oklahoma St." vs "Oklahoma State", "St. John's" vs "Saint Johns", "@Duke 12"
//! vs "Duke"). Both sides go through the same rules so a plain string equality
//! on [`TeamKey`] is enough to join them.
//!
//! Rule order, applied to whitespace-separated tokens:
//!
//! 1. drop every ASCII digit and apostrophe, then any leading `@` markers and
//!    surrounding whitespace; internal runs of whitespace collapse to one space
//! 2. a trailing token that is exactly `St.` becomes `State`
//! 3. a leading token that is exactly `St.` becomes `Saint`
//! 4. (key only) lower-case
//!
//! The suffix rule runs before the prefix rule, so a name that is only `St.`
//! becomes `State`, and `St. St.` becomes `Saint State`. A `St.` in the middle
//! of a name ("Mount St. Mary's") is left alone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Join key produced by [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamKey(String);

impl TeamKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TeamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rules 1–3: the display form, with the source casing preserved.
pub fn canonical_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_ascii_digit() && *c != '\'')
        .collect();
    let stripped = cleaned.trim_start_matches(|c: char| c == '@' || c.is_whitespace());

    let mut tokens: Vec<&str> = stripped.split_whitespace().collect();

    if let Some(last) = tokens.last_mut()
        && *last == "St."
    {
        *last = "State";
    }
    if let Some(first) = tokens.first_mut()
        && *first == "St."
    {
        *first = "Saint";
    }

    tokens.join(" ")
}

/// Rules 1–4. Total and idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> TeamKey {
    TeamKey(canonical_name(raw).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        " ",
        "@",
        "St.",
        "St. St.",
        "Duke",
        "@Duke 12",
        "12 Duke",
        "@ @Duke",
        "Oklahoma St.",
        "Oklahoma State",
        "St. John's",
        "Saint Johns",
        "St. Johns",
        "Mount St. Mary's",
        "San Diego St.",
        "Texas A&M",
        "  North   Carolina  ",
        "Mathias M'Madi",
        "@St. Mary's 25",
        "ST.",
        "'St.",
        "Oklahoma 'St.",
    ];

    #[test]
    fn normalize_is_idempotent() {
        for raw in SAMPLES {
            let once = normalize(raw);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {raw:?}");

            let display = canonical_name(raw);
            assert_eq!(canonical_name(&display), display, "display form not idempotent for {raw:?}");
        }
    }

    #[test]
    fn state_suffix_expands() {
        assert_eq!(normalize("Oklahoma St."), normalize("Oklahoma State"));
        assert_eq!(canonical_name("San Diego St."), "San Diego State");
    }

    #[test]
    fn saint_prefix_expands_and_apostrophes_drop() {
        assert_eq!(normalize("St. John's"), normalize("Saint Johns"));
        assert_eq!(normalize("St. Johns"), normalize("St. John's"));
        assert_eq!(canonical_name("St. John's"), "Saint Johns");
    }

    #[test]
    fn ranking_digits_and_away_marker_are_stripped() {
        assert_eq!(normalize("@Duke 12"), normalize("Duke"));
        assert_eq!(normalize("12 Duke"), normalize("Duke"));
        assert_eq!(normalize("@St. Mary's 25"), normalize("Saint Marys"));
    }

    #[test]
    fn lone_st_token_takes_suffix_rule() {
        assert_eq!(canonical_name("St."), "State");
        assert_eq!(canonical_name("St. St."), "Saint State");
    }

    #[test]
    fn middle_st_token_is_untouched() {
        assert_eq!(canonical_name("Mount St. Mary's"), "Mount St. Marys");
    }

    #[test]
    fn key_is_case_folded_but_display_is_not() {
        assert_eq!(normalize("DUKE"), normalize("duke"));
        assert_eq!(canonical_name("DUKE"), "DUKE");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(canonical_name("  North   Carolina  "), "North Carolina");
        assert!(normalize("   ").is_empty());
        assert!(normalize("@ 12").is_empty());
    }
}
