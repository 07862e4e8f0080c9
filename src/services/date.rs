//! Publish dates
//!
//! `date` is stored as `YYYY-MM-DD`; input may also be an RFC 3339 timestamp.
//! `dateDisplay` is rendered from it in the configured locale.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::config::DateLocale;

const BG_MONTHS: [&str; 12] = [
    "Януари",
    "Февруари",
    "Март",
    "Април",
    "Май",
    "Юни",
    "Юли",
    "Август",
    "Септември",
    "Октомври",
    "Ноември",
    "Декември",
];

/// Parse a calendar date from `YYYY-MM-DD` or RFC 3339
///
/// RFC 3339 input keeps the calendar date of its own offset.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Canonical storage form of a date
pub fn to_storage(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Today's date in UTC
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Human-readable date
///
/// - `Bg`: `Януари 2024 г.`
/// - `En`: `January 15, 2024`
pub fn format_date_display(date: NaiveDate, locale: DateLocale) -> String {
    match locale {
        DateLocale::Bg => {
            let month = BG_MONTHS[date.month0() as usize];
            format!("{} {} г.", month, date.year())
        }
        DateLocale::En => date.format("%B %-d, %Y").to_string(),
    }
}
