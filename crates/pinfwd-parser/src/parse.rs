//! Line grammars and next-occurrence inference.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// One candidate event from the pinned announcement.
///
/// Every non-blank line produces an entry. Lines that match no grammar
/// (or name an unconstructible date like "31 апреля") keep `date: None`
/// and an empty description — preserved for diagnostics, never scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    /// Original source line, trimmed.
    pub raw_line: String,
    /// Resolved concrete date; `None` marks the entry invalid.
    pub date: Option<NaiveDate>,
    /// Trimmed free text following the date token.
    pub description: String,
}

impl EventEntry {
    pub fn is_valid(&self) -> bool {
        self.date.is_some()
    }

    fn invalid(raw_line: &str) -> Self {
        Self {
            raw_line: raw_line.to_string(),
            date: None,
            description: String::new(),
        }
    }
}

static NAMED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{1,2})\s+(января|февраля|марта|апреля|мая|июня|июля|августа|сентября|октября|ноября|декабря)\s+(.*)$",
    )
    .expect("named-month regex is valid")
});

static DOTTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\s+(.*)$").expect("dotted regex is valid"));

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})-(\d{1,2})\.(\d{1,2})\s+(.*)$").expect("range regex is valid")
});

fn month_number(token: &str) -> Option<u32> {
    let month = match token {
        "января" => 1,
        "февраля" => 2,
        "марта" => 3,
        "апреля" => 4,
        "мая" => 5,
        "июня" => 6,
        "июля" => 7,
        "августа" => 8,
        "сентября" => 9,
        "октября" => 10,
        "ноября" => 11,
        "декабря" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse the whole announcement. Blank lines are skipped; input order is
/// preserved; no sorting by date. `today` is the deterministic reference
/// used for year rollover, computed once by the caller.
pub fn parse_event_list(text: &str, today: NaiveDate) -> Vec<EventEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| parse_event_line(line, today))
        .collect()
}

fn parse_event_line(line: &str, today: NaiveDate) -> EventEntry {
    let parsed = try_named_month(line, today)
        .or_else(|| try_dotted(line, today))
        .or_else(|| try_range(line, today));

    match parsed {
        Some((date, description)) => EventEntry {
            raw_line: line.to_string(),
            date: Some(date),
            description,
        },
        None => {
            tracing::debug!("No grammar matched line: {line:?}");
            EventEntry::invalid(line)
        }
    }
}

/// `<day> <monthName> <description>`.
///
/// Rollover quirk, kept deliberately: the year advances only when the
/// candidate is on/before today AND the month is strictly earlier than
/// the current month. A past day in the current month therefore stays in
/// the past and is dropped later by the lookahead filter.
fn try_named_month(line: &str, today: NaiveDate) -> Option<(NaiveDate, String)> {
    let caps = NAMED_RE.captures(line)?;
    let day: u32 = caps[1].parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    let month = month_number(&caps[2])?;
    let description = caps[3].trim().to_string();

    // Unconstructible pairs ("31 апреля", rolled "29 февраля") fail here
    // and leave the entry invalid.
    let mut date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if date <= today && month < today.month() {
        date = NaiveDate::from_ymd_opt(today.year() + 1, month, day)?;
    }
    Some((date, description))
}

/// `<day>.<month> <description>`; rolls to next year whenever the
/// candidate is strictly before today.
fn try_dotted(line: &str, today: NaiveDate) -> Option<(NaiveDate, String)> {
    let caps = DOTTED_RE.captures(line)?;
    let day: u32 = caps[1].parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    let month: u32 = caps[2].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    let description = caps[3].trim().to_string();

    Some((roll_forward(today, month, day)?, description))
}

/// `<startDay>-<endDay>.<month> <description>`; only the start day is the
/// event date — the reminder is about the start of a range, not its span.
fn try_range(line: &str, today: NaiveDate) -> Option<(NaiveDate, String)> {
    let caps = RANGE_RE.captures(line)?;
    let start_day: u32 = caps[1].parse().ok()?;
    if !(1..=31).contains(&start_day) {
        return None;
    }
    let month: u32 = caps[3].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    let description = caps[4].trim().to_string();

    Some((roll_forward(today, month, start_day)?, description))
}

fn roll_forward(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if date < today {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(date)
    }
}
