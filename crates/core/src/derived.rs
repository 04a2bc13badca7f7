//! Read-time status and duration fields.
//!
//! Nothing here is persisted. An open engagement's duration counts up to
//! "today", so the same row legitimately reports a larger value each day it
//! stays open.

use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::cell::from_serial;
use crate::normalize::norm_key;
use crate::record::Record;
use crate::schema::{DURATION_DAYS, END_DATE, STARTING_DATE, STATUS};

pub const STATUS_COMPLETED: &str = "Completed";
pub const STATUS_ACTIVE: &str = "Active";

const SERIAL_MIN: f64 = 20_000.0;
const SERIAL_MAX: f64 = 60_000.0;

static ISO_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").expect("static pattern"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%a %b %d %Y",
];

/// Source of "today" for open-ended durations.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Parse a cell's text as a calendar date. Tries, in order, a spreadsheet
/// serial in (20000, 60000), an ISO `YYYY-MM-DD` prefix, then a handful of
/// common free-form layouts.
pub fn parse_any_date(value: &str) -> Option<NaiveDate> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(num) = s.parse::<f64>() {
        if num > SERIAL_MIN && num < SERIAL_MAX {
            return from_serial(num).map(|dt| dt.date());
        }
    }

    if let Some(caps) = ISO_PREFIX.captures(s) {
        let (y, m, d) = (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    parse_generic(s)
}

fn parse_generic(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // "Mon Jan 01 2024 00:00:00 GMT+0000 (...)": keep the leading date part.
    let head: Vec<&str> = s.split_whitespace().take(4).collect();
    if head.len() == 4 {
        return NaiveDate::parse_from_str(&head.join(" "), "%a %b %d %Y").ok();
    }
    None
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Inclusive day count from `start` to `end`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

pub fn derive_status(start: Option<NaiveDate>, end: Option<NaiveDate>) -> &'static str {
    match (start, end) {
        (_, Some(_)) => STATUS_COMPLETED,
        (Some(_), None) => STATUS_ACTIVE,
        (None, None) => "",
    }
}

/// Empty when there is no start; an open item counts up to `today`.
pub fn derive_duration(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> String {
    match start {
        None => String::new(),
        Some(start) => days_inclusive(start, end.unwrap_or(today)).to_string(),
    }
}

fn first_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn display_start(raw: &str, parsed: Option<NaiveDate>) -> String {
    match parsed {
        Some(d) => to_iso(d),
        None => first_chars(raw, 10),
    }
}

fn display_end(parsed: Option<NaiveDate>) -> String {
    parsed.map(to_iso).unwrap_or_default()
}

/// Engagement view: short dates, inclusive duration, and status.
pub fn engagement_fields(record: &Record, today: NaiveDate) -> Record {
    let mut out = record.clone();
    let key = |canonical: &str| {
        record
            .key_normalized(canonical)
            .unwrap_or(canonical)
            .to_string()
    };
    let raw_start = record.get_normalized(STARTING_DATE).unwrap_or_default();
    let raw_end = record.get_normalized(END_DATE).unwrap_or_default();
    let start = parse_any_date(raw_start);
    let end = parse_any_date(raw_end);

    out.set(key(STARTING_DATE), display_start(raw_start, start));
    out.set(key(END_DATE), display_end(end));
    out.set(key(DURATION_DAYS), derive_duration(start, end, today));
    out.set(key(STATUS), derive_status(start, end));
    out
}

/// Column roles detected on a free-form schedule record.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScheduleColumns {
    pub start: Option<String>,
    pub end: Option<String>,
    pub duration: String,
    pub status: String,
    pub group: Option<String>,
}

const START_CANDIDATES: &[&str] = &["starting date", "start date"];
const END_CANDIDATES: &[&str] = &["end date", "ending date"];

fn find_key<'a>(keys: &[&'a str], pred: impl Fn(&str) -> bool) -> Option<&'a str> {
    keys.iter().copied().find(|k| pred(&norm_key(k)))
}

/// First key containing a candidate phrase, candidates tried in order.
/// Spacing is ignored on both sides.
fn find_candidate<'a>(keys: &[&'a str], candidates: &[&str]) -> Option<&'a str> {
    candidates.iter().find_map(|c| {
        let phrase = c.replace(' ', "");
        find_key(keys, |k| k.replace(' ', "").contains(&phrase))
    })
}

impl ScheduleColumns {
    pub fn detect(record: &Record) -> Self {
        let keys: Vec<&str> = record.keys().collect();
        let start = find_candidate(&keys, START_CANDIDATES)
            .or_else(|| find_key(&keys, |k| k.contains("start") && k.contains("date")))
            .or_else(|| find_key(&keys, |k| k == "date"));
        let end = find_candidate(&keys, END_CANDIDATES)
            .or_else(|| find_key(&keys, |k| k.contains("end") && k.contains("date")));
        let duration = find_key(&keys, |k| k.contains("duration")).unwrap_or(DURATION_DAYS);
        let status = find_key(&keys, |k| k.contains("status") || k.contains("phase")).unwrap_or(STATUS);
        let group = find_key(&keys, |k| k.contains("group"));

        Self {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
            duration: duration.to_string(),
            status: status.to_string(),
            group: group.map(str::to_string),
        }
    }
}

/// Schedule view. Like engagements, except status stays empty for rows whose
/// group cell is blank (or that have no group column at all).
pub fn schedule_fields(record: &Record, today: NaiveDate) -> Record {
    let cols = ScheduleColumns::detect(record);
    let mut out = record.clone();

    let raw_start = cols.start.as_deref().and_then(|k| record.get(k)).unwrap_or_default();
    let raw_end = cols.end.as_deref().and_then(|k| record.get(k)).unwrap_or_default();
    let start = parse_any_date(raw_start);
    let end = parse_any_date(raw_end);

    if let Some(k) = &cols.start {
        out.set(k.clone(), display_start(raw_start, start));
    }
    if let Some(k) = &cols.end {
        out.set(k.clone(), display_end(end));
    }
    out.set(cols.duration.clone(), derive_duration(start, end, today));

    let has_group = cols
        .group
        .as_deref()
        .and_then(|k| record.get(k))
        .is_some_and(|v| !v.trim().is_empty());
    let status = if has_group { derive_status(start, end) } else { "" };
    out.set(cols.status, status);
    out
}
