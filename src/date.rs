//! Date helpers shared by the date leaf parsers.
//!
//! Dates are local wall-clock times ([`NaiveDateTime`]). Epoch milliseconds
//! are converted through the [`Local`] timezone on the way in and out.

pub mod reduce;

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone, Timelike};
use regex::{Captures, Regex};

use crate::parsers::js_number;
use crate::value::Value;

/// The pattern used by [`to_date_string`].
pub const DATE_PATTERN: &str = "YYYY-MM-DD";
/// The pattern used by [`to_datetime_string`].
pub const DATETIME_PATTERN: &str = "YYYY-MM-DD HH:mm:ss";

/// Anything the date helpers accept: epoch milliseconds, date text, or a date.
#[derive(Clone, Debug, PartialEq)]
pub enum DateLike {
    Epoch(i64),
    Text(String),
    Date(NaiveDateTime),
}

impl From<i64> for DateLike {
    fn from(millis: i64) -> Self {
        DateLike::Epoch(millis)
    }
}

impl From<&str> for DateLike {
    fn from(text: &str) -> Self {
        DateLike::Text(text.to_owned())
    }
}

impl From<String> for DateLike {
    fn from(text: String) -> Self {
        DateLike::Text(text)
    }
}

impl From<NaiveDateTime> for DateLike {
    fn from(date: NaiveDateTime) -> Self {
        DateLike::Date(date)
    }
}

impl From<DateLike> for Value {
    fn from(date: DateLike) -> Self {
        match date {
            DateLike::Epoch(millis) => Value::Int(millis),
            DateLike::Text(text) => Value::String(text),
            DateLike::Date(date) => Value::Date(date),
        }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%dT%H:%M:%S",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y/%m/%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%m/%d/%Y", "%b %d %Y", "%b %d, %Y", "%d %b %Y"];

/// Returns `true` when `text` can be turned into a date by [`to_date`].
///
/// ```
/// use typed_qs::date::could_be_date;
///
/// assert!(could_be_date("2020-01-11 11:11:11"));
/// assert!(could_be_date("1607656271000"));
/// assert!(!could_be_date("yesterday"));
/// ```
pub fn could_be_date(text: &str) -> bool {
    parse_text(text).is_some()
}

/// Converts anything date-like into a local date and time.
pub fn to_date(date: &DateLike) -> Option<NaiveDateTime> {
    match date {
        DateLike::Epoch(millis) => from_epoch(*millis),
        DateLike::Text(text) => parse_text(text),
        DateLike::Date(date) => Some(*date),
    }
}

fn from_epoch(millis: i64) -> Option<NaiveDateTime> {
    local_from_utc(DateTime::from_timestamp_millis(millis)?.naive_utc())
}

/// Shifts a UTC time into local time, `None` when that leaves chrono's range.
fn local_from_utc(utc: NaiveDateTime) -> Option<NaiveDateTime> {
    let offset = Local.offset_from_utc_datetime(&utc).fix();
    utc.checked_add_signed(TimeDelta::seconds(i64::from(offset.local_minus_utc())))
}

fn parse_text(text: &str) -> Option<NaiveDateTime> {
    if let Some(number) = js_number(text) {
        // infinite epochs and those past the ECMAScript date range are not dates
        if !number.is_finite() || number.abs() > 8.64e15 {
            return None;
        }
        return from_epoch(number.trunc() as i64);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return local_from_utc(date.naive_utc());
    }

    let slashed = text.replace('-', "/");
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&slashed, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(&slashed, format).ok())
                .or_else(|| match slashed.matches('/').count() {
                    // year and month only
                    1 => NaiveDate::parse_from_str(&format!("{slashed}/1"), "%Y/%m/%d").ok(),
                    _ => None,
                })?
                .and_hms_opt(0, 0, 0)
        })
}

static TOKENS: LazyLock<[(Regex, usize); 9]> = LazyLock::new(|| {
    let token = |unit: char, max: usize| {
        let regex = Regex::new(&format!("{unit}{{{},{max}}}", max / 2)).expect("valid token regex");
        (regex, max)
    };
    [
        token('Y', 4),
        token('y', 4),
        token('M', 2),
        token('D', 2),
        token('d', 2),
        token('H', 2),
        token('h', 2),
        token('m', 2),
        token('s', 2),
    ]
});

/// Formats a date with a token pattern, e.g. `YYYY-MM-DD HH:mm:ss`.
///
/// `Y`/`y` runs of 2 to 4 are the year, zero-padded to four digits with the
/// trailing run kept, so `YY` gives `20` for 2020. `M`, `D`/`d`, `H`, `h`
/// (12-hour), `m` and `s` runs of 1 or 2 are zero-padded to the run length.
/// Anything else in the pattern is copied as is.
///
/// ```
/// use typed_qs::date::{DateLike, format};
///
/// let date = DateLike::from("2020/01/11 15:04:05");
/// assert_eq!(format(&date, "YY/M/D h:mm").as_deref(), Some("20/1/11 3:04"));
/// ```
pub fn format(date: &DateLike, pattern: &str) -> Option<String> {
    let date = to_date(date)?;
    let hour = date.hour();
    let values = [
        i64::from(date.year()),
        i64::from(date.year()),
        i64::from(date.month()),
        i64::from(date.day()),
        i64::from(date.day()),
        i64::from(hour),
        i64::from(if hour > 12 { hour - 12 } else { hour }),
        i64::from(date.minute()),
        i64::from(date.second()),
    ];

    let mut formatted = pattern.to_owned();
    for ((regex, max), value) in TOKENS.iter().zip(values) {
        let max = *max;
        let value = value.to_string();
        formatted = regex
            .replace_all(&formatted, |caps: &Captures<'_>| {
                let run = caps[0].len();
                if max > 2 {
                    let padded = format!("{value:0>max$}");
                    padded[max - run..].to_owned()
                } else {
                    format!("{value:0>run$}")
                }
            })
            .into_owned();
    }
    Some(formatted)
}

/// Midnight on the same day.
pub fn start_of_day(date: &DateLike) -> Option<NaiveDateTime> {
    to_date(date)?.date().and_hms_milli_opt(0, 0, 0, 0)
}

/// The last millisecond of the same day.
pub fn end_of_day(date: &DateLike) -> Option<NaiveDateTime> {
    to_date(date)?.date().and_hms_milli_opt(23, 59, 59, 999)
}

pub fn to_date_string(date: &DateLike) -> Option<String> {
    format(date, DATE_PATTERN)
}

pub fn to_datetime_string(date: &DateLike) -> Option<String> {
    format(date, DATETIME_PATTERN)
}

/// Milliseconds since the Unix epoch.
pub fn get_time(date: &DateLike) -> Option<i64> {
    let date = to_date(date)?;
    Local
        .from_local_datetime(&date)
        .earliest()
        .map(|local| local.timestamp_millis())
}
