//! Reducers post-process a parsed date before it is returned.
//!
//! The date parsers fold their date left through a list of reducers, so
//! `[start_of_day(), to_datetime_string()]` turns `2020/01/11 11:11:11` into
//! `"2020-01-11 00:00:00"`.

use std::sync::Arc;

use super::DateLike;

/// A step applied to a date. Returning `None` makes the date parser yield
/// nothing for the value.
pub type Reducer = Arc<dyn Fn(DateLike) -> Option<DateLike> + Send + Sync>;

/// Wraps a closure as a [`Reducer`].
///
/// ```
/// use chrono::Duration;
/// use typed_qs::date::{DateLike, reduce, to_date};
///
/// let tomorrow = reduce::reducer(|d| Some(DateLike::Date(to_date(&d)? + Duration::days(1))));
/// let next = tomorrow(DateLike::from("2020-01-11")).unwrap();
/// assert_eq!(typed_qs::date::to_date_string(&next).as_deref(), Some("2020-01-12"));
/// ```
pub fn reducer<F>(f: F) -> Reducer
where
    F: Fn(DateLike) -> Option<DateLike> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn start_of_day() -> Reducer {
    reducer(|date| super::start_of_day(&date).map(DateLike::Date))
}

pub fn end_of_day() -> Reducer {
    reducer(|date| super::end_of_day(&date).map(DateLike::Date))
}

pub fn to_date_string() -> Reducer {
    reducer(|date| super::to_date_string(&date).map(DateLike::Text))
}

pub fn to_datetime_string() -> Reducer {
    reducer(|date| super::to_datetime_string(&date).map(DateLike::Text))
}

/// Epoch milliseconds.
pub fn get_time() -> Reducer {
    reducer(|date| super::get_time(&date).map(DateLike::Epoch))
}

/// Formats with a token pattern, see [`format`](super::format).
pub fn pattern(pattern: impl Into<String>) -> Reducer {
    let pattern = pattern.into();
    reducer(move |date| super::format(&date, &pattern).map(DateLike::Text))
}

pub(crate) fn compose(reducers: &[Reducer], date: DateLike) -> Option<DateLike> {
    reducers.iter().try_fold(date, |date, reduce| reduce(date))
}
