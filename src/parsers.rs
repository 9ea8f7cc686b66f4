//! The leaf parser library.
//!
//! A [`Parser`] turns the raw text found at a template leaf into a typed
//! [`Value`]. Returning `None` means "no value": the engine then falls back
//! to the default for that leaf, if there is one.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::date::reduce::{self, Reducer, compose};
use crate::date::{DateLike, to_date};
use crate::value::Value;

/// The largest integer an `f64` represents exactly, `2^53 - 1`.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// What a parser is handed for its leaf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Input<'a> {
    /// The key was not in the querystring. The engine itself never calls a
    /// parser with this, but custom callers might.
    Absent,
    Scalar(&'a str),
    List(&'a [String]),
}

impl<'a> Input<'a> {
    pub fn as_scalar(&self) -> Option<&'a str> {
        match *self {
            Input::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

/// A shareable leaf parser.
///
/// ```
/// use typed_qs::{Input, Parser, Value};
///
/// let shout = Parser::new(|input: Input<'_>| Some(input.as_scalar()?.to_uppercase().into()));
/// assert_eq!(shout.parse(Input::Scalar("hi")), Some(Value::from("HI")));
/// assert_eq!(shout.parse(Input::Absent), None);
/// ```
#[derive(Clone)]
pub struct Parser(Arc<dyn Fn(Input<'_>) -> Option<Value> + Send + Sync>);

impl Parser {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Input<'_>) -> Option<Value> + Send + Sync + 'static,
    {
        Parser(Arc::new(f))
    }

    pub fn parse(&self, input: Input<'_>) -> Option<Value> {
        (self.0)(input)
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Parser")
    }
}

/// Text, optionally trimmed. A list is joined with `,`.
pub fn string(trim: bool) -> Parser {
    Parser::new(move |input| match input {
        Input::Absent => None,
        Input::Scalar(s) if trim => Some(s.trim().into()),
        Input::Scalar(s) => Some(s.into()),
        Input::List(items) => Some(items.join(",").into()),
    })
}

/// Any number `Number()` would accept in a browser, always as a float.
pub fn number() -> Parser {
    Parser::new(|input| js_number(input.as_scalar()?).map(Value::Float))
}

pub fn boolean() -> Parser {
    Parser::new(|input| match input.as_scalar()?.trim() {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => None,
    })
}

/// A signed integer within the safe range.
pub fn integer() -> Parser {
    static INTEGER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("valid integer regex"));
    Parser::new(|input| safe_integer(input.as_scalar()?, &INTEGER))
}

/// A non-negative integer within the safe range.
pub fn natural() -> Parser {
    static NATURAL: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("valid natural regex"));
    Parser::new(|input| safe_integer(input.as_scalar()?, &NATURAL))
}

fn safe_integer(text: &str, shape: &Regex) -> Option<Value> {
    if !shape.is_match(text) {
        return None;
    }
    text.parse::<i64>()
        .ok()
        .filter(|i| i.unsigned_abs() <= MAX_SAFE_INTEGER as u64)
        .map(Value::Int)
}

/// A comma separated string, or a repeated key, as an array.
///
/// Each element goes through `mapper` when one is given; elements it
/// rejects are dropped.
///
/// ```
/// use typed_qs::{Input, Value, parsers};
///
/// let ids = parsers::array(Some(parsers::natural()));
/// assert_eq!(
///     ids.parse(Input::Scalar("1,x,3")),
///     Some(Value::from(vec![1, 3]))
/// );
/// ```
pub fn array(mapper: Option<Parser>) -> Parser {
    Parser::new(move |input| {
        let items: Vec<&str> = match input {
            Input::Absent => return None,
            Input::Scalar(s) => s.split(',').collect(),
            Input::List(items) => items.iter().map(String::as_str).collect(),
        };
        let values = match &mapper {
            Some(mapper) => items
                .into_iter()
                .filter_map(|item| mapper.parse(Input::Scalar(item)))
                .collect(),
            None => items.into_iter().map(Value::from).collect(),
        };
        Some(Value::Array(values))
    })
}

/// One of a fixed set of values.
///
/// The trimmed text is compared against each candidate after coercing it to
/// the candidate's type, so `"10"` matches `Value::Int(10)`. The matching
/// candidate is returned.
pub fn one_of<I, V>(candidates: I) -> Parser
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let candidates: Vec<Value> = candidates.into_iter().map(Into::into).collect();
    Parser::new(move |input| {
        let text = input.as_scalar()?.trim();
        candidates
            .iter()
            .find(|candidate| matches_candidate(candidate, text))
            .cloned()
    })
}

fn matches_candidate(candidate: &Value, text: &str) -> bool {
    match candidate {
        Value::String(s) => s == text,
        Value::Int(i) => js_number(text) == Some(*i as f64),
        Value::Float(f) => js_number(text) == Some(*f),
        Value::Bool(b) => text == if *b { "true" } else { "false" },
        _ => false,
    }
}

/// The untouched text, when it matches `regex`.
pub fn reg_exp(regex: Regex) -> Parser {
    Parser::new(move |input| {
        let text = input.as_scalar()?;
        regex.is_match(text).then(|| text.into())
    })
}

/// A date, folded through `reducers` in order.
///
/// With no reducers the result is a `Value::Date`; otherwise its type
/// follows the last reducer (text, epoch millis or date).
///
/// ```
/// use typed_qs::date::reduce;
/// use typed_qs::{Input, Value, parsers};
///
/// let day = parsers::date(vec![reduce::start_of_day(), reduce::to_datetime_string()]);
/// assert_eq!(
///     day.parse(Input::Scalar("2020/01/11 11:11:11")),
///     Some(Value::from("2020-01-11 00:00:00"))
/// );
/// ```
pub fn date(reducers: Vec<Reducer>) -> Parser {
    Parser::new(move |input| {
        let text = input.as_scalar()?.trim();
        let date = to_date(&DateLike::from(text))?;
        compose(&reducers, DateLike::Date(date)).map(Value::from)
    })
}

/// A date, folded through `reducers`, then written as `YYYY-MM-DD`.
pub fn date_pattern(mut reducers: Vec<Reducer>) -> Parser {
    reducers.push(reduce::to_date_string());
    date(reducers)
}

/// A date, folded through `reducers`, then written as `YYYY-MM-DD HH:mm:ss`.
pub fn datetime_pattern(mut reducers: Vec<Reducer>) -> Parser {
    reducers.push(reduce::to_datetime_string());
    date(reducers)
}

/// A parser from any closure.
pub fn any<F>(f: F) -> Parser
where
    F: Fn(Input<'_>) -> Option<Value> + Send + Sync + 'static,
{
    Parser::new(f)
}

/// Coerces text to a number the way JavaScript's `Number()` does, except
/// that blank text is not a number.
pub(crate) fn js_number(text: &str) -> Option<f64> {
    static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
            .expect("valid decimal regex")
    });

    let text = text.trim();
    match text {
        "" => return None,
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    for (prefixes, radix) in [(["0x", "0X"], 16), (["0o", "0O"], 8), (["0b", "0B"], 2)] {
        if let Some(digits) = prefixes.iter().find_map(|p| text.strip_prefix(p)) {
            if digits.is_empty() {
                return None;
            }
            // literals of any width, with f64 precision
            return digits.chars().try_fold(0.0, |acc: f64, c| {
                c.to_digit(radix)
                    .map(|digit| acc * f64::from(radix) + f64::from(digit))
            });
        }
    }
    if DECIMAL.is_match(text) {
        text.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scalar(parser: &Parser, text: &str) -> Option<Value> {
        parser.parse(Input::Scalar(text))
    }

    fn list(parser: &Parser, items: &[&str]) -> Option<Value> {
        let items: Vec<String> = items.iter().map(|s| (*s).to_owned()).collect();
        parser.parse(Input::List(&items))
    }

    #[test]
    fn js_number_coercion() {
        assert_eq!(js_number(" 12 "), Some(12.0));
        assert_eq!(js_number("-1.5e3"), Some(-1500.0));
        assert_eq!(js_number(".5"), Some(0.5));
        assert_eq!(js_number("5."), Some(5.0));
        assert_eq!(js_number("0x1F"), Some(31.0));
        assert_eq!(js_number("0b101"), Some(5.0));
        assert_eq!(js_number("0o17"), Some(15.0));
        assert_eq!(js_number("-Infinity"), Some(f64::NEG_INFINITY));
        let wide = format!("0x{}", "F".repeat(34));
        assert_eq!(js_number(&wide), Some(16f64.powi(34) - 1.0));
        assert!(js_number(&format!("0b1{}", "0".repeat(200))).is_some_and(|n| n > 1e60));
        for text in ["", "  ", "1,2", "abc", "1e", "0x", "0x+1", "inf", "NaN", "-0x1"] {
            assert_eq!(js_number(text), None, "{text:?}");
        }
    }

    #[test]
    fn string_parser() {
        assert_eq!(scalar(&string(true), "  hi "), Some("hi".into()));
        assert_eq!(scalar(&string(false), "  hi "), Some("  hi ".into()));
        assert_eq!(scalar(&string(true), ""), Some("".into()));
        assert_eq!(list(&string(true), &["a", " b"]), Some("a, b".into()));
        assert_eq!(string(true).parse(Input::Absent), None);
    }

    #[test]
    fn number_parser() {
        assert_eq!(scalar(&number(), "12.34"), Some(Value::Float(12.34)));
        assert_eq!(scalar(&number(), "-2"), Some(Value::Float(-2.0)));
        assert_eq!(scalar(&number(), ""), None);
        assert_eq!(scalar(&number(), "12px"), None);
        assert_eq!(list(&number(), &["1"]), None);
    }

    #[test]
    fn boolean_parser() {
        assert_eq!(scalar(&boolean(), "true"), Some(Value::Bool(true)));
        assert_eq!(scalar(&boolean(), " false"), Some(Value::Bool(false)));
        assert_eq!(scalar(&boolean(), "1"), None);
        assert_eq!(scalar(&boolean(), "TRUE"), None);
        assert_eq!(list(&boolean(), &["true"]), None);
    }

    #[test]
    fn integer_parsers() {
        assert_eq!(scalar(&integer(), "-42"), Some(Value::Int(-42)));
        assert_eq!(scalar(&integer(), "007"), Some(Value::Int(7)));
        assert_eq!(scalar(&integer(), "9007199254740991"), Some(Value::Int(MAX_SAFE_INTEGER)));
        assert_eq!(scalar(&integer(), "9007199254740992"), None);
        assert_eq!(scalar(&integer(), "1.5"), None);
        assert_eq!(scalar(&integer(), " 1"), None);
        assert_eq!(scalar(&natural(), "42"), Some(Value::Int(42)));
        assert_eq!(scalar(&natural(), "-42"), None);
        assert_eq!(list(&natural(), &["1"]), None);
    }

    #[test]
    fn array_parser() {
        assert_eq!(
            scalar(&array(None), "a,b"),
            Some(Value::from(vec!["a", "b"]))
        );
        assert_eq!(
            list(&array(Some(integer())), &["1", "x", "-3"]),
            Some(Value::from(vec![1, -3]))
        );
        assert_eq!(scalar(&array(None), ""), Some(Value::from(vec![""])));
        assert_eq!(array(None).parse(Input::Absent), None);
    }

    #[test]
    fn one_of_parser() {
        let roles = one_of(["GUEST", "MASTER"]);
        assert_eq!(scalar(&roles, " MASTER "), Some("MASTER".into()));
        assert_eq!(scalar(&roles, "master"), None);
        assert_eq!(list(&roles, &["GUEST"]), None);

        let sizes = one_of([Value::Int(10), Value::Float(2.5), Value::Bool(true)]);
        assert_eq!(scalar(&sizes, "10"), Some(Value::Int(10)));
        assert_eq!(scalar(&sizes, "10.0"), Some(Value::Int(10)));
        assert_eq!(scalar(&sizes, "2.5"), Some(Value::Float(2.5)));
        assert_eq!(scalar(&sizes, "true"), Some(Value::Bool(true)));
        assert_eq!(scalar(&sizes, "11"), None);
    }

    #[test]
    fn reg_exp_parser() {
        let tag = reg_exp(Regex::new(r"^<\w+>$").unwrap());
        assert_eq!(scalar(&tag, "<abc>"), Some("<abc>".into()));
        assert_eq!(scalar(&tag, "abc"), None);
        assert_eq!(list(&tag, &["<abc>"]), None);
    }

    #[test]
    fn date_parsers() {
        let parsed = scalar(&date(vec![]), " 2020-01-11 11:11:11 ").unwrap();
        assert!(matches!(parsed, Value::Date(_)), "got: {parsed:?}");
        assert_eq!(
            scalar(&date_pattern(vec![]), "2020/01/11 11:11:11"),
            Some("2020-01-11".into())
        );
        assert_eq!(
            scalar(&datetime_pattern(vec![reduce::end_of_day()]), "2020-01-11"),
            Some("2020-01-11 23:59:59".into())
        );
        assert_eq!(scalar(&date(vec![]), "soon"), None);
        assert_eq!(scalar(&date(vec![]), ""), None);
        assert_eq!(list(&date(vec![]), &["2020-01-11"]), None);
    }

    #[test]
    fn any_parser() {
        let length = any(|input| match input {
            Input::Absent => Some(Value::Int(-1)),
            Input::Scalar(s) => Some(Value::Int(s.len() as i64)),
            Input::List(items) => Some(Value::Int(items.len() as i64)),
        });
        assert_eq!(scalar(&length, "abc"), Some(Value::Int(3)));
        assert_eq!(list(&length, &["a", "b"]), Some(Value::Int(2)));
        assert_eq!(length.parse(Input::Absent), Some(Value::Int(-1)));
    }
}
