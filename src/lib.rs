//! Typed parsing of querystring-style strings
//!
//! Querystrings are not formally defined and loosely take the form of
//! _nested_ urlencoded queries. This library tokenizes them with the syntax
//! of [qs](https://github.com/ljharb/qs) and
//! [`Rack::Utils::parse_nested_query`](http://www.rubydoc.info/github/rack/rack/Rack/Utils#parse_nested_query-class_method),
//! then types the result with a declarative [`Template`].
//!
//! A template mirrors the shape of the expected value. Each leaf holds a
//! [`Parser`] from the [`parsers`] module, which turns the raw text into a
//! typed [`Value`] or rejects it. Rejected and missing fields fall back to
//! an optional defaults tree, so a template never fails on bad input data:
//! the only errors are querystrings that cannot be tokenized and raw
//! structures whose shape disagrees with the template.
//!
//! ## Usage
//!
//! ```
//! use typed_qs::date::reduce;
//! use typed_qs::{ParseOptions, Template, Value, parsers};
//!
//! let template = Template::mapping([
//!     ("id", Template::from(parsers::natural())),
//!     ("name", parsers::string(true).into()),
//!     ("role", parsers::one_of(["GUEST", "USER", "MASTER"]).into()),
//!     ("ids", parsers::array(Some(parsers::natural())).into()),
//!     (
//!         "since",
//!         parsers::date(vec![reduce::start_of_day(), reduce::to_datetime_string()]).into(),
//!     ),
//!     ("group", Template::mapping([("active", parsers::boolean())])),
//! ]);
//! let options = ParseOptions::new()
//!     .template(template)
//!     .defaults(Value::object([("role", "GUEST")]));
//!
//! let value = typed_qs::parse(
//!     "?id=42&name=+Acme+&role=ROOT&ids=1,2&since=2020-01-11+11:11:11&group[active]=true",
//!     &options,
//! )
//! .unwrap();
//! assert_eq!(
//!     value,
//!     Value::object([
//!         ("id", Value::from(42)),
//!         ("name", Value::from("Acme")),
//!         ("role", Value::from("GUEST")),
//!         ("ids", Value::from(vec![1, 2])),
//!         ("since", Value::from("2020-01-11 00:00:00")),
//!         ("group", Value::object([("active", true)])),
//!     ])
//! );
//! ```
//!
//! Values go back to querystrings with [`stringify`], and into plain Rust
//! types with [`from_value`] or [`parse_as`].

mod config;
pub mod date;
mod de;
mod error;
pub mod parsers;
mod ser;
mod template;
mod value;

use serde::de::DeserializeOwned;

#[doc(inline)]
pub use config::{ArrayFormat, Config};
#[doc(inline)]
pub use de::tokenize;
pub use error::{Error, Result};
#[doc(inline)]
pub use parsers::{Input, Parser};
#[doc(inline)]
pub use ser::stringify;
#[doc(inline)]
pub use template::{Template, parse_by_template};
#[doc(inline)]
pub use value::{Map, RawValue, Value, from_value};

/// Everything [`parse`] needs besides the querystring.
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    template: Option<Template>,
    defaults: Option<Value>,
    config: Config,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The template to parse against. Required.
    pub fn template(mut self, template: impl Into<Template>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Values for fields that are missing or rejected by their parser.
    pub fn defaults(mut self, defaults: impl Into<Value>) -> Self {
        self.defaults = Some(defaults.into());
        self
    }

    /// The tokenizer configuration. Defaults to [`Config::default`].
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }
}

/// Tokenizes `search` and parses it against the template in `options`.
///
/// Fails with [`Error::MissingTemplate`] before looking at `search` when no
/// template was given.
pub fn parse(search: &str, options: &ParseOptions) -> Result<Value> {
    let template = options.template.as_ref().ok_or(Error::MissingTemplate)?;
    let raw = options.config.tokenize(search)?;
    let value = parse_by_template(&raw, template, options.defaults.as_ref())?;
    tracing::debug!(
        len = search.len(),
        defaults = options.defaults.is_some(),
        "parsed querystring against template"
    );
    Ok(value)
}

/// Like [`parse`], then deserializes the value into `T`.
///
/// ```
/// use serde::Deserialize;
/// use typed_qs::{ParseOptions, Template, parsers};
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Page {
///     page: u32,
///     size: Option<u32>,
/// }
///
/// let options = ParseOptions::new().template(Template::mapping([
///     ("page", parsers::natural()),
///     ("size", parsers::one_of([10, 20, 30])),
/// ]));
/// let page: Page = typed_qs::parse_as("page=2&size=15", &options).unwrap();
/// assert_eq!(page, Page { page: 2, size: None });
/// ```
pub fn parse_as<T: DeserializeOwned>(search: &str, options: &ParseOptions) -> Result<T> {
    from_value(parse(search, options)?)
}
