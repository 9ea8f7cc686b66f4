use std::io::Write;

use crate::error::Result;
use crate::value::{RawValue, Value};

/// Configuration for tokenizing and stringifying querystrings.
///
/// ## Nesting Depth
///
/// The `max_depth` parameter controls how deeply nested keys are split.
/// Past the limit, the remaining brackets are kept as one literal key
/// segment, so maliciously deep inputs cannot blow up the tree. A
/// `max_depth` of 0 means no nesting is allowed (flat key-value pairs only).
///
/// Default value: `max_depth = 5`
///
/// ```
/// use typed_qs::{Config, RawValue};
///
/// let config = Config::new().max_depth(0);
/// let raw = config.tokenize("a[b][c]=1").unwrap();
/// assert_eq!(raw.get("a[b][c]"), Some(&RawValue::from("1")));
///
/// let raw = Config::new().tokenize("a[b][c]=1").unwrap();
/// let c = raw.get("a").and_then(|a| a.get("b")).and_then(|b| b.get("c"));
/// assert_eq!(c, Some(&RawValue::from("1")));
/// ```
///
/// ## Array Limit
///
/// Indexed keys such as `a[3]=x` only build arrays while the index is at
/// most `array_limit` (default 20). Larger indices produce an object keyed
/// by the index text instead, so `a[99999999]=x` cannot allocate a huge
/// sparse array.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub(crate) max_depth: usize,
    pub(crate) array_limit: usize,
    pub(crate) ignore_query_prefix: bool,
    pub(crate) use_form_encoding: bool,
    pub(crate) array_format: ArrayFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayFormat {
    /// Use the `a[0]=1&a[1]=2` format.
    Indexed,
    /// Use the `a[]=1&a[]=2` format.
    EmptyIndexed,
    /// Use the `a=1&a=2` format.
    Unindexed,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            max_depth: 5,
            array_limit: 20,
            ignore_query_prefix: true,
            use_form_encoding: cfg!(feature = "default_to_form_encoding"),
            array_format: ArrayFormat::Indexed,
        }
    }

    /// Specifies the maximum depth key that will be split into nested
    /// segments. Default is 5.
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Specifies the largest index that still builds an array. Default is 20.
    pub const fn array_limit(mut self, array_limit: usize) -> Self {
        self.array_limit = array_limit;
        self
    }

    /// Whether a leading `?` is stripped before tokenizing. Default is `true`,
    /// so `location.search`-style strings can be passed as is.
    pub const fn ignore_query_prefix(mut self, ignore_query_prefix: bool) -> Self {
        self.ignore_query_prefix = ignore_query_prefix;
        self
    }

    /// By default, querystrings use query-string encoding, as defined
    /// in [WHATWG](https://url.spec.whatwg.org/#query-percent-encode-set).
    ///
    /// This is a relatively lax encoding scheme, which does not
    /// percent encode many characters (like square brackets in keys).
    ///
    /// To use form encoding, set this to `true`. Brackets in keys are then
    /// written as `%5B`/`%5D`, and those sequences are decoded as brackets
    /// when tokenizing.
    /// Alternatively, you can use the `default_to_form_encoding` Cargo feature
    /// to set this to `true` by default.
    pub const fn use_form_encoding(mut self, use_form_encoding: bool) -> Self {
        self.use_form_encoding = use_form_encoding;
        self
    }

    /// Specifies how arrays should be formatted in the querystring
    /// during stringifying.
    ///
    /// The default is `Indexed`, which results in keys like `a[0]=1&a[1]=2`.
    pub const fn array_format(mut self, array_format: ArrayFormat) -> Self {
        self.array_format = array_format;
        self
    }

    /// Tokenizes a querystring into its raw nested form using this `Config`.
    pub fn tokenize(self, input: &str) -> Result<RawValue> {
        crate::de::tokenize_with(input, self)
    }

    /// Stringifies a value to a querystring using this `Config`.
    pub fn stringify(self, input: &Value) -> Result<String> {
        // initialize the buffer with 128 bytes
        // this is a guess based on what `serde_json` does
        let mut buffer = Vec::with_capacity(128);
        crate::ser::write_value(&mut buffer, input, self)?;
        String::from_utf8(buffer).map_err(crate::Error::from)
    }

    /// Stringifies a value into a generic writer using this `Config`.
    pub fn stringify_to_writer<W: Write>(self, input: &Value, writer: &mut W) -> Result<()> {
        crate::ser::write_value(writer, input, self)
    }
}
