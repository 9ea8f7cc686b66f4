use std::borrow::Cow;
use std::fmt;
use std::slice::Iter;

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::error::{Error, Result};
use crate::value::RawValue;

mod decode;

pub type ParsedMap<'qs> = IndexMap<Key<'qs>, ParsedValue<'qs>>;

/// Represents a key in the parsed querystring.
///
/// Keys can be either integers (for array indices) or strings (for object keys).
/// This allows the parser to handle both `items[0]=foo` (integer key) and
/// `user[name]=bar` (string key) notations.
///
/// Only canonical decimal text becomes an `Int`: `items[007]` keeps the
/// string key `"007"` so the original spelling survives into objects.
#[derive(PartialEq, Eq, Hash)]
pub enum Key<'a> {
    Int(usize),
    String(Cow<'a, str>),
}

impl Key<'_> {
    /// In some cases, we would rather push an empty key
    /// (e.g. for `[a]=1` the root segment is empty).
    fn empty_key() -> Self {
        Key::String(Cow::Borrowed(""))
    }

    fn into_string(self) -> String {
        match self {
            Key::Int(i) => itoa::Buffer::new().format(i).to_owned(),
            Key::String(s) => s.into_owned(),
        }
    }
}

impl fmt::Debug for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::String(s) => write!(f, "\"{s}\""),
        }
    }
}

/// An intermediate representation of the parsed query string.
///
/// The parser builds a tree of these values before it is folded into
/// [`RawValue`]s by [`into_raw`].
///
/// - `Map`: Nested objects like `user[name]=John&user[age]=30`
/// - `Sequence`: Arrays like `ids[]=1&ids[]=2`, or repeated keys
/// - `String`: Leaf values; both `key=` and a bare `key` yield `""`
/// - `Uninitialized`: Used internally during parsing for placeholder values
#[derive(Debug, PartialEq)]
pub enum ParsedValue<'qs> {
    Map(ParsedMap<'qs>),
    Sequence(Vec<ParsedValue<'qs>>),
    String(Cow<'qs, str>),
    Uninitialized,
}

impl ParsedValue<'_> {
    fn empty() -> Self {
        ParsedValue::String(Cow::Borrowed(""))
    }
}

pub fn parse(encoded_string: &[u8], config: crate::Config) -> Result<ParsedMap<'_>> {
    let mut parser = Parser::new(encoded_string, config);
    let mut output = ParsedMap::default();
    parser.parse(&mut output)?;

    Ok(output)
}

/// The `Parser` struct is a stateful querystring parser.
///
/// It iterates over a slice of bytes, maintaining an accumulator range `(start, end)`
/// to track the current segment being parsed. This approach avoids allocations
/// by working directly with slices of the input string.
///
/// The parser handles bracket notation for nested structures and supports both
/// query-string encoding and form encoding modes.
struct Parser<'qs> {
    inner: &'qs [u8],
    iter: Iter<'qs, u8>,
    index: usize,
    acc: (usize, usize),
    config: crate::Config,
}

impl Parser<'_> {
    fn next(&mut self) -> Option<u8> {
        self.acc.1 = self.index;
        self.index += 1;
        let mut next = self.iter.next().copied();

        if self.config.use_form_encoding && matches!(next, Some(b'%')) {
            // in formencoding mode, we will eagerly decode any
            // percent-encoded brackets
            let bracket = match self.iter.as_slice() {
                [b'5', b'B' | b'b', ..] => Some(b'['),
                [b'5', b'D' | b'd', ..] => Some(b']'),
                _ => None,
            };
            if bracket.is_some() {
                // skip the next two characters
                let _ = self.iter.next();
                let _ = self.iter.next();
                self.index += 2;
                next = bracket;
            }
        }
        next
    }
}

impl<'qs> Parser<'qs> {
    pub fn new(encoded: &'qs [u8], config: crate::Config) -> Self {
        Parser {
            inner: encoded,
            iter: encoded.iter(),
            acc: (0, 0),
            index: 0,
            config,
        }
    }

    /// Resets the accumulator range by setting `(start, end)` to `(end, end)`.
    fn clear_acc(&mut self) {
        self.acc = (self.index, self.index);
    }

    /// Extracts a key from the range tracked by the parser.
    /// Avoids allocations when neither percent encoded, nor `'+'` values are
    /// present.
    fn collect_key(&mut self) -> Option<Key<'qs>> {
        if self.acc.0 == self.acc.1 {
            // no bytes to parse
            return None;
        }
        let inner = self.inner;
        let bytes = &inner[self.acc.0..self.acc.1];
        self.clear_acc();
        let canonical_int = bytes.iter().all(|b| b.is_ascii_digit())
            && (bytes.len() == 1 || bytes[0] != b'0');
        if canonical_int {
            // all bytes are ASCII digits, so this is valid utf-8
            if let Some(i) = std::str::from_utf8(bytes)
                .ok()
                .and_then(|key| key.parse::<usize>().ok())
            {
                return Some(Key::Int(i));
            }
            // overflowing indices fall back to the string case
        }
        Some(Key::String(decode::decode(bytes)))
    }

    /// Extracts the value up until the next `&` (or the end of the string).
    fn collect_value(&mut self) -> ParsedValue<'qs> {
        // clear the accumulator to start fresh
        self.clear_acc();
        while !matches!(self.next(), None | Some(b'&')) {
            // eat bytes up until the next '&' (or end of string) as the value
        }

        if self.acc.0 == self.acc.1 {
            return ParsedValue::empty();
        }

        let inner = self.inner;
        let decoded = decode::decode(&inner[self.acc.0..self.acc.1]);
        self.clear_acc();
        ParsedValue::String(decoded)
    }

    /// Main parsing entry point that processes the querystring into a map structure.
    ///
    /// It processes the input byte-by-byte, handling special characters like
    /// `&` (pair separator), `=` (key-value separator), and `[`/`]` (nesting).
    /// Pairs without a key (`&&` or `=value`) are skipped.
    fn parse(&mut self, root_map: &mut ParsedMap<'qs>) -> Result<()> {
        if self.inner.is_empty() {
            // empty string -- nothing to parse
            return Ok(());
        }
        let no_nesting = self.config.max_depth == 0;
        loop {
            let Some(x) = self.next() else {
                // we reached the end of the string
                // push the key (if exists) with an empty value
                if let Some(key) = self.collect_key() {
                    insert_unique(self, root_map, key, ParsedValue::empty())?;
                }
                return Ok(());
            };

            match x {
                b'&' => {
                    // we have a simple key with no value
                    if let Some(key) = self.collect_key() {
                        insert_unique(self, root_map, key, ParsedValue::empty())?;
                    }
                }
                b'=' => {
                    let key = self.collect_key();
                    let value = self.collect_value();
                    if let Some(key) = key {
                        insert_unique(self, root_map, key, value)?;
                    }
                }
                b'[' if !no_nesting => {
                    // we have a nested key
                    // first get the first segment of the key
                    // and parse the rest of the key
                    let root = self.collect_key().unwrap_or_else(Key::empty_key);
                    let node = root_map.entry(root).or_insert(ParsedValue::Uninitialized);
                    self.parse_nested_key(node, 0)?;
                }
                _ => {
                    // for any other character
                    // do nothing, keep accumulating the key
                    continue;
                }
            }

            // if we reached here we pushed a new value -- clear the accumulator
            self.clear_acc();
        }
    }

    fn parse_nested_key(
        &mut self,
        current_node: &mut ParsedValue<'qs>,
        depth: usize,
    ) -> Result<()> {
        let reached_max_depth = depth >= self.config.max_depth;
        if !reached_max_depth {
            // if we haven't reached the maximum depth yet, we can clear the accumulator
            // otherwise, we want to keep the accumulated `[` character
            self.clear_acc();
        }

        let Some(first_byte) = self.next() else {
            return Err(Error::parse_err(
                "query string ended before expected",
                self.index,
            ));
        };

        if first_byte == b']' && !reached_max_depth {
            // empty key (e.g. "[]") -- parse as a sequence
            match current_node {
                ParsedValue::Sequence(seq) => {
                    parse_sequence_value(self, seq)?;
                }
                ParsedValue::Uninitialized => {
                    let mut seq = vec![];
                    parse_sequence_value(self, &mut seq)?;
                    *current_node = ParsedValue::Sequence(seq);
                }
                ParsedValue::String(_) => {
                    // a plain value seen first joins the sequence
                    let existing = std::mem::replace(current_node, ParsedValue::Uninitialized);
                    let mut seq = vec![existing];
                    parse_sequence_value(self, &mut seq)?;
                    *current_node = ParsedValue::Sequence(seq);
                }
                ParsedValue::Map(_) => {
                    return Err(Error::parse_err(
                        "invalid input: the same key is used for both a nested map and a sequence",
                        self.index,
                    ));
                }
            }
            return Ok(());
        }

        // otherwise we have a key
        // and this entry _must_ be a map
        let map = expect_map(self, current_node)?;

        if reached_max_depth {
            // if we've reached the maximum depth already, we'll just parse the entire
            // remaining key as a string and insert it into the map
            let mut next = Some(first_byte);
            loop {
                match next {
                    None | Some(b'&') => {
                        let key = self.collect_key().unwrap_or_else(Key::empty_key);
                        insert_unique(self, map, key, ParsedValue::empty())?;
                    }
                    Some(b'=') => {
                        let key = self.collect_key().unwrap_or_else(Key::empty_key);
                        let value = self.collect_value();
                        insert_unique(self, map, key, value)?;
                    }
                    Some(_) => {
                        next = self.next();
                        continue;
                    }
                }
                return Ok(());
            }
        }

        // parse until the closing bracket
        loop {
            let Some(b) = self.next() else {
                return Err(Error::parse_err(
                    "unexpected end of input while parsing nested key",
                    self.index,
                ));
            };
            if b != b']' {
                continue;
            }

            // finished parsing the key
            let segment = self.collect_key().unwrap_or_else(Key::empty_key);

            // get next byte to determine next step
            match self.next() {
                None | Some(b'&') => {
                    insert_unique(self, map, segment, ParsedValue::empty())?;
                }
                Some(b'=') => {
                    let value = self.collect_value();
                    insert_unique(self, map, segment, value)?;
                }
                Some(b'[') => {
                    let node = map.entry(segment).or_insert(ParsedValue::Uninitialized);
                    self.parse_nested_key(node, depth + 1)?;
                }
                Some(x) => {
                    let char = x as char;
                    return Err(Error::parse_err(
                        format!(
                            "unexpected character `{char}` while parsing nested key: expected `&`, `=` or `[`"
                        ),
                        self.index,
                    ));
                }
            }
            return Ok(());
        }
    }
}

fn insert_unique<'qs>(
    parser: &Parser<'_>,
    map: &mut ParsedMap<'qs>,
    key: Key<'qs>,
    value: ParsedValue<'qs>,
) -> Result<()> {
    match map.entry(key) {
        Entry::Occupied(mut o) => {
            let entry = o.get_mut();
            match entry {
                ParsedValue::Sequence(parsed_values) => {
                    // a repeated key appends to the existing values
                    parsed_values.push(value);
                }
                ParsedValue::String(_) => {
                    // we support multiple values for the same key
                    // by converting the existing value into a sequence
                    let existing = std::mem::replace(entry, ParsedValue::Uninitialized);
                    *entry = ParsedValue::Sequence(vec![existing, value]);
                }
                ParsedValue::Map(_) => {
                    return Err(Error::parse_err(
                        format!(
                            "invalid input: the same key is used for both a value and a nested map: {:?}",
                            o.key()
                        ),
                        parser.index,
                    ));
                }
                ParsedValue::Uninitialized => {
                    return Err(Error::parse_err(
                        format!("internal error: value is uninitialized: {:?}", o.key()),
                        parser.index,
                    ));
                }
            }
        }
        Entry::Vacant(v) => {
            v.insert(value);
        }
    }
    Ok(())
}

fn parse_sequence_value<'qs>(
    parser: &mut Parser<'qs>,
    seq: &mut Vec<ParsedValue<'qs>>,
) -> Result<()> {
    match parser.next() {
        Some(b'=') => {
            // Key is finished, parse up until the '&' as the value
            let value = parser.collect_value();
            seq.push(value);
        }
        None | Some(b'&') => {
            // No value
            seq.push(ParsedValue::empty());
        }
        Some(b'[') => {
            // we cannot handle unindexed sequences of maps
            // since we would have parsing ambiguity
            // e.g. `abc[][x]=1&abc[][y]=2`
            // could either be two entries with `x` and `y` set alternatively
            // or a single entry with both set
            return Err(Error::parse_err(
                "unsupported: unable to parse nested maps of unindexed sequences",
                parser.index,
            ));
        }
        Some(_) => {
            return Err(Error::parse_err(
                "unsupported: unexpected character after `[]`",
                parser.index,
            ));
        }
    }
    Ok(())
}

fn expect_map<'a, 'qs>(
    parser: &Parser<'qs>,
    node: &'a mut ParsedValue<'qs>,
) -> Result<&'a mut ParsedMap<'qs>> {
    if matches!(node, ParsedValue::Uninitialized) {
        *node = ParsedValue::Map(ParsedMap::default());
    }
    match node {
        ParsedValue::Map(map) => Ok(map),
        ParsedValue::Sequence(_) => Err(Error::parse_err(
            "invalid input: the same key is used for both a sequence and a nested map",
            parser.index,
        )),
        ParsedValue::String(_) => Err(Error::parse_err(
            "invalid input: the same key is used for both a value and a nested map",
            parser.index,
        )),
        ParsedValue::Uninitialized => unreachable!("initialized above"),
    }
}

/// Folds the parsed tree into [`RawValue`]s.
///
/// The root is always an object. Nested maps whose keys are all indices
/// within `array_limit` become arrays ordered by index (sparse indices are
/// compacted), and arrays holding only strings become `RawValue::Strings`.
pub fn into_raw(root: ParsedMap<'_>, config: crate::Config) -> RawValue {
    RawValue::Object(
        root.into_iter()
            .map(|(k, v)| (k.into_string(), value_into_raw(v, config)))
            .collect(),
    )
}

fn value_into_raw(value: ParsedValue<'_>, config: crate::Config) -> RawValue {
    match value {
        ParsedValue::String(s) => RawValue::String(s.into_owned()),
        ParsedValue::Sequence(items) => {
            sequence(items.into_iter().map(|v| value_into_raw(v, config)).collect())
        }
        ParsedValue::Map(map) => map_into_raw(map, config),
        // a node is only left uninitialized if parsing aborted
        ParsedValue::Uninitialized => RawValue::String(String::new()),
    }
}

fn map_into_raw(map: ParsedMap<'_>, config: crate::Config) -> RawValue {
    let indexed = !map.is_empty()
        && map
            .keys()
            .all(|k| matches!(k, Key::Int(i) if *i <= config.array_limit));
    if !indexed {
        return RawValue::Object(
            map.into_iter()
                .map(|(k, v)| (k.into_string(), value_into_raw(v, config)))
                .collect(),
        );
    }

    let mut entries: Vec<_> = map.into_iter().collect();
    entries.sort_by_key(|(k, _)| match k {
        Key::Int(i) => *i,
        Key::String(_) => usize::MAX,
    });
    sequence(
        entries
            .into_iter()
            .map(|(_, v)| value_into_raw(v, config))
            .collect(),
    )
}

fn sequence(items: Vec<RawValue>) -> RawValue {
    if !items.iter().all(|i| matches!(i, RawValue::String(_))) {
        return RawValue::Array(items);
    }
    RawValue::Strings(
        items
            .into_iter()
            .filter_map(|i| match i {
                RawValue::String(s) => Some(s),
                _ => None,
            })
            .collect(),
    )
}

#[cfg(test)]
mod test {
    use std::borrow::Cow;

    use crate::Config;

    use super::{Key, ParsedMap, ParsedValue, parse};

    use pretty_assertions::assert_eq;

    const DEFAULT_CONFIG: Config = Config::new().max_depth(10);
    const FORM_ENCODING_CONFIG: Config = DEFAULT_CONFIG.use_form_encoding(true);

    impl<'a> From<&'a str> for ParsedValue<'a> {
        fn from(s: &'a str) -> Self {
            ParsedValue::String(Cow::Borrowed(s))
        }
    }

    impl<'a> From<&'a str> for Key<'a> {
        fn from(s: &'a str) -> Self {
            Key::String(Cow::Borrowed(s))
        }
    }

    impl From<usize> for Key<'_> {
        fn from(i: usize) -> Self {
            Key::Int(i)
        }
    }

    #[test]
    fn parse_empty() {
        let parsed = parse(b"", DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, ParsedMap::default())
    }

    #[test]
    fn parse_map_no_value() {
        let parsed = parse(b"abc&def=", DEFAULT_CONFIG).unwrap();
        assert_eq!(
            parsed,
            ParsedMap::from_iter([("abc".into(), "".into()), ("def".into(), "".into())])
        );
    }

    #[test]
    fn parse_skips_empty_keys() {
        let parsed = parse(b"&&=2&a=1", DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, ParsedMap::from_iter([("a".into(), "1".into())]));
    }

    #[test]
    fn parse_ordered_sequence() {
        let parsed = parse(b"abc[1]=1&abc[0]=0&abc[007]=7", DEFAULT_CONFIG).unwrap();
        assert_eq!(
            parsed,
            ParsedMap::from_iter([(
                "abc".into(),
                ParsedValue::Map(ParsedMap::from_iter([
                    (1.into(), "1".into()),
                    (0.into(), "0".into()),
                    ("007".into(), "7".into()),
                ]))
            )])
        );
    }

    #[test]
    fn parse_repeated_keys() {
        let parsed = parse(b"a=1&a=2&a", DEFAULT_CONFIG).unwrap();
        assert_eq!(
            parsed,
            ParsedMap::from_iter([(
                "a".into(),
                ParsedValue::Sequence(vec!["1".into(), "2".into(), "".into()])
            )])
        );
    }

    #[test]
    fn parse_value_and_sequence_any_order() {
        let expected = ParsedMap::from_iter([(
            "a".into(),
            ParsedValue::Sequence(vec!["1".into(), "2".into()]),
        )]);
        assert_eq!(parse(b"a=1&a[]=2", DEFAULT_CONFIG).unwrap(), expected);
        assert_eq!(parse(b"a[]=1&a=2", DEFAULT_CONFIG).unwrap(), expected);

        let parsed = parse(b"abc&abc[]=1&abc[]=2", DEFAULT_CONFIG).unwrap();
        assert_eq!(
            parsed,
            ParsedMap::from_iter([(
                "abc".into(),
                ParsedValue::Sequence(vec!["".into(), "1".into(), "2".into()])
            )])
        );
    }

    #[test]
    fn parse_map_and_sequence() {
        let parse_err = parse(b"abc[x]=1&abc[]=2", DEFAULT_CONFIG).unwrap_err();
        assert!(
            parse_err
                .to_string()
                .contains("the same key is used for both a nested map and a sequence"),
            "got: {}",
            parse_err
        );
    }

    #[test]
    fn parse_value_and_map() {
        let parse_err = parse(b"abc[x]=1&abc=2", DEFAULT_CONFIG).unwrap_err();
        assert!(
            parse_err
                .to_string()
                .contains("the same key is used for both a value and a nested map"),
            "got: {}",
            parse_err
        );
    }

    #[test]
    fn parse_unclosed_bracket() {
        let parse_err = parse(b"abc[def=1", DEFAULT_CONFIG).unwrap_err();
        assert!(
            parse_err.to_string().contains("unexpected end of input"),
            "got: {}",
            parse_err
        );
    }

    #[test]
    fn parse_unindexed_sequence_of_maps() {
        let parse_err = parse(b"abc[][x]=1", DEFAULT_CONFIG).unwrap_err();
        assert!(
            parse_err.to_string().contains("nested maps of unindexed sequences"),
            "got: {}",
            parse_err
        );
    }

    #[test]
    fn parse_formencoded_brackets() {
        // in form encoding mode, the brackets are eagerly decoded
        let parsed = parse(b"abc%5Bdef%5D=ghi", FORM_ENCODING_CONFIG).unwrap();
        assert_eq!(
            parsed,
            ParsedMap::from_iter([(
                "abc".into(),
                ParsedValue::Map(ParsedMap::from_iter([("def".into(), "ghi".into())]))
            )])
        );

        let parsed = parse(b"foo=%5BHello%5D", FORM_ENCODING_CONFIG).unwrap();
        assert_eq!(
            parsed,
            ParsedMap::from_iter([("foo".into(), "[Hello]".into())])
        );
    }

    #[test]
    fn parse_encoded_brackets() {
        // otherwise the brackets are not structural, so we end up with a key
        // containing brackets
        let parsed = parse(b"abc%5Bdef%5D=ghi", DEFAULT_CONFIG).unwrap();
        assert_eq!(
            parsed,
            ParsedMap::from_iter([("abc[def]".into(), "ghi".into())])
        );
    }
}
