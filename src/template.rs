//! Templates and the engine that walks them.
//!
//! A [`Template`] mirrors the shape of the value to be produced. The engine
//! walks the template, not the querystring, so keys the template does not
//! name are ignored and every key it names is present in the output.

use std::fmt;

use crate::error::{Error, Result};
use crate::parsers::{Input, Parser};
use crate::value::{Map, RawValue, Value};

/// The declared shape of a parse result.
///
/// ```
/// use typed_qs::{Template, parsers};
///
/// let template = Template::mapping([
///     ("id", Template::from(parsers::natural())),
///     ("group", Template::mapping([("name", parsers::string(true))])),
///     ("range", Template::sequence([parsers::date(vec![]), parsers::date(vec![])])),
/// ]);
/// # let _ = template;
/// ```
#[derive(Clone, Debug)]
pub enum Template {
    Leaf(Parser),
    Mapping(Map<Template>),
    Sequence(Vec<Template>),
}

impl Template {
    pub fn mapping<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Template>,
    {
        Template::Mapping(
            entries
                .into_iter()
                .map(|(k, t)| (k.into(), t.into()))
                .collect(),
        )
    }

    pub fn sequence<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Template>,
    {
        Template::Sequence(items.into_iter().map(Into::into).collect())
    }

    fn kind(&self) -> &'static str {
        match self {
            Template::Leaf(_) => "a scalar",
            Template::Mapping(_) => "a nested map",
            Template::Sequence(_) => "a nested sequence",
        }
    }
}

impl From<Parser> for Template {
    fn from(parser: Parser) -> Self {
        Template::Leaf(parser)
    }
}

/// Builds a typed value from a tokenized querystring.
///
/// For every leaf of `template`, the raw value at the same path is handed
/// to the leaf's parser. When the path is missing from `raw`, or the parser
/// yields nothing, the value at the same path in `defaults` is used, and
/// `Value::Null` when there is none. A `Value::Null` inside `defaults`
/// counts as no default.
///
/// A leaf that meets a nested structure, or a mapping/sequence that meets
/// a plain string, is an [`Error::ShapeMismatch`].
///
/// ```
/// use typed_qs::{Template, Value, parse_by_template, parsers, tokenize};
///
/// let raw = tokenize("id=7&role=ROOT").unwrap();
/// let template = Template::mapping([
///     ("id", parsers::natural()),
///     ("role", parsers::one_of(["GUEST", "MASTER"])),
/// ]);
/// let defaults = Value::object([("role", "GUEST")]);
/// assert_eq!(
///     parse_by_template(&raw, &template, Some(&defaults)).unwrap(),
///     Value::object([("id", Value::from(7)), ("role", Value::from("GUEST"))])
/// );
/// ```
pub fn parse_by_template(
    raw: &RawValue,
    template: &Template,
    defaults: Option<&Value>,
) -> Result<Value> {
    resolve(Slot::Raw(raw), template, defaults, &mut Path::default())
}

/// Where the engine currently is in the raw tree.
#[derive(Clone, Copy)]
enum Slot<'a> {
    Absent,
    Raw(&'a RawValue),
    /// One element of a `RawValue::Strings`.
    Item(&'a str),
}

impl<'a> Slot<'a> {
    fn get(self, key: &str) -> Slot<'a> {
        match self {
            Slot::Raw(RawValue::Object(map)) => map.get(key).map_or(Slot::Absent, Slot::Raw),
            Slot::Raw(RawValue::Array(_) | RawValue::Strings(_)) => match index_key(key) {
                Some(index) => self.index(index),
                None => Slot::Absent,
            },
            _ => Slot::Absent,
        }
    }

    fn index(self, index: usize) -> Slot<'a> {
        match self {
            Slot::Raw(RawValue::Array(items)) => items.get(index).map_or(Slot::Absent, Slot::Raw),
            Slot::Raw(RawValue::Strings(items)) => items
                .get(index)
                .map_or(Slot::Absent, |item| Slot::Item(item)),
            Slot::Raw(RawValue::Object(map)) => {
                let mut buffer = itoa::Buffer::new();
                map.get(buffer.format(index)).map_or(Slot::Absent, Slot::Raw)
            }
            _ => Slot::Absent,
        }
    }
}

/// `"3"` indexes an array, `"03"` does not.
fn index_key(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    let mut buffer = itoa::Buffer::new();
    (buffer.format(index) == key).then_some(index)
}

/// The bracketed path of the current template node, e.g. `group[id]`.
#[derive(Default)]
struct Path(Vec<String>);

impl Path {
    fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((first, rest)) = self.0.split_first() else {
            return f.write_str("<root>");
        };
        f.write_str(first)?;
        for segment in rest {
            write!(f, "[{segment}]")?;
        }
        Ok(())
    }
}

fn resolve(
    slot: Slot<'_>,
    template: &Template,
    defaults: Option<&Value>,
    path: &mut Path,
) -> Result<Value> {
    let defaults = defaults.filter(|d| !d.is_null());
    match template {
        Template::Leaf(parser) => resolve_leaf(slot, parser, defaults, path),
        Template::Mapping(entries) => {
            reject_scalar(slot, template, path)?;
            let mut object = Map::with_capacity(entries.len());
            for (key, template) in entries {
                path.push(key.as_str());
                let value = resolve(
                    slot.get(key),
                    template,
                    defaults.and_then(|d| default_at_key(d, key)),
                    path,
                )?;
                path.pop();
                object.insert(key.clone(), value);
            }
            Ok(Value::Object(object))
        }
        Template::Sequence(items) => {
            reject_scalar(slot, template, path)?;
            let mut array = Vec::with_capacity(items.len());
            for (index, template) in items.iter().enumerate() {
                path.push(index.to_string());
                let value = resolve(
                    slot.index(index),
                    template,
                    defaults.and_then(|d| default_at_index(d, index)),
                    path,
                )?;
                path.pop();
                array.push(value);
            }
            Ok(Value::Array(array))
        }
    }
}

fn reject_scalar(slot: Slot<'_>, template: &Template, path: &Path) -> Result<()> {
    match slot {
        Slot::Raw(raw @ RawValue::String(_)) => {
            Err(Error::shape_mismatch(path, template.kind(), raw.kind()))
        }
        Slot::Item(_) => Err(Error::shape_mismatch(path, template.kind(), "a string")),
        _ => Ok(()),
    }
}

fn resolve_leaf(
    slot: Slot<'_>,
    parser: &Parser,
    defaults: Option<&Value>,
    path: &Path,
) -> Result<Value> {
    let input = match slot {
        // the parser is not consulted for missing keys
        Slot::Absent => return Ok(defaults.cloned().unwrap_or_default()),
        Slot::Item(item) => Input::Scalar(item),
        Slot::Raw(RawValue::String(s)) => Input::Scalar(s),
        Slot::Raw(RawValue::Strings(items)) => Input::List(items),
        Slot::Raw(raw) => return Err(Error::shape_mismatch(path, "a scalar", raw.kind())),
    };
    Ok(parser
        .parse(input)
        .or_else(|| defaults.cloned())
        .unwrap_or_default())
}

fn default_at_key<'a>(defaults: &'a Value, key: &str) -> Option<&'a Value> {
    match defaults {
        Value::Array(items) => index_key(key).and_then(|index| items.get(index)),
        _ => defaults.get(key),
    }
}

fn default_at_index(defaults: &Value, index: usize) -> Option<&Value> {
    match defaults {
        Value::Object(map) => map.get(&index.to_string()),
        _ => defaults.get_index(index),
    }
}
