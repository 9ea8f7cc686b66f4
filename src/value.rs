//! Value types on either side of the template engine.
//!
//! [`RawValue`] is what the tokenizer produces from a querystring: strings,
//! lists of strings and nested objects/arrays of those, with no typing.
//! [`Value`] is what the engine produces after the leaf parsers have run,
//! and is also the shape of a defaults tree and the input to `stringify`.

use std::fmt;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

mod de;

pub use de::from_value;

/// An insertion-ordered map, used for both raw and parsed objects.
pub type Map<V> = IndexMap<String, V>;

/// The tokenized form of a querystring.
///
/// - `String`: a single value, e.g. `name=Acme`
/// - `Strings`: repeated or indexed values, e.g. `id=1&id=2` or `id[]=1&id[]=2`
/// - `Object`: nested keys, e.g. `user[name]=John&user[age]=30`
/// - `Array`: indexed nested structures, e.g. `users[0][name]=John`
///
/// Absence is expressed with `Option<&RawValue>`; there is no "undefined"
/// variant.
#[derive(Clone, PartialEq)]
pub enum RawValue {
    String(String),
    Strings(Vec<String>),
    Object(Map<RawValue>),
    Array(Vec<RawValue>),
}

impl RawValue {
    /// Looks up `key` when this is an object.
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        match self {
            RawValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Describes the shape of this value for error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            RawValue::String(_) => "a string",
            RawValue::Strings(_) => "a list of strings",
            RawValue::Object(_) => "a nested map",
            RawValue::Array(_) => "a nested sequence",
        }
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::String(s) => write!(f, "String({s})"),
            RawValue::Strings(s) => f.debug_list().entries(s.iter()).finish(),
            RawValue::Object(m) => f.debug_map().entries(m.iter()).finish(),
            RawValue::Array(a) => f.debug_list().entries(a.iter()).finish(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::String(s.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::String(s)
    }
}

impl<const N: usize> From<[&str; N]> for RawValue {
    fn from(list: [&str; N]) -> Self {
        RawValue::Strings(list.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl FromIterator<(String, RawValue)> for RawValue {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        RawValue::Object(iter.into_iter().collect())
    }
}

/// A typed value produced by parsing a querystring against a template.
///
/// `Null` marks an absent value: a template field with no raw data and no
/// default, or a "not set" entry in a defaults tree.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A local, wall-clock date and time.
    Date(NaiveDateTime),
    Array(Vec<Value>),
    Object(Map<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Looks up `key` when this is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Looks up position `index` when this is an array.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Builds an object from `(key, value)` pairs, keeping their order.
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The ISO-8601 text used whenever a date leaves the crate as a string.
pub(crate) const DATE_SERIALIZE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

macro_rules! value_from {
    ($($ty:ty => $variant:ident,)*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
    NaiveDateTime => Date,
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().collect())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(&d.format(DATE_SERIALIZE_FORMAT)),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}
