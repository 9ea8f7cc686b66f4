use serde::de::value::{MapDeserializer, SeqDeserializer, StringDeserializer};
use serde::de::{self, IntoDeserializer};

use super::{DATE_SERIALIZE_FORMAT, Value};
use crate::error::{Error, Result};

/// Deserializes a parsed [`Value`] into any `T: Deserialize`.
///
/// `Value::Null` fields deserialize as `None` for `Option` fields, and
/// dates as their ISO-8601 text (which `chrono`'s serde support accepts).
///
/// ```
/// use serde::Deserialize;
/// use typed_qs::{Value, from_value};
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Page {
///     page: u32,
///     tag: Option<String>,
/// }
///
/// let value = Value::object([("page", Value::from(3)), ("tag", Value::Null)]);
/// assert_eq!(from_value::<Page>(value).unwrap(), Page { page: 3, tag: None });
/// ```
pub fn from_value<T: de::DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(value)
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(i) => visitor.visit_i64(i),
            Value::Float(f) => visitor.visit_f64(f),
            Value::String(s) => visitor.visit_string(s),
            Value::Date(d) => visitor.visit_string(d.format(DATE_SERIALIZE_FORMAT).to_string()),
            Value::Array(items) => {
                let mut seq: SeqDeserializer<_, Error> = SeqDeserializer::new(items.into_iter());
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Value::Object(map) => {
                let mut map: MapDeserializer<'_, _, Error> = MapDeserializer::new(map.into_iter());
                let value = visitor.visit_map(&mut map)?;
                map.end()?;
                Ok(value)
            }
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self {
            // only unit variants can be expressed by a leaf parser
            Value::String(s) => {
                let variant: StringDeserializer<Error> = s.into_deserializer();
                visitor.visit_enum(variant)
            }
            other => Err(de::Error::invalid_type(other.unexpected(), &"a unit variant")),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

impl Value {
    fn unexpected(&self) -> de::Unexpected<'_> {
        match self {
            Value::Null => de::Unexpected::Unit,
            Value::Bool(b) => de::Unexpected::Bool(*b),
            Value::Int(i) => de::Unexpected::Signed(*i),
            Value::Float(f) => de::Unexpected::Float(*f),
            Value::String(s) => de::Unexpected::Str(s),
            Value::Date(_) => de::Unexpected::Other("date"),
            Value::Array(_) => de::Unexpected::Seq,
            Value::Object(_) => de::Unexpected::Map,
        }
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;

    use super::from_value;
    use crate::Value;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "UPPERCASE")]
    enum Role {
        Guest,
        Master,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Group {
        id: u64,
        tags: Vec<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Query {
        active: bool,
        price: f64,
        role: Role,
        group: Group,
        note: Option<String>,
    }

    #[test]
    fn deserialize_struct() {
        let value = Value::object([
            ("active", Value::from(true)),
            ("price", Value::from(12)),
            ("role", Value::from("MASTER")),
            (
                "group",
                Value::object([
                    ("id", Value::from(654321)),
                    ("tags", Value::from(vec!["crm"])),
                ]),
            ),
            ("note", Value::Null),
        ]);
        let query: Query = from_value(value).unwrap();
        assert_eq!(
            query,
            Query {
                active: true,
                price: 12.0,
                role: Role::Master,
                group: Group {
                    id: 654321,
                    tags: vec!["crm".to_owned()],
                },
                note: None,
            }
        );
    }

    #[test]
    fn deserialize_enum_variants() {
        assert_eq!(from_value::<Role>(Value::from("GUEST")).unwrap(), Role::Guest);

        let err = from_value::<Role>(Value::Null).unwrap_err();
        assert!(err.to_string().contains("a unit variant"), "got: {err}");
    }
}
