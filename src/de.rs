//! Tokenizing querystrings into their raw nested form.
//!
//! ### An overview of the design
//!
//! Query parameters are not ordered: `a[0]=1&a[1]=2&b=Hello` may equally
//! arrive as `a[1]=2&b=Hello&a[0]=1`. The `parse` module therefore makes a
//! single pass over the bytes and builds a map structure first, keyed by
//! either indices or strings, before anything looks at it.
//!
//! That intermediate tree is then folded into [`RawValue`]s: index-keyed
//! maps become arrays, and arrays of plain strings become
//! `RawValue::Strings`. This is the only shape the template engine ever
//! consumes; it never sees the querystring itself.

mod parse;

use crate::Config;
use crate::error::Result;
use crate::value::RawValue;

/// Tokenizes a querystring with the default [`Config`].
///
/// ```
/// use typed_qs::RawValue;
///
/// let raw = typed_qs::tokenize("?name=Acme&ids=1&ids=2&address[city]=Carrot+City").unwrap();
/// assert_eq!(raw.get("name"), Some(&RawValue::from("Acme")));
/// assert_eq!(raw.get("ids"), Some(&RawValue::from(["1", "2"])));
/// assert_eq!(
///     raw.get("address").and_then(|a| a.get("city")),
///     Some(&RawValue::from("Carrot City"))
/// );
/// ```
pub fn tokenize(input: &str) -> Result<RawValue> {
    Config::default().tokenize(input)
}

pub(crate) fn tokenize_with(input: &str, config: Config) -> Result<RawValue> {
    let input = match input.strip_prefix('?') {
        Some(stripped) if config.ignore_query_prefix => stripped,
        _ => input,
    };
    let parsed = parse::parse(input.as_bytes(), config)?;
    tracing::trace!(keys = parsed.len(), "tokenized querystring");
    Ok(parse::into_raw(parsed, config))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::tokenize;
    use crate::value::RawValue;
    use crate::Config;

    fn object<const N: usize>(entries: [(&str, RawValue); N]) -> RawValue {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect()
    }

    #[test]
    fn tokenize_empty() {
        assert_eq!(tokenize("").unwrap(), object([]));
        assert_eq!(tokenize("?").unwrap(), object([]));
    }

    #[test]
    fn tokenize_query_prefix() {
        assert_eq!(tokenize("?a=1").unwrap(), object([("a", "1".into())]));

        let config = Config::new().ignore_query_prefix(false);
        assert_eq!(
            config.tokenize("?a=1").unwrap(),
            object([("?a", "1".into())])
        );
    }

    #[test]
    fn tokenize_indexed_arrays() {
        // sparse indices are compacted in index order
        assert_eq!(
            tokenize("a[3]=c&a[1]=b&a[0]=a").unwrap(),
            object([("a", ["a", "b", "c"].into())])
        );
        assert_eq!(
            tokenize("a[]=x&a[]=y").unwrap(),
            object([("a", ["x", "y"].into())])
        );
    }

    #[test]
    fn tokenize_repeated_keys_in_any_order() {
        for search in ["ids=1&ids[]=2", "ids[]=1&ids=2", "ids=1&ids=2"] {
            assert_eq!(
                tokenize(search).unwrap(),
                object([("ids", ["1", "2"].into())]),
                "{search}"
            );
        }
    }

    #[test]
    fn tokenize_array_limit() {
        assert_eq!(
            tokenize("a[21]=x").unwrap(),
            object([("a", object([("21", "x".into())]))])
        );
        assert_eq!(
            Config::new().array_limit(100).tokenize("a[21]=x").unwrap(),
            object([("a", ["x"].into())])
        );
    }

    #[test]
    fn tokenize_mixed_keys_stay_objects() {
        assert_eq!(
            tokenize("a[0]=x&a[b]=y").unwrap(),
            object([("a", object([("0", "x".into()), ("b", "y".into())]))])
        );
    }

    #[test]
    fn tokenize_arrays_of_maps() {
        assert_eq!(
            tokenize("users[0][name]=ann&users[1][name]=bob&users[1][age]=7").unwrap(),
            object([(
                "users",
                RawValue::Array(vec![
                    object([("name", "ann".into())]),
                    object([("name", "bob".into()), ("age", "7".into())]),
                ])
            )])
        );
    }

    #[test]
    fn tokenize_max_depth() {
        assert_eq!(
            tokenize("a[b][c][d][e][f][g][h]=i").unwrap(),
            object([(
                "a",
                object([(
                    "b",
                    object([(
                        "c",
                        object([(
                            "d",
                            object([("e", object([("f", object([("[g][h]", "i".into())]))]))])
                        )])
                    )])
                )])
            )])
        );
    }

    #[test]
    fn tokenize_decodes_values() {
        assert_eq!(
            tokenize("name=jimmy+&reg=%3Cabc%3E&e=%E2%9C%93").unwrap(),
            object([
                ("name", "jimmy ".into()),
                ("reg", "<abc>".into()),
                ("e", "✓".into()),
            ])
        );
    }

    #[test]
    fn tokenize_rejects_malformed_nesting() {
        let err = tokenize("a[b=1").unwrap_err();
        assert!(matches!(err, crate::Error::Parse { .. }), "got: {err}");
    }
}
