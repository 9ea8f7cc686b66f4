//! Stringifying values into querystrings.

mod encode;

use std::io::Write;

use chrono::{Local, NaiveDateTime, TimeZone};
use encode::encode;

use crate::Config;
use crate::config::ArrayFormat;
use crate::error::Result;
use crate::value::Value;

/// Stringifies a value into a querystring with the default [`Config`].
///
/// Object entries are written in order and nested keys use bracket
/// notation. `Value::Null` entries (and empty containers) are skipped, so
/// the output only carries what the tokenizer would give back.
///
/// ```
/// use typed_qs::Value;
///
/// let value = Value::object([
///     ("id", Value::from(42)),
///     ("name", Value::from("Acme")),
///     ("address", Value::object([("city", "Carrot City")])),
///     ("user_ids", Value::from(vec![1, 2])),
///     ("email", Value::Null),
/// ]);
/// assert_eq!(
///     typed_qs::stringify(&value)?,
///     "id=42&name=Acme&address[city]=Carrot+City&user_ids[0]=1&user_ids[1]=2"
/// );
/// # Ok::<(), typed_qs::Error>(())
/// ```
pub fn stringify(value: &Value) -> Result<String> {
    Config::default().stringify(value)
}

pub(crate) fn write_value<W: Write>(writer: W, value: &Value, config: Config) -> Result<()> {
    let mut qs = QsWriter::new(writer, config);
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                qs.push_key(key.as_bytes());
                qs.write(value)?;
                qs.pop_key();
            }
        }
        Value::Array(items) => {
            // a top-level sequence is keyed by position
            let mut buffer = itoa::Buffer::new();
            for (idx, item) in items.iter().enumerate() {
                qs.push_key(buffer.format(idx).as_bytes());
                qs.write(item)?;
                qs.pop_key();
            }
        }
        // a scalar has no key to be written under
        _ => {}
    }
    Ok(())
}

/// A writer for the querystring format.
///
/// The writer maintains a key stack to build nested paths. For example,
/// when writing `{user: {name: "John"}}`, it pushes "user" onto the stack,
/// then writes "name" as `user[name]=John`.
struct QsWriter<W: Write> {
    writer: W,
    first_kv: bool,
    key: Vec<Vec<u8>>,
    config: Config,
}

impl<W: Write> QsWriter<W> {
    fn new(writer: W, config: Config) -> Self {
        Self {
            writer,
            first_kv: true,
            key: Vec::with_capacity(4),
            config,
        }
    }

    /// Pushes a new key segment onto the key stack for nested structures.
    ///
    /// - First key "user" becomes: `user`
    /// - Second key "name" becomes: `user[name]`
    /// - Third key "first" becomes: `user[name][first]`
    fn push_key(&mut self, newkey: &[u8]) {
        let first_key_segment = self.key.is_empty();
        let form = self.config.use_form_encoding;

        let mut segment = Vec::with_capacity(newkey.len() + if form { 6 } else { 2 });
        if !first_key_segment {
            segment.extend_from_slice(if form { b"%5B" as &[u8] } else { b"[" });
        }
        if newkey
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_' || *b == b'.')
        {
            // nothing to percent-encode
            segment.extend_from_slice(newkey);
        } else {
            for encoded in encode(newkey, form) {
                segment.extend_from_slice(&encoded);
            }
        }
        if !first_key_segment {
            segment.extend_from_slice(if form { b"%5D" as &[u8] } else { b"]" });
        }
        self.key.push(segment);
    }

    fn pop_key(&mut self) {
        self.key.pop();
    }

    fn write_key_stack(&mut self) -> Result<()> {
        if self.first_kv {
            self.first_kv = false;
        } else {
            self.writer.write_all(b"&")?;
        }
        for segment in &self.key {
            self.writer.write_all(segment)?;
        }
        Ok(())
    }

    fn write_pair(&mut self, value: &[u8]) -> Result<()> {
        self.write_key_stack()?;
        self.writer.write_all(b"=")?;
        for encoded in encode(value, self.config.use_form_encoding) {
            self.writer.write_all(&encoded)?;
        }
        Ok(())
    }

    fn write(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Bool(b) => self.write_pair(if *b { b"true" as &[u8] } else { b"false" }),
            Value::Int(i) => {
                let mut buffer = itoa::Buffer::new();
                self.write_pair(buffer.format(*i).as_bytes())
            }
            Value::Float(f) => {
                let mut buffer = ryu::Buffer::new();
                let repr = format_float(*f, &mut buffer);
                self.write_pair(repr.as_bytes())
            }
            Value::String(s) => self.write_pair(s.as_bytes()),
            Value::Date(d) => self.write_pair(format_date(d).as_bytes()),
            Value::Array(items) => self.write_seq(items),
            Value::Object(map) => {
                for (key, value) in map {
                    self.push_key(key.as_bytes());
                    self.write(value)?;
                    self.pop_key();
                }
                Ok(())
            }
        }
    }

    fn write_seq(&mut self, items: &[Value]) -> Result<()> {
        let mut buffer = itoa::Buffer::new();
        for (idx, item) in items.iter().enumerate() {
            match self.config.array_format {
                ArrayFormat::Indexed => self.push_key(buffer.format(idx).as_bytes()),
                ArrayFormat::EmptyIndexed => self.push_key(b""),
                // unindexed arrays repeat the parent key
                ArrayFormat::Unindexed => {
                    self.write(item)?;
                    continue;
                }
            }
            self.write(item)?;
            self.pop_key();
        }
        Ok(())
    }
}

/// Formats a float the way the tokenized text would be written by hand:
/// integral values without a trailing `.0`, and `NaN`/`Infinity` spelled out.
fn format_float(f: f64, buffer: &mut ryu::Buffer) -> &str {
    if f.is_nan() {
        "NaN"
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        // `ryu` would print `12.0`
        let s = buffer.format_finite(f);
        s.strip_suffix(".0").unwrap_or(s)
    } else {
        buffer.format_finite(f)
    }
}

/// Dates are written as UTC ISO-8601, e.g. `2020-12-11T03:11:11.000Z`.
fn format_date(date: &NaiveDateTime) -> String {
    let utc = match Local.from_local_datetime(date).earliest() {
        Some(local) => local.naive_utc(),
        // a wall-clock time skipped by a DST transition
        None => *date,
    };
    utc.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
