use std::fmt::Display;
use std::{io, string};

use serde::de;

/// Errors that can occur while tokenizing, template-parsing or
/// stringifying a querystring.
///
/// Note that a leaf parser failing to coerce a value (e.g. `"abc"` given
/// to `integer()`) is *not* an error: the field resolves to its default,
/// or to `Value::Null` when no default is configured.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `parse` was invoked without a template.
    #[error("missing template: a template is required for parsing")]
    MissingTemplate,

    /// The tokenized querystring disagrees with the template about whether
    /// a path holds a scalar or a nested structure.
    #[error("shape mismatch at `{path}`: template expects {expected}, found {found}")]
    ShapeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The querystring could not be tokenized.
    #[error("parsing failed with error: '{msg}' at position: {index}")]
    Parse { msg: String, index: usize },

    /// Writing the serialized querystring failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The stringified output was not valid utf-8.
    #[error(transparent)]
    FromUtf8(#[from] string::FromUtf8Error),

    /// A parsed value could not be deserialized into the requested type.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Generate a tokenizer error message with position.
    pub fn parse_err<T>(msg: T, index: usize) -> Self
    where
        T: Display,
    {
        Error::Parse {
            msg: msg.to_string(),
            index,
        }
    }

    pub(crate) fn shape_mismatch(
        path: impl Display,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Error::ShapeMismatch {
            path: path.to_string(),
            expected,
            found,
        }
    }
}

impl de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
