//! Performance oriented JSON manipulation.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// Extension trait for [`serde_json_bytes::Value`].
pub trait ValueExt {
    /// Returns whether this value can be accepted as a GraphQL `Int` input.
    ///
    /// Integers must fit in 32 bits; numeric strings are accepted too.
    fn is_valid_int_input(&self) -> bool;

    /// Returns whether this value can be accepted as a GraphQL `Float` input.
    fn is_valid_float_input(&self) -> bool;

    /// Name of the JSON type of this value, for error messages.
    fn json_type_name(&self) -> &'static str;

    /// Compact JSON rendering of this value, for error messages.
    fn to_json_string(&self) -> String;
}

impl ValueExt for Value {
    fn is_valid_int_input(&self) -> bool {
        match self {
            Value::Number(number) => number
                .as_i64()
                .and_then(|x| i32::try_from(x).ok())
                .is_some(),
            Value::String(s) => s.as_str().trim().parse::<i32>().is_ok(),
            _ => false,
        }
    }

    fn is_valid_float_input(&self) -> bool {
        match self {
            Value::Number(number) => number.as_f64().is_some_and(f64::is_finite),
            Value::String(s) => s
                .as_str()
                .trim()
                .parse::<f64>()
                .is_ok_and(f64::is_finite),
            _ => false,
        }
    }

    fn json_type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.json_type_name().to_string())
    }
}

/// A path element of a [`Path`].
///
/// Serialized as a JSON string for keys and a JSON integer for list indices.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => write!(f, "{key}"),
        }
    }
}

/// A path into the result document, from the root of `data`.
///
/// This can be composed of field names and list indices.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn empty() -> Path {
        Path(Default::default())
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element)
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    /// Returns a new path with `element` appended.
    pub fn join(&self, element: impl Into<PathElement>) -> Self {
        let mut new = self.clone();
        new.push(element.into());
        new
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<String> for PathElement {
    fn from(key: String) -> Self {
        PathElement::Key(key)
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

impl<T> From<T> for Path
where
    T: AsRef<str>,
{
    /// Parses a `/` separated path, numeric segments being list indices.
    fn from(s: T) -> Self {
        Self(
            s.as_ref()
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(|segment| match segment.parse::<usize>() {
                    Ok(index) => PathElement::Index(index),
                    Err(_) => PathElement::Key(segment.to_string()),
                })
                .collect(),
        )
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}
