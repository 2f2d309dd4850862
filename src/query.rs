//! # Query Parameters
//!
//! An ordered multiset of `key=value` pairs. Repeating a key appends another
//! pair; nothing is ever merged or overwritten.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    pairs: Vec<(String, Option<String>)>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: Option<String>) {
        self.pairs.push((key.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn pairs(&self) -> &[(String, Option<String>)] {
        &self.pairs
    }

    /// Append the fields of a serializable object, in declaration order.
    ///
    /// `null` fields become valueless pairs and arrays repeat their key once
    /// per element. Anything other than a struct or map is rejected.
    pub fn extend_from<T: Serialize + ?Sized>(&mut self, object: &T) -> Result<()> {
        let value = serde_json::to_value(object).map_err(|e| Error::InvalidQuery(e.to_string()))?;
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(()),
            other => {
                return Err(Error::InvalidQuery(format!(
                    "expected an object with named fields, found {other}"
                )))
            }
        };

        for (key, value) in map {
            match value {
                Value::Array(items) => {
                    for item in items {
                        self.pairs.push((key.clone(), scalar_text(item)));
                    }
                }
                other => self.pairs.push((key, scalar_text(other))),
            }
        }
        Ok(())
    }

    /// Encoded query string without the leading `?`.
    ///
    /// Keys and values are percent-encoded one at a time; a missing value
    /// encodes as the empty string.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| {
                let value = value.as_deref().unwrap_or_default();
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
