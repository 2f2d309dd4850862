//! # JSON Options
//!
//! Shared serialization rules for request bodies and response payloads:
//!
//! - property names are matched case-insensitively when reading
//! - unit enum variants are written as their names and read from strings
//!   case-insensitively
//! - trailing commas in objects and arrays are tolerated when reading

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};
use serde::{forward_to_deserialize_any, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;

pub fn to_string<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

/// Deserialize `text` with the lenient reading rules of this module
pub fn from_str<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    let value: Value = serde_json::from_str(&strip_trailing_commas(text))?;
    T::deserialize(CaseInsensitive(value))
}

/// Remove commas that follow a value and directly precede a closing `}` or
/// `]`, outside strings. A comma with no value before it is left alone.
fn strip_trailing_commas(text: &str) -> Cow<'_, str> {
    if !text.contains(',') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut pending_comma: Option<usize> = None;
    let mut after_value = false;
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            ',' => {
                pending_comma = after_value.then_some(out.len());
                after_value = false;
                out.push(ch);
            }
            '}' | ']' => {
                if let Some(pos) = pending_comma.take() {
                    out.remove(pos);
                }
                after_value = true;
                out.push(ch);
            }
            '{' | '[' | ':' => {
                pending_comma = None;
                after_value = false;
                out.push(ch);
            }
            c if c.is_whitespace() => out.push(c),
            c => {
                pending_comma = None;
                after_value = true;
                if c == '"' {
                    in_string = true;
                }
                out.push(c);
            }
        }
    }

    Cow::Owned(out)
}

/// Deserializer over a parsed [`Value`] that folds object keys onto the
/// field names the target struct declares.
struct CaseInsensitive(Value);

impl<'de> IntoDeserializer<'de, serde_json::Error> for CaseInsensitive {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

impl<'de> Deserializer<'de> for CaseInsensitive {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => {
                let mut seq = SeqDeserializer::<_, serde_json::Error>::new(
                    items.into_iter().map(CaseInsensitive),
                );
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Value::Object(map) => {
                let mut access = MapDeserializer::<_, serde_json::Error>::new(
                    map.into_iter().map(|(k, v)| (k, CaseInsensitive(v))),
                );
                let value = visitor.visit_map(&mut access)?;
                access.end()?;
                Ok(value)
            }
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(CaseInsensitive(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => {
                let folded = map.into_iter().map(|(key, value)| {
                    let key = match fields.iter().find(|f| f.eq_ignore_ascii_case(&key)) {
                        Some(field) => (*field).to_string(),
                        None => key,
                    };
                    (key, CaseInsensitive(value))
                });
                let mut access = MapDeserializer::<_, serde_json::Error>::new(folded);
                let value = visitor.visit_map(&mut access)?;
                access.end()?;
                Ok(value)
            }
            other => CaseInsensitive(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::String(s) => {
                let variant = variants
                    .iter()
                    .find(|v| v.eq_ignore_ascii_case(&s))
                    .map(|v| (*v).to_string())
                    .unwrap_or(s);
                visitor.visit_enum(de::value::StringDeserializer::<serde_json::Error>::new(
                    variant,
                ))
            }
            other => other.deserialize_enum(name, variants, visitor),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
        ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    enum Status {
        Active,
        Archived,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i64,
        name: String,
        status: Status,
        tags: Vec<Tag>,
        owner: Option<Tag>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Tag {
        label: String,
    }

    #[test]
    fn from_str_should_match_properties_case_insensitively() {
        let item: Item = from_str(
            r#"{"Id":42,"NAME":"The Answer","Status":"active","Tags":[{"Label":"x"}],"owner":null}"#,
        )
        .unwrap();

        assert_eq!(
            item,
            Item {
                id: 42,
                name: "The Answer".into(),
                status: Status::Active,
                tags: vec![Tag { label: "x".into() }],
                owner: None,
            }
        );
    }

    #[test]
    fn from_str_should_tolerate_trailing_commas() {
        let tag: Tag = from_str("{ \"label\": \"a,]\", }").unwrap();
        assert_eq!(tag.label, "a,]");

        let numbers: Vec<u8> = from_str("[1, 2, 3,\n]").unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn from_str_should_reject_a_comma_without_a_value() {
        assert!(from_str::<Vec<u8>>("[,]").is_err());
        assert!(from_str::<Vec<u8>>("[1,,]").is_err());
        assert!(from_str::<std::collections::HashMap<String, u8>>("{,}").is_err());
    }

    #[test]
    fn from_str_should_strip_commas_after_nested_containers() {
        let nested: Vec<Vec<u8>> = from_str("[[1,], [2],]").unwrap();
        assert_eq!(nested, vec![vec![1], vec![2]]);
    }

    #[test]
    fn from_str_should_report_type_mismatch() {
        let result: serde_json::Result<Tag> = from_str(r#"{"label": 5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn to_string_should_write_enums_as_names() {
        assert_eq!(to_string(&Status::Archived).unwrap(), "\"Archived\"");
    }

    #[test]
    fn strip_trailing_commas_should_leave_valid_json_untouched() {
        let text = r#"{"a":[1,2],"b":"x"}"#;
        assert_eq!(strip_trailing_commas(text), text);
    }
}
