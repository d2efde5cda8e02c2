//! Untyped response values with timestamp coercion.
//!
//! # Design
//! `StructuredValue` is what the raw result shape returns: a JSON tree whose
//! timestamp-shaped strings have been promoted to `DateTime` leaves. It is
//! deliberately a distinct type from the typed object/list shapes so a raw
//! payload cannot be mistaken for a decoded DTO.
//!
//! A `DateTime` leaf keeps the text it was parsed from, and rendering back to
//! JSON emits that text unchanged. Typed shapes are built from the rendered
//! JSON, so `String` fields receive the server's bytes, while timestamp
//! fields parse through [`deserialize_timestamp`] and accept every form the
//! backend emits, including offset-less ones.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::de::{Deserialize, Deserializer, Error as _};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Number, Value};

/// A JSON tree with structured timestamps.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// A timestamp string, parsed, along with its original text.
    DateTime {
        parsed: DateTime<FixedOffset>,
        raw: String,
    },
    Array(Vec<StructuredValue>),
    Object(BTreeMap<String, StructuredValue>),
}

impl StructuredValue {
    /// Convert parsed JSON, coercing timestamp strings at any depth.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::from_text(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render back to plain JSON; timestamps become their original text.
    pub fn into_json(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => Value::Number(n),
            Self::String(s) => Value::String(s),
            Self::DateTime { raw, .. } => Value::String(raw),
            Self::Array(items) => Value::Array(items.into_iter().map(Self::into_json).collect()),
            Self::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
        }
    }

    /// Promote timestamp-shaped strings to `DateTime`. Idempotent.
    pub fn coerce_timestamps(self) -> Self {
        match self {
            Self::String(s) => Self::from_text(s),
            Self::Array(items) => {
                Self::Array(items.into_iter().map(Self::coerce_timestamps).collect())
            }
            Self::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.coerce_timestamps()))
                    .collect(),
            ),
            other => other,
        }
    }

    fn from_text(s: String) -> Self {
        match parse_timestamp(&s) {
            Some(parsed) => Self::DateTime { parsed, raw: s },
            None => Self::String(s),
        }
    }

    /// Look up a key on an object value.
    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime { parsed, .. } => Some(parsed),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[StructuredValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, StructuredValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl Default for StructuredValue {
    fn default() -> Self {
        Self::Object(BTreeMap::new())
    }
}

impl From<Value> for StructuredValue {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

impl From<StructuredValue> for Value {
    fn from(value: StructuredValue) -> Self {
        value.into_json()
    }
}

impl Serialize for StructuredValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::DateTime { raw, .. } => serializer.serialize_str(raw),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for StructuredValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

/// Deserialize an optional timestamp leniently, accepting every form
/// [`parse_timestamp`] does. Use with `#[serde(deserialize_with = ...)]`.
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {s:?}"))),
    }
}

/// Parse an ISO-8601 date-time string.
///
/// Requires `YYYY-MM-DD`, a `T` or space separator and `HH:MM:SS`, followed
/// by an optional fraction and an optional `Z`/`±HH:MM`/`±HHMM` offset.
/// Offset-less timestamps are read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    if !looks_like_timestamp(s) {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }
    let normalized = s.replacen(' ', "T", 1);
    if let Ok(ts) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts);
    }
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

fn looks_like_timestamp(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < 19 {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);
    digits(0..4)
        && b[4] == b'-'
        && digits(5..7)
        && b[7] == b'-'
        && digits(8..10)
        && (b[10] == b'T' || b[10] == b' ')
        && digits(11..13)
        && b[13] == b':'
        && digits(14..16)
        && b[16] == b':'
        && digits(17..19)
}
