//! Result shapes and known-field projection.
//!
//! # Design
//! A target type "declares a known field set" when its `Deserialize` impl
//! asks for a struct: serde passes the full list of accepted field names
//! (renames and aliases included) to `Deserializer::deserialize_struct`. We
//! run the impl once against a probe deserializer that records that list and
//! then bails out. Maps, flattened structs and untyped values ask for
//! something else, so they report no field set and skip projection.

use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Value};

/// How a successful payload is coerced before it reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// A single JSON object decoded into the target type.
    Object,
    /// A JSON array whose elements are decoded into the target type.
    List,
    /// The payload returned verbatim as a `StructuredValue`.
    Raw,
}

/// Field names the target type accepts, if it deserializes as a struct.
pub fn known_fields<T: DeserializeOwned>() -> Option<&'static [&'static str]> {
    let mut fields = None;
    let _ = T::deserialize(FieldProbe { fields: &mut fields });
    fields
}

/// Keep only the keys the target type declares.
///
/// Objects are projected when `T` has a known field set; every other value
/// is returned untouched.
pub fn project<T: DeserializeOwned>(value: Value) -> Value {
    match (value, known_fields::<T>()) {
        (Value::Object(map), Some(fields)) => Value::Object(project_map(map, fields)),
        (value, _) => value,
    }
}

fn project_map(map: Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    map.into_iter()
        .filter(|(key, _)| fields.contains(&key.as_str()))
        .collect()
}

struct FieldProbe<'a> {
    fields: &'a mut Option<&'static [&'static str]>,
}

impl<'de> Deserializer<'de> for FieldProbe<'_> {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("not a struct"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        *self.fields = Some(fields);
        Err(de::Error::custom("field set recorded"))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}
