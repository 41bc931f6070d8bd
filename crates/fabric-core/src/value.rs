//! Structured payloads carried by canonical values.
//!
//! [`Value`] is the closed data model every message, stack entry and machine
//! state is expressed in. Floats are deliberately absent: the canonical
//! encoding is integer-only.
//!
//! The JSON bridge renders byte buffers with the typed-buffer descriptor
//! `{"type": "Buffer", "data": [byte, ...]}` and reads the same form back.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::{Map as JsonMap, Value as Json};

/// Key of the typed-buffer discriminator field.
const BUFFER_TYPE_KEY: &str = "type";
/// Discriminator value marking a typed-buffer descriptor.
const BUFFER_TYPE: &str = "Buffer";
/// Key holding the byte list of a typed-buffer descriptor.
const BUFFER_DATA_KEY: &str = "data";

/// An arbitrary structured payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Bytes(Bytes),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// The empty value malformed input degrades to.
    pub fn empty() -> Self {
        Value::Array(Vec::new())
    }

    /// Build a map from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a map field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Look up an array element.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.as_array().and_then(|items| items.get(index))
    }

    /// Render as JSON, with byte buffers as typed-buffer descriptors.
    ///
    /// [`Value::from_json`] inverts this only for maps that do not look like
    /// its special shapes: a map keyed exactly `"0".."n-1"` reads back as an
    /// array, and a map shaped `{ type: "Buffer", data: [bytes] }` reads back
    /// as bytes. Either changes the value's id.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(i) => Json::from(*i),
            Value::Text(s) => Json::String(s.clone()),
            Value::Bytes(b) => buffer_descriptor(b),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(m) => Json::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<JsonMap<String, Json>>(),
            ),
        }
    }

    /// Read a JSON document.
    ///
    /// - typed-buffer descriptors become [`Value::Bytes`]; a descriptor whose
    ///   data is not a list of bytes becomes an empty buffer
    /// - objects keyed exactly `"0"..="n-1"` become arrays in index order
    /// - numbers outside `i64`, and non-integral numbers, become their
    ///   decimal text
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Text(n.to_string()),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            Json::Object(obj) => {
                if let Some(bytes) = parse_buffer_descriptor(obj) {
                    return Value::Bytes(bytes);
                }
                if let Some(items) = index_keyed_items(obj) {
                    return Value::Array(items.into_iter().map(Value::from_json).collect());
                }
                Value::Map(
                    obj.iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }
}

fn buffer_descriptor(bytes: &[u8]) -> Json {
    let mut obj = JsonMap::new();
    obj.insert(BUFFER_TYPE_KEY.into(), Json::String(BUFFER_TYPE.into()));
    obj.insert(
        BUFFER_DATA_KEY.into(),
        Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
    );
    Json::Object(obj)
}

/// Returns `Some` if `obj` is a typed-buffer descriptor.
fn parse_buffer_descriptor(obj: &JsonMap<String, Json>) -> Option<Bytes> {
    if obj.len() != 2 || obj.get(BUFFER_TYPE_KEY)?.as_str()? != BUFFER_TYPE {
        return None;
    }
    let data = obj.get(BUFFER_DATA_KEY)?;

    let decoded: Option<Vec<u8>> = data.as_array().and_then(|items| {
        items
            .iter()
            .map(|b| b.as_u64().and_then(|n| u8::try_from(n).ok()))
            .collect()
    });

    match decoded {
        Some(bytes) => Some(Bytes::from(bytes)),
        None => {
            tracing::warn!("typed buffer with non-byte data; decoding as empty buffer");
            Some(Bytes::new())
        }
    }
}

/// Returns the values in index order if `obj` is keyed exactly `"0".."n-1"`.
fn index_keyed_items(obj: &JsonMap<String, Json>) -> Option<Vec<&Json>> {
    if obj.is_empty() {
        return None;
    }
    let mut slots: Vec<Option<&Json>> = vec![None; obj.len()];
    for (key, value) in obj {
        let index: usize = key.parse().ok()?;
        // Reject "01", "+1" and friends so the mapping stays one-to-one.
        if index.to_string() != *key || index >= slots.len() {
            return None;
        }
        slots[index] = Some(value);
    }
    slots.into_iter().collect()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i.into())
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_buffer_descriptor_decodes_to_bytes() {
        let json = json!({ "type": "Buffer", "data": [0, 1, 255] });
        assert_eq!(Value::from_json(&json), Value::from(vec![0u8, 1, 255]));
    }

    #[test]
    fn test_buffer_descriptor_with_bad_data_is_empty() {
        let json = json!({ "type": "Buffer", "data": [0, 256, "x"] });
        assert_eq!(Value::from_json(&json), Value::Bytes(Bytes::new()));

        let json = json!({ "type": "Buffer", "data": "nope" });
        assert_eq!(Value::from_json(&json), Value::Bytes(Bytes::new()));
    }

    #[test]
    fn test_buffer_lookalike_with_extra_fields_is_a_map() {
        let json = json!({ "type": "Buffer", "data": [1], "extra": true });
        assert!(matches!(Value::from_json(&json), Value::Map(_)));
    }

    #[test]
    fn test_index_keyed_object_is_array() {
        let json = json!({ "1": "b", "0": "a", "2": "c" });
        assert_eq!(
            Value::from_json(&json),
            Value::Array(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_index_keyed_ordering_past_ten() {
        let obj: JsonMap<String, Json> = (0..12).map(|i| (i.to_string(), json!(i))).collect();
        let value = Value::from_json(&Json::Object(obj));
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 12);
        assert_eq!(items[10], Value::Integer(10));
    }

    #[test]
    fn test_sparse_index_keys_stay_a_map() {
        assert!(matches!(Value::from_json(&json!({ "0": 1, "2": 2 })), Value::Map(_)));
        assert!(matches!(Value::from_json(&json!({ "00": 1 })), Value::Map(_)));
    }

    #[test]
    fn test_non_integral_numbers_become_text() {
        assert_eq!(Value::from_json(&json!(1.5)), Value::Text("1.5".into()));
        assert_eq!(Value::from_json(&json!(-7)), Value::Integer(-7));
    }

    #[test]
    fn test_json_roundtrip_of_ordinary_maps() {
        let value = Value::map([
            ("blob", Value::from(vec![0xde, 0xad])),
            ("n", Value::from(3)),
            ("list", Value::Array(vec![Value::Null, Value::Bool(false)])),
        ]);
        assert_eq!(Value::from_json(&value.to_json()), value);
    }

    #[test]
    fn test_accessors() {
        let value = Value::map([("input", Value::from("Hello, world."))]);
        assert_eq!(value.get("input").and_then(Value::as_text), Some("Hello, world."));
        assert!(value.get("missing").is_none());
        assert!(value.get_index(0).is_none());
        assert_eq!(Value::empty().as_array().map(<[Value]>::len), Some(0));
    }

    #[test]
    fn test_json_roundtrip_collapses_lookalike_maps() {
        let indexed = Value::map([("0", Value::from("a")), ("1", Value::from("b"))]);
        assert_eq!(
            Value::from_json(&indexed.to_json()),
            Value::Array(vec!["a".into(), "b".into()])
        );

        let buffer_shaped = Value::map([
            ("type", Value::from("Buffer")),
            ("data", Value::Array(vec![Value::from(7)])),
        ]);
        assert_eq!(Value::from_json(&buffer_shaped.to_json()), Value::from(vec![7u8]));
    }
}
