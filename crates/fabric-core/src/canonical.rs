//! Canonical CBOR encoding and content addressing.
//!
//! Values are encoded as CBOR (RFC 8949) with deterministic rules:
//! - Map keys: text only, sorted by their encoded bytes
//! - Integers: smallest valid encoding
//! - Lengths: definite only
//! - Byte buffers: major type 2, length-prefixed
//!
//! A value's identifier is SHA-256 over these bytes. The encoding is frozen:
//! changing it changes every identifier, including the genesis page.

use std::fmt;
use std::io::Cursor;

use ciborium::value::{Integer, Value as Cbor};
use serde::{Deserialize, Serialize};

use crate::crypto::{Key, PublicKey, Sha256Hash, Signature};
use crate::error::{CoreError, Result};
use crate::value::Value;

/// Content identifier of a canonical value: SHA-256 of its canonical bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub [u8; 32]);

impl ValueId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for ValueId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Sha256Hash> for ValueId {
    fn from(hash: Sha256Hash) -> Self {
        Self(hash.0)
    }
}

/// A value together with its content hash.
///
/// Immutable once constructed: the id is computed in [`CanonicalValue::new`]
/// and there is no way to reach the data mutably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalValue {
    data: Value,
    id: ValueId,
}

impl CanonicalValue {
    /// Canonicalize a value.
    pub fn new(data: Value) -> Self {
        let id = ValueId::from(Sha256Hash::hash(&canonical_bytes(&data)));
        Self { data, id }
    }

    /// The canonical empty value (an empty array).
    pub fn empty() -> Self {
        Self::new(Value::empty())
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn id(&self) -> ValueId {
        self.id
    }

    /// Canonical CBOR bytes of the data.
    pub fn to_bytes(&self) -> Vec<u8> {
        canonical_bytes(&self.data)
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    /// Sign the canonical bytes.
    pub fn sign(&self, key: &Key) -> Signature {
        key.sign(&self.to_bytes())
    }

    /// Check a signature over the canonical bytes.
    pub fn verify(&self, public_key: &PublicKey, signature: &Signature) -> bool {
        public_key.verify(&self.to_bytes(), signature).is_ok()
    }
}

impl From<Value> for CanonicalValue {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

impl From<CanonicalValue> for Value {
    fn from(value: CanonicalValue) -> Self {
        value.data
    }
}

macro_rules! canonical_from {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for CanonicalValue {
                fn from(v: $t) -> Self {
                    Self::new(Value::from(v))
                }
            }
        )*
    };
}

canonical_from!(bool, i64, i32, u32, &str, String, Vec<u8>, &[u8], bytes::Bytes, Vec<Value>);

/// Parse a serialized preimage, surfacing malformed input.
pub fn try_reconstruct(preimage: &str) -> Result<CanonicalValue> {
    let json: serde_json::Value =
        serde_json::from_str(preimage).map_err(|e| CoreError::MalformedInput(e.to_string()))?;
    Ok(CanonicalValue::new(Value::from_json(&json)))
}

/// Parse a serialized preimage.
///
/// Never fails: garbage yields [`CanonicalValue::empty`].
pub fn reconstruct(preimage: &str) -> CanonicalValue {
    match try_reconstruct(preimage) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "discarding malformed preimage");
            CanonicalValue::empty()
        }
    }
}

/// Encode a value to canonical CBOR bytes.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value(&mut buf, &to_cbor(value));
    buf
}

/// Decode canonical CBOR bytes.
///
/// Rejects anything the encoder would not have produced: floats, tags,
/// non-text map keys, and non-canonical or trailing bytes.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let cbor: Cbor = ciborium::from_reader(Cursor::new(bytes))
        .map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let value = from_cbor(cbor)?;
    if canonical_bytes(&value) != bytes {
        return Err(CoreError::DecodingError("non-canonical encoding".into()));
    }
    Ok(value)
}

fn to_cbor(value: &Value) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Integer(i) => Cbor::Integer((*i).into()),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Bytes(b) => Cbor::Bytes(b.to_vec()),
        Value::Array(items) => Cbor::Array(items.iter().map(to_cbor).collect()),
        Value::Map(m) => Cbor::Map(
            m.iter()
                .map(|(k, v)| (Cbor::Text(k.clone()), to_cbor(v)))
                .collect(),
        ),
    }
}

fn from_cbor(cbor: Cbor) -> Result<Value> {
    Ok(match cbor {
        Cbor::Null => Value::Null,
        Cbor::Bool(b) => Value::Bool(b),
        Cbor::Integer(i) => Value::Integer(
            i64::try_from(i).map_err(|_| CoreError::DecodingError("integer out of range".into()))?,
        ),
        Cbor::Text(s) => Value::Text(s),
        Cbor::Bytes(b) => Value::Bytes(b.into()),
        Cbor::Array(items) => {
            Value::Array(items.into_iter().map(from_cbor).collect::<Result<_>>()?)
        }
        Cbor::Map(entries) => {
            let mut map = std::collections::BTreeMap::new();
            for (k, v) in entries {
                let Cbor::Text(key) = k else {
                    return Err(CoreError::DecodingError("map key must be text".into()));
                };
                map.insert(key, from_cbor(v)?);
            }
            Value::Map(map)
        }
        other => {
            return Err(CoreError::DecodingError(format!(
                "unsupported CBOR item: {:?}",
                other
            )))
        }
    })
}

/// Recursively encode a CBOR value.
fn encode_value(buf: &mut Vec<u8>, value: &Cbor) {
    match value {
        Cbor::Integer(i) => encode_integer(buf, *i),
        Cbor::Bytes(b) => encode_bytes(buf, b),
        Cbor::Text(s) => encode_text(buf, s),
        Cbor::Array(arr) => encode_array(buf, arr),
        Cbor::Map(entries) => encode_map_canonical(buf, entries),
        Cbor::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Cbor::Null => buf.push(0xf6),
        // to_cbor never produces floats or tags.
        _ => unreachable!("unsupported CBOR value in canonical encoding"),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Cbor]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value(buf, item);
    }
}

/// Encode a map with keys sorted by their encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Cbor, Cbor)]) {
    let mut pairs: Vec<(Vec<u8>, &Cbor)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value(buf, value);
    }
}
