//! Page: one hash-linked entry of a ledger.
//!
//! A page wraps a canonical value and points at its predecessor:
//!
//! ```text
//! id = SHA256(canonical { "height": h, "parent": parent_id, "value": value_id })
//! ```
//!
//! The page at height 0 points at [`PageId::GENESIS_PARENT`].

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_bytes, decode_value, CanonicalValue};
use crate::crypto::Sha256Hash;
use crate::error::{CoreError, Result};
use crate::value::Value;

/// Field names of the hashed page header and the persisted page record.
mod keys {
    pub const HEIGHT: &str = "height";
    pub const PARENT: &str = "parent";
    pub const VALUE: &str = "value";
    pub const ID: &str = "id";
}

/// A 32-byte page identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub [u8; 32]);

impl PageId {
    /// Parent sentinel of the genesis page.
    pub const GENESIS_PARENT: Self = Self([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        Sha256Hash::from_hex(s).map(|h| Self(h.0))
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for PageId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// One entry of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    height: u64,
    parent: PageId,
    value: CanonicalValue,
    id: PageId,
}

impl Page {
    /// Build a page and compute its id.
    pub fn new(height: u64, parent: PageId, value: CanonicalValue) -> Self {
        let id = compute_id(height, &parent, &value);
        Self {
            height,
            parent,
            value,
            id,
        }
    }

    /// Build the height-0 page.
    pub fn genesis(value: CanonicalValue) -> Self {
        Self::new(0, PageId::GENESIS_PARENT, value)
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn parent(&self) -> PageId {
        self.parent
    }

    pub fn value(&self) -> &CanonicalValue {
        &self.value
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    /// The Merkle preimage leaf for this page: its id bytes.
    pub fn leaf(&self) -> Bytes {
        Bytes::copy_from_slice(&self.id.0)
    }

    /// Recompute the id from the page contents.
    pub fn recompute_id(&self) -> PageId {
        compute_id(self.height, &self.parent, &self.value)
    }

    /// Check that the stored id matches the page contents.
    pub fn verify_id(&self) -> bool {
        self.recompute_id() == self.id
    }

    /// Encode the page as a canonical CBOR record (for persistence).
    pub fn to_bytes(&self) -> Vec<u8> {
        let record = Value::map([
            (keys::HEIGHT, height_value(self.height)),
            (keys::PARENT, Value::from(self.parent.0.to_vec())),
            (keys::VALUE, self.value.data().clone()),
            (keys::ID, Value::from(self.id.0.to_vec())),
        ]);
        canonical_bytes(&record)
    }

    /// Decode a page record, recomputing and checking its id.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record = decode_value(bytes)?;

        let height = match record.get(keys::HEIGHT) {
            Some(Value::Integer(h)) => u64::try_from(*h)
                .map_err(|_| CoreError::DecodingError("negative page height".into()))?,
            _ => return Err(CoreError::DecodingError("missing page height".into())),
        };
        let parent = PageId(digest_field(&record, keys::PARENT)?);
        let stored = PageId(digest_field(&record, keys::ID)?);
        let value = match record.get(keys::VALUE) {
            Some(v) => CanonicalValue::new(v.clone()),
            None => return Err(CoreError::DecodingError("missing page value".into())),
        };

        let page = Self::new(height, parent, value);
        if page.id != stored {
            return Err(CoreError::PageIdMismatch {
                height,
                expected: page.id,
                actual: stored,
            });
        }
        Ok(page)
    }
}

fn height_value(height: u64) -> Value {
    // Heights past i64::MAX are unreachable by appending.
    Value::Integer(i64::try_from(height).unwrap_or(i64::MAX))
}

fn compute_id(height: u64, parent: &PageId, value: &CanonicalValue) -> PageId {
    let header = Value::map([
        (keys::HEIGHT, height_value(height)),
        (keys::PARENT, Value::from(parent.0.to_vec())),
        (keys::VALUE, Value::from(value.id().0.to_vec())),
    ]);
    PageId(Sha256Hash::hash(&canonical_bytes(&header)).0)
}

fn digest_field(record: &Value, key: &str) -> Result<[u8; 32]> {
    record
        .get(key)
        .and_then(Value::as_bytes)
        .and_then(|b| <[u8; 32]>::try_from(b.as_ref()).ok())
        .ok_or_else(|| CoreError::DecodingError(format!("invalid page {}", key)))
}
