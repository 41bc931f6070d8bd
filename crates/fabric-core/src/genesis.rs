//! The fixed, reproducible first page of every ledger.
//!
//! The genesis value is the seed data signed by a key derived from a
//! hard-coded seed phrase. Ed25519 signatures are deterministic, so the same
//! seed always yields the same value id and the same genesis page id.

use crate::canonical::CanonicalValue;
use crate::crypto::{Key, Sha256Hash};
use crate::page::Page;
use crate::value::Value;

/// Seed phrase for the default genesis key: `SHA256(phrase)` is the key seed.
pub const GENESIS_SEED_PHRASE: &[u8] = b"fabric/genesis/v1";

/// Id of the default genesis page.
pub const GENESIS_PAGE_ID: &str =
    "89a88e812bc1a835792e0824196a91e92eff5058d577889735dda55a5261c999";

/// Field names of the signed genesis value.
mod keys {
    pub const AUTHOR: &str = "author";
    pub const DATA: &str = "data";
    pub const SIGNATURE: &str = "signature";
}

/// Seed record a ledger's first page is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genesis {
    data: Value,
    key_seed: [u8; 32],
}

impl Genesis {
    pub fn new(data: Value, key_seed: [u8; 32]) -> Self {
        Self { data, key_seed }
    }

    /// The seed payload.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// The key that signs the seed payload.
    pub fn key(&self) -> Key {
        Key::from_seed(&self.key_seed)
    }

    /// The signed seed record: `{ author, data, signature }`.
    pub fn value(&self) -> CanonicalValue {
        let key = self.key();
        let data = CanonicalValue::new(self.data.clone());
        let signature = data.sign(&key);

        CanonicalValue::new(Value::map([
            (keys::AUTHOR, Value::from(key.public_key().0.to_vec())),
            (keys::DATA, data.into_data()),
            (keys::SIGNATURE, Value::from(signature.0.to_vec())),
        ]))
    }

    /// The height-0 page.
    pub fn page(&self) -> Page {
        Page::genesis(self.value())
    }
}

impl Default for Genesis {
    fn default() -> Self {
        let data = Value::map([
            ("name", Value::from("fabric")),
            ("type", Value::from("Genesis")),
            ("version", Value::from(1)),
        ]);
        Self::new(data, Sha256Hash::hash(GENESIS_SEED_PHRASE).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Signature;

    #[test]
    fn test_default_genesis_page_id() {
        assert_eq!(Genesis::default().page().id().to_hex(), GENESIS_PAGE_ID);
    }

    #[test]
    fn test_genesis_is_reproducible() {
        let a = Genesis::default();
        let b = Genesis::default();
        assert_eq!(a.value().id(), b.value().id());
        assert_eq!(a.page().id(), b.page().id());
    }

    #[test]
    fn test_genesis_signature_verifies() {
        let genesis = Genesis::default();
        let value = genesis.value();

        let data = CanonicalValue::new(value.data().get(keys::DATA).unwrap().clone());
        let sig_bytes: [u8; 64] = value
            .data()
            .get(keys::SIGNATURE)
            .and_then(Value::as_bytes)
            .unwrap()
            .as_ref()
            .try_into()
            .unwrap();

        assert!(data.verify(&genesis.key().public_key(), &Signature(sig_bytes)));
    }

    #[test]
    fn test_different_seed_different_genesis() {
        let default = Genesis::default();
        let other = Genesis::new(default.data().clone(), [0x99; 32]);
        assert_ne!(default.page().id(), other.page().id());
    }
}
