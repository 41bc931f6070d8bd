//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use fabric::{Fabric, FabricConfig};
use fabric_core::{Key, PublicKey, Script};
use fabric_store::MemoryStore;

/// A test fixture with a key and a shared memory store.
///
/// The store is behind an `Arc`, so a fabric built from the fixture and the
/// test itself see the same bytes.
pub struct TestFixture {
    pub key: Key,
    pub store: Arc<MemoryStore>,
    pub config: FabricConfig,
}

impl TestFixture {
    /// Create a new test fixture with a random key.
    pub fn new() -> Self {
        Self {
            key: Key::generate(),
            store: Arc::new(MemoryStore::new()),
            config: FabricConfig::default(),
        }
    }

    /// Create with a deterministic key from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            key: Key::from_seed(&seed),
            ..Self::new()
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    /// Build a stopped fabric over the fixture's store.
    pub fn fabric(&self) -> Fabric<Arc<MemoryStore>> {
        Fabric::new(self.key.clone(), self.store.clone(), self.config.clone())
    }

    /// Build and start a fabric over the fixture's store.
    pub async fn started_fabric(&self) -> fabric::Result<Fabric<Arc<MemoryStore>>> {
        let fabric = self.fabric();
        fabric.start().await?;
        Ok(fabric)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple fixtures with distinct deterministic keys.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&(i as u64).to_be_bytes());
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// Build a script from string tokens.
pub fn script(tokens: &[&str]) -> Script {
    tokens.iter().copied().collect()
}
