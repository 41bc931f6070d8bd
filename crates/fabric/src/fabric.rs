//! The Fabric: lifecycle facade over a persisted ledger.
//!
//! Brings together the ledger, the byte store and the machine. All pure
//! work happens in `fabric-core`; this type only decides when to load,
//! persist and lock.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use fabric_core::{
    CanonicalValue, CoreError, Genesis, Key, Ledger, LedgerState, Machine, MachineConfig,
    MerkleTree, Page, PublicKey, Script, Sha256Hash, Signature, State,
};
use fabric_store::ByteStore;

use crate::error::{FabricError, Result};

/// Configuration for a Fabric instance.
#[derive(Debug, Clone)]
pub struct FabricConfig {
    /// Prefix for every key this instance writes.
    pub namespace: String,
    /// Whether pages are written to and restored from the store.
    pub persist: bool,
    /// Seed of the ledger's first page.
    pub genesis: Genesis,
    /// Configuration for machines started by [`Fabric::compute`].
    pub machine: MachineConfig,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            namespace: "fabric".to_string(),
            persist: true,
            genesis: Genesis::default(),
            machine: MachineConfig::default(),
        }
    }
}

/// The main Fabric struct.
///
/// Provides a unified API for:
/// - Starting and stopping a persisted ledger
/// - Appending messages and machine states as pages
/// - Running scripts
/// - Raw byte storage next to the ledger
///
/// Appends on one instance are serialized by an internal mutex held across
/// build, persist and commit, so concurrent callers always extend the tip.
pub struct Fabric<S: ByteStore> {
    key: Key,
    store: Arc<S>,
    config: FabricConfig,
    ledger: Mutex<Ledger>,
}

impl<S: ByteStore> Fabric<S> {
    /// Create a stopped instance.
    pub fn new(key: Key, store: S, config: FabricConfig) -> Self {
        let ledger = Ledger::new(config.genesis.clone());
        Self {
            key,
            store: Arc::new(store),
            config,
            ledger: Mutex::new(ledger),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FabricConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start the ledger.
    ///
    /// With persistence on, previously written pages are reloaded and
    /// re-verified; a fresh store gets its genesis page written.
    pub async fn start(&self) -> Result<()> {
        let mut ledger = self.ledger.lock().await;
        if ledger.state() == LedgerState::Started {
            return Err(lifecycle_fault("start", &ledger));
        }

        if self.config.persist && ledger.is_empty() {
            let pages = self.load_pages().await?;
            let restored = pages.len();
            *ledger = Ledger::from_pages(self.config.genesis.clone(), pages)?;
            if restored > 0 {
                tracing::info!(pages = restored, id = %ledger.id(), "restored ledger");
            }
        }

        // Genesis must be durable before the ledger accepts appends; a failed
        // write leaves the instance stopped and empty so `start` can be retried.
        if self.config.persist && ledger.is_empty() {
            let genesis = self.config.genesis.page();
            self.persist_page(&genesis).await?;
        }
        ledger.start()?;

        tracing::info!(height = ?ledger.height(), "fabric started");
        Ok(())
    }

    /// Stop the ledger. Committed pages are kept and reloaded by `start`.
    pub async fn stop(&self) {
        let mut ledger = self.ledger.lock().await;
        if ledger.state() == LedgerState::Started {
            tracing::info!(height = ?ledger.height(), "fabric stopped");
        }
        ledger.stop();
    }

    pub async fn state(&self) -> LedgerState {
        self.ledger.lock().await.state()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Canonicalize `message` and append it as a new page.
    ///
    /// The page is written to the store before it is committed in memory; a
    /// failed write leaves the ledger unchanged.
    pub async fn append(&self, message: impl Into<CanonicalValue>) -> Result<Page> {
        let mut ledger = self.ledger.lock().await;
        let page = ledger.next_page(message)?;

        if self.config.persist {
            self.persist_page(&page).await?;
        }

        let committed = ledger.commit(page)?;
        tracing::debug!(height = committed.height(), id = %committed.id(), "appended page");
        Ok(committed.clone())
    }

    /// Append a machine result as a page.
    pub async fn commit_state(&self, state: &State) -> Result<Page> {
        self.append(state.value().clone()).await
    }

    pub async fn pages(&self) -> Vec<Page> {
        self.ledger.lock().await.pages().to_vec()
    }

    pub async fn page(&self, height: u64) -> Option<Page> {
        self.ledger.lock().await.get(height).cloned()
    }

    /// Merkle leaves in page order.
    pub async fn preimage(&self) -> Vec<Bytes> {
        self.ledger.lock().await.preimage().to_vec()
    }

    pub async fn preimage_string(&self) -> String {
        self.ledger.lock().await.preimage_string()
    }

    /// Tree over the current preimage.
    pub async fn merkle_tree(&self) -> MerkleTree {
        MerkleTree::new(self.ledger.lock().await.preimage())
    }

    pub async fn ledger_id(&self) -> Sha256Hash {
        self.ledger.lock().await.id()
    }

    pub async fn height(&self) -> Option<u64> {
        self.ledger.lock().await.height()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Machine Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `script` on a fresh machine with the standard opcodes.
    ///
    /// The resulting state is returned, not appended; see
    /// [`Fabric::commit_state`].
    pub async fn compute(&self, script: Script) -> Result<State> {
        self.require_started("compute").await?;

        let mut machine = Machine::with_standard_opcodes(self.config.machine.clone());
        *machine.script_mut() = script;
        machine.start()?;
        let state = machine.compute().cloned();
        machine.stop();
        Ok(state?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Store Passthrough
    // ─────────────────────────────────────────────────────────────────────────

    /// Read a value written with [`Fabric::set`].
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.require_started("get").await?;
        Ok(self.store.get(&self.data_key(key)).await?)
    }

    /// Store raw bytes next to the ledger. Keys live in their own namespace
    /// and cannot collide with page records.
    pub async fn set(&self, key: &str, value: impl Into<Bytes>) -> Result<()> {
        self.require_started("set").await?;
        Ok(self.store.set(&self.data_key(key), value.into()).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Signing
    // ─────────────────────────────────────────────────────────────────────────

    pub fn sign(&self, value: &CanonicalValue) -> Signature {
        value.sign(&self.key)
    }

    pub fn verify(&self, value: &CanonicalValue, signature: &Signature) -> bool {
        value.verify(&self.key.public_key(), signature)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    fn height_key(&self) -> String {
        format!("{}/height", self.config.namespace)
    }

    fn page_key(&self, height: u64) -> String {
        format!("{}/pages/{}", self.config.namespace, height)
    }

    fn data_key(&self, key: &str) -> String {
        format!("{}/data/{}", self.config.namespace, key)
    }

    /// Write a page record, then advance the persisted height to it.
    async fn persist_page(&self, page: &Page) -> Result<()> {
        self.store
            .set(&self.page_key(page.height()), Bytes::from(page.to_bytes()))
            .await?;
        self.store
            .set(&self.height_key(), Bytes::from(page.height().to_string()))
            .await?;
        Ok(())
    }

    async fn load_pages(&self) -> Result<Vec<Page>> {
        let Some(raw) = self.store.get(&self.height_key()).await? else {
            return Ok(Vec::new());
        };
        let height: u64 = std::str::from_utf8(&raw)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| FabricError::InvalidHeight(String::from_utf8_lossy(&raw).into_owned()))?;

        let mut pages = Vec::new();
        for h in 0..=height {
            let record = self
                .store
                .get(&self.page_key(h))
                .await?
                .ok_or(FabricError::MissingPage { height: h })?;
            pages.push(Page::from_bytes(&record)?);
        }
        Ok(pages)
    }

    async fn require_started(&self, operation: &'static str) -> Result<()> {
        let ledger = self.ledger.lock().await;
        if ledger.state() != LedgerState::Started {
            return Err(lifecycle_fault(operation, &ledger));
        }
        Ok(())
    }
}

fn lifecycle_fault(operation: &'static str, ledger: &Ledger) -> FabricError {
    FabricError::Core(CoreError::Lifecycle {
        operation,
        state: ledger.state().as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_core::Value;
    use fabric_store::MemoryStore;

    fn fabric() -> Fabric<MemoryStore> {
        Fabric::new(Key::from_seed(&[7; 32]), MemoryStore::new(), FabricConfig::default())
    }

    #[tokio::test]
    async fn test_start_persists_genesis() {
        let fabric = fabric();
        fabric.start().await.unwrap();

        assert_eq!(fabric.height().await, Some(0));
        assert!(fabric.store().has("fabric/pages/0").await.unwrap());
        assert_eq!(
            fabric.store().get("fabric/height").await.unwrap().unwrap(),
            Bytes::from_static(b"0")
        );
    }

    #[tokio::test]
    async fn test_append_requires_start() {
        let fabric = fabric();
        let err = fabric.append(Value::from("early")).await.unwrap_err();
        assert!(err.is_lifecycle());

        let err = fabric.set("k", Bytes::from_static(b"v")).await.unwrap_err();
        assert!(err.is_lifecycle());
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let fabric = fabric();
        fabric.start().await.unwrap();
        assert!(fabric.start().await.unwrap_err().is_lifecycle());
    }

    #[tokio::test]
    async fn test_data_keys_are_namespaced() {
        let fabric = fabric();
        fabric.start().await.unwrap();
        fabric.set("height", Bytes::from_static(b"not a height")).await.unwrap();

        assert_eq!(
            fabric.get("height").await.unwrap().unwrap(),
            Bytes::from_static(b"not a height")
        );
        assert_eq!(
            fabric.store().get("fabric/height").await.unwrap().unwrap(),
            Bytes::from_static(b"0")
        );
    }

    #[tokio::test]
    async fn test_no_persist_leaves_store_empty() {
        let config = FabricConfig {
            persist: false,
            ..FabricConfig::default()
        };
        let fabric = Fabric::new(Key::generate(), MemoryStore::new(), config);
        fabric.start().await.unwrap();
        fabric.append(Value::from("hello")).await.unwrap();

        assert_eq!(fabric.height().await, Some(1));
        assert!(fabric.store().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_height_record() {
        let fabric = fabric();
        fabric
            .store()
            .set("fabric/height", Bytes::from_static(b"seven"))
            .await
            .unwrap();
        assert!(matches!(
            fabric.start().await,
            Err(FabricError::InvalidHeight(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_page_record() {
        let fabric = fabric();
        fabric
            .store()
            .set("fabric/height", Bytes::from_static(b"0"))
            .await
            .unwrap();
        assert!(matches!(
            fabric.start().await,
            Err(FabricError::MissingPage { height: 0 })
        ));
    }

    #[tokio::test]
    async fn test_sign_and_verify() {
        let fabric = fabric();
        let value = CanonicalValue::from("signed");
        let signature = fabric.sign(&value);
        assert!(fabric.verify(&value, &signature));
        assert!(!fabric.verify(&CanonicalValue::from("other"), &signature));
    }
}
