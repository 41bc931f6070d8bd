//! Ledger: the ordered, hash-chained sequence of pages.
//!
//! The ledger keeps two parallel sequences that must never drift apart:
//! `pages[i]` and `preimage[i]`, where `preimage[i]` is the Merkle leaf of
//! page `i`. An external tree builder relies on that correspondence.
//!
//! Lifecycle is an explicit state machine: `Stopped -> Started -> Stopped`.
//! Appending requires `Started`; stopping never touches committed pages.
//!
//! Appends take `&mut self`, so a single ledger is serialized by the borrow
//! checker. Callers sharing a ledger across tasks wrap it in a mutex and
//! hold the lock for the whole build-persist-commit sequence.

use bytes::Bytes;
use serde_json::{Map as JsonMap, Value as Json};

use crate::canonical::CanonicalValue;
use crate::crypto::Sha256Hash;
use crate::error::{CoreError, Result};
use crate::genesis::Genesis;
use crate::page::{Page, PageId};
use crate::value::Value;

/// Lifecycle state of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    Stopped,
    Started,
}

impl LedgerState {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerState::Stopped => "stopped",
            LedgerState::Started => "started",
        }
    }
}

/// An append-only, hash-chained ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    genesis: Genesis,
    pages: Vec<Page>,
    preimage: Vec<Bytes>,
    id: Sha256Hash,
    state: LedgerState,
}

impl Ledger {
    /// Create an empty, stopped ledger. `start` creates the genesis page.
    pub fn new(genesis: Genesis) -> Self {
        Self {
            genesis,
            pages: Vec::new(),
            preimage: Vec::new(),
            id: ledger_id(&[]),
            state: LedgerState::Stopped,
        }
    }

    /// Restore a stopped ledger from previously persisted pages.
    ///
    /// The first page must be this genesis's page, and every later page must
    /// link to its predecessor.
    pub fn from_pages(genesis: Genesis, pages: Vec<Page>) -> Result<Self> {
        let mut ledger = Self::new(genesis);

        if let Some(first) = pages.first() {
            let expected = ledger.genesis.page().id();
            if first.id() != expected {
                return Err(CoreError::ChainIntegrity {
                    height: 0,
                    expected,
                    actual: first.id(),
                });
            }
        }

        for page in pages {
            check_link(ledger.pages.last(), &page)?;
            ledger.push(page);
        }

        Ok(ledger)
    }

    /// Transition to `Started`, creating the genesis page if there is none.
    pub fn start(&mut self) -> Result<()> {
        if self.state == LedgerState::Started {
            return Err(self.lifecycle_fault("start"));
        }

        if self.pages.is_empty() {
            let genesis = self.genesis.page();
            tracing::debug!(id = %genesis.id(), "creating genesis page");
            self.push(genesis);
        }

        self.state = LedgerState::Started;
        tracing::debug!(height = self.pages.len() - 1, "ledger started");
        Ok(())
    }

    /// Transition to `Stopped`. Safe from any state; committed pages stay.
    pub fn stop(&mut self) {
        if self.state == LedgerState::Started {
            tracing::debug!(pages = self.pages.len(), "ledger stopped");
        }
        self.state = LedgerState::Stopped;
    }

    /// Canonicalize `message`, chain it onto the tip, and commit it.
    pub fn append(&mut self, message: impl Into<CanonicalValue>) -> Result<&Page> {
        let page = self.next_page(message)?;
        self.commit(page)
    }

    /// Build the page `append` would commit, without committing it.
    pub fn next_page(&self, message: impl Into<CanonicalValue>) -> Result<Page> {
        self.require_started("append")?;
        let tip = self.tip().ok_or_else(|| self.lifecycle_fault("append"))?;
        Ok(Page::new(tip.height() + 1, tip.id(), message.into()))
    }

    /// Commit a prepared page.
    ///
    /// Fails with [`CoreError::ChainIntegrity`] if the page does not point at
    /// the current tip, leaving the ledger unchanged.
    pub fn commit(&mut self, page: Page) -> Result<&Page> {
        self.require_started("append")?;
        check_link(self.pages.last(), &page)?;
        self.push(page);
        tracing::trace!(height = self.pages.len() - 1, "page committed");
        Ok(&self.pages[self.pages.len() - 1])
    }

    /// Re-check every link and page id.
    pub fn verify_chain(&self) -> Result<()> {
        let mut prev = None;
        for page in &self.pages {
            check_link(prev, page)?;
            prev = Some(page);
        }
        Ok(())
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn get(&self, height: u64) -> Option<&Page> {
        usize::try_from(height).ok().and_then(|h| self.pages.get(h))
    }

    /// Merkle leaves, one per page, in page order.
    pub fn preimage(&self) -> &[Bytes] {
        &self.preimage
    }

    /// Serialize the preimage as an index-keyed object of typed buffers.
    ///
    /// [`crate::reconstruct`] reads this back into the leaf sequence.
    pub fn preimage_string(&self) -> String {
        let obj: JsonMap<String, Json> = self
            .preimage
            .iter()
            .enumerate()
            .map(|(i, leaf)| (i.to_string(), Value::Bytes(leaf.clone()).to_json()))
            .collect();
        Json::Object(obj).to_string()
    }

    /// Hash over the full page sequence.
    pub fn id(&self) -> Sha256Hash {
        self.id
    }

    pub fn tip(&self) -> Option<&Page> {
        self.pages.last()
    }

    /// Height of the tip, if any page exists.
    pub fn height(&self) -> Option<u64> {
        self.tip().map(Page::height)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn state(&self) -> LedgerState {
        self.state
    }

    pub fn genesis(&self) -> &Genesis {
        &self.genesis
    }

    fn push(&mut self, page: Page) {
        self.preimage.push(page.leaf());
        self.pages.push(page);
        self.id = ledger_id(&self.pages);
    }

    fn require_started(&self, operation: &'static str) -> Result<()> {
        if self.state != LedgerState::Started {
            return Err(self.lifecycle_fault(operation));
        }
        Ok(())
    }

    fn lifecycle_fault(&self, operation: &'static str) -> CoreError {
        CoreError::Lifecycle {
            operation,
            state: self.state.as_str(),
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(Genesis::default())
    }
}

/// Check that `page` may follow `prev`.
fn check_link(prev: Option<&Page>, page: &Page) -> Result<()> {
    let expected_height = prev.map_or(0, |p| p.height() + 1);
    if page.height() != expected_height {
        return Err(CoreError::HeightMismatch {
            expected: expected_height,
            got: page.height(),
        });
    }

    let expected_parent = prev.map_or(PageId::GENESIS_PARENT, Page::id);
    if page.parent() != expected_parent {
        return Err(CoreError::ChainIntegrity {
            height: page.height(),
            expected: expected_parent,
            actual: page.parent(),
        });
    }

    let recomputed = page.recompute_id();
    if recomputed != page.id() {
        return Err(CoreError::PageIdMismatch {
            height: page.height(),
            expected: recomputed,
            actual: page.id(),
        });
    }

    Ok(())
}

fn ledger_id(pages: &[Page]) -> Sha256Hash {
    let mut buf = Vec::with_capacity(pages.len() * 32);
    for page in pages {
        buf.extend_from_slice(page.id().as_bytes());
    }
    Sha256Hash::hash(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::reconstruct;

    fn message(input: &str) -> Value {
        Value::map([("debug", Value::from(true)), ("input", Value::from(input))])
    }

    #[test]
    fn test_start_creates_genesis() {
        let mut ledger = Ledger::default();
        assert!(ledger.is_empty());

        ledger.start().unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.height(), Some(0));
        assert_eq!(ledger.tip().unwrap().id(), Genesis::default().page().id());
    }

    #[test]
    fn test_append_links_pages() {
        let mut ledger = Ledger::default();
        ledger.start().unwrap();
        ledger.append(message("Hello, world.")).unwrap();
        ledger.append(message("Why trust? Verify.")).unwrap();

        let pages = ledger.pages();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].parent(), pages[0].id());
        assert_eq!(pages[2].parent(), pages[1].id());
        assert_eq!(pages[2].height(), 2);
        ledger.verify_chain().unwrap();
    }

    #[test]
    fn test_preimage_tracks_pages() {
        let mut ledger = Ledger::default();
        ledger.start().unwrap();
        ledger.append(message("Hello, world.")).unwrap();
        ledger.append(message("Why trust? Verify.")).unwrap();

        assert_eq!(ledger.preimage().len(), 3);
        for (page, leaf) in ledger.pages().iter().zip(ledger.preimage()) {
            assert_eq!(leaf.as_ref(), page.id().as_bytes());
        }
    }

    #[test]
    fn test_preimage_string_reconstructs() {
        let mut ledger = Ledger::default();
        ledger.start().unwrap();
        ledger.append(message("Hello, world.")).unwrap();

        let restored = reconstruct(&ledger.preimage_string());
        let items = restored.data().as_array().unwrap();
        assert_eq!(items.len(), 2);
        for (item, leaf) in items.iter().zip(ledger.preimage()) {
            assert_eq!(item.as_bytes(), Some(leaf));
        }
    }

    #[test]
    fn test_append_while_stopped_fails() {
        let mut ledger = Ledger::default();
        let result = ledger.append(message("too early"));
        assert!(matches!(
            result,
            Err(CoreError::Lifecycle { operation: "append", state: "stopped" })
        ));

        ledger.start().unwrap();
        ledger.stop();
        assert!(ledger.append(message("too late")).is_err());
    }

    #[test]
    fn test_double_start_fails() {
        let mut ledger = Ledger::default();
        ledger.start().unwrap();
        assert!(matches!(ledger.start(), Err(CoreError::Lifecycle { .. })));
    }

    #[test]
    fn test_restart_keeps_pages() {
        let mut ledger = Ledger::default();
        ledger.start().unwrap();
        ledger.append(message("Hello, world.")).unwrap();
        let id = ledger.id();
        ledger.stop();
        ledger.stop();

        ledger.start().unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.id(), id);
        ledger.append(message("again")).unwrap();
        assert_eq!(ledger.height(), Some(2));
    }

    #[test]
    fn test_commit_rejects_stale_parent() {
        let mut ledger = Ledger::default();
        ledger.start().unwrap();

        // Two pages prepared against the same tip: only the first may land.
        let first = ledger.next_page(message("first")).unwrap();
        let second = ledger.next_page(message("second")).unwrap();
        ledger.commit(first).unwrap();

        let before = ledger.id();
        let result = ledger.commit(second);
        assert!(matches!(result, Err(CoreError::HeightMismatch { expected: 2, got: 1 })));
        assert_eq!(ledger.id(), before);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_commit_rejects_wrong_parent() {
        let mut ledger = Ledger::default();
        ledger.start().unwrap();

        let forged = Page::new(1, PageId::from_bytes([0xab; 32]), CanonicalValue::from("x"));
        assert!(matches!(
            ledger.commit(forged),
            Err(CoreError::ChainIntegrity { height: 1, .. })
        ));
    }

    #[test]
    fn test_ledger_id_changes_on_append() {
        let mut ledger = Ledger::default();
        ledger.start().unwrap();
        let before = ledger.id();
        ledger.append(message("Hello, world.")).unwrap();
        assert_ne!(ledger.id(), before);
    }

    #[test]
    fn test_from_pages_roundtrip() {
        let mut ledger = Ledger::default();
        ledger.start().unwrap();
        ledger.append(message("Hello, world.")).unwrap();

        let restored = Ledger::from_pages(Genesis::default(), ledger.pages().to_vec()).unwrap();
        assert_eq!(restored.id(), ledger.id());
        assert_eq!(restored.state(), LedgerState::Stopped);
        assert_eq!(restored.preimage(), ledger.preimage());
    }

    #[test]
    fn test_from_pages_rejects_foreign_genesis() {
        let foreign = Genesis::new(Value::from("other"), [0x01; 32]);
        let mut ledger = Ledger::new(foreign);
        ledger.start().unwrap();

        let result = Ledger::from_pages(Genesis::default(), ledger.pages().to_vec());
        assert!(matches!(result, Err(CoreError::ChainIntegrity { height: 0, .. })));
    }

    #[test]
    fn test_from_pages_rejects_gap() {
        let mut ledger = Ledger::default();
        ledger.start().unwrap();
        ledger.append(message("one")).unwrap();
        ledger.append(message("two")).unwrap();

        let mut pages = ledger.pages().to_vec();
        pages.remove(1);
        assert!(Ledger::from_pages(Genesis::default(), pages).is_err());
    }
}
