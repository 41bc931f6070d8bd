//! # Fabric
//!
//! Verifiable, append-only memory: a hash-chained ledger of canonical values
//! with Merkle inclusion proofs, plus a small stack machine whose results can
//! be committed to the ledger.
//!
//! ## Key Concepts
//!
//! - **Canonical Value**: Data plus the SHA-256 of its deterministic encoding.
//! - **Page**: One hash-linked ledger entry. Never edited.
//! - **Genesis**: The fixed first page, reproducible from a hard-coded seed.
//! - **Preimage**: The ordered Merkle leaves of a ledger, one per page.
//! - **State**: The canonical snapshot a machine run ends with.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fabric::{Fabric, FabricConfig};
//! use fabric::core::{Key, Script, Value};
//! use fabric::store::SqliteStore;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let store = SqliteStore::open("fabric.db")?;
//!     let fabric = Fabric::new(Key::generate(), store, FabricConfig::default());
//!
//!     fabric.start().await?;
//!     fabric.append(Value::from("Hello, world.")).await?;
//!
//!     let script: Script = ["1", "1", "OP_ADD"].into_iter().collect();
//!     let state = fabric.compute(script).await?;
//!     fabric.commit_state(&state).await?;
//!
//!     fabric.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `fabric::core` - Pure primitives (values, ledger, machine)
//! - `fabric::store` - Byte storage and SQLite

pub mod error;
pub mod fabric;

pub use fabric_core as core;
pub use fabric_store as store;

pub use crate::error::{FabricError, Result};
pub use crate::fabric::{Fabric, FabricConfig};

pub use fabric_core::{
    CanonicalValue, Key, LedgerState, MerkleProof, MerkleTree, Page, PageId, PublicKey, Script,
    Sha256Hash, Signature, State, Value,
};
