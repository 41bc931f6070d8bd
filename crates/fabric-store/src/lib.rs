//! # Fabric Store
//!
//! Byte storage for Fabric. A trait-based key/value interface with SQLite
//! and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`ByteStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use fabric_store::{ByteStore, SqliteStore};
//!
//! async fn example() -> fabric_store::Result<()> {
//!     let store = SqliteStore::open("fabric.db")?;
//!     store.set("greeting", Bytes::from_static(b"hello")).await?;
//!     assert!(store.get("greeting").await?.is_some());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::ByteStore;
