//! # Fabric Testkit
//!
//! Testing utilities for Fabric.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known inputs with expected hashes for cross-platform verification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use fabric_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, detail) in verify_all_vectors() {
//!     assert!(ok, "{}: {}", name, detail);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use fabric_core::CanonicalValue;
//! use fabric_testkit::generators::value;
//!
//! proptest! {
//!     #[test]
//!     fn id_is_deterministic(v in value()) {
//!         prop_assert_eq!(CanonicalValue::new(v.clone()).id(), CanonicalValue::new(v).id());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use fabric_testkit::fixtures::TestFixture;
//!
//! # async fn example() -> fabric::Result<()> {
//! let fixture = TestFixture::new();
//! let fabric = fixture.started_fabric().await?;
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, script, TestFixture};
pub use generators::{key, sum_script, value};
pub use vectors::{canonical_vectors, ledger_vectors, verify_all_vectors, CanonicalVector, LedgerVector};
