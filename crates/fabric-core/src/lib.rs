//! # Fabric Core
//!
//! Pure primitives for Fabric: canonical values, the hash-chained ledger,
//! Merkle inclusion proofs, and the stack machine.
//!
//! This crate contains no I/O, no storage, no async. Everything here is a
//! deterministic function of its inputs.
//!
//! ## Key Types
//!
//! - [`CanonicalValue`] - A value plus the SHA-256 of its canonical encoding
//! - [`Key`] - Ed25519 signing identity
//! - [`Stack`] - Append-only commitment sequence
//! - [`Page`] / [`Ledger`] - Hash-linked pages and the chain that owns them
//! - [`MerkleTree`] - Inclusion proofs over a ledger preimage
//! - [`Machine`] - Stack interpreter producing a [`State`]
//!
//! ## Canonicalization
//!
//! Values are encoded as deterministic CBOR. See the [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod genesis;
pub mod ledger;
pub mod machine;
pub mod merkle;
pub mod opcode;
pub mod page;
pub mod script;
pub mod stack;
pub mod value;

pub use canonical::{
    canonical_bytes, decode_value, reconstruct, try_reconstruct, CanonicalValue, ValueId,
};
pub use crypto::{Key, PublicKey, Sha256Hash, Signature};
pub use error::{CoreError, MachineError, Result};
pub use genesis::{Genesis, GENESIS_PAGE_ID};
pub use ledger::{Ledger, LedgerState};
pub use machine::{Machine, MachineConfig, MachineLifecycle, OpcodePolicy, State};
pub use merkle::{MerkleProof, MerkleTree, Position, ProofStep};
pub use opcode::{Opcode, Operation};
pub use page::{Page, PageId};
pub use script::Script;
pub use stack::{OperandStack, Stack};
pub use value::Value;
