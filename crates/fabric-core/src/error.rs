//! Error types for Fabric Core.

use thiserror::Error;

use crate::page::PageId;

/// Errors raised by canonicalization, signing, and the ledger.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    /// Unparseable preimage. Callers of [`crate::reconstruct`] never see this;
    /// it is absorbed into the empty value.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("chain integrity fault at height {height}: expected parent {expected}, got {actual}")]
    ChainIntegrity {
        height: u64,
        expected: PageId,
        actual: PageId,
    },

    #[error("page at height {height} has id {actual}, recomputed {expected}")]
    PageIdMismatch {
        height: u64,
        expected: PageId,
        actual: PageId,
    },

    #[error("page height out of order: expected {expected}, got {got}")]
    HeightMismatch { expected: u64, got: u64 },

    #[error("cannot {operation} while {state}")]
    Lifecycle {
        operation: &'static str,
        state: &'static str,
    },
}

/// Errors that abort a single machine run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("unknown opcode: {0}")]
    UnknownOpcode(String),

    #[error("stack underflow in {opcode}: requires {required} operands, {available} available")]
    StackUnderflow {
        opcode: &'static str,
        required: usize,
        available: usize,
    },

    #[error("{opcode} expects a numeric operand, got {got}")]
    NotNumeric { opcode: &'static str, got: String },

    #[error("integer overflow in {0}")]
    Overflow(&'static str),

    #[error("cannot {operation} while {state}")]
    Lifecycle {
        operation: &'static str,
        state: &'static str,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
