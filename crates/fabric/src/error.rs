//! Error types for the Fabric facade.

use fabric_core::{CoreError, MachineError};
use fabric_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Fabric operations.
#[derive(Debug, Error)]
pub enum FabricError {
    /// Ledger, canonicalization or lifecycle error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A script run failed.
    #[error("machine error: {0}")]
    Machine(#[from] MachineError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The persisted height names a page that is not in the store.
    #[error("persisted page {height} is missing")]
    MissingPage { height: u64 },

    /// The persisted height record is not a decimal integer.
    #[error("invalid persisted height: {0}")]
    InvalidHeight(String),
}

impl FabricError {
    /// Whether this is a lifecycle fault (operation invoked in the wrong state).
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            FabricError::Core(CoreError::Lifecycle { .. })
                | FabricError::Machine(MachineError::Lifecycle { .. })
        )
    }

    /// Whether this is a broken hash link in a ledger.
    pub fn is_chain_integrity(&self) -> bool {
        matches!(self, FabricError::Core(CoreError::ChainIntegrity { .. }))
    }
}

/// Result type for Fabric operations.
pub type Result<T> = std::result::Result<T, FabricError>;
