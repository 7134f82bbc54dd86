//! Error types for the transactional index substrate
//!
//! All fallible operations return [`Result`]. We use `thiserror` for automatic
//! `Display` and `Error` trait implementations.
//!
//! ## Taxonomy
//!
//! - Contract violations (inserting after an unknown record, reading past the
//!   end, a corrupted layer registry) are errors and must never be swallowed.
//! - Defined no-ops (removing an absent value, adding a duplicate without a
//!   combiner) are NOT errors. They surface as `None` / `false` return values.

use crate::types::ContainerId;
use thiserror::Error;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the transactional index substrate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Record referenced by an operation is not present
    #[error("Record {record_id} is not present in the array")]
    RecordNotFound {
        /// Missing record id
        record_id: i32,
    },

    /// Record is already present where uniqueness is required
    #[error("Record {record_id} is already present in the array")]
    DuplicateRecord {
        /// Duplicated record id
        record_id: i32,
    },

    /// Positional access beyond the logical length
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Logical length at the time of the call
        len: usize,
    },

    /// Range that is reversed or exceeds the logical length
    #[error("Invalid range {start}..{end} for length {len}")]
    InvalidRange {
        /// Range start (inclusive)
        start: usize,
        /// Range end (exclusive)
        end: usize,
        /// Logical length at the time of the call
        len: usize,
    },

    /// Transaction context holds a layer of a different type for this container
    #[error("Layer registered for container {container} has an unexpected type")]
    LayerTypeMismatch {
        /// Container whose layer could not be resolved
        container: ContainerId,
    },

    /// Transaction tried to open more diff layers than configured
    #[error("Transaction exceeded the limit of {limit} diff layers")]
    LayerLimitExceeded {
        /// Configured limit
        limit: usize,
    },

    /// Commit found layers that no participant claimed
    #[error("Commit found {count} diff layers not owned by any participant")]
    OrphanedLayers {
        /// Number of unclaimed layers
        count: usize,
    },

    /// Configuration could not be parsed or is inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal bookkeeping is inconsistent
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Returns true for errors caused by a caller breaking an operation contract
    ///
    /// These indicate index corruption upstream and must not be retried.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::RecordNotFound { .. }
                | Error::DuplicateRecord { .. }
                | Error::IndexOutOfBounds { .. }
                | Error::InvalidRange { .. }
                | Error::InvariantViolation(_)
        )
    }

    /// Returns true for errors raised by transaction bookkeeping rather than data
    pub fn is_transaction_error(&self) -> bool {
        matches!(
            self,
            Error::LayerTypeMismatch { .. }
                | Error::LayerLimitExceeded { .. }
                | Error::OrphanedLayers { .. }
        )
    }
}
