//! Core identifier types
//!
//! This module defines:
//! - ContainerId: process-unique identity of a transactional container
//! - TxnId: identifier of a logical transaction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of container identities, shared by the whole process
static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a transactional container
///
/// A transaction context keys its diff layers by this id, so two containers
/// must never share one. [`ContainerId::next`] hands out unique values for the
/// lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(u64);

impl ContainerId {
    /// Allocate a fresh, never before used id
    pub fn next() -> Self {
        Self(NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw value (tests and diagnostics)
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a logical transaction
pub type TxnId = u64;
