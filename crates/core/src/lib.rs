//! Core types and traits for the Strata transactional index
//!
//! This crate defines the foundational pieces shared by every layer:
//! - Error: Error taxonomy (contract violations vs. transaction bookkeeping)
//! - ContainerId / TxnId: identities used to key per-transaction diff layers
//! - Comparator: element ordering for sorted containers
//! - ValueOps: combiner / reducer / obsolete check / deep equality for
//!   containers whose elements are mutable aggregates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{Comparator, FnComparator, NaturalOrder, ValueOps};
pub use types::{ContainerId, TxnId};
