//! Strata transactional index - copy-on-write arrays for in-memory indexes
//!
//! Array-backed sets that many logical transactions observe and mutate
//! concurrently, each through its own diff layer over an immutable base
//! array. Nothing is copied per write; the merged array is built lazily.
//!
//! # Quick Start
//!
//! ```ignore
//! use strata_txindex::{TransactionManager, TransactionalIntArray};
//!
//! let manager = TransactionManager::new();
//! let array = TransactionalIntArray::from_vec(vec![1, 3, 5, 7]);
//!
//! let mut txn = manager.begin();
//! array.remove(Some(&mut txn), &3)?;
//! array.add(Some(&mut txn), 4)?;
//! assert_eq!(*array.get_array(None)?, vec![1, 3, 5, 7]);
//!
//! manager.commit(txn, &[&array])?;
//! assert_eq!(*array.get_array(None)?, vec![1, 4, 5, 7]);
//! ```
//!
//! # Architecture
//!
//! - `strata-core`: errors, identifiers, comparators, value operations
//! - `strata-concurrency`: transaction context, participants, manager
//! - `strata-index`: diff layers, position index, containers, iterators

pub use strata_concurrency::{
    CommitSummary, TransactionConfig, TransactionContext, TransactionManager,
    TransactionMetrics, TransactionalParticipant,
};
pub use strata_core::{
    Comparator, ContainerId, Error, FnComparator, NaturalOrder, Result, TxnId, ValueOps,
};
pub use strata_index::*;
