//! Transaction layer for the Strata transactional index
//!
//! This crate provides the explicit transaction handle containers consume:
//! - TransactionContext: per-transaction registry of diff layers
//! - TransactionalParticipant: commit / rollback capability of a container
//! - TransactionManager: transaction ids, commit protocol, metrics
//! - TransactionConfig: serde/TOML configuration
//!
//! Isolation is structural: each transaction gets its own diff layer per
//! container, seeded from the same immutable base array. Nothing here locks
//! on the read or write path; only commits are serialized.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod manager;
pub mod participant;
pub mod transaction;

pub use config::TransactionConfig;
pub use manager::{CommitSummary, TransactionManager, TransactionMetrics};
pub use participant::TransactionalParticipant;
pub use transaction::TransactionContext;
