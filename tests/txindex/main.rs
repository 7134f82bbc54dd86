//! Transactional Index Integration Tests
//!
//! End-to-end behaviour of the containers driven through the transaction
//! manager: merge correctness against a plain-vector oracle, isolation
//! between concurrent transactions, nested commit/rollback, and randomized
//! stress runs.

mod common;

mod complex_fold;
mod isolation;
mod lifecycle;
mod merge_oracle;
mod stress;
mod unordered_oracle;
