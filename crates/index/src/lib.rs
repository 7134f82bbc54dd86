//! Transactional array containers for the Strata index
//!
//! This crate provides the array substrate the index structures are built on:
//! - plan: merge-plan stepper driving every merge scan
//! - changes: diff layers recording pending edits against a base array
//! - lookup: PositionIndex, unordered record ids with O(log n) lookup
//! - array: transactional containers routing operations to the base array
//!   or to a per-transaction diff layer
//! - iter: lazy iterators walking base array and layer in lockstep
//!
//! # Isolation
//!
//! A container never shares a diff layer between transactions. Each layer is
//! seeded from the immutable base array snapshot current at first touch, so
//! concurrent transactions never observe each other's pending edits. Commit
//! replaces the base array wholesale.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array;
pub mod changes;
pub mod iter;
pub mod lookup;
pub mod plan;

pub use array::{
    NestedParticipant, TransactionalComplexObjArray, TransactionalIntArray, TransactionalObjArray,
    TransactionalUnorderedIntArray,
};
pub use changes::{
    ComplexObjArrayChanges, IntArrayChanges, ObjArrayChanges, UnorderedIntArrayChanges,
};
pub use iter::{BaseArray, ChangeView, MergeIter};
pub use lookup::PositionIndex;
pub use plan::{next_change, PlannedChange};
