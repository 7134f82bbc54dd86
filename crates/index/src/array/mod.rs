//! Transactional containers
//!
//! Long-lived mutable sets owned by the index structures above this crate.
//! Every operation takes the caller's transaction context explicitly:
//!
//! - `None`: the edit applies to the base array directly (single-writer fast
//!   path). The base is copy-on-write, so snapshots held by open transactions
//!   keep their view.
//! - `Some(txn)` without a layer: reads see the base array, the first write
//!   seeds a diff layer from the current base snapshot.
//! - `Some(txn)` with a layer: reads and writes go through the layer; the base
//!   array stays untouched until commit.
//!
//! Commit merges the layer into a new base array and swaps it in; rollback
//! drops the layer. Both are driven through
//! [`TransactionalParticipant`](strata_concurrency::TransactionalParticipant).

mod complex;
mod obj;
mod unordered;

pub use complex::{NestedParticipant, TransactionalComplexObjArray};
pub use obj::{TransactionalIntArray, TransactionalObjArray};
pub use unordered::TransactionalUnorderedIntArray;

use strata_core::{Comparator, Error, Result};

/// Sort `values` by `comparator`, folding runs of equal elements with `fold`
fn normalize<T, C, F>(mut values: Vec<T>, comparator: &C, mut fold: F) -> Vec<T>
where
    C: Comparator<T>,
    F: FnMut(&mut T, T),
{
    values.sort_by(|a, b| comparator.compare(a, b));
    let mut normalized: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        match normalized.last_mut() {
            Some(last) if comparator.compare(last, &value).is_eq() => fold(last, value),
            _ => normalized.push(value),
        }
    }
    normalized
}

/// Element on `index`, or `IndexOutOfBounds`
fn element_at<T: Clone>(values: &[T], index: usize) -> Result<T> {
    values.get(index).cloned().ok_or(Error::IndexOutOfBounds {
        index,
        len: values.len(),
    })
}
