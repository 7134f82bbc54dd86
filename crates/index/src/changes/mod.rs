//! Diff layers: pending edits against an immutable base array
//!
//! A diff layer never mutates its base array. It records:
//! - insertion groups: `(base position, sorted group)` spliced before the
//!   base element at that position, one group per position
//! - removals: base positions whose element is dropped
//!
//! Both position arrays are strictly ascending. The merged array is produced
//! by a single linear scan driven by [`next_change`] and memoized by the
//! owning layer until its next mutation.
//!
//! Variants:
//! - [`ObjArrayChanges`]: sorted sets of comparable values (the integer
//!   variant is `ObjArrayChanges<i32>`)
//! - [`ComplexObjArrayChanges`]: sorted sets of aggregates folded with
//!   [`ValueOps`](strata_core::ValueOps)
//! - [`UnorderedIntArrayChanges`]: insertion-ordered record ids backed by a
//!   [`PositionIndex`](crate::lookup::PositionIndex)

mod complex;
mod obj;
mod unordered;

pub use complex::ComplexObjArrayChanges;
pub use obj::{IntArrayChanges, ObjArrayChanges};
pub use unordered::UnorderedIntArrayChanges;

use crate::plan::next_change;
use smallvec::SmallVec;

/// Values inserted before one base position
pub(crate) type Group<T> = SmallVec<[T; 4]>;

/// Position bookkeeping shared by the ordered diff layers
#[derive(Debug, Clone)]
pub(crate) struct ChangeSet<T> {
    /// Base positions with an insertion group (strictly ascending)
    insertions: Vec<usize>,
    /// Groups aligned with `insertions`, never empty
    groups: Vec<Group<T>>,
    /// Base positions whose element is dropped (strictly ascending)
    removals: Vec<usize>,
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self {
            insertions: Vec::new(),
            groups: Vec::new(),
            removals: Vec::new(),
        }
    }
}

impl<T> ChangeSet<T> {
    pub(crate) fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.removals.is_empty()
    }

    pub(crate) fn insertions(&self) -> &[usize] {
        &self.insertions
    }

    pub(crate) fn removals(&self) -> &[usize] {
        &self.removals
    }

    pub(crate) fn group_by_index(&self, index: usize) -> &[T] {
        &self.groups[index]
    }

    pub(crate) fn groups(&self) -> impl Iterator<Item = &T> {
        self.groups.iter().flatten()
    }

    pub(crate) fn group(&self, position: usize) -> Option<&[T]> {
        self.insertions
            .binary_search(&position)
            .ok()
            .map(|i| &self.groups[i][..])
    }

    pub(crate) fn group_mut(&mut self, position: usize) -> Option<&mut Group<T>> {
        match self.insertions.binary_search(&position) {
            Ok(i) => Some(&mut self.groups[i]),
            Err(_) => None,
        }
    }

    pub(crate) fn group_len(&self, position: usize) -> usize {
        self.group(position).map_or(0, <[T]>::len)
    }

    /// Insert `value` at `offset` of the group at `position`, creating it if needed
    pub(crate) fn insert(&mut self, position: usize, offset: usize, value: T) {
        match self.insertions.binary_search(&position) {
            Ok(i) => self.groups[i].insert(offset, value),
            Err(i) => {
                let mut group = Group::new();
                group.push(value);
                self.insertions.insert(i, position);
                self.groups.insert(i, group);
            }
        }
    }

    /// Take the value at `offset` of the group at `position`, dropping the group once empty
    pub(crate) fn take(&mut self, position: usize, offset: usize) -> Option<T> {
        let i = self.insertions.binary_search(&position).ok()?;
        if offset >= self.groups[i].len() {
            return None;
        }
        let value = self.groups[i].remove(offset);
        if self.groups[i].is_empty() {
            self.insertions.remove(i);
            self.groups.remove(i);
        }
        Some(value)
    }

    pub(crate) fn is_removed(&self, position: usize) -> bool {
        self.removals.binary_search(&position).is_ok()
    }

    /// Record a removal; false if it was already recorded
    pub(crate) fn remove(&mut self, position: usize) -> bool {
        match self.removals.binary_search(&position) {
            Ok(_) => false,
            Err(i) => {
                self.removals.insert(i, position);
                true
            }
        }
    }

    /// Retract a removal; false if there was none
    pub(crate) fn restore(&mut self, position: usize) -> bool {
        match self.removals.binary_search(&position) {
            Ok(i) => {
                self.removals.remove(i);
                true
            }
            Err(_) => false,
        }
    }

    /// Logical index of the first element of the group at `position`
    ///
    /// Counts surviving base elements and inserted values before `position`
    /// without materializing anything.
    pub(crate) fn group_start(&self, position: usize) -> usize {
        logical_start(position, &self.insertions, &self.removals, |index| {
            self.groups[index].len()
        })
    }

    pub(crate) fn merged_len(&self, base_len: usize) -> usize {
        base_len - self.removals.len() + self.groups.iter().map(|g| g.len()).sum::<usize>()
    }
}

impl<T: Clone> ChangeSet<T> {
    /// Apply all pending edits to `base` in one linear scan
    pub(crate) fn merge(&self, base: &[T]) -> Vec<T> {
        merge_scan(
            base,
            &self.insertions,
            &self.removals,
            self.merged_len(base.len()),
            |index| &self.groups[index][..],
        )
    }
}

/// Linear merge of `base` with insertion groups and removals
///
/// `group(i)` yields the values spliced before base position `insertions[i]`.
pub(crate) fn merge_scan<'a, T, G>(
    base: &[T],
    insertions: &[usize],
    removals: &[usize],
    capacity: usize,
    group: G,
) -> Vec<T>
where
    T: Clone + 'a,
    G: Fn(usize) -> &'a [T],
{
    let mut result = Vec::with_capacity(capacity);
    let (mut ins, mut rem) = (0, 0);
    let mut copied = 0;

    loop {
        let change = next_change(insertions.get(ins).copied(), removals.get(rem).copied());
        let position = match change.position() {
            Some(position) => position,
            None => break,
        };
        result.extend_from_slice(&base[copied..position]);
        copied = position;
        if change.inserts() {
            result.extend_from_slice(group(ins));
            ins += 1;
        }
        if change.removes() {
            copied = position + 1;
            rem += 1;
        }
    }

    if copied < base.len() {
        result.extend_from_slice(&base[copied..]);
    }
    result
}

/// Logical index at which the group before base `position` starts
pub(crate) fn logical_start<L>(
    position: usize,
    insertions: &[usize],
    removals: &[usize],
    group_len: L,
) -> usize
where
    L: Fn(usize) -> usize,
{
    let removed_before = removals.partition_point(|&r| r < position);
    let groups_before = insertions.partition_point(|&p| p < position);
    let inserted_before: usize = (0..groups_before).map(group_len).sum();
    position - removed_before + inserted_before
}
