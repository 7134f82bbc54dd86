use super::ChangeSet;
use once_cell::unsync::OnceCell;
use std::sync::Arc;
use strata_core::{Comparator, NaturalOrder};

/// Diff layer over a sorted set of comparable values
///
/// Adding a value already present is a no-op (or retracts its pending
/// removal); removing an absent value is a no-op.
#[derive(Debug)]
pub struct ObjArrayChanges<T, C = NaturalOrder> {
    base: Arc<Vec<T>>,
    comparator: C,
    changes: ChangeSet<T>,
    memoized: OnceCell<Arc<Vec<T>>>,
}

/// Diff layer over a sorted set of integers
pub type IntArrayChanges = ObjArrayChanges<i32, NaturalOrder>;

impl<T, C> ObjArrayChanges<T, C>
where
    T: Clone,
    C: Comparator<T>,
{
    /// Empty layer over `base`
    pub fn new(base: Arc<Vec<T>>, comparator: C) -> Self {
        Self {
            base,
            comparator,
            changes: ChangeSet::default(),
            memoized: OnceCell::new(),
        }
    }

    /// Base array the layer computes against
    pub fn base(&self) -> &Arc<Vec<T>> {
        &self.base
    }

    fn search_base(&self, value: &T) -> Result<usize, usize> {
        self.base
            .binary_search_by(|probe| self.comparator.compare(probe, value))
    }

    fn search_group(&self, position: usize, value: &T) -> Result<usize, usize> {
        self.changes
            .group(position)
            .map_or(Err(0), |group| {
                group.binary_search_by(|probe| self.comparator.compare(probe, value))
            })
    }

    /// Whether `value` is in the merged view
    pub fn contains(&self, value: &T) -> bool {
        match self.search_base(value) {
            Ok(position) => !self.changes.is_removed(position),
            Err(position) => self.search_group(position, value).is_ok(),
        }
    }

    /// Index of `value` in the merged view, computed from the bookkeeping
    pub fn index_of(&self, value: &T) -> Option<usize> {
        match self.search_base(value) {
            Ok(position) if self.changes.is_removed(position) => None,
            Ok(position) => {
                Some(self.changes.group_start(position) + self.changes.group_len(position))
            }
            Err(position) => self
                .search_group(position, value)
                .ok()
                .map(|offset| self.changes.group_start(position) + offset),
        }
    }

    /// Add `value`, returning its index in the merged view
    pub fn add(&mut self, value: T) -> usize {
        match self.search_base(&value) {
            Ok(position) => {
                if self.changes.restore(position) {
                    self.invalidate();
                }
                self.changes.group_start(position) + self.changes.group_len(position)
            }
            Err(position) => match self.search_group(position, &value) {
                Ok(offset) => self.changes.group_start(position) + offset,
                Err(offset) => {
                    self.changes.insert(position, offset, value);
                    self.invalidate();
                    self.changes.group_start(position) + offset
                }
            },
        }
    }

    /// Remove `value`, returning the index it had in the merged view
    pub fn remove(&mut self, value: &T) -> Option<usize> {
        let index = match self.search_base(value) {
            Ok(position) => {
                if self.changes.is_removed(position) {
                    return None;
                }
                let index = self.changes.group_start(position) + self.changes.group_len(position);
                self.changes.remove(position);
                index
            }
            Err(position) => {
                let offset = self.search_group(position, value).ok()?;
                let index = self.changes.group_start(position) + offset;
                self.changes.take(position, offset);
                index
            }
        };
        self.invalidate();
        Some(index)
    }

    /// Values inserted before base `position`
    pub fn insertion_on_position(&self, position: usize) -> Option<&[T]> {
        self.changes.group(position)
    }

    /// Whether the base element at `position` is dropped
    pub fn is_removal_on_position(&self, position: usize) -> bool {
        self.changes.is_removed(position)
    }

    /// Whether the layer records any edit
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Length of the merged view
    pub fn merged_len(&self) -> usize {
        self.changes.merged_len(self.base.len())
    }

    /// Merged array (memoized until the next mutation)
    pub fn merged(&self) -> Arc<Vec<T>> {
        if self.changes.is_empty() {
            return Arc::clone(&self.base);
        }
        Arc::clone(
            self.memoized
                .get_or_init(|| Arc::new(self.changes.merge(&self.base))),
        )
    }

    /// Inserted values that exist only in this layer
    pub fn inserted_values(&self) -> impl Iterator<Item = &T> {
        self.changes.groups()
    }

    pub(crate) fn changes(&self) -> &ChangeSet<T> {
        &self.changes
    }

    fn invalidate(&mut self) {
        self.memoized.take();
    }
}
