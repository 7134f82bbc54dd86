use super::ChangeSet;
use once_cell::unsync::OnceCell;
use std::sync::Arc;
use strata_core::{Comparator, NaturalOrder, ValueOps};

/// Diff layer over a sorted set of aggregates
///
/// Key-equal values fold together through [`ValueOps`] instead of
/// duplicating. Each base position is in one of three states:
///
/// - untouched: no removal recorded
/// - replaced: a removal is recorded AND the last value of the insertion
///   group at that position is key-equal to the base element; the merge
///   emits the group (carrying the folded value) and drops the base element
/// - removed: a removal is recorded with no key-equal value in the group
///
/// Every add/remove of an existing key computes the new effective value from
/// a plain clone of the current one and then settles the state: obsolete
/// values become `removed`, values deep-equal to the base element collapse
/// back to `untouched`, anything else is `replaced`.
///
/// Without value operations the layer behaves like
/// [`ObjArrayChanges`](super::ObjArrayChanges).
#[derive(Debug)]
pub struct ComplexObjArrayChanges<T, C = NaturalOrder> {
    base: Arc<Vec<T>>,
    comparator: C,
    ops: Option<ValueOps<T>>,
    changes: ChangeSet<T>,
    memoized: OnceCell<Arc<Vec<T>>>,
}

impl<T, C> ComplexObjArrayChanges<T, C>
where
    T: Clone,
    C: Comparator<T>,
{
    /// Empty layer over `base`
    pub fn new(base: Arc<Vec<T>>, comparator: C, ops: Option<ValueOps<T>>) -> Self {
        Self {
            base,
            comparator,
            ops,
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

    /// Offset of the folded replacement of base `position` within its group
    fn replacement_offset(&self, position: usize) -> Option<usize> {
        if !self.changes.is_removed(position) {
            return None;
        }
        let group = self.changes.group(position)?;
        let last = group.last()?;
        self.comparator
            .compare(last, &self.base[position])
            .is_eq()
            .then(|| group.len() - 1)
    }

    /// Current value of the key stored at base `position`
    fn effective(&self, position: usize) -> Option<T> {
        if !self.changes.is_removed(position) {
            return Some(self.base[position].clone());
        }
        self.replacement_offset(position)
            .and_then(|offset| self.changes.group(position).map(|g| g[offset].clone()))
    }

    fn is_obsolete(&self, value: &T) -> bool {
        self.ops.as_ref().map_or(false, |ops| ops.is_obsolete(value))
    }

    fn is_original(&self, position: usize, value: &T) -> bool {
        self.ops
            .as_ref()
            .map_or(true, |ops| ops.deep_equals(value, &self.base[position]))
    }

    /// Settle base `position` on a new effective value
    fn settle(&mut self, position: usize, value: Option<T>) {
        let replacement = self.replacement_offset(position);
        match value {
            None => {
                if let Some(offset) = replacement {
                    self.changes.take(position, offset);
                }
                self.changes.remove(position);
            }
            Some(value) if self.is_original(position, &value) => {
                if let Some(offset) = replacement {
                    self.changes.take(position, offset);
                }
                self.changes.restore(position);
            }
            Some(value) => match replacement {
                Some(offset) => {
                    if let Some(group) = self.changes.group_mut(position) {
                        group[offset] = value;
                    }
                }
                None => {
                    let offset = self.changes.group_len(position);
                    self.changes.insert(position, offset, value);
                    self.changes.remove(position);
                }
            },
        }
        self.memoized.take();
    }

    /// Whether the key of `value` is in the merged view
    pub fn contains(&self, value: &T) -> bool {
        match self.search_base(value) {
            Ok(position) => {
                !self.changes.is_removed(position) || self.replacement_offset(position).is_some()
            }
            Err(position) => self.search_group(position, value).is_ok(),
        }
    }

    /// Index of the key of `value` in the merged view
    pub fn index_of(&self, value: &T) -> Option<usize> {
        match self.search_base(value) {
            Ok(position) => {
                if self.changes.is_removed(position) {
                    self.replacement_offset(position)
                        .map(|offset| self.compute_removal_index(position, Some(offset)))
                } else {
                    Some(self.compute_removal_index(position, None))
                }
            }
            Err(position) => self
                .search_group(position, value)
                .ok()
                .map(|offset| self.compute_removal_index(position, Some(offset))),
        }
    }

    /// Current value stored under the key of `value`
    pub fn get_equal(&self, value: &T) -> Option<T> {
        match self.search_base(value) {
            Ok(position) => self.effective(position),
            Err(position) => {
                let offset = self.search_group(position, value).ok()?;
                self.changes.group(position).map(|g| g[offset].clone())
            }
        }
    }

    /// Logical index of an edit at base `position` once all pending changes apply
    ///
    /// `offset` addresses a value of the insertion group at `position`; `None`
    /// addresses the base element itself (or the slot it would occupy).
    pub fn compute_removal_index(&self, position: usize, offset: Option<usize>) -> usize {
        let start = self.changes.group_start(position);
        match offset {
            Some(offset) => start + offset,
            None => match self.replacement_offset(position) {
                Some(offset) => start + offset,
                None => start + self.changes.group_len(position),
            },
        }
    }

    /// Add `value`, folding it into a key-equal value when one exists
    ///
    /// Returns the index the key occupies afterwards, or `None` when the
    /// folded result is obsolete and the key disappeared.
    pub fn add(&mut self, value: T) -> Option<usize> {
        match self.search_base(&value) {
            Ok(position) => {
                let current = self.effective(position);
                let next = match (current, &self.ops) {
                    (Some(mut current), Some(ops)) => {
                        ops.combine(&mut current, &value);
                        Some(current)
                    }
                    (Some(_), None) => return Some(self.compute_removal_index(position, None)),
                    (None, Some(_)) => Some(value),
                    (None, None) => Some(self.base[position].clone()),
                };
                let next = next.filter(|v| !self.is_obsolete(v));
                let present = next.is_some();
                self.settle(position, next);
                present.then(|| self.compute_removal_index(position, None))
            }
            Err(position) => match self.search_group(position, &value) {
                Ok(offset) => {
                    let ops = match &self.ops {
                        Some(ops) => ops.clone(),
                        None => return Some(self.compute_removal_index(position, Some(offset))),
                    };
                    let obsolete = match self.changes.group_mut(position) {
                        Some(group) => {
                            ops.combine(&mut group[offset], &value);
                            ops.is_obsolete(&group[offset])
                        }
                        None => false,
                    };
                    if obsolete {
                        self.changes.take(position, offset);
                    }
                    self.memoized.take();
                    (!obsolete).then(|| self.compute_removal_index(position, Some(offset)))
                }
                Err(offset) => {
                    if self.is_obsolete(&value) {
                        return None;
                    }
                    self.changes.insert(position, offset, value);
                    self.memoized.take();
                    Some(self.compute_removal_index(position, Some(offset)))
                }
            },
        }
    }

    /// Remove `value`, subtracting it from a key-equal value
    ///
    /// Returns the index the key occupied before the call, or `None` when the
    /// key was absent.
    pub fn remove(&mut self, value: &T) -> Option<usize> {
        match self.search_base(value) {
            Ok(position) => {
                let mut current = self.effective(position)?;
                let index = self.compute_removal_index(position, None);
                let next = match &self.ops {
                    Some(ops) => {
                        ops.reduce(&mut current, value);
                        (!ops.is_obsolete(&current)).then_some(current)
                    }
                    None => None,
                };
                self.settle(position, next);
                Some(index)
            }
            Err(position) => {
                let offset = self.search_group(position, value).ok()?;
                let index = self.compute_removal_index(position, Some(offset));
                let drop = match (&self.ops, self.changes.group_mut(position)) {
                    (Some(ops), Some(group)) => {
                        ops.reduce(&mut group[offset], value);
                        ops.is_obsolete(&group[offset])
                    }
                    _ => true,
                };
                if drop {
                    self.changes.take(position, offset);
                }
                self.memoized.take();
                Some(index)
            }
        }
    }

    /// Values inserted before base `position`, including a folded replacement
    pub fn insertion_on_position(&self, position: usize) -> Option<&[T]> {
        self.changes.group(position)
    }

    /// Whether the base element at `position` is dropped or replaced
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

    /// Values that exist only in this layer
    pub fn inserted_values(&self) -> impl Iterator<Item = &T> {
        self.changes.groups()
    }

    pub(crate) fn changes(&self) -> &ChangeSet<T> {
        &self.changes
    }
}
