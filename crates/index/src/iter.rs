//! Lazy iterators over a container's current view
//!
//! Walks the base array and a diff layer in lockstep, yielding the merged
//! sequence without materializing it. Without a layer the iterator simply
//! walks the base array snapshot it holds.

use crate::changes::{ComplexObjArrayChanges, ObjArrayChanges, UnorderedIntArrayChanges};
use crate::lookup::PositionIndex;
use std::sync::Arc;
use strata_core::Comparator;

/// Read access to the bookkeeping of a diff layer
pub trait ChangeView<T> {
    /// Base array the layer computes against
    fn base_slice(&self) -> &[T];
    /// Base positions with an insertion group (strictly ascending)
    fn insertion_positions(&self) -> &[usize];
    /// Group aligned with `insertion_positions()[index]`
    fn group_at(&self, index: usize) -> &[T];
    /// Base positions dropped from the view (strictly ascending)
    fn removal_positions(&self) -> &[usize];
    /// Length of the merged view
    fn view_len(&self) -> usize;
}

/// Owned handle on a base array snapshot
pub trait BaseArray<T> {
    /// Elements of the snapshot
    fn as_slice(&self) -> &[T];
}

impl<T> BaseArray<T> for Arc<Vec<T>> {
    fn as_slice(&self) -> &[T] {
        self
    }
}

impl BaseArray<i32> for Arc<PositionIndex> {
    fn as_slice(&self) -> &[i32] {
        self.get_array()
    }
}

enum Source<'a, B, V> {
    Base(B),
    Layer(&'a V),
}

/// Iterator over the merged view of a container
pub struct MergeIter<'a, T, B, V> {
    source: Source<'a, B, V>,
    base_pos: usize,
    ins: usize,
    group_offset: usize,
    rem: usize,
    remaining: usize,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<'a, T, B, V> MergeIter<'a, T, B, V>
where
    B: BaseArray<T>,
    V: ChangeView<T>,
{
    /// Iterate a base array snapshot with no pending edits
    pub fn over_base(base: B) -> Self {
        let remaining = base.as_slice().len();
        Self::new(Source::Base(base), remaining)
    }

    /// Iterate the merged view of a diff layer
    pub fn over_layer(layer: &'a V) -> Self {
        Self::new(Source::Layer(layer), layer.view_len())
    }

    fn new(source: Source<'a, B, V>, remaining: usize) -> Self {
        Self {
            source,
            base_pos: 0,
            ins: 0,
            group_offset: 0,
            rem: 0,
            remaining,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'a, T, B, V> Iterator for MergeIter<'a, T, B, V>
where
    T: Clone,
    B: BaseArray<T>,
    V: ChangeView<T>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let layer: &'a V = match &self.source {
            Source::Base(base) => {
                let item = base.as_slice().get(self.base_pos).cloned();
                if item.is_some() {
                    self.base_pos += 1;
                    self.remaining -= 1;
                }
                return item;
            }
            Source::Layer(layer) => layer,
        };

        let insertions = layer.insertion_positions();
        let removals = layer.removal_positions();
        let base = layer.base_slice();
        loop {
            if insertions.get(self.ins) == Some(&self.base_pos) {
                let group = layer.group_at(self.ins);
                if let Some(item) = group.get(self.group_offset) {
                    self.group_offset += 1;
                    self.remaining -= 1;
                    return Some(item.clone());
                }
                self.ins += 1;
                self.group_offset = 0;
                continue;
            }
            if self.base_pos >= base.len() {
                return None;
            }
            let position = self.base_pos;
            self.base_pos += 1;
            if removals.get(self.rem) == Some(&position) {
                self.rem += 1;
                continue;
            }
            self.remaining -= 1;
            return Some(base[position].clone());
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, B, V> ExactSizeIterator for MergeIter<'a, T, B, V>
where
    T: Clone,
    B: BaseArray<T>,
    V: ChangeView<T>,
{
}

impl<T: Clone, C: Comparator<T>> ChangeView<T> for ObjArrayChanges<T, C> {
    fn base_slice(&self) -> &[T] {
        self.base()
    }

    fn insertion_positions(&self) -> &[usize] {
        self.changes().insertions()
    }

    fn group_at(&self, index: usize) -> &[T] {
        self.changes().group_by_index(index)
    }

    fn removal_positions(&self) -> &[usize] {
        self.changes().removals()
    }

    fn view_len(&self) -> usize {
        self.merged_len()
    }
}

impl<T: Clone, C: Comparator<T>> ChangeView<T> for ComplexObjArrayChanges<T, C> {
    fn base_slice(&self) -> &[T] {
        self.base()
    }

    fn insertion_positions(&self) -> &[usize] {
        self.changes().insertions()
    }

    fn group_at(&self, index: usize) -> &[T] {
        self.changes().group_by_index(index)
    }

    fn removal_positions(&self) -> &[usize] {
        self.changes().removals()
    }

    fn view_len(&self) -> usize {
        self.merged_len()
    }
}

impl ChangeView<i32> for UnorderedIntArrayChanges {
    fn base_slice(&self) -> &[i32] {
        self.base().get_array()
    }

    fn insertion_positions(&self) -> &[usize] {
        UnorderedIntArrayChanges::insertion_positions(self)
    }

    fn group_at(&self, index: usize) -> &[i32] {
        self.group_by_index(index)
    }

    fn removal_positions(&self) -> &[usize] {
        UnorderedIntArrayChanges::removal_positions(self)
    }

    fn view_len(&self) -> usize {
        self.merged_len()
    }
}
