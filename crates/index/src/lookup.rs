//! Position index: an unordered record array with a sorted shadow index
//!
//! Insertion order, not value order, is primary, yet membership and position
//! lookups stay O(log n):
//!
//! - `record_ids` holds every record id in ascending order
//! - `positions[i]` is the slot of `record_ids[i]` in the unordered array
//!
//! `positions` is always a permutation of `0..len`. The unordered array
//! itself is only materialized on demand and memoized until the next
//! mutation.

use once_cell::sync::OnceCell;
use std::sync::Arc;
use strata_core::{Error, Result};

/// Unordered array of unique record ids with O(log n) lookup
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    positions: Vec<usize>,
    record_ids: Vec<i32>,
    memoized: OnceCell<Arc<Vec<i32>>>,
}

impl PositionIndex {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Index holding a single record
    pub fn single(record_id: i32) -> Self {
        Self {
            positions: vec![0],
            record_ids: vec![record_id],
            memoized: OnceCell::new(),
        }
    }

    /// Build from an unordered array of unique ids
    ///
    /// # Errors
    /// `DuplicateRecord` if an id occurs twice.
    pub fn from_unordered(unordered: &[i32]) -> Result<Self> {
        let index = Self::build(unordered.to_vec());
        if let Some(pair) = index.record_ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(Error::DuplicateRecord { record_id: pair[0] });
        }
        Ok(index)
    }

    /// Rebuild both arrays from a materialized unordered array
    fn build(unordered: Vec<i32>) -> Self {
        let mut positions: Vec<usize> = (0..unordered.len()).collect();
        positions.sort_by_key(|&slot| unordered[slot]);
        let record_ids = positions.iter().map(|&slot| unordered[slot]).collect();
        let memoized = OnceCell::new();
        let _ = memoized.set(Arc::new(unordered));
        Self {
            positions,
            record_ids,
            memoized,
        }
    }

    /// Slot of `record_id` in the unordered array
    pub fn find_position(&self, record_id: i32) -> Option<usize> {
        self.record_ids
            .binary_search(&record_id)
            .ok()
            .map(|index| self.positions[index])
    }

    /// Whether `record_id` is present
    pub fn contains(&self, record_id: i32) -> bool {
        self.record_ids.binary_search(&record_id).is_ok()
    }

    /// Insert `record_id` right after `previous` (or at the head for `None`)
    ///
    /// Returns the slot the record landed on.
    ///
    /// # Errors
    /// * `RecordNotFound` - `previous` is not in the index
    /// * `DuplicateRecord` - `record_id` is already in the index
    pub fn add_record(&mut self, previous: Option<i32>, record_id: i32) -> Result<usize> {
        let slot = match previous {
            None => 0,
            Some(prev) => {
                self.find_position(prev)
                    .ok_or(Error::RecordNotFound { record_id: prev })?
                    + 1
            }
        };
        self.insert_at_slot(slot, record_id)?;
        Ok(slot)
    }

    /// Insert `record_id` at slot `index`
    ///
    /// # Errors
    /// * `IndexOutOfBounds` - `index > len`
    /// * `DuplicateRecord` - `record_id` is already in the index
    pub fn add_record_on_index(&mut self, index: usize, record_id: i32) -> Result<()> {
        if index > self.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        self.insert_at_slot(index, record_id)
    }

    fn insert_at_slot(&mut self, slot: usize, record_id: i32) -> Result<()> {
        let sorted_index = match self.record_ids.binary_search(&record_id) {
            Ok(_) => return Err(Error::DuplicateRecord { record_id }),
            Err(index) => index,
        };
        for position in self.positions.iter_mut().filter(|p| **p >= slot) {
            *position += 1;
        }
        self.record_ids.insert(sorted_index, record_id);
        self.positions.insert(sorted_index, slot);
        self.memoized.take();
        Ok(())
    }

    /// Append a batch of ids at the end, keeping their order
    ///
    /// Rebuilds the positions in one pass instead of shifting per element.
    ///
    /// # Errors
    /// `DuplicateRecord` if an id is already present or repeats in the batch;
    /// the index is left unchanged.
    pub fn append_records(&mut self, record_ids: &[i32]) -> Result<()> {
        if record_ids.is_empty() {
            return Ok(());
        }
        let mut sorted_new = record_ids.to_vec();
        sorted_new.sort_unstable();
        for (i, &id) in sorted_new.iter().enumerate() {
            if (i > 0 && sorted_new[i - 1] == id) || self.contains(id) {
                return Err(Error::DuplicateRecord { record_id: id });
            }
        }

        let mut aggregated = Vec::with_capacity(self.len() + record_ids.len());
        aggregated.extend_from_slice(self.get_array());
        aggregated.extend_from_slice(record_ids);

        let mut positions: Vec<usize> = (0..aggregated.len()).collect();
        positions.sort_by_key(|&slot| aggregated[slot]);

        let mut merged = Vec::with_capacity(aggregated.len());
        let (mut old, mut new) = (self.record_ids.iter().peekable(), sorted_new.iter().peekable());
        while let (Some(&&a), Some(&&b)) = (old.peek(), new.peek()) {
            if a < b {
                merged.push(a);
                old.next();
            } else {
                merged.push(b);
                new.next();
            }
        }
        merged.extend(old);
        merged.extend(new);

        self.positions = positions;
        self.record_ids = merged;
        self.memoized = OnceCell::new();
        let _ = self.memoized.set(Arc::new(aggregated));
        Ok(())
    }

    /// Remove `record_id`, returning the slot it occupied
    ///
    /// # Errors
    /// `RecordNotFound` if the id is absent.
    pub fn remove_record(&mut self, record_id: i32) -> Result<usize> {
        let index = self
            .record_ids
            .binary_search(&record_id)
            .map_err(|_| Error::RecordNotFound { record_id })?;
        self.record_ids.remove(index);
        let slot = self.positions.remove(index);
        for position in self.positions.iter_mut().filter(|p| **p > slot) {
            *position -= 1;
        }
        self.memoized.take();
        Ok(slot)
    }

    /// Remove the slots `start..end`, returning the removed ids in order
    ///
    /// # Errors
    /// `InvalidRange` if `start > end` or `end > len`.
    pub fn remove_range(&mut self, start: usize, end: usize) -> Result<Vec<i32>> {
        let len = self.len();
        if start > end || end > len {
            return Err(Error::InvalidRange { start, end, len });
        }
        let mut remaining = self.get_array().to_vec();
        let removed: Vec<i32> = remaining.drain(start..end).collect();
        *self = Self::build(remaining);
        Ok(removed)
    }

    /// Record on slot `index`
    pub fn record_at(&self, index: usize) -> Option<i32> {
        if let Some(array) = self.memoized.get() {
            return array.get(index).copied();
        }
        self.positions
            .iter()
            .position(|&p| p == index)
            .map(|i| self.record_ids[i])
    }

    /// Record on the last slot
    pub fn last_record_id(&self) -> Option<i32> {
        self.len().checked_sub(1).and_then(|last| self.record_at(last))
    }

    /// Materialized unordered array (memoized)
    pub fn get_array(&self) -> &[i32] {
        self.materialized().as_slice()
    }

    /// Materialized unordered array, shared with later readers of this index
    pub fn shared_array(&self) -> Arc<Vec<i32>> {
        Arc::clone(self.materialized())
    }

    fn materialized(&self) -> &Arc<Vec<i32>> {
        self.memoized.get_or_init(|| {
            let mut result = vec![0; self.record_ids.len()];
            for (&slot, &id) in self.positions.iter().zip(&self.record_ids) {
                result[slot] = id;
            }
            Arc::new(result)
        })
    }

    /// Record ids in ascending order
    pub fn record_ids(&self) -> &[i32] {
        &self.record_ids
    }

    /// Slots aligned with [`record_ids`](Self::record_ids)
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.record_ids.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.record_ids.is_empty()
    }
}

impl PartialEq for PositionIndex {
    fn eq(&self, other: &Self) -> bool {
        self.record_ids == other.record_ids && self.positions == other.positions
    }
}

impl Eq for PositionIndex {}
