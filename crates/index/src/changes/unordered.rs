use super::{logical_start, merge_scan};
use crate::lookup::PositionIndex;
use once_cell::unsync::OnceCell;
use std::sync::Arc;
use strata_core::{Error, Result};

/// Where a record currently lives in the merged view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Untouched base record at this base position
    Base(usize),
    /// Record of the insertion group before base `position`
    Inserted { position: usize, offset: usize },
    Absent,
}

/// Diff layer over an insertion-ordered array of unique record ids
///
/// Groups are [`PositionIndex`] instances so membership checks inside a
/// group stay logarithmic. Adding a record that is already present moves it:
/// its previous placement is withdrawn first. Re-adding a removed base record
/// on its original slot cancels the removal instead of recording an
/// insertion.
#[derive(Debug)]
pub struct UnorderedIntArrayChanges {
    base: Arc<PositionIndex>,
    insertions: Vec<usize>,
    groups: Vec<PositionIndex>,
    removals: Vec<usize>,
    memoized: OnceCell<Arc<Vec<i32>>>,
}

impl UnorderedIntArrayChanges {
    /// Empty layer over `base`
    pub fn new(base: Arc<PositionIndex>) -> Self {
        Self {
            base,
            insertions: Vec::new(),
            groups: Vec::new(),
            removals: Vec::new(),
            memoized: OnceCell::new(),
        }
    }

    /// Base index the layer computes against
    pub fn base(&self) -> &Arc<PositionIndex> {
        &self.base
    }

    fn is_removed(&self, position: usize) -> bool {
        self.removals.binary_search(&position).is_ok()
    }

    fn group(&self, position: usize) -> Option<&PositionIndex> {
        self.insertions
            .binary_search(&position)
            .ok()
            .map(|i| &self.groups[i])
    }

    fn group_len(&self, position: usize) -> usize {
        self.group(position).map_or(0, PositionIndex::len)
    }

    fn group_start(&self, position: usize) -> usize {
        logical_start(position, &self.insertions, &self.removals, |i| {
            self.groups[i].len()
        })
    }

    fn locate(&self, record_id: i32) -> Placement {
        if let Some(position) = self.base.find_position(record_id) {
            if !self.is_removed(position) {
                return Placement::Base(position);
            }
        }
        for (i, group) in self.groups.iter().enumerate() {
            if let Some(offset) = group.find_position(record_id) {
                return Placement::Inserted {
                    position: self.insertions[i],
                    offset,
                };
            }
        }
        Placement::Absent
    }

    fn index_of_placement(&self, placement: Placement) -> Option<usize> {
        match placement {
            Placement::Base(position) => {
                Some(self.group_start(position) + self.group_len(position))
            }
            Placement::Inserted { position, offset } => Some(self.group_start(position) + offset),
            Placement::Absent => None,
        }
    }

    /// Whether `record_id` is in the merged view
    pub fn contains(&self, record_id: i32) -> bool {
        self.locate(record_id) != Placement::Absent
    }

    /// Index of `record_id` in the merged view
    pub fn index_of(&self, record_id: i32) -> Option<usize> {
        self.index_of_placement(self.locate(record_id))
    }

    /// Insert `record_id` right after `previous` (or at the head for `None`)
    ///
    /// Returns the index the record landed on.
    ///
    /// # Errors
    /// * `RecordNotFound` - `previous` is not in the merged view
    /// * `InvariantViolation` - `previous` is `record_id` itself
    pub fn add_after(&mut self, previous: Option<i32>, record_id: i32) -> Result<usize> {
        if previous == Some(record_id) {
            return Err(Error::InvariantViolation(format!(
                "record {record_id} cannot be placed after itself"
            )));
        }
        let expected = match previous {
            None => 0,
            Some(prev) => {
                self.index_of(prev)
                    .ok_or(Error::RecordNotFound { record_id: prev })?
                    + 1
            }
        };
        if self.index_of(record_id) == Some(expected) {
            return Ok(expected);
        }

        self.withdraw(record_id)?;
        let target = match previous.map(|prev| self.locate(prev)) {
            None => (0, 0),
            Some(Placement::Base(position)) => (position + 1, 0),
            Some(Placement::Inserted { position, offset }) => (position, offset + 1),
            Some(Placement::Absent) => {
                return Err(Error::InvariantViolation(format!(
                    "record {} vanished while moving {record_id}",
                    previous.unwrap_or_default()
                )))
            }
        };
        self.insert_at(target, record_id)?;
        self.index_of(record_id)
            .ok_or_else(|| Error::InvariantViolation(format!("record {record_id} was not inserted")))
    }

    /// Insert `record_id` so that it ends up on `index`
    ///
    /// # Errors
    /// `IndexOutOfBounds` if `index` exceeds the length the array has once
    /// `record_id` is withdrawn from its current place.
    pub fn add_on_index(&mut self, index: usize, record_id: i32) -> Result<()> {
        let present = self.contains(record_id);
        let len = self.merged_len() - usize::from(present);
        if index > len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        if present {
            self.withdraw(record_id)?;
        }

        let mut remaining = index;
        for position in 0..=self.base.len() {
            let group_len = self.group_len(position);
            if remaining <= group_len {
                return self.insert_at((position, remaining), record_id);
            }
            remaining -= group_len;
            if position < self.base.len() && !self.is_removed(position) {
                remaining -= 1;
            }
        }
        Err(Error::InvariantViolation(format!(
            "index {index} not reachable in array of length {len}"
        )))
    }

    /// Append `record_ids` at the end, keeping their order
    ///
    /// # Errors
    /// `DuplicateRecord` if the batch repeats an id.
    pub fn append_all(&mut self, record_ids: &[i32]) -> Result<()> {
        if record_ids.is_empty() {
            return Ok(());
        }
        let mut sorted = record_ids.to_vec();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(Error::DuplicateRecord { record_id: pair[0] });
        }
        for &record_id in record_ids {
            self.withdraw(record_id)?;
        }

        let tail = self.base.len();
        match self.insertions.binary_search(&tail) {
            Ok(i) => self.groups[i].append_records(record_ids)?,
            Err(i) => {
                self.insertions.insert(i, tail);
                self.groups.insert(i, PositionIndex::from_unordered(record_ids)?);
            }
        }
        self.memoized.take();
        Ok(())
    }

    /// Remove `record_id`, returning the index it had
    pub fn remove(&mut self, record_id: i32) -> Result<Option<usize>> {
        self.withdraw(record_id)
    }

    /// Remove the records on indexes `start..end`, returning them in order
    ///
    /// # Errors
    /// `InvalidRange` if `start > end` or `end` exceeds the merged length.
    pub fn remove_range(&mut self, start: usize, end: usize) -> Result<Vec<i32>> {
        let len = self.merged_len();
        if start > end || end > len {
            return Err(Error::InvalidRange { start, end, len });
        }
        let removed = self.merged()[start..end].to_vec();
        for &record_id in &removed {
            self.withdraw(record_id)?;
        }
        Ok(removed)
    }

    /// Record on `index` of the merged view
    pub fn get(&self, index: usize) -> Option<i32> {
        self.merged().get(index).copied()
    }

    /// Last record of the merged view, found without materializing it
    pub fn last_record_id(&self) -> Option<i32> {
        let base = self.base.get_array();
        for position in (0..=base.len()).rev() {
            if position < base.len() && !self.is_removed(position) {
                return Some(base[position]);
            }
            if let Some(last) = self.group(position).and_then(PositionIndex::last_record_id) {
                return Some(last);
            }
        }
        None
    }

    /// Records inserted before base `position`
    pub fn insertion_on_position(&self, position: usize) -> Option<&[i32]> {
        self.group(position).map(PositionIndex::get_array)
    }

    /// Whether the base record at `position` is dropped
    pub fn is_removal_on_position(&self, position: usize) -> bool {
        self.is_removed(position)
    }

    /// Whether the layer records any edit
    pub fn has_changes(&self) -> bool {
        !self.insertions.is_empty() || !self.removals.is_empty()
    }

    /// Length of the merged view
    pub fn merged_len(&self) -> usize {
        let inserted: usize = self.groups.iter().map(PositionIndex::len).sum();
        self.base.len() - self.removals.len() + inserted
    }

    /// Merged array (memoized until the next mutation)
    pub fn merged(&self) -> Arc<Vec<i32>> {
        if !self.has_changes() {
            return self.base.shared_array();
        }
        Arc::clone(self.memoized.get_or_init(|| {
            Arc::new(merge_scan(
                self.base.get_array(),
                &self.insertions,
                &self.removals,
                self.merged_len(),
                |i| self.groups[i].get_array(),
            ))
        }))
    }

    /// New base index holding the merged view
    pub fn to_index(&self) -> Result<Arc<PositionIndex>> {
        if !self.has_changes() {
            return Ok(Arc::clone(&self.base));
        }
        PositionIndex::from_unordered(&self.merged()).map(Arc::new)
    }

    pub(crate) fn insertion_positions(&self) -> &[usize] {
        &self.insertions
    }

    pub(crate) fn removal_positions(&self) -> &[usize] {
        &self.removals
    }

    pub(crate) fn group_by_index(&self, index: usize) -> &[i32] {
        self.groups[index].get_array()
    }

    /// Take `record_id` out of its current placement
    fn withdraw(&mut self, record_id: i32) -> Result<Option<usize>> {
        let placement = self.locate(record_id);
        let index = self.index_of_placement(placement);
        match placement {
            Placement::Base(position) => {
                if let Err(i) = self.removals.binary_search(&position) {
                    self.removals.insert(i, position);
                }
            }
            Placement::Inserted { position, .. } => {
                if let Ok(i) = self.insertions.binary_search(&position) {
                    self.groups[i].remove_record(record_id)?;
                    if self.groups[i].is_empty() {
                        self.insertions.remove(i);
                        self.groups.remove(i);
                    }
                }
            }
            Placement::Absent => return Ok(None),
        }
        self.memoized.take();
        Ok(index)
    }

    /// Place `record_id` (already withdrawn) at `offset` of the group before `position`
    fn insert_at(&mut self, (position, offset): (usize, usize), record_id: i32) -> Result<()> {
        let restores_base = self.base.get_array().get(position) == Some(&record_id)
            && self.is_removed(position);

        if restores_base {
            if let Ok(i) = self.removals.binary_search(&position) {
                self.removals.remove(i);
            }
            // values after the restored record move behind it
            let tail = match self.insertions.binary_search(&position) {
                Ok(i) => {
                    let len = self.groups[i].len();
                    let tail = self.groups[i].remove_range(offset, len)?;
                    if self.groups[i].is_empty() {
                        self.insertions.remove(i);
                        self.groups.remove(i);
                    }
                    tail
                }
                Err(_) => Vec::new(),
            };
            if !tail.is_empty() {
                let next = position + 1;
                match self.insertions.binary_search(&next) {
                    Ok(i) => {
                        let mut combined = tail;
                        combined.extend_from_slice(self.groups[i].get_array());
                        self.groups[i] = PositionIndex::from_unordered(&combined)?;
                    }
                    Err(i) => {
                        self.insertions.insert(i, next);
                        self.groups.insert(i, PositionIndex::from_unordered(&tail)?);
                    }
                }
            }
        } else {
            match self.insertions.binary_search(&position) {
                Ok(i) => self.groups[i].add_record_on_index(offset, record_id)?,
                Err(i) => {
                    self.insertions.insert(i, position);
                    self.groups.insert(i, PositionIndex::single(record_id));
                }
            }
        }
        self.memoized.take();
        Ok(())
    }
}
