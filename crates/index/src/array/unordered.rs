use super::element_at;
use crate::changes::UnorderedIntArrayChanges;
use crate::iter::MergeIter;
use crate::lookup::PositionIndex;
use parking_lot::RwLock;
use std::sync::Arc;
use strata_concurrency::{TransactionContext, TransactionalParticipant};
use strata_core::{ContainerId, Error, Result};
use tracing::{debug, warn};

/// Iterator over a [`TransactionalUnorderedIntArray`]
pub type UnorderedArrayIter<'a> = MergeIter<'a, i32, Arc<PositionIndex>, UnorderedIntArrayChanges>;

/// Insertion-ordered array of unique record ids with per-transaction isolation
///
/// Record order is whatever the caller placed them in; lookups stay
/// logarithmic through the [`PositionIndex`] shadow. Placing a record that is
/// already present moves it.
pub struct TransactionalUnorderedIntArray {
    id: ContainerId,
    base: RwLock<Arc<PositionIndex>>,
}

impl TransactionalUnorderedIntArray {
    /// Empty container
    pub fn new() -> Self {
        Self::from_index(PositionIndex::new())
    }

    /// Container holding `record_ids` in the given order
    ///
    /// # Errors
    /// `DuplicateRecord` if an id occurs twice.
    pub fn from_vec(record_ids: &[i32]) -> Result<Self> {
        PositionIndex::from_unordered(record_ids).map(Self::from_index)
    }

    fn from_index(index: PositionIndex) -> Self {
        Self {
            id: ContainerId::next(),
            base: RwLock::new(Arc::new(index)),
        }
    }

    /// Identity under which transactions register this container's layer
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Current committed base index
    pub fn base_index(&self) -> Arc<PositionIndex> {
        Arc::clone(&self.base.read())
    }

    fn layer<'t>(
        &self,
        txn: Option<&'t TransactionContext>,
    ) -> Result<Option<&'t UnorderedIntArrayChanges>> {
        match txn {
            None => Ok(None),
            Some(txn) => txn.layer_for(self.id),
        }
    }

    fn layer_mut<'t>(&self, txn: &'t mut TransactionContext) -> Result<&'t mut UnorderedIntArrayChanges> {
        txn.get_or_create_layer_for(self.id, || UnorderedIntArrayChanges::new(self.base_index()))
    }

    /// Place `record_id` right after `previous` (or at the head for `None`)
    ///
    /// Returns the index the record occupies afterwards.
    ///
    /// # Errors
    /// * `RecordNotFound` - `previous` is not in the current view
    /// * `InvariantViolation` - `previous` is `record_id` itself
    pub fn add_after(
        &self,
        txn: Option<&mut TransactionContext>,
        previous: Option<i32>,
        record_id: i32,
    ) -> Result<usize> {
        if let Some(txn) = txn {
            return self.layer_mut(txn)?.add_after(previous, record_id);
        }
        if previous == Some(record_id) {
            return Err(Error::InvariantViolation(format!(
                "record {record_id} cannot be placed after itself"
            )));
        }

        let mut base = self.base.write();
        let expected = match previous {
            None => 0,
            Some(prev) => {
                base.find_position(prev)
                    .ok_or(Error::RecordNotFound { record_id: prev })?
                    + 1
            }
        };
        if base.find_position(record_id) == Some(expected) {
            return Ok(expected);
        }
        let index = Arc::make_mut(&mut base);
        if index.contains(record_id) {
            index.remove_record(record_id)?;
        }
        index.add_record(previous, record_id)
    }

    /// Place `record_id` so that it ends up on `index`
    ///
    /// # Errors
    /// `IndexOutOfBounds` if `index` exceeds the length the array has once
    /// `record_id` is withdrawn from its current place.
    pub fn add_on_index(
        &self,
        txn: Option<&mut TransactionContext>,
        index: usize,
        record_id: i32,
    ) -> Result<()> {
        if let Some(txn) = txn {
            return self.layer_mut(txn)?.add_on_index(index, record_id);
        }
        let mut base = self.base.write();
        let present = base.contains(record_id);
        let len = base.len() - usize::from(present);
        if index > len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        let positions = Arc::make_mut(&mut base);
        if present {
            positions.remove_record(record_id)?;
        }
        positions.add_record_on_index(index, record_id)
    }

    /// Append `record_ids` at the end in the given order
    ///
    /// Records already present move to the end.
    ///
    /// # Errors
    /// `DuplicateRecord` if the batch repeats an id.
    pub fn append_all(&self, txn: Option<&mut TransactionContext>, record_ids: &[i32]) -> Result<()> {
        if let Some(txn) = txn {
            return self.layer_mut(txn)?.append_all(record_ids);
        }
        let mut sorted = record_ids.to_vec();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(Error::DuplicateRecord { record_id: pair[0] });
        }
        let mut base = self.base.write();
        let index = Arc::make_mut(&mut base);
        for &record_id in record_ids {
            if index.contains(record_id) {
                index.remove_record(record_id)?;
            }
        }
        index.append_records(record_ids)
    }

    /// Append `record_id` unless it is present; returns true if appended
    pub fn add(&self, txn: Option<&mut TransactionContext>, record_id: i32) -> Result<bool> {
        self.add_returning_index(txn, record_id).map(|(_, added)| added)
    }

    /// Append `record_id` unless it is present
    ///
    /// Returns the index the record occupies and whether it was appended.
    pub fn add_returning_index(
        &self,
        mut txn: Option<&mut TransactionContext>,
        record_id: i32,
    ) -> Result<(usize, bool)> {
        if let Some(index) = self.index_of(txn.as_deref(), record_id)? {
            return Ok((index, false));
        }
        self.append_all(txn.as_deref_mut(), &[record_id])?;
        let len = self.len(txn.as_deref())?;
        Ok((len - 1, true))
    }

    /// Append every record not yet present; returns how many were appended
    pub fn add_all(&self, mut txn: Option<&mut TransactionContext>, record_ids: &[i32]) -> Result<usize> {
        let mut added = 0;
        for &record_id in record_ids {
            if self.add(txn.as_deref_mut(), record_id)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove `record_id`, returning the index it had
    pub fn remove(&self, txn: Option<&mut TransactionContext>, record_id: i32) -> Result<Option<usize>> {
        if let Some(txn) = txn {
            return self.layer_mut(txn)?.remove(record_id);
        }
        let mut base = self.base.write();
        if !base.contains(record_id) {
            return Ok(None);
        }
        Arc::make_mut(&mut base).remove_record(record_id).map(Some)
    }

    /// Remove every record; returns how many were present
    pub fn remove_all(&self, mut txn: Option<&mut TransactionContext>, record_ids: &[i32]) -> Result<usize> {
        let mut removed = 0;
        for &record_id in record_ids {
            if self.remove(txn.as_deref_mut(), record_id)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove the records on indexes `start..end`, returning them in order
    ///
    /// # Errors
    /// `InvalidRange` if `start > end` or `end` exceeds the length.
    pub fn remove_range(
        &self,
        txn: Option<&mut TransactionContext>,
        start: usize,
        end: usize,
    ) -> Result<Vec<i32>> {
        match txn {
            Some(txn) => self.layer_mut(txn)?.remove_range(start, end),
            None => Arc::make_mut(&mut self.base.write()).remove_range(start, end),
        }
    }

    /// Record on `index` of the current view
    ///
    /// # Errors
    /// `IndexOutOfBounds` if `index` is past the end.
    pub fn get(&self, txn: Option<&TransactionContext>, index: usize) -> Result<i32> {
        match self.layer(txn)? {
            Some(layer) => element_at(&layer.merged(), index),
            None => element_at(self.base.read().get_array(), index),
        }
    }

    /// Current view as an array
    pub fn get_array(&self, txn: Option<&TransactionContext>) -> Result<Arc<Vec<i32>>> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.merged(),
            None => self.base.read().shared_array(),
        })
    }

    /// Number of records in the current view
    pub fn len(&self, txn: Option<&TransactionContext>) -> Result<usize> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.merged_len(),
            None => self.base.read().len(),
        })
    }

    /// Whether the current view is empty
    pub fn is_empty(&self, txn: Option<&TransactionContext>) -> Result<bool> {
        self.len(txn).map(|len| len == 0)
    }

    /// Index of `record_id` in the current view
    pub fn index_of(&self, txn: Option<&TransactionContext>, record_id: i32) -> Result<Option<usize>> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.index_of(record_id),
            None => self.base.read().find_position(record_id),
        })
    }

    /// Whether `record_id` is in the current view
    pub fn contains(&self, txn: Option<&TransactionContext>, record_id: i32) -> Result<bool> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.contains(record_id),
            None => self.base.read().contains(record_id),
        })
    }

    /// Last record of the current view
    pub fn last_record_id(&self, txn: Option<&TransactionContext>) -> Result<Option<i32>> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.last_record_id(),
            None => self.base.read().last_record_id(),
        })
    }

    /// Lazy iterator over the current view
    pub fn iter<'a>(&self, txn: Option<&'a TransactionContext>) -> Result<UnorderedArrayIter<'a>> {
        Ok(match self.layer(txn)? {
            Some(layer) => MergeIter::over_layer(layer),
            None => MergeIter::over_base(self.base_index()),
        })
    }
}

impl Default for TransactionalUnorderedIntArray {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionalParticipant for TransactionalUnorderedIntArray {
    fn container_id(&self) -> ContainerId {
        self.id
    }

    fn commit(&self, txn: &mut TransactionContext) -> Result<bool> {
        let layer = match txn.discard_layer::<UnorderedIntArrayChanges>(self.id)? {
            Some(layer) => layer,
            None => return Ok(false),
        };
        let merged = layer.to_index()?;
        let mut base = self.base.write();
        if !Arc::ptr_eq(&base, layer.base()) {
            warn!(target: "strata::index", container = %self.id, txn_id = txn.txn_id(), "Base index replaced since layer was seeded");
        }
        debug!(target: "strata::index", container = %self.id, txn_id = txn.txn_id(), len = merged.len(), "Base index swapped");
        *base = merged;
        Ok(true)
    }

    fn rollback(&self, txn: &mut TransactionContext) {
        if txn.drop_layer(self.id) {
            debug!(target: "strata::index", container = %self.id, txn_id = txn.txn_id(), "Diff layer discarded");
        }
    }
}

impl std::fmt::Debug for TransactionalUnorderedIntArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionalUnorderedIntArray")
            .field("id", &self.id)
            .field("len", &self.base.read().len())
            .finish()
    }
}
