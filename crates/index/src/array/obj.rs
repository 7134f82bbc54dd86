use super::{element_at, normalize};
use crate::changes::ObjArrayChanges;
use crate::iter::MergeIter;
use parking_lot::RwLock;
use std::sync::Arc;
use strata_concurrency::{TransactionContext, TransactionalParticipant};
use strata_core::{Comparator, ContainerId, NaturalOrder, Result};
use tracing::{debug, warn};

/// Iterator over a [`TransactionalObjArray`]
pub type ObjArrayIter<'a, T, C> = MergeIter<'a, T, Arc<Vec<T>>, ObjArrayChanges<T, C>>;

/// Sorted set of comparable values with per-transaction isolation
///
/// ## Example
///
/// ```rust,ignore
/// use strata_index::TransactionalIntArray;
/// use strata_concurrency::TransactionContext;
///
/// let array = TransactionalIntArray::from_vec(vec![1, 3, 5, 7]);
/// let mut txn = TransactionContext::new(1);
///
/// array.remove(Some(&mut txn), &3)?;
/// array.add(Some(&mut txn), 4)?;
/// assert_eq!(*array.get_array(Some(&txn))?, vec![1, 4, 5, 7]);
/// assert_eq!(*array.get_array(None)?, vec![1, 3, 5, 7]);
/// ```
pub struct TransactionalObjArray<T, C = NaturalOrder> {
    id: ContainerId,
    comparator: C,
    base: RwLock<Arc<Vec<T>>>,
}

/// Sorted set of integers with per-transaction isolation
pub type TransactionalIntArray = TransactionalObjArray<i32, NaturalOrder>;

impl<T> TransactionalObjArray<T, NaturalOrder>
where
    T: Ord + Clone + Send + Sync + 'static,
{
    /// Empty container ordered by `Ord`
    pub fn new() -> Self {
        Self::with_comparator(Vec::new(), NaturalOrder)
    }

    /// Container holding `values` (sorted and deduplicated)
    pub fn from_vec(values: Vec<T>) -> Self {
        Self::with_comparator(values, NaturalOrder)
    }
}

impl<T> Default for TransactionalObjArray<T, NaturalOrder>
where
    T: Ord + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> TransactionalObjArray<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: Comparator<T> + Clone + 'static,
{
    /// Container holding `values` ordered by `comparator`
    ///
    /// Values the comparator considers equal collapse to the first one.
    pub fn with_comparator(values: Vec<T>, comparator: C) -> Self {
        let base = normalize(values, &comparator, |_, _| {});
        Self {
            id: ContainerId::next(),
            comparator,
            base: RwLock::new(Arc::new(base)),
        }
    }

    /// Identity under which transactions register this container's layer
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Current committed base array
    pub fn base_array(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.base.read())
    }

    fn layer<'t>(
        &self,
        txn: Option<&'t TransactionContext>,
    ) -> Result<Option<&'t ObjArrayChanges<T, C>>> {
        match txn {
            None => Ok(None),
            Some(txn) => txn.layer_for(self.id),
        }
    }

    fn layer_mut<'t>(&self, txn: &'t mut TransactionContext) -> Result<&'t mut ObjArrayChanges<T, C>> {
        txn.get_or_create_layer_for(self.id, || {
            ObjArrayChanges::new(self.base_array(), self.comparator.clone())
        })
    }

    fn search(&self, values: &[T], value: &T) -> std::result::Result<usize, usize> {
        values.binary_search_by(|probe| self.comparator.compare(probe, value))
    }

    /// Insert `value`; returns its index and whether it was new
    fn insert(&self, txn: Option<&mut TransactionContext>, value: T) -> Result<(usize, bool)> {
        match txn {
            Some(txn) => {
                let layer = self.layer_mut(txn)?;
                let added = !layer.contains(&value);
                Ok((layer.add(value), added))
            }
            None => {
                let mut base = self.base.write();
                match self.search(&base, &value) {
                    Ok(index) => Ok((index, false)),
                    Err(index) => {
                        Arc::make_mut(&mut base).insert(index, value);
                        Ok((index, true))
                    }
                }
            }
        }
    }

    /// Add `value`; returns false if it was already present
    pub fn add(&self, txn: Option<&mut TransactionContext>, value: T) -> Result<bool> {
        self.insert(txn, value).map(|(_, added)| added)
    }

    /// Add `value`; returns the index it occupies afterwards
    pub fn add_returning_index(&self, txn: Option<&mut TransactionContext>, value: T) -> Result<usize> {
        self.insert(txn, value).map(|(index, _)| index)
    }

    /// Add every value; returns how many were new
    pub fn add_all<I>(&self, mut txn: Option<&mut TransactionContext>, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = T>,
    {
        let mut added = 0;
        for value in values {
            if self.add(txn.as_deref_mut(), value)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove `value`; returns false if it was absent
    pub fn remove(&self, txn: Option<&mut TransactionContext>, value: &T) -> Result<bool> {
        match txn {
            Some(txn) => Ok(self.layer_mut(txn)?.remove(value).is_some()),
            None => {
                let mut base = self.base.write();
                match self.search(&base, value) {
                    Ok(index) => {
                        Arc::make_mut(&mut base).remove(index);
                        Ok(true)
                    }
                    Err(_) => Ok(false),
                }
            }
        }
    }

    /// Remove every value; returns how many were present
    pub fn remove_all<'v, I>(&self, mut txn: Option<&mut TransactionContext>, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'v T>,
        T: 'v,
    {
        let mut removed = 0;
        for value in values {
            if self.remove(txn.as_deref_mut(), value)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Element on `index` of the current view
    ///
    /// # Errors
    /// `IndexOutOfBounds` if `index` is past the end.
    pub fn get(&self, txn: Option<&TransactionContext>, index: usize) -> Result<T> {
        match self.layer(txn)? {
            Some(layer) => element_at(&layer.merged(), index),
            None => element_at(&self.base.read(), index),
        }
    }

    /// Current view as an array
    pub fn get_array(&self, txn: Option<&TransactionContext>) -> Result<Arc<Vec<T>>> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.merged(),
            None => self.base_array(),
        })
    }

    /// Number of elements in the current view
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

    /// Index of `value` in the current view
    pub fn index_of(&self, txn: Option<&TransactionContext>, value: &T) -> Result<Option<usize>> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.index_of(value),
            None => self.search(&self.base.read(), value).ok(),
        })
    }

    /// Whether `value` is in the current view
    pub fn contains(&self, txn: Option<&TransactionContext>, value: &T) -> Result<bool> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.contains(value),
            None => self.search(&self.base.read(), value).is_ok(),
        })
    }

    /// Lazy iterator over the current view
    pub fn iter<'a>(&self, txn: Option<&'a TransactionContext>) -> Result<ObjArrayIter<'a, T, C>> {
        Ok(match self.layer(txn)? {
            Some(layer) => MergeIter::over_layer(layer),
            None => MergeIter::over_base(self.base_array()),
        })
    }
}

impl<T, C> TransactionalParticipant for TransactionalObjArray<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: Comparator<T> + Clone + 'static,
{
    fn container_id(&self) -> ContainerId {
        self.id
    }

    fn commit(&self, txn: &mut TransactionContext) -> Result<bool> {
        let layer = match txn.discard_layer::<ObjArrayChanges<T, C>>(self.id)? {
            Some(layer) => layer,
            None => return Ok(false),
        };
        let merged = layer.merged();
        let mut base = self.base.write();
        if !Arc::ptr_eq(&base, layer.base()) {
            warn!(target: "strata::index", container = %self.id, txn_id = txn.txn_id(), "Base array replaced since layer was seeded");
        }
        debug!(target: "strata::index", container = %self.id, txn_id = txn.txn_id(), len = merged.len(), "Base array swapped");
        *base = merged;
        Ok(true)
    }

    fn rollback(&self, txn: &mut TransactionContext) {
        if txn.drop_layer(self.id) {
            debug!(target: "strata::index", container = %self.id, txn_id = txn.txn_id(), "Diff layer discarded");
        }
    }
}

impl<T, C> std::fmt::Debug for TransactionalObjArray<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionalObjArray")
            .field("id", &self.id)
            .field("len", &self.base.read().len())
            .finish()
    }
}
