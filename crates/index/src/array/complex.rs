use super::{element_at, normalize};
use crate::changes::ComplexObjArrayChanges;
use crate::iter::MergeIter;
use parking_lot::RwLock;
use std::sync::Arc;
use strata_concurrency::{TransactionContext, TransactionalParticipant};
use strata_core::{Comparator, ContainerId, NaturalOrder, Result, ValueOps};
use tracing::{debug, warn};

/// Iterator over a [`TransactionalComplexObjArray`]
pub type ComplexArrayIter<'a, T, C> =
    MergeIter<'a, T, Arc<Vec<T>>, ComplexObjArrayChanges<T, C>>;

/// Access to the transactional container an element owns, if any
pub type NestedParticipant<T> =
    Arc<dyn Fn(&T) -> Option<&dyn TransactionalParticipant> + Send + Sync>;

type Layer<T, C> = ComplexObjArrayChanges<T, C>;

/// Sorted set of mutable aggregates with per-transaction isolation
///
/// ## Design
///
/// Key-equal values fold together through [`ValueOps`]: adding combines into
/// the present value, removing reduces it, and a value the obsolete check
/// declares empty disappears. Without value operations the container is a
/// plain sorted set.
///
/// Elements may own transactional containers themselves. When a
/// [`NestedParticipant`] accessor is installed, commit and rollback are
/// forwarded to every nested container reachable from the elements, and the
/// nested layers count as owned by this container.
pub struct TransactionalComplexObjArray<T, C = NaturalOrder> {
    id: ContainerId,
    comparator: C,
    ops: Option<ValueOps<T>>,
    nested: Option<NestedParticipant<T>>,
    base: RwLock<Arc<Vec<T>>>,
}

impl<T> TransactionalComplexObjArray<T, NaturalOrder>
where
    T: Ord + Clone + Send + Sync + 'static,
{
    /// Container holding `values` ordered by `Ord`
    pub fn from_vec(values: Vec<T>, ops: Option<ValueOps<T>>) -> Self {
        Self::with_comparator(values, NaturalOrder, ops)
    }
}

impl<T, C> TransactionalComplexObjArray<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: Comparator<T> + Clone + 'static,
{
    /// Container holding `values` ordered by `comparator`
    ///
    /// Key-equal values are combined, obsolete results dropped.
    pub fn with_comparator(values: Vec<T>, comparator: C, ops: Option<ValueOps<T>>) -> Self {
        let mut base = normalize(values, &comparator, |into, value| {
            if let Some(ops) = &ops {
                ops.combine(into, &value);
            }
        });
        if let Some(ops) = &ops {
            base.retain(|value| !ops.is_obsolete(value));
        }
        Self {
            id: ContainerId::next(),
            comparator,
            ops,
            nested: None,
            base: RwLock::new(Arc::new(base)),
        }
    }

    /// Install the accessor to the containers nested in elements
    pub fn with_nested<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&T) -> Option<&dyn TransactionalParticipant> + Send + Sync + 'static,
    {
        self.nested = Some(Arc::new(accessor));
        self
    }

    /// Identity under which transactions register this container's layer
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Current committed base array
    pub fn base_array(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.base.read())
    }

    fn layer<'t>(&self, txn: Option<&'t TransactionContext>) -> Result<Option<&'t Layer<T, C>>> {
        match txn {
            None => Ok(None),
            Some(txn) => txn.layer_for(self.id),
        }
    }

    fn layer_mut<'t>(&self, txn: &'t mut TransactionContext) -> Result<&'t mut Layer<T, C>> {
        txn.get_or_create_layer_for(self.id, || {
            ComplexObjArrayChanges::new(
                self.base_array(),
                self.comparator.clone(),
                self.ops.clone(),
            )
        })
    }

    fn search(&self, values: &[T], value: &T) -> std::result::Result<usize, usize> {
        values.binary_search_by(|probe| self.comparator.compare(probe, value))
    }

    fn is_obsolete(&self, value: &T) -> bool {
        self.ops.as_ref().map_or(false, |ops| ops.is_obsolete(value))
    }

    /// Add `value` to the base array directly
    fn add_to_base(&self, value: T) -> Option<usize> {
        let mut base = self.base.write();
        match self.search(&base, &value) {
            Ok(index) => {
                let ops = match &self.ops {
                    Some(ops) => ops,
                    None => return Some(index),
                };
                let values = Arc::make_mut(&mut base);
                ops.combine(&mut values[index], &value);
                if ops.is_obsolete(&values[index]) {
                    values.remove(index);
                    return None;
                }
                Some(index)
            }
            Err(_) if self.is_obsolete(&value) => None,
            Err(index) => {
                Arc::make_mut(&mut base).insert(index, value);
                Some(index)
            }
        }
    }

    /// Remove `value` from the base array directly
    fn remove_from_base(&self, value: &T) -> Option<usize> {
        let mut base = self.base.write();
        let index = self.search(&base, value).ok()?;
        let values = Arc::make_mut(&mut base);
        let drop = match &self.ops {
            Some(ops) => {
                ops.reduce(&mut values[index], value);
                ops.is_obsolete(&values[index])
            }
            None => true,
        };
        if drop {
            values.remove(index);
        }
        Some(index)
    }

    /// Add `value`, folding it into a key-equal element
    ///
    /// Returns the index the key occupies afterwards, or `None` when the
    /// folded result is obsolete and the key is gone. Without value
    /// operations adding a present key is a no-op that reports its index.
    pub fn add_returning_index(
        &self,
        txn: Option<&mut TransactionContext>,
        value: T,
    ) -> Result<Option<usize>> {
        let txn = match txn {
            Some(txn) => txn,
            None => return Ok(self.add_to_base(value)),
        };
        if self.nested.is_none() {
            return Ok(self.layer_mut(txn)?.add(value));
        }
        let displaced = self.get_equal(Some(&*txn), &value)?;
        let incoming = value.clone();
        let index = self.layer_mut(txn)?.add(value);
        if let Some(displaced) = &displaced {
            self.release_nested(txn, displaced)?;
        }
        self.release_nested(txn, &incoming)?;
        Ok(index)
    }

    /// Add `value`; returns true if it introduced a key absent before
    ///
    /// A new key whose value is obsolete on arrival is not introduced.
    pub fn add(&self, mut txn: Option<&mut TransactionContext>, value: T) -> Result<bool> {
        let was_present = self.contains(txn.as_deref(), &value)?;
        let index = self.add_returning_index(txn.as_deref_mut(), value)?;
        Ok(index.is_some() && !was_present)
    }

    /// Add every value; returns how many introduced a new key
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

    /// Remove `value`, subtracting it from the key-equal element
    ///
    /// Returns false if the key was absent.
    pub fn remove(&self, txn: Option<&mut TransactionContext>, value: &T) -> Result<bool> {
        let txn = match txn {
            Some(txn) => txn,
            None => return Ok(self.remove_from_base(value).is_some()),
        };
        let stored = match &self.nested {
            Some(_) => self.get_equal(Some(&*txn), value)?,
            None => None,
        };
        let removed = self.layer_mut(txn)?.remove(value).is_some();
        if let Some(stored) = &stored {
            self.release_nested(txn, stored)?;
        }
        Ok(removed)
    }

    /// Remove every value; returns how many keys were present
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

    /// Current value stored under the key of `value`
    pub fn get_equal(&self, txn: Option<&TransactionContext>, value: &T) -> Result<Option<T>> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.get_equal(value),
            None => {
                let base = self.base.read();
                self.search(&base, value).ok().map(|index| base[index].clone())
            }
        })
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

    /// Index of the key of `value` in the current view
    pub fn index_of(&self, txn: Option<&TransactionContext>, value: &T) -> Result<Option<usize>> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.index_of(value),
            None => self.search(&self.base.read(), value).ok(),
        })
    }

    /// Whether the key of `value` is in the current view
    pub fn contains(&self, txn: Option<&TransactionContext>, value: &T) -> Result<bool> {
        Ok(match self.layer(txn)? {
            Some(layer) => layer.contains(value),
            None => self.search(&self.base.read(), value).is_ok(),
        })
    }

    /// Lazy iterator over the current view
    pub fn iter<'a>(&self, txn: Option<&'a TransactionContext>) -> Result<ComplexArrayIter<'a, T, C>> {
        Ok(match self.layer(txn)? {
            Some(layer) => MergeIter::over_layer(layer),
            None => MergeIter::over_base(self.base_array()),
        })
    }

    fn nested_ids(&self, values: &[T]) -> Vec<ContainerId> {
        let mut ids: Vec<ContainerId> = match &self.nested {
            Some(nested) => values
                .iter()
                .filter_map(|value| nested(value).map(|p| p.container_id()))
                .collect(),
            None => Vec::new(),
        };
        ids.sort_unstable();
        ids
    }

    /// Commit the containers nested in `values`
    fn commit_nested(&self, values: &[T], txn: &mut TransactionContext) -> Result<bool> {
        let mut committed = false;
        if let Some(nested) = &self.nested {
            for value in values {
                if let Some(participant) = nested(value) {
                    committed |= participant.commit(txn)?;
                }
            }
        }
        Ok(committed)
    }

    /// Roll back the container nested in `dropped` once nothing reaches it
    ///
    /// A container still reachable from the current view stays. So does one
    /// reachable from the base array, which commit and rollback handle.
    fn release_nested(&self, txn: &mut TransactionContext, dropped: &T) -> Result<()> {
        let nested = match &self.nested {
            Some(nested) => nested,
            None => return Ok(()),
        };
        let participant = match nested(dropped) {
            Some(participant) => participant,
            None => return Ok(()),
        };
        let id = participant.container_id();
        let reaches = |value: &T| nested(value).map_or(false, |p| p.container_id() == id);

        if self.get_equal(Some(&*txn), dropped)?.map_or(false, |value| reaches(&value)) {
            return Ok(());
        }
        let base = match self.layer(Some(&*txn))? {
            Some(layer) => Arc::clone(layer.base()),
            None => self.base_array(),
        };
        if self.search(&base, dropped).map_or(false, |index| reaches(&base[index])) {
            return Ok(());
        }
        debug!(target: "strata::index", container = %self.id, nested = %id, txn_id = txn.txn_id(), "Nested layer released");
        participant.rollback(txn);
        Ok(())
    }

    fn rollback_nested(&self, values: &[T], txn: &mut TransactionContext) {
        if let Some(nested) = &self.nested {
            for participant in values.iter().filter_map(|value| nested(value)) {
                participant.rollback(txn);
            }
        }
    }
}

impl<T, C> TransactionalParticipant for TransactionalComplexObjArray<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: Comparator<T> + Clone + 'static,
{
    fn container_id(&self) -> ContainerId {
        self.id
    }

    fn commit(&self, txn: &mut TransactionContext) -> Result<bool> {
        let layer = match txn.discard_layer::<Layer<T, C>>(self.id)? {
            Some(layer) => layer,
            None => {
                let base = self.base_array();
                return self.commit_nested(&base, txn);
            }
        };
        let merged = layer.merged();

        // elements dropped by this transaction lose their nested edits
        let survivors = self.nested_ids(&merged);
        if let Some(nested) = &self.nested {
            for participant in layer.base().iter().filter_map(|value| nested(value)) {
                if survivors.binary_search(&participant.container_id()).is_err() {
                    participant.rollback(txn);
                }
            }
        }

        {
            let mut base = self.base.write();
            if !Arc::ptr_eq(&base, layer.base()) {
                warn!(target: "strata::index", container = %self.id, txn_id = txn.txn_id(), "Base array replaced since layer was seeded");
            }
            debug!(target: "strata::index", container = %self.id, txn_id = txn.txn_id(), len = merged.len(), "Base array swapped");
            *base = Arc::clone(&merged);
        }
        self.commit_nested(&merged, txn)?;
        Ok(true)
    }

    fn rollback(&self, txn: &mut TransactionContext) {
        let layer = match txn.discard_layer::<Layer<T, C>>(self.id) {
            Ok(layer) => layer,
            Err(_) => {
                txn.drop_layer(self.id);
                None
            }
        };
        if let Some(layer) = &layer {
            debug!(target: "strata::index", container = %self.id, txn_id = txn.txn_id(), "Diff layer discarded");
            let inserted: Vec<T> = layer.inserted_values().cloned().collect();
            self.rollback_nested(&inserted, txn);
            self.rollback_nested(layer.base(), txn);
        }
        let base = self.base_array();
        self.rollback_nested(&base, txn);
    }

    fn collect_owned_layers(&self, txn: &TransactionContext, owned: &mut Vec<ContainerId>) {
        let layer = self.layer(Some(txn)).ok().flatten();
        if layer.is_some() {
            owned.push(self.id);
        }
        let nested = match &self.nested {
            Some(nested) => nested,
            None => return,
        };
        let mut visit = |values: &[T]| {
            for participant in values.iter().filter_map(|value| nested(value)) {
                participant.collect_owned_layers(txn, owned);
            }
        };
        match layer {
            Some(layer) => {
                visit(&layer.merged()[..]);
                visit(&layer.base()[..]);
            }
            None => visit(&self.base_array()[..]),
        }
    }
}

impl<T, C> std::fmt::Debug for TransactionalComplexObjArray<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionalComplexObjArray")
            .field("id", &self.id)
            .field("len", &self.base.read().len())
            .field("ops", &self.ops.is_some())
            .field("nested", &self.nested.is_some())
            .finish()
    }
}
