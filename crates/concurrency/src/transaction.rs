//! Transaction context carrying per-container diff layers
//!
//! A [`TransactionContext`] is the explicit handle every container operation
//! receives when it runs inside a transaction. It owns at most one diff layer
//! per container, keyed by [`ContainerId`]:
//!
//! - `layer_for` / `layer_for_mut`: the layer if this transaction touched the
//!   container, otherwise `None` and the caller reads the base array
//! - `get_or_create_layer_for`: lazily seeds a layer on first mutation
//! - `discard_layer`: takes the layer out (commit merges it, rollback drops it)
//!
//! Layers are stored type-erased. The container that created a layer is the
//! only one that reads it back, so a type mismatch signals a corrupted
//! registry and is reported as [`Error::LayerTypeMismatch`].
//!
//! The context is owned by a single thread of control. It is `Send` so it can
//! move between threads, but nothing inside it is shared.

use rustc_hash::FxHashMap;
use std::any::Any;
use strata_core::{ContainerId, Error, Result, TxnId};
use tracing::debug;

/// Type-erased diff layer
type ErasedLayer = Box<dyn Any + Send>;

/// Per-transaction registry of diff layers
pub struct TransactionContext {
    /// Transaction identifier
    txn_id: TxnId,
    /// Diff layers keyed by the container that owns them
    layers: FxHashMap<ContainerId, ErasedLayer>,
    /// Upper bound on the number of layers (None = unbounded)
    max_layers: Option<usize>,
}

impl TransactionContext {
    /// Create an empty context
    pub fn new(txn_id: TxnId) -> Self {
        Self {
            txn_id,
            layers: FxHashMap::default(),
            max_layers: None,
        }
    }

    /// Create an empty context that refuses to hold more than `max_layers` layers
    pub fn with_layer_limit(txn_id: TxnId, max_layers: Option<usize>) -> Self {
        Self {
            max_layers,
            ..Self::new(txn_id)
        }
    }

    /// Transaction identifier
    pub fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    /// Diff layer of `container`, if this transaction touched it
    pub fn layer_for<L: Any>(&self, container: ContainerId) -> Result<Option<&L>> {
        match self.layers.get(&container) {
            None => Ok(None),
            Some(layer) => layer
                .downcast_ref::<L>()
                .map(Some)
                .ok_or(Error::LayerTypeMismatch { container }),
        }
    }

    /// Mutable diff layer of `container`, if this transaction touched it
    pub fn layer_for_mut<L: Any>(&mut self, container: ContainerId) -> Result<Option<&mut L>> {
        match self.layers.get_mut(&container) {
            None => Ok(None),
            Some(layer) => layer
                .downcast_mut::<L>()
                .map(Some)
                .ok_or(Error::LayerTypeMismatch { container }),
        }
    }

    /// Diff layer of `container`, creating it with `seed` on first touch
    ///
    /// `seed` runs only when no layer exists yet; it typically captures the
    /// container's current base array.
    pub fn get_or_create_layer_for<L, F>(&mut self, container: ContainerId, seed: F) -> Result<&mut L>
    where
        L: Any + Send,
        F: FnOnce() -> L,
    {
        if !self.layers.contains_key(&container) {
            if let Some(limit) = self.max_layers {
                if self.layers.len() >= limit {
                    return Err(Error::LayerLimitExceeded { limit });
                }
            }
            debug!(target: "strata::txn", txn_id = self.txn_id, container = %container, "Diff layer created");
            self.layers.insert(container, Box::new(seed()));
        }
        self.layers
            .get_mut(&container)
            .and_then(|layer| layer.downcast_mut::<L>())
            .ok_or(Error::LayerTypeMismatch { container })
    }

    /// Take the diff layer of `container` out of the context
    ///
    /// On a type mismatch the layer stays registered.
    pub fn discard_layer<L: Any>(&mut self, container: ContainerId) -> Result<Option<L>> {
        match self.layers.remove(&container) {
            None => Ok(None),
            Some(layer) => match layer.downcast::<L>() {
                Ok(layer) => Ok(Some(*layer)),
                Err(layer) => {
                    self.layers.insert(container, layer);
                    Err(Error::LayerTypeMismatch { container })
                }
            },
        }
    }

    /// Drop the layer of `container` regardless of its type
    ///
    /// Returns true if a layer was registered.
    pub fn drop_layer(&mut self, container: ContainerId) -> bool {
        self.layers.remove(&container).is_some()
    }

    /// Whether this transaction touched `container`
    pub fn has_layer(&self, container: ContainerId) -> bool {
        self.layers.contains_key(&container)
    }

    /// Whether any container was touched
    pub fn has_layers(&self) -> bool {
        !self.layers.is_empty()
    }

    /// Number of registered layers
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Ids of all containers with a registered layer
    pub fn layer_ids(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.layers.keys().copied()
    }

    /// Reset for reuse under a new transaction id
    ///
    /// Drops all layers but keeps the map allocation.
    pub fn reset(&mut self, txn_id: TxnId) {
        self.txn_id = txn_id;
        self.layers.clear();
    }

    /// Allocated layer slots (for debugging/testing)
    pub fn capacity(&self) -> usize {
        self.layers.capacity()
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("layers", &self.layers.len())
            .field("max_layers", &self.max_layers)
            .finish()
    }
}
