//! Commit / rollback capability of transactional containers
//!
//! Every container implements [`TransactionalParticipant`]. A container whose
//! elements are themselves containers forwards commit and rollback to each
//! owned element, which is how isolation composes through nested structures.

use crate::transaction::TransactionContext;
use strata_core::{ContainerId, Result};

/// Something that keeps a diff layer in a [`TransactionContext`]
pub trait TransactionalParticipant: Send + Sync {
    /// Identity under which the participant registers its layer
    fn container_id(&self) -> ContainerId;

    /// Merge the participant's layer into a new base array
    ///
    /// Takes the layer out of `txn`. Returns false when the transaction never
    /// touched the participant.
    fn commit(&self, txn: &mut TransactionContext) -> Result<bool>;

    /// Drop the participant's layer, leaving the base array untouched
    fn rollback(&self, txn: &mut TransactionContext);

    /// Report every layer in `txn` this participant is responsible for
    ///
    /// The default reports only the participant's own layer. Containers that
    /// own nested participants must report theirs as well.
    fn collect_owned_layers(&self, txn: &TransactionContext, owned: &mut Vec<ContainerId>) {
        if txn.has_layer(self.container_id()) {
            owned.push(self.container_id());
        }
    }
}
