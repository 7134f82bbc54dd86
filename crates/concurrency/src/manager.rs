//! Transaction manager driving commit and rollback over participants
//!
//! Containers never see each other's pending edits because each transaction
//! holds its own diff layers. The only shared mutable point is a container's
//! base array reference, swapped at commit. The manager serializes commits
//! with a single commit lock so two transactions never swap the same base
//! concurrently.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. Acquire commit lock
//! 2. Collect layers owned by participants (and their nested participants)
//! 3. IF unclaimed layers AND strict: abort, nothing is touched
//! 4. participant.commit() for each participant (merge + base swap)
//! 5. Drop unclaimed layers (lenient mode only)
//! 6. Return CommitSummary
//! ```

use crate::config::TransactionConfig;
use crate::participant::TransactionalParticipant;
use crate::transaction::TransactionContext;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use strata_core::{ContainerId, Error, Result, TxnId};
use tracing::{debug, info, warn};

/// Outcome of a successful commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    /// Committed transaction
    pub txn_id: TxnId,
    /// Participants whose base array was replaced
    pub containers_committed: usize,
    /// Unclaimed layers dropped in lenient mode
    pub orphaned_layers_dropped: usize,
}

/// Manages transaction identities and the commit protocol
///
/// # Memory Ordering
///
/// The metric counters use Relaxed ordering: they are purely observational
/// and do not synchronize any other memory operations.
pub struct TransactionManager {
    config: TransactionConfig,
    /// Next transaction ID
    next_txn_id: AtomicU64,
    /// Serializes base array swaps across transactions
    commit_lock: Mutex<()>,
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_rolled_back: AtomicU64,
    containers_committed: AtomicU64,
}

impl TransactionManager {
    /// Create a manager with default configuration
    pub fn new() -> Self {
        Self::with_config(TransactionConfig::default())
    }

    /// Create a manager with the given configuration
    pub fn with_config(config: TransactionConfig) -> Self {
        Self {
            config,
            next_txn_id: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
            active_count: AtomicU64::new(0),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_rolled_back: AtomicU64::new(0),
            containers_committed: AtomicU64::new(0),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Start a new transaction
    pub fn begin(&self) -> TransactionContext {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::Relaxed);
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);

        debug!(target: "strata::txn", txn_id, "Transaction started");

        TransactionContext::with_layer_limit(txn_id, self.config.max_layers_per_transaction)
    }

    /// Commit `txn`, replacing the base array of every touched participant
    ///
    /// Participants are committed in the given order. A participant that
    /// fails aborts the remaining ones; those already committed stay
    /// committed.
    ///
    /// # Errors
    /// * `OrphanedLayers` - strict mode and `txn` holds layers no participant owns
    /// * any error raised by a participant's merge
    pub fn commit(
        &self,
        mut txn: TransactionContext,
        participants: &[&dyn TransactionalParticipant],
    ) -> Result<CommitSummary> {
        let _guard = self.commit_lock.lock();
        let txn_id = txn.txn_id();

        let orphans = self.orphaned_layers(&txn, participants);
        if !orphans.is_empty() && self.config.strict_participants {
            self.record_rollback();
            warn!(target: "strata::txn", txn_id, orphans = orphans.len(), "Commit rejected: unclaimed diff layers");
            return Err(Error::OrphanedLayers {
                count: orphans.len(),
            });
        }

        let mut committed = 0;
        for participant in participants {
            match participant.commit(&mut txn) {
                Ok(true) => committed += 1,
                Ok(false) => {}
                Err(e) => {
                    self.record_rollback();
                    warn!(target: "strata::txn", txn_id, error = %e, "Transaction aborted during commit");
                    return Err(e);
                }
            }
        }

        let mut dropped = 0;
        for id in orphans {
            if txn.drop_layer(id) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(target: "strata::txn", txn_id, dropped, "Dropped unclaimed diff layers");
        }

        self.record_commit(committed);
        info!(target: "strata::txn", txn_id, containers = committed, "Transaction committed");

        Ok(CommitSummary {
            txn_id,
            containers_committed: committed,
            orphaned_layers_dropped: dropped,
        })
    }

    /// Roll back `txn`, leaving every base array untouched
    ///
    /// Participants release their layers (and nested layers); whatever is
    /// left afterwards is dropped with the context. Returns the number of
    /// layers the transaction held.
    pub fn rollback(
        &self,
        mut txn: TransactionContext,
        participants: &[&dyn TransactionalParticipant],
    ) -> usize {
        let txn_id = txn.txn_id();
        let held = txn.layer_count();
        for participant in participants {
            participant.rollback(&mut txn);
        }
        self.record_rollback();
        debug!(target: "strata::txn", txn_id, layers = held, "Transaction rolled back");
        held
    }

    fn orphaned_layers(
        &self,
        txn: &TransactionContext,
        participants: &[&dyn TransactionalParticipant],
    ) -> Vec<ContainerId> {
        let mut owned = Vec::with_capacity(txn.layer_count());
        for participant in participants {
            participant.collect_owned_layers(txn, &mut owned);
        }
        let owned: FxHashSet<ContainerId> = owned.into_iter().collect();
        txn.layer_ids().filter(|id| !owned.contains(id)).collect()
    }

    fn record_commit(&self, containers: usize) {
        self.finish_active();
        self.total_committed.fetch_add(1, Ordering::Relaxed);
        self.containers_committed
            .fetch_add(containers as u64, Ordering::Relaxed);
    }

    fn record_rollback(&self) {
        self.finish_active();
        self.total_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    fn finish_active(&self) {
        // Saturating decrement to prevent underflow
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
    }

    /// Current snapshot of transaction statistics
    pub fn metrics(&self) -> TransactionMetrics {
        TransactionMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: self.total_started.load(Ordering::Relaxed),
            total_committed: self.total_committed.load(Ordering::Relaxed),
            total_rolled_back: self.total_rolled_back.load(Ordering::Relaxed),
            containers_committed: self.containers_committed.load(Ordering::Relaxed),
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Transaction metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMetrics {
    /// Transactions begun and not yet finished
    pub active_count: u64,
    /// Total transactions started
    pub total_started: u64,
    /// Total transactions committed
    pub total_committed: u64,
    /// Total transactions rolled back or aborted
    pub total_rolled_back: u64,
    /// Base array swaps performed by commits
    pub containers_committed: u64,
}

impl TransactionMetrics {
    /// Commit success rate (committed / started)
    pub fn commit_rate(&self) -> f64 {
        if self.total_started > 0 {
            self.total_committed as f64 / self.total_started as f64
        } else {
            0.0
        }
    }
}
