//! Commit / rollback protocol through the transaction manager

use crate::common::*;
use strata_txindex::{
    Error, TransactionConfig, TransactionManager, TransactionalIntArray,
    TransactionalUnorderedIntArray,
};

#[test]
fn test_commit_summary_counts_touched_containers() {
    init_tracing();
    let manager = TransactionManager::new();
    let ints = TransactionalIntArray::from_vec(vec![1, 2]);
    let ids = TransactionalUnorderedIntArray::from_vec(&[5]).unwrap();
    let untouched = stock_array(vec![stock(1, 1)]);

    let mut txn = manager.begin();
    let txn_id = txn.txn_id();
    ints.add(Some(&mut txn), 3).unwrap();
    ids.append_all(Some(&mut txn), &[6]).unwrap();

    let summary = manager.commit(txn, &[&ints, &ids, &untouched]).unwrap();
    assert_eq!(summary.txn_id, txn_id);
    assert_eq!(summary.containers_committed, 2);
    assert_eq!(summary.orphaned_layers_dropped, 0);
    assert_eq!(*ints.get_array(None).unwrap(), vec![1, 2, 3]);
    assert_eq!(*ids.get_array(None).unwrap(), vec![5, 6]);

    let metrics = manager.metrics();
    assert_eq!(metrics.total_started, 1);
    assert_eq!(metrics.total_committed, 1);
    assert_eq!(metrics.containers_committed, 2);
    assert_eq!(metrics.active_count, 0);
}

#[test]
fn test_strict_commit_rejects_unclaimed_layers() {
    let manager = TransactionManager::new();
    let listed = TransactionalIntArray::from_vec(vec![1]);
    let forgotten = TransactionalIntArray::from_vec(vec![1]);

    let mut txn = manager.begin();
    listed.add(Some(&mut txn), 2).unwrap();
    forgotten.add(Some(&mut txn), 2).unwrap();

    let err = manager.commit(txn, &[&listed]).unwrap_err();
    assert_eq!(err, Error::OrphanedLayers { count: 1 });
    assert!(err.is_transaction_error());
    // nothing was touched
    assert_eq!(*listed.get_array(None).unwrap(), vec![1]);
    assert_eq!(manager.metrics().total_rolled_back, 1);
}

#[test]
fn test_lenient_commit_drops_unclaimed_layers() {
    let config = TransactionConfig::default().with_strict_participants(false);
    let manager = TransactionManager::with_config(config);
    let listed = TransactionalIntArray::from_vec(vec![1]);
    let forgotten = TransactionalIntArray::from_vec(vec![1]);

    let mut txn = manager.begin();
    listed.add(Some(&mut txn), 2).unwrap();
    forgotten.add(Some(&mut txn), 2).unwrap();

    let summary = manager.commit(txn, &[&listed]).unwrap();
    assert_eq!(summary.orphaned_layers_dropped, 1);
    assert_eq!(*listed.get_array(None).unwrap(), vec![1, 2]);
    assert_eq!(*forgotten.get_array(None).unwrap(), vec![1]);
}

#[test]
fn test_rollback_leaves_bases_untouched() {
    let manager = TransactionManager::new();
    let ints = TransactionalIntArray::from_vec(vec![1, 2]);
    let stocks = stock_array(vec![stock(1, 1)]);

    let mut txn = manager.begin();
    ints.remove(Some(&mut txn), &1).unwrap();
    stocks.add(Some(&mut txn), stock(1, 4)).unwrap();

    assert_eq!(manager.rollback(txn, &[&ints, &stocks]), 2);
    assert_eq!(*ints.get_array(None).unwrap(), vec![1, 2]);
    assert_eq!(*stocks.get_array(None).unwrap(), vec![stock(1, 1)]);

    let metrics = manager.metrics();
    assert_eq!(metrics.total_rolled_back, 1);
    assert_eq!(metrics.commit_rate(), 0.0);
}

#[test]
fn test_layer_limit_from_toml() {
    let config = TransactionConfig::from_toml_str("max_layers_per_transaction = 1").unwrap();
    let manager = TransactionManager::with_config(config);
    let first = TransactionalIntArray::new();
    let second = TransactionalIntArray::new();

    let mut txn = manager.begin();
    first.add(Some(&mut txn), 1).unwrap();
    first.add(Some(&mut txn), 2).unwrap();
    assert_eq!(
        second.add(Some(&mut txn), 1).unwrap_err(),
        Error::LayerLimitExceeded { limit: 1 }
    );
    // reads of an untouched container still work
    assert!(second.is_empty(Some(&txn)).unwrap());
    manager.commit(txn, &[&first, &second]).unwrap();
    assert_eq!(first.len(None).unwrap(), 2);
}

#[test]
fn test_context_reuse_after_reset() {
    let manager = TransactionManager::new();
    let array = TransactionalIntArray::from_vec(vec![1]);

    let mut txn = manager.begin();
    array.add(Some(&mut txn), 2).unwrap();
    txn.reset(99);
    assert_eq!(txn.txn_id(), 99);
    assert!(!txn.has_layers());
    assert_eq!(*array.get_array(Some(&txn)).unwrap(), vec![1]);
}
