//! Isolation between concurrent transactions
//!
//! Two transactions over the same container each see only their own edits;
//! the base array is untouched until one of them commits.

use crate::common::*;
use strata_txindex::{
    TransactionContext, TransactionManager, TransactionalIntArray, TransactionalUnorderedIntArray,
};

#[test]
fn test_disjoint_edits_stay_private() {
    let array = TransactionalIntArray::from_vec(vec![1, 3, 5, 7]);
    let mut left = TransactionContext::new(1);
    let mut right = TransactionContext::new(2);

    array.add(Some(&mut left), 2).unwrap();
    array.remove(Some(&mut right), &7).unwrap();
    array.add(Some(&mut right), 8).unwrap();

    assert_eq!(*array.get_array(Some(&left)).unwrap(), vec![1, 2, 3, 5, 7]);
    assert_eq!(*array.get_array(Some(&right)).unwrap(), vec![1, 3, 5, 8]);
    assert_eq!(*array.get_array(None).unwrap(), vec![1, 3, 5, 7]);
}

#[test]
fn test_commit_does_not_leak_into_open_transaction() {
    let manager = TransactionManager::new();
    let array = TransactionalIntArray::from_vec(vec![10, 20]);

    let mut reader = manager.begin();
    array.add(Some(&mut reader), 15).unwrap();

    let mut writer = manager.begin();
    array.remove(Some(&mut writer), &10).unwrap();
    manager.commit(writer, &[&array]).unwrap();

    assert_eq!(*array.get_array(None).unwrap(), vec![20]);
    // the reader's layer was seeded before the commit
    assert_eq!(*array.get_array(Some(&reader)).unwrap(), vec![10, 15, 20]);
}

#[test]
fn test_untouched_transaction_reads_latest_base() {
    let manager = TransactionManager::new();
    let array = TransactionalIntArray::from_vec(vec![1]);
    let idle = manager.begin();

    let mut writer = manager.begin();
    array.add(Some(&mut writer), 2).unwrap();
    manager.commit(writer, &[&array]).unwrap();

    assert_eq!(*array.get_array(Some(&idle)).unwrap(), vec![1, 2]);
}

#[test]
fn test_complex_isolation() {
    let array = stock_array(vec![stock(1, 5), stock(2, 1)]);
    let mut left = TransactionContext::new(1);
    let mut right = TransactionContext::new(2);

    array.add(Some(&mut left), stock(1, 3)).unwrap();
    array.remove(Some(&mut right), &stock(1, 5)).unwrap();

    assert_eq!(
        *array.get_array(Some(&left)).unwrap(),
        vec![stock(1, 8), stock(2, 1)]
    );
    assert_eq!(*array.get_array(Some(&right)).unwrap(), vec![stock(2, 1)]);
    assert_eq!(
        *array.get_array(None).unwrap(),
        vec![stock(1, 5), stock(2, 1)]
    );
}

#[test]
fn test_unordered_isolation() {
    let array = TransactionalUnorderedIntArray::from_vec(&[4, 2, 9]).unwrap();
    let mut left = TransactionContext::new(1);
    let mut right = TransactionContext::new(2);

    array.add_after(Some(&mut left), Some(2), 5).unwrap();
    array.add_on_index(Some(&mut right), 0, 9).unwrap();

    assert_eq!(*array.get_array(Some(&left)).unwrap(), vec![4, 2, 5, 9]);
    assert_eq!(*array.get_array(Some(&right)).unwrap(), vec![9, 4, 2]);
    assert_eq!(*array.get_array(None).unwrap(), vec![4, 2, 9]);
}
