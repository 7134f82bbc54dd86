//! Worked examples of the three container families

use crate::common::*;
use strata_txindex::{TransactionManager, TransactionalIntArray, TransactionalUnorderedIntArray};

#[test]
fn test_removal_cancelled_by_re_add() {
    let manager = TransactionManager::new();
    let array = TransactionalIntArray::from_vec(vec![1, 3, 5, 7]);
    let mut txn = manager.begin();

    array.remove(Some(&mut txn), &3).unwrap();
    array.add(Some(&mut txn), 4).unwrap();
    assert_eq!(*array.get_array(Some(&txn)).unwrap(), vec![1, 4, 5, 7]);

    array.add(Some(&mut txn), 3).unwrap();
    assert_eq!(*array.get_array(Some(&txn)).unwrap(), vec![1, 3, 4, 5, 7]);

    manager.commit(txn, &[&array]).unwrap();
    assert_eq!(*array.get_array(None).unwrap(), vec![1, 3, 4, 5, 7]);
}

#[test]
fn test_counter_folds_to_nothing() {
    let manager = TransactionManager::new();
    let array = stock_array(vec![stock(1, 5)]);
    let mut txn = manager.begin();

    array.add(Some(&mut txn), stock(1, 3)).unwrap();
    assert_eq!(*array.get_array(Some(&txn)).unwrap(), vec![stock(1, 8)]);

    array.remove(Some(&mut txn), &stock(1, 8)).unwrap();
    assert!(array.get_array(Some(&txn)).unwrap().is_empty());

    manager.commit(txn, &[&array]).unwrap();
    assert!(array.is_empty(None).unwrap());
}

#[test]
fn test_placement_example() {
    let manager = TransactionManager::new();
    let array = TransactionalUnorderedIntArray::new();
    let mut txn = manager.begin();

    array.add_after(Some(&mut txn), None, 10).unwrap();
    array.add_after(Some(&mut txn), Some(10), 20).unwrap();
    array.add_after(Some(&mut txn), None, 30).unwrap();
    assert_eq!(*array.get_array(Some(&txn)).unwrap(), vec![30, 10, 20]);

    manager.commit(txn, &[&array]).unwrap();
    assert_eq!(array.base_index().get_array(), &[30, 10, 20]);
}
