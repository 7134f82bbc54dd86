//! Merge correctness against a plain-vector oracle
//!
//! For any base array and any interleaved add/remove sequence, the merged
//! view equals the result of applying the same sequence to a mutable copy.

use crate::common::*;
use proptest::prelude::*;
use strata_txindex::{
    ComplexObjArrayChanges, NaturalOrder, ObjArrayChanges, TransactionContext,
    TransactionalIntArray, TransactionalParticipant,
};
use std::sync::Arc;

fn edits() -> impl Strategy<Value = Vec<(bool, i32)>> {
    prop::collection::vec((any::<bool>(), 0..40i32), 0..60)
}

fn stock_edits() -> impl Strategy<Value = Vec<(bool, Stock)>> {
    prop::collection::vec((any::<bool>(), 0..8u32, -3..4i64), 0..50).prop_map(|edits| {
        edits
            .into_iter()
            .map(|(add, key, qty)| (add, stock(key, qty)))
            .collect()
    })
}

proptest! {
    #[test]
    fn layer_merge_matches_oracle(base in prop::collection::btree_set(0..40i32, 0..20), edits in edits()) {
        let base: Vec<i32> = base.into_iter().collect();
        let mut layer = ObjArrayChanges::new(Arc::new(base.clone()), NaturalOrder);
        for &(add, value) in &edits {
            if add {
                layer.add(value);
            } else {
                layer.remove(&value);
            }
        }
        let expected = oracle_set(&base, &edits);
        prop_assert_eq!(&*layer.merged(), &expected);
        prop_assert_eq!(layer.merged_len(), expected.len());
        for (index, value) in expected.iter().enumerate() {
            prop_assert_eq!(layer.index_of(value), Some(index));
        }
    }

    #[test]
    fn container_paths_agree(base in prop::collection::vec(0..40i32, 0..20), edits in edits()) {
        let direct = TransactionalIntArray::from_vec(base.clone());
        let layered = TransactionalIntArray::from_vec(base.clone());
        let mut txn = TransactionContext::new(1);
        for &(add, value) in &edits {
            if add {
                direct.add(None, value).unwrap();
                layered.add(Some(&mut txn), value).unwrap();
            } else {
                direct.remove(None, &value).unwrap();
                layered.remove(Some(&mut txn), &value).unwrap();
            }
        }
        let expected = oracle_set(&base, &edits);
        prop_assert_eq!(&*direct.get_array(None).unwrap(), &expected);
        prop_assert_eq!(&*layered.get_array(Some(&txn)).unwrap(), &expected);
        prop_assert_eq!(layered.iter(Some(&txn)).unwrap().collect::<Vec<_>>(), expected.clone());

        layered.commit(&mut txn).unwrap();
        prop_assert_eq!(&*layered.get_array(None).unwrap(), &expected);
    }

    #[test]
    fn complex_merge_matches_folding_oracle(
        base in prop::collection::vec((0..8u32, 1..5i64), 0..8),
        edits in stock_edits(),
    ) {
        let base: Vec<Stock> = base.into_iter().map(|(key, qty)| stock(key, qty)).collect();
        let direct = stock_array(base.clone());
        let layered = stock_array(base.clone());
        let mut txn = TransactionContext::new(1);
        for (add, value) in &edits {
            if *add {
                direct.add(None, value.clone()).unwrap();
                layered.add(Some(&mut txn), value.clone()).unwrap();
            } else {
                direct.remove(None, value).unwrap();
                layered.remove(Some(&mut txn), value).unwrap();
            }
        }
        let expected = oracle_stock(&base, &edits);
        prop_assert_eq!(&*direct.get_array(None).unwrap(), &expected);
        prop_assert_eq!(&*layered.get_array(Some(&txn)).unwrap(), &expected);
        prop_assert_eq!(layered.len(Some(&txn)).unwrap(), expected.len());
        for value in &expected {
            prop_assert_eq!(layered.get_equal(Some(&txn), value).unwrap(), Some(value.clone()));
        }
    }

    #[test]
    fn complex_without_ops_is_plain_set(base in prop::collection::btree_set(0..40i32, 0..20), edits in edits()) {
        let base: Vec<i32> = base.into_iter().collect();
        let mut layer = ComplexObjArrayChanges::new(Arc::new(base.clone()), NaturalOrder, None);
        for &(add, value) in &edits {
            if add {
                layer.add(value);
            } else {
                layer.remove(&value);
            }
        }
        prop_assert_eq!(&*layer.merged(), &oracle_set(&base, &edits));
    }

    #[test]
    fn add_then_remove_restores_membership(base in prop::collection::btree_set(0..20i32, 0..10), value in 0..20i32) {
        prop_assume!(!base.contains(&value));
        let base: Vec<i32> = base.into_iter().collect();
        let array = TransactionalIntArray::from_vec(base.clone());
        let mut txn = TransactionContext::new(1);
        array.add(Some(&mut txn), value).unwrap();
        array.remove(Some(&mut txn), &value).unwrap();
        prop_assert_eq!(
            array.contains(Some(&txn), &value).unwrap(),
            array.contains(None, &value).unwrap()
        );
        prop_assert_eq!(&*array.get_array(Some(&txn)).unwrap(), &base);
    }

    #[test]
    fn fold_then_unfold_restores_value(
        base in prop::collection::vec((0..8u32, 1..5i64), 0..8),
        key in 0..8u32,
        qty in 1..5i64,
    ) {
        let base: Vec<Stock> = base.into_iter().map(|(key, qty)| stock(key, qty)).collect();
        let array = stock_array(base);
        let mut txn = TransactionContext::new(1);
        array.add(Some(&mut txn), stock(key, qty)).unwrap();
        array.remove(Some(&mut txn), &stock(key, qty)).unwrap();
        prop_assert_eq!(
            array.contains(Some(&txn), &stock(key, 0)).unwrap(),
            array.contains(None, &stock(key, 0)).unwrap()
        );
        prop_assert_eq!(array.get_array(Some(&txn)).unwrap(), array.get_array(None).unwrap());
    }

    #[test]
    fn position_arrays_stay_strictly_ascending(base in prop::collection::btree_set(0..40i32, 0..20), edits in edits()) {
        let base: Vec<i32> = base.into_iter().collect();
        let mut layer = ObjArrayChanges::new(Arc::new(base.clone()), NaturalOrder);
        for &(add, value) in &edits {
            if add {
                layer.add(value);
            } else {
                layer.remove(&value);
            }
            let removed: Vec<usize> = (0..base.len()).filter(|&p| layer.is_removal_on_position(p)).collect();
            let grouped: Vec<usize> = (0..=base.len()).filter(|&p| layer.insertion_on_position(p).is_some()).collect();
            prop_assert!(removed.windows(2).all(|w| w[0] < w[1]));
            for position in grouped {
                let group = layer.insertion_on_position(position).unwrap_or(&[]);
                prop_assert!(!group.is_empty());
                prop_assert!(group.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
