//! Unordered containers against a plain-vector oracle
//!
//! Placement semantics: placing a present record moves it; a failed
//! placement leaves the array unchanged.

use proptest::prelude::*;
use strata_txindex::{
    PositionIndex, TransactionContext, TransactionalParticipant, TransactionalUnorderedIntArray,
};

#[derive(Debug, Clone)]
enum Op {
    AddAfter(Option<i32>, i32),
    AddOnIndex(usize, i32),
    Append(Vec<i32>),
    Remove(i32),
    RemoveRange(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (prop::option::of(0..12i32), 0..12i32).prop_map(|(prev, id)| Op::AddAfter(prev, id)),
        (0..14usize, 0..12i32).prop_map(|(index, id)| Op::AddOnIndex(index, id)),
        prop::collection::vec(0..12i32, 0..4).prop_map(Op::Append),
        (0..12i32).prop_map(Op::Remove),
        (0..14usize, 0..14usize).prop_map(|(start, end)| Op::RemoveRange(start, end)),
    ]
}

/// Apply `op` to the oracle; returns false if the op must be rejected
fn apply(model: &mut Vec<i32>, op: &Op) -> bool {
    match op {
        Op::AddAfter(prev, id) => {
            if *prev == Some(*id) {
                return false;
            }
            if let Some(prev) = prev {
                if !model.contains(prev) {
                    return false;
                }
            }
            model.retain(|v| v != id);
            let at = match prev {
                None => 0,
                Some(prev) => model.iter().position(|v| v == prev).map_or(0, |i| i + 1),
            };
            model.insert(at, *id);
        }
        Op::AddOnIndex(index, id) => {
            let len = model.len() - usize::from(model.contains(id));
            if *index > len {
                return false;
            }
            model.retain(|v| v != id);
            model.insert(*index, *id);
        }
        Op::Append(ids) => {
            let mut sorted = ids.clone();
            sorted.sort_unstable();
            sorted.dedup();
            if sorted.len() != ids.len() {
                return false;
            }
            model.retain(|v| !ids.contains(v));
            model.extend_from_slice(ids);
        }
        Op::Remove(id) => model.retain(|v| v != id),
        Op::RemoveRange(start, end) => {
            if start > end || *end > model.len() {
                return false;
            }
            model.drain(*start..*end);
        }
    }
    true
}

fn run(array: &TransactionalUnorderedIntArray, txn: Option<&mut TransactionContext>, op: &Op) -> bool {
    match op {
        Op::AddAfter(prev, id) => array.add_after(txn, *prev, *id).is_ok(),
        Op::AddOnIndex(index, id) => array.add_on_index(txn, *index, *id).is_ok(),
        Op::Append(ids) => array.append_all(txn, ids).is_ok(),
        Op::Remove(id) => array.remove(txn, *id).is_ok(),
        Op::RemoveRange(start, end) => array.remove_range(txn, *start, *end).is_ok(),
    }
}

proptest! {
    #[test]
    fn unordered_paths_match_oracle(
        base in prop::collection::btree_set(0..12i32, 0..8),
        order in any::<u64>(),
        ops in prop::collection::vec(op(), 0..40),
    ) {
        let mut base: Vec<i32> = base.into_iter().collect();
        if !base.is_empty() {
            let len = base.len();
            base.rotate_left((order as usize) % len);
        }
        let direct = TransactionalUnorderedIntArray::from_vec(&base).unwrap();
        let layered = TransactionalUnorderedIntArray::from_vec(&base).unwrap();
        let mut txn = TransactionContext::new(1);
        let mut model = base.clone();

        for op in &ops {
            let accepted = apply(&mut model, op);
            prop_assert_eq!(run(&direct, None, op), accepted, "direct {:?}", op);
            prop_assert_eq!(run(&layered, Some(&mut txn), op), accepted, "layered {:?}", op);
            prop_assert_eq!(&*direct.get_array(None).unwrap(), &model);
            prop_assert_eq!(&*layered.get_array(Some(&txn)).unwrap(), &model);
        }

        prop_assert_eq!(layered.last_record_id(Some(&txn)).unwrap(), model.last().copied());
        for (index, id) in model.iter().enumerate() {
            prop_assert_eq!(layered.index_of(Some(&txn), *id).unwrap(), Some(index));
        }
        prop_assert_eq!(layered.iter(Some(&txn)).unwrap().collect::<Vec<_>>(), model.clone());
        prop_assert_eq!(&*layered.get_array(None).unwrap(), &base);

        layered.commit(&mut txn).unwrap();
        prop_assert_eq!(&*layered.get_array(None).unwrap(), &model);
    }

    #[test]
    fn position_index_stays_a_permutation(ops in prop::collection::vec(op(), 0..60)) {
        let mut index = PositionIndex::new();
        for op in &ops {
            let _ = match op {
                Op::AddAfter(prev, id) => index.add_record(*prev, *id).map(|_| ()),
                Op::AddOnIndex(at, id) => index.add_record_on_index(*at, *id),
                Op::Append(ids) => index.append_records(ids),
                Op::Remove(id) => index.remove_record(*id).map(|_| ()),
                Op::RemoveRange(start, end) => index.remove_range(*start, *end).map(|_| ()),
            };
            let mut slots = index.positions().to_vec();
            slots.sort_unstable();
            prop_assert!(slots.iter().copied().eq(0..index.len()));
            prop_assert!(index.record_ids().windows(2).all(|w| w[0] < w[1]));
            for (slot, id) in index.get_array().iter().enumerate() {
                prop_assert_eq!(index.find_position(*id), Some(slot));
            }
        }
    }
}

#[test]
fn test_position_index_example() {
    let mut index = PositionIndex::new();
    index.add_record(None, 10).unwrap();
    index.add_record(Some(10), 20).unwrap();
    index.add_record(None, 30).unwrap();
    assert_eq!(index.get_array(), &[30, 10, 20]);
}
