//! Randomized stress runs
//!
//! Many threads open transactions on the same shared containers. Each thread
//! checks its private view against its own oracle; the shared base arrays
//! must come out untouched by rolled-back work.

use crate::common::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Barrier};
use std::thread;
use strata_txindex::{TransactionManager, TransactionalIntArray, TransactionalUnorderedIntArray};

const THREADS: usize = 8;
const ROUNDS: usize = 50;

#[test]
fn stress_private_views_over_shared_base() {
    let manager = Arc::new(TransactionManager::new());
    let base: Vec<i32> = (0..200).step_by(3).collect();
    let array = Arc::new(TransactionalIntArray::from_vec(base.clone()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let manager = Arc::clone(&manager);
            let array = Arc::clone(&array);
            let barrier = Arc::clone(&barrier);
            let base = base.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(thread_id as u64);
                barrier.wait();
                for _ in 0..ROUNDS {
                    let mut txn = manager.begin();
                    let mut edits = Vec::new();
                    for _ in 0..rng.gen_range(1..40) {
                        let add = rng.gen_bool(0.5);
                        let value = rng.gen_range(0..200);
                        if add {
                            array.add(Some(&mut txn), value).unwrap();
                        } else {
                            array.remove(Some(&mut txn), &value).unwrap();
                        }
                        edits.push((add, value));
                    }
                    let expected = oracle_set(&base, &edits);
                    assert_eq!(*array.get_array(Some(&txn)).unwrap(), expected);
                    assert_eq!(array.iter(Some(&txn)).unwrap().count(), expected.len());
                    manager.rollback(txn, &[&*array]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(*array.get_array(None).unwrap(), base);
    let metrics = manager.metrics();
    assert_eq!(metrics.total_rolled_back, (THREADS * ROUNDS) as u64);
    assert_eq!(metrics.active_count, 0);
}

#[test]
fn stress_concurrent_commits_on_separate_containers() {
    let manager = Arc::new(TransactionManager::new());
    let arrays: Vec<Arc<TransactionalUnorderedIntArray>> = (0..THREADS)
        .map(|_| Arc::new(TransactionalUnorderedIntArray::new()))
        .collect();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = arrays
        .iter()
        .enumerate()
        .map(|(thread_id, array)| {
            let manager = Arc::clone(&manager);
            let array = Arc::clone(array);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(1000 + thread_id as u64);
                let mut model: Vec<i32> = Vec::new();
                barrier.wait();
                for _ in 0..ROUNDS {
                    let mut txn = manager.begin();
                    let id = rng.gen_range(0..64);
                    let previous = if model.is_empty() || rng.gen_bool(0.2) {
                        None
                    } else {
                        Some(model[rng.gen_range(0..model.len())])
                    };
                    if previous == Some(id) {
                        manager.rollback(txn, &[&*array]);
                        continue;
                    }
                    array.add_after(Some(&mut txn), previous, id).unwrap();
                    model.retain(|&v| v != id);
                    let at = previous
                        .and_then(|p| model.iter().position(|&v| v == p))
                        .map_or(0, |i| i + 1);
                    model.insert(at, id);
                    manager.commit(txn, &[&*array]).unwrap();
                }
                assert_eq!(*array.get_array(None).unwrap(), model);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(manager.metrics().active_count, 0);
}
