//! Shared helpers for the integration suites

#![allow(dead_code)]

use std::cmp::Ordering;
use strata_txindex::{FnComparator, TransactionalComplexObjArray, ValueOps};

/// Aggregate keyed by `key`, folded by summing `qty`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stock {
    pub key: u32,
    pub qty: i64,
}

/// Route commit/rollback logs to the test harness; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn stock(key: u32, qty: i64) -> Stock {
    Stock { key, qty }
}

pub fn stock_ops() -> ValueOps<Stock> {
    ValueOps::new(
        |t: &mut Stock, a: &Stock| t.qty += a.qty,
        |t: &mut Stock, r: &Stock| t.qty -= r.qty,
        |t: &Stock| t.qty == 0,
        |a: &Stock, b: &Stock| a == b,
    )
}

pub type ByKey = FnComparator<fn(&Stock, &Stock) -> Ordering>;

pub fn by_key(a: &Stock, b: &Stock) -> Ordering {
    a.key.cmp(&b.key)
}

pub fn stock_array(values: Vec<Stock>) -> TransactionalComplexObjArray<Stock, ByKey> {
    let comparator: ByKey = FnComparator(by_key);
    TransactionalComplexObjArray::with_comparator(values, comparator, Some(stock_ops()))
}

/// Plain sorted-set oracle
pub fn oracle_set(base: &[i32], edits: &[(bool, i32)]) -> Vec<i32> {
    let mut values: Vec<i32> = base.to_vec();
    values.sort_unstable();
    values.dedup();
    for &(add, value) in edits {
        match values.binary_search(&value) {
            Ok(i) if !add => {
                values.remove(i);
            }
            Err(i) if add => values.insert(i, value),
            _ => {}
        }
    }
    values
}

/// Folding oracle: sums quantities per key, drops keys that reach zero
pub fn oracle_stock(base: &[Stock], edits: &[(bool, Stock)]) -> Vec<Stock> {
    let mut values: Vec<Stock> = Vec::new();
    for value in base {
        apply_stock(&mut values, true, value);
    }
    for (add, value) in edits {
        apply_stock(&mut values, *add, value);
    }
    values
}

fn apply_stock(values: &mut Vec<Stock>, add: bool, value: &Stock) {
    match values.binary_search_by(|probe| probe.key.cmp(&value.key)) {
        Ok(i) => {
            if add {
                values[i].qty += value.qty;
            } else {
                values[i].qty -= value.qty;
            }
            if values[i].qty == 0 {
                values.remove(i);
            }
        }
        Err(i) if add && value.qty != 0 => values.insert(i, value.clone()),
        Err(_) => {}
    }
}
