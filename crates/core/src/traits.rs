//! Element ordering and value folding abstractions
//!
//! Ordered containers keep their elements sorted by a [`Comparator`]. Complex
//! containers additionally carry [`ValueOps`]: the four functions that decide
//! how two key-equal values fold together.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Total order over container elements
///
/// Two elements comparing `Equal` are the same logical key. Implementations
/// must be consistent across calls since diff layers binary-search with them.
pub trait Comparator<T>: Send + Sync {
    /// Compare two elements
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Orders elements by their `Ord` implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<T: Ord> Comparator<T> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Adapts a closure into a [`Comparator`]
#[derive(Clone, Copy)]
pub struct FnComparator<F>(pub F);

impl<T, F> Comparator<T> for FnComparator<F>
where
    F: Fn(&T, &T) -> Ordering + Send + Sync,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> fmt::Debug for FnComparator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnComparator")
    }
}

type FoldFn<T> = Arc<dyn Fn(&mut T, &T) + Send + Sync>;
type TestFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type EqFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Value-level semantics for key-equal elements
///
/// - combiner: folds an added value into an existing key-equal value
/// - reducer: subtracts a removed value's contribution from an existing value
/// - obsolete check: decides whether a value is empty and must be dropped
/// - deep equality: decides whether a folded value is identical to the
///   original base element, in which case the change collapses
///
/// The four are supplied together through [`ValueOps::new`]; there is no way
/// to set only some of them.
pub struct ValueOps<T> {
    combiner: FoldFn<T>,
    reducer: FoldFn<T>,
    obsolete_check: TestFn<T>,
    deep_equals: EqFn<T>,
}

impl<T> ValueOps<T> {
    /// Bundle the four value functions
    pub fn new<C, R, O, E>(combiner: C, reducer: R, obsolete_check: O, deep_equals: E) -> Self
    where
        C: Fn(&mut T, &T) + Send + Sync + 'static,
        R: Fn(&mut T, &T) + Send + Sync + 'static,
        O: Fn(&T) -> bool + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            combiner: Arc::new(combiner),
            reducer: Arc::new(reducer),
            obsolete_check: Arc::new(obsolete_check),
            deep_equals: Arc::new(deep_equals),
        }
    }

    /// Fold `added` into `target`
    #[inline]
    pub fn combine(&self, target: &mut T, added: &T) {
        (self.combiner)(target, added)
    }

    /// Subtract `removed` from `target`
    #[inline]
    pub fn reduce(&self, target: &mut T, removed: &T) {
        (self.reducer)(target, removed)
    }

    /// Whether `value` carries nothing and should disappear
    #[inline]
    pub fn is_obsolete(&self, value: &T) -> bool {
        (self.obsolete_check)(value)
    }

    /// Whether `a` and `b` are identical beyond their key
    #[inline]
    pub fn deep_equals(&self, a: &T, b: &T) -> bool {
        (self.deep_equals)(a, b)
    }
}

impl<T> Clone for ValueOps<T> {
    fn clone(&self) -> Self {
        Self {
            combiner: Arc::clone(&self.combiner),
            reducer: Arc::clone(&self.reducer),
            obsolete_check: Arc::clone(&self.obsolete_check),
            deep_equals: Arc::clone(&self.deep_equals),
        }
    }
}

impl<T> fmt::Debug for ValueOps<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueOps").finish_non_exhaustive()
    }
}
