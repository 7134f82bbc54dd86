//! Merge-plan stepper
//!
//! Decides which edit a merge scan applies next, given the nearest pending
//! insertion position and the nearest pending removal position. Insertion
//! wins a tie: the group is spliced first and the base element at the same
//! position is dropped afterwards, so a freshly inserted value is never taken
//! for the removed one.

/// Next edit of a merge scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedChange {
    /// Splice the insertion group at this base position
    Insertion(usize),
    /// Drop the base element at this position
    Removal(usize),
    /// Splice the group, then drop the base element at the same position
    Both(usize),
    /// Nothing left to do
    Done,
}

impl PlannedChange {
    /// Base position the change applies to
    pub fn position(&self) -> Option<usize> {
        match *self {
            PlannedChange::Insertion(p) | PlannedChange::Removal(p) | PlannedChange::Both(p) => {
                Some(p)
            }
            PlannedChange::Done => None,
        }
    }

    /// Whether the change consumes an insertion group
    pub fn inserts(&self) -> bool {
        matches!(self, PlannedChange::Insertion(_) | PlannedChange::Both(_))
    }

    /// Whether the change drops a base element
    pub fn removes(&self) -> bool {
        matches!(self, PlannedChange::Removal(_) | PlannedChange::Both(_))
    }
}

/// Plan the closest edit
#[inline]
pub fn next_change(insertion: Option<usize>, removal: Option<usize>) -> PlannedChange {
    match (insertion, removal) {
        (None, None) => PlannedChange::Done,
        (Some(i), None) => PlannedChange::Insertion(i),
        (None, Some(r)) => PlannedChange::Removal(r),
        (Some(i), Some(r)) if i < r => PlannedChange::Insertion(i),
        (Some(i), Some(r)) if r < i => PlannedChange::Removal(r),
        (Some(i), Some(_)) => PlannedChange::Both(i),
    }
}
