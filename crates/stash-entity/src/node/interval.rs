//! Nested-interval positions.
//!
//! Every node of an owner's tree carries a `(lft, rgt)` pair. A node's pair
//! strictly encloses the pairs of all of its descendants, so ancestry is a
//! constant-time comparison and a subtree is a contiguous `lft` range.

use serde::{Deserialize, Serialize};

/// A node's position in its owner's nested-interval numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// Left bound.
    pub lft: u64,
    /// Right bound.
    pub rgt: u64,
}

impl Interval {
    /// Interval assigned to a freshly provisioned root.
    pub const ROOT: Interval = Interval { lft: 1, rgt: 2 };

    /// Create an interval.
    pub fn new(lft: u64, rgt: u64) -> Self {
        Self { lft, rgt }
    }

    /// Whether `other` lies strictly inside this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        self.lft < other.lft && other.rgt < self.rgt
    }

    /// Whether nothing is nested inside this interval.
    pub fn is_leaf(&self) -> bool {
        self.rgt == self.lft + 1
    }

    /// Number of bound values the interval occupies (2 per node inside it,
    /// itself included).
    pub fn width(&self) -> u64 {
        self.rgt - self.lft + 1
    }

    /// Number of nodes nested inside this interval.
    pub fn descendant_count(&self) -> u64 {
        (self.width() - 2) / 2
    }
}
