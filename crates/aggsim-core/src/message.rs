//! Message model for the aggregation overlay.
//!
//! Every message is born as DATA with an effective size of one; it stands
//! for exactly one generated original. Coalescing folds a later duplicate's
//! effective size into the earlier occurrence and turns the duplicate into a
//! tombstone, so the sum of effective sizes across all live DATA messages is
//! an invariant of the run.

use serde::{Deserialize, Serialize};

/// Kind of a buffered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Carries a key and the weight of the originals it represents.
    Data,
    /// A suppressed duplicate. Holds its buffer slot until it reaches the
    /// head, then is discarded without consuming bandwidth.
    Tombstone,
}

/// A single message travelling up an aggregation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    /// Aggregation key; always non-negative.
    pub key: i64,
    /// Number of original messages this one stands for.
    pub eff_size: i64,
    /// Earliest tick at which this message may leave its buffer.
    pub forward_time: i64,
    /// Index of the tree this message travels on.
    pub tree: usize,
}

impl Message {
    /// A fresh DATA message representing exactly one original.
    pub fn data(key: i64, tree: usize, forward_time: i64) -> Self {
        Self {
            kind: MessageKind::Data,
            key,
            eff_size: 1,
            forward_time,
            tree,
        }
    }

    pub fn is_data(&self) -> bool {
        self.kind == MessageKind::Data
    }

    /// Suppress this message as a duplicate, returning the weight to fold
    /// into the surviving occurrence.
    pub fn suppress(&mut self) -> i64 {
        let weight = self.eff_size;
        self.kind = MessageKind::Tombstone;
        self.eff_size = 0;
        weight
    }
}
