//! Identifiers, time ranges and partition lifecycle state

use serde::{Deserialize, Serialize};

/// Identifier for databases, collections, partitions and segments
pub type UniqueId = i64;

/// Identifier of a query node owning an ingest channel
pub type NodeId = i64;

/// Hybrid logical timestamp assigned by the upstream time-tick service
pub type Timestamp = u64;

/// Database that exists in every replica after construction
pub const DEFAULT_DB_ID: UniqueId = 0;

/// Reserved partition id added to every collection created through the DDL path
pub const DEFAULT_PARTITION_ID: UniqueId = 2021;

// ============================================================================
// TimeRange
// ============================================================================

/// Minimum and maximum timestamp observed in a batch
///
/// Every batch flowing through the flow graph carries one. A stage that joins
/// several predecessor batches merges their ranges before emitting its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimeRange {
    /// Smallest timestamp in the batch
    pub timestamp_min: Timestamp,
    /// Largest timestamp in the batch
    pub timestamp_max: Timestamp,
}

impl TimeRange {
    /// Create a range. Bounds are normalized so that `min <= max`.
    pub fn new(a: Timestamp, b: Timestamp) -> Self {
        Self {
            timestamp_min: a.min(b),
            timestamp_max: a.max(b),
        }
    }

    /// Min of minimums, max of maximums.
    pub fn merge(self, other: TimeRange) -> TimeRange {
        TimeRange {
            timestamp_min: self.timestamp_min.min(other.timestamp_min),
            timestamp_max: self.timestamp_max.max(other.timestamp_max),
        }
    }

    /// Merge every range in `ranges`; `None` when the iterator is empty.
    pub fn merge_all<I>(ranges: I) -> Option<TimeRange>
    where
        I: IntoIterator<Item = TimeRange>,
    {
        ranges.into_iter().reduce(TimeRange::merge)
    }

    /// Whether `ts` lies within the range (inclusive).
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.timestamp_min <= ts && ts <= self.timestamp_max
    }
}

// ============================================================================
// PartitionState
// ============================================================================

/// Lifecycle state of a partition tracked by the replica
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PartitionState {
    /// Not loaded anywhere. Also reported for untracked partitions.
    #[default]
    NotPresent,
    /// Persisted, not loaded
    OnDisk,
    /// Loading into memory
    PartialInMemory,
    /// Fully loaded into memory
    InMemory,
    /// Loading into GPU memory
    PartialInGpu,
    /// Fully loaded into GPU memory
    InGpu,
}

impl PartitionState {
    /// A load is in progress.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartialInMemory | Self::PartialInGpu)
    }

    /// The partition can serve queries.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::InMemory | Self::InGpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_time_range_new_normalizes() {
        let r = TimeRange::new(20, 10);
        assert_eq!(r.timestamp_min, 10);
        assert_eq!(r.timestamp_max, 20);
    }

    #[test]
    fn test_merge_all_empty() {
        assert_eq!(TimeRange::merge_all(Vec::new()), None);
    }

    #[test]
    fn test_merge_all_takes_outer_bounds() {
        let merged =
            TimeRange::merge_all([TimeRange::new(5, 9), TimeRange::new(3, 4), TimeRange::new(8, 12)])
                .unwrap();
        assert_eq!(merged, TimeRange::new(3, 12));
    }

    #[test]
    fn test_partition_state_default_is_sentinel() {
        assert_eq!(PartitionState::default(), PartitionState::NotPresent);
        assert!(!PartitionState::NotPresent.is_ready());
        assert!(PartitionState::PartialInGpu.is_partial());
        assert!(PartitionState::InMemory.is_ready());
    }

    proptest! {
        #[test]
        fn prop_merge_covers_both(a in any::<u64>(), b in any::<u64>(), c in any::<u64>(), d in any::<u64>()) {
            let x = TimeRange::new(a, b);
            let y = TimeRange::new(c, d);
            let m = x.merge(y);
            prop_assert!(m.contains(x.timestamp_min) && m.contains(x.timestamp_max));
            prop_assert!(m.contains(y.timestamp_min) && m.contains(y.timestamp_max));
            prop_assert_eq!(m, y.merge(x));
        }
    }
}
