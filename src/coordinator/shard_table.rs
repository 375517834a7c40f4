//! Partition-to-shard ownership table.

use super::PartitionId;
use crate::runtime::ShardId;
use dashmap::DashMap;

/// Tracks which shard currently hosts each partition replica.
///
/// Lookups observe a snapshot: ownership may move between calls, and the
/// routing layer treats a decision as valid only for the duration of one
/// operation. Updated by the partition lifecycle outside this crate.
#[derive(Debug, Default)]
pub struct ShardTable {
    shards: DashMap<PartitionId, ShardId>,
}

impl ShardTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shard hosting `partition`, if any replica is local to this node.
    pub fn shard_for(&self, partition: &PartitionId) -> Option<ShardId> {
        self.shards.get(partition).map(|entry| *entry)
    }

    /// Record (or move) ownership of `partition`.
    pub fn set(&self, partition: PartitionId, shard: ShardId) {
        self.shards.insert(partition, shard);
    }

    /// Drop ownership of `partition`, e.g. when its replica moves off this
    /// node.
    pub fn remove(&self, partition: &PartitionId) {
        self.shards.remove(partition);
    }

    /// Number of partitions with a local owner.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_lookup() {
        let table = ShardTable::new();
        assert_eq!(table.shard_for(&PartitionId::offsets(0)), None);

        table.set(PartitionId::offsets(0), 2);
        assert_eq!(table.shard_for(&PartitionId::offsets(0)), Some(2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_ownership_moves() {
        let table = ShardTable::new();
        table.set(PartitionId::offsets(3), 1);
        table.set(PartitionId::offsets(3), 4);
        assert_eq!(table.shard_for(&PartitionId::offsets(3)), Some(4));

        table.remove(&PartitionId::offsets(3));
        assert_eq!(table.shard_for(&PartitionId::offsets(3)), None);
        assert!(table.is_empty());
    }
}
