//! Maps group ids onto partitions of the internal offsets topic.

use super::{GroupId, PartitionId, INTERNAL_NAMESPACE, OFFSETS_TOPIC};
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministically assigns each group to a coordinator partition.
///
/// The mapping is a pure function of the group id and the offsets topic's
/// partition count: repeated queries yield the same partition. Resolution
/// fails (returns `None`) until the partition count is known, i.e. until
/// the offsets topic has been created and its metadata observed.
pub struct CoordinatorMapper {
    namespace: String,
    topic: String,
    partitions: RwLock<Option<u32>>,
}

impl CoordinatorMapper {
    /// Mapper over the default internal offsets topic.
    pub fn new() -> Self {
        Self::for_topic(INTERNAL_NAMESPACE, OFFSETS_TOPIC)
    }

    /// Mapper over an explicit internal topic.
    pub fn for_topic(namespace: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            topic: topic.into(),
            partitions: RwLock::new(None),
        }
    }

    /// Record the offsets topic's partition count once its metadata is
    /// known. Changing the count remaps groups; only ever grow it as part
    /// of a coordinated topic change.
    pub fn set_partition_count(&self, count: u32) {
        *self.partitions.write() = Some(count);
    }

    /// Partition count currently known, if any.
    pub fn partition_count(&self) -> Option<u32> {
        *self.partitions.read()
    }

    /// Coordinator partition for `group`, or `None` while the offsets
    /// topic is unknown. Non-blocking and non-suspending.
    pub fn partition_for(&self, group: &GroupId) -> Option<PartitionId> {
        let count = (*self.partitions.read())?;
        if count == 0 {
            return None;
        }
        let mut hasher = DefaultHasher::new();
        group.hash(&mut hasher);
        let partition = (hasher.finish() % u64::from(count)) as i32;
        Some(PartitionId::new(
            self.namespace.clone(),
            self.topic.clone(),
            partition,
        ))
    }

    /// Namespace of the mapped topic.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of the mapped topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Default for CoordinatorMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_until_topic_known() {
        let mapper = CoordinatorMapper::new();
        assert_eq!(mapper.partition_for(&GroupId::from("g")), None);

        mapper.set_partition_count(16);
        assert!(mapper.partition_for(&GroupId::from("g")).is_some());
    }

    #[test]
    fn test_deterministic() {
        let mapper = CoordinatorMapper::new();
        mapper.set_partition_count(16);

        let g = GroupId::from("payments");
        let first = mapper.partition_for(&g).unwrap();
        for _ in 0..32 {
            assert_eq!(mapper.partition_for(&g).unwrap(), first);
        }
    }

    #[test]
    fn test_partition_in_range() {
        let mapper = CoordinatorMapper::new();
        mapper.set_partition_count(8);

        for i in 0..100 {
            let p = mapper
                .partition_for(&GroupId::from(format!("group-{i}").as_str()))
                .unwrap();
            assert!((0..8).contains(&p.partition));
            assert_eq!(p.namespace, INTERNAL_NAMESPACE);
            assert_eq!(p.topic, OFFSETS_TOPIC);
        }
    }

    #[test]
    fn test_zero_partitions_unresolvable() {
        let mapper = CoordinatorMapper::new();
        mapper.set_partition_count(0);
        assert_eq!(mapper.partition_for(&GroupId::from("g")), None);
    }
}
