use std::cmp::Ordering;

use crate::cluster::BrokerId;

/// One partition of one topic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicPartition {
    /// The name of the topic.
    pub topic: String,

    /// 0-based partition index, dense within a topic.
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl std::fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.topic, self.partition)
    }
}

/// Describes one existing partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPartitionInfo {
    pub topic_partition: TopicPartition,

    /// Number of replicas this partition carries.
    pub replication: usize,

    /// The ID of the current leader, `None` while the partition is leaderless.
    pub leader: Option<BrokerId>,

    /// The set of all nodes that host this partition, preferred leader first.
    pub replicas: Vec<BrokerId>,

    /// The set of all nodes that are in sync with the leader for this partition.
    pub isr: Vec<BrokerId>,
}

impl TopicPartitionInfo {
    /// Builds the description of a healthy partition: leader is the first
    /// replica and every replica is in sync.
    pub fn new(topic: impl Into<String>, partition: i32, replicas: Vec<BrokerId>) -> Self {
        Self {
            topic_partition: TopicPartition::new(topic, partition),
            replication: replicas.len(),
            leader: replicas.first().copied(),
            isr: replicas.clone(),
            replicas,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic_partition.topic
    }

    pub fn partition(&self) -> i32 {
        self.topic_partition.partition
    }
}

/// A target or current replica assignment of one partition.
///
/// The derived order sorts by topic name, then partition index, which is
/// what plans are presented and compared by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionReplicas {
    pub topic: String,

    pub partition: i32,

    /// Brokers hosting the partition, the first one being the intended leader.
    pub replicas: Vec<BrokerId>,
}

impl PartitionReplicas {
    pub fn new(topic: impl Into<String>, partition: i32, replicas: Vec<BrokerId>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            replicas,
        }
    }

    /// Intended leader of the partition.
    pub fn leader(&self) -> Option<BrokerId> {
        self.replicas.first().copied()
    }
}

/// Orders by (topic, partition) only, ignoring the replica lists.
pub fn by_topic_partition(a: &PartitionReplicas, b: &PartitionReplicas) -> Ordering {
    a.topic
        .cmp(&b.topic)
        .then_with(|| a.partition.cmp(&b.partition))
}

/// Current per-broker load for one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicBrokerDistribution {
    pub broker: BrokerId,

    /// Number of partitions of the topic this broker hosts a replica of.
    pub replicas: usize,

    /// Number of partitions of the topic this broker currently leads.
    pub leaders: usize,
}
