//! Access to cluster topology and reassignment submission.
//!
//! [`ClusterApi`] is the seam the planner is written against. [`KafkaCluster`]
//! talks to a live cluster, [`SnapshotCluster`] serves a point-in-time snapshot
//! from memory.

use async_trait::async_trait;

use crate::topic::{PartitionReplicas, TopicBrokerDistribution, TopicPartitionInfo};

pub mod error;
pub mod kafka;
pub mod report;
pub mod snapshot;

pub use error::{Error, Result};
pub use kafka::{ClusterBuilder, KafkaCluster};
pub use snapshot::SnapshotCluster;

pub type BrokerId = i32;

/// A cluster node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Broker {
    pub id: BrokerId,

    /// Failure domain of the broker, empty when the cluster reports none.
    pub rack: String,
}

impl Broker {
    pub fn new(id: BrokerId, rack: impl Into<String>) -> Self {
        Self {
            id,
            rack: rack.into(),
        }
    }
}

/// A batch of target assignments, submitted as one unit.
///
/// Built through [`ClusterApi::partition_reassign_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignmentRequest {
    partitions: Vec<PartitionReplicas>,
}

impl ReassignmentRequest {
    pub(crate) fn new(partitions: Vec<PartitionReplicas>) -> Self {
        Self { partitions }
    }

    pub fn partitions(&self) -> &[PartitionReplicas] {
        &self.partitions
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// Everything the planner and the reporting commands need from a cluster.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// ID of the cluster.
    async fn id(&self) -> Result<String>;

    /// The broker currently acting as controller.
    async fn controller(&self) -> Result<Broker>;

    /// All brokers, sorted by ID.
    async fn brokers(&self) -> Result<Vec<Broker>>;

    /// Resolves one broker, failing with [`Error::BrokerNotFound`].
    async fn broker(&self, id: BrokerId) -> Result<Broker> {
        self.brokers()
            .await?
            .into_iter()
            .find(|b| b.id == id)
            .ok_or(Error::BrokerNotFound(id))
    }

    /// Names of all non-internal topics, sorted.
    async fn topics(&self) -> Result<Vec<String>>;

    /// Partitions of one topic sorted by index, failing with [`Error::TopicNotFound`].
    async fn describe_topic(&self, name: &str) -> Result<Vec<TopicPartitionInfo>>;

    /// Partitions of all non-internal topics sorted by (topic, index). A topic
    /// the cluster reports an error for fails the whole call.
    async fn describe_all_topics(&self) -> Result<Vec<TopicPartitionInfo>>;

    /// Partitions that have a replica on the given broker.
    async fn describe_topics_for_broker(&self, id: BrokerId) -> Result<Vec<TopicPartitionInfo>> {
        self.broker(id).await?;
        let partitions = self.describe_all_topics().await?;
        Ok(report::hosted_by(partitions, id))
    }

    /// Replica and leader count of every broker for one topic.
    async fn partition_distribution(&self, topic: &str) -> Result<Vec<TopicBrokerDistribution>> {
        let brokers = self.brokers().await?;
        let partitions = self.describe_topic(topic).await?;
        Ok(report::broker_distribution(&brokers, &partitions))
    }

    /// Current replica lists of one topic.
    async fn partition_replica_distribution(&self, topic: &str) -> Result<Vec<PartitionReplicas>> {
        let partitions = self.describe_topic(topic).await?;
        Ok(report::replica_distribution(&partitions))
    }

    /// Packages target assignments into a request for [`reassign_partitions`](Self::reassign_partitions).
    fn partition_reassign_request(&self, partitions: Vec<PartitionReplicas>) -> ReassignmentRequest {
        ReassignmentRequest::new(partitions)
    }

    /// Submits a reassignment. Success means the cluster accepted it, not
    /// that data movement finished.
    async fn reassign_partitions(&self, request: &ReassignmentRequest) -> Result<()>;
}
