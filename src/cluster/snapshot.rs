use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use super::{Broker, BrokerId, ClusterApi, Error, ReassignmentRequest, Result};
use crate::topic::{PartitionReplicas, TopicPartitionInfo};

/// [`ClusterApi`] serving a point-in-time view of a cluster from memory.
///
/// Accepted reassignments are applied to the view immediately and recorded,
/// see [`submitted`](Self::submitted).
#[derive(Debug)]
pub struct SnapshotCluster {
    cluster_id: String,
    controller: Option<BrokerId>,
    brokers: Vec<Broker>,
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    topics: BTreeMap<String, Vec<TopicPartitionInfo>>,
    submitted: Vec<ReassignmentRequest>,
}

impl SnapshotCluster {
    /// Brokers are listed by ID, duplicates included, so the planner sees
    /// exactly what was captured.
    pub fn new(brokers: Vec<Broker>) -> Self {
        Self {
            cluster_id: "snapshot".to_string(),
            controller: brokers.first().map(|b| b.id),
            brokers,
            state: RwLock::new(State::default()),
        }
    }

    /// Adds a topic whose partition `i` has the replica list `replicas[i]`,
    /// led by its first replica.
    pub fn with_topic(self, name: impl Into<String>, replicas: Vec<Vec<BrokerId>>) -> Self {
        let name = name.into();
        let partitions = replicas
            .into_iter()
            .enumerate()
            .map(|(i, r)| TopicPartitionInfo::new(name.clone(), i as i32, r))
            .collect();
        self.with_partitions(name, partitions)
    }

    /// Adds a topic from full partition descriptions.
    pub fn with_partitions(
        self,
        name: impl Into<String>,
        mut partitions: Vec<TopicPartitionInfo>,
    ) -> Self {
        partitions.sort_by_key(|p| p.partition());
        self.state.write().topics.insert(name.into(), partitions);
        self
    }

    pub fn with_cluster_id(mut self, id: impl Into<String>) -> Self {
        self.cluster_id = id.into();
        self
    }

    pub fn with_controller(mut self, id: BrokerId) -> Self {
        self.controller = Some(id);
        self
    }

    /// Reassignments accepted so far, oldest first.
    pub fn submitted(&self) -> Vec<ReassignmentRequest> {
        self.state.read().submitted.clone()
    }

    fn validate(&self, state: &State, target: &PartitionReplicas) -> Result<()> {
        let partitions = state
            .topics
            .get(&target.topic)
            .ok_or_else(|| Error::TopicNotFound(target.topic.clone()))?;
        if !partitions.iter().any(|p| p.partition() == target.partition) {
            return Err(Error::InvalidResponse(format!(
                "partition {}/{} does not exist",
                target.topic, target.partition
            )));
        }
        if target.replicas.is_empty() {
            return Err(Error::InvalidResponse(format!(
                "partition {}/{} has no replicas",
                target.topic, target.partition
            )));
        }
        let mut seen = HashSet::with_capacity(target.replicas.len());
        if let Some(dup) = target.replicas.iter().find(|r| !seen.insert(**r)) {
            return Err(Error::DuplicateBroker(*dup));
        }
        if let Some(unknown) = target
            .replicas
            .iter()
            .find(|r| !self.brokers.iter().any(|b| b.id == **r))
        {
            return Err(Error::BrokerNotFound(*unknown));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterApi for SnapshotCluster {
    async fn id(&self) -> Result<String> {
        Ok(self.cluster_id.clone())
    }

    async fn controller(&self) -> Result<Broker> {
        let id = self
            .controller
            .ok_or_else(|| Error::InvalidResponse("snapshot has no controller".to_string()))?;
        self.broker(id).await
    }

    async fn brokers(&self) -> Result<Vec<Broker>> {
        let mut brokers = self.brokers.clone();
        brokers.sort_by_key(|b| b.id);
        Ok(brokers)
    }

    async fn topics(&self) -> Result<Vec<String>> {
        Ok(self.state.read().topics.keys().cloned().collect())
    }

    async fn describe_topic(&self, name: &str) -> Result<Vec<TopicPartitionInfo>> {
        self.state
            .read()
            .topics
            .get(name)
            .cloned()
            .ok_or_else(|| Error::TopicNotFound(name.to_string()))
    }

    async fn describe_all_topics(&self) -> Result<Vec<TopicPartitionInfo>> {
        Ok(self
            .state
            .read()
            .topics
            .values()
            .flatten()
            .cloned()
            .collect())
    }

    async fn reassign_partitions(&self, request: &ReassignmentRequest) -> Result<()> {
        let mut state = self.state.write();
        for target in request.partitions() {
            self.validate(&state, target)?;
        }

        for target in request.partitions() {
            let partition = state
                .topics
                .get_mut(&target.topic)
                .and_then(|ps| ps.iter_mut().find(|p| p.partition() == target.partition));
            if let Some(partition) = partition {
                partition.replication = target.replicas.len();
                partition.leader = target.leader();
                partition.isr = target.replicas.clone();
                partition.replicas = target.replicas.clone();
            }
        }
        state.submitted.push(request.clone());

        info!(
            partitions = request.partitions().len(),
            "applied reassignment to snapshot"
        );
        Ok(())
    }
}
