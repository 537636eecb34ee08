use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::error::{ProtocolError, RequestContext};
use super::{Broker, ClusterApi, Error, ReassignmentRequest, Result};
use crate::build_info::DEFAULT_CLIENT_ID;
use crate::connection::{BrokerConnector, BrokerEndpoint};
use crate::protocol::messages::{
    AlterPartitionReassignmentsRequest, MetadataResponse, MetadataResponsePartition,
    ReassignablePartition, ReassignableTopic,
};
use crate::topic::{TopicPartition, TopicPartitionInfo};

/// Builder for [`KafkaCluster`].
pub struct ClusterBuilder {
    bootstrap_brokers: Vec<String>,
    client_id: Option<Arc<str>>,
    max_message_size: usize,
    request_timeout: Duration,
    reassignment_timeout_ms: i32,
}

impl ClusterBuilder {
    /// Create a new [`ClusterBuilder`] with the list of bootstrap brokers
    pub fn new(bootstrap_brokers: Vec<String>) -> Self {
        Self {
            bootstrap_brokers,
            client_id: None,
            max_message_size: 100 * 1024 * 1024, // 100MB
            request_timeout: Duration::from_secs(30),
            reassignment_timeout_ms: 60_000,
        }
    }

    /// Sets client ID.
    pub fn client_id(mut self, client_id: impl Into<Arc<str>>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set maximum size (in bytes) of message frames that can be received from a broker.
    ///
    /// Metadata of large clusters is the biggest frame this crate reads; setting
    /// this too small makes every metadata request fail.
    pub fn max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Timeout for connecting to a broker and for each request roundtrip.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Time the controller may take to accept a reassignment.
    pub fn reassignment_timeout_ms(mut self, timeout_ms: i32) -> Self {
        self.reassignment_timeout_ms = timeout_ms;
        self
    }

    /// Build [`KafkaCluster`], loading the broker topology.
    pub async fn build(self) -> Result<KafkaCluster> {
        let brokers = Arc::new(BrokerConnector::new(
            self.bootstrap_brokers,
            self.client_id
                .unwrap_or_else(|| Arc::from(DEFAULT_CLIENT_ID)),
            self.max_message_size,
            self.request_timeout,
        ));
        brokers.refresh_metadata().await?;

        Ok(KafkaCluster {
            brokers,
            reassignment_timeout_ms: self.reassignment_timeout_ms,
        })
    }
}

impl std::fmt::Debug for ClusterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterBuilder").finish_non_exhaustive()
    }
}

/// [`ClusterApi`] over a live cluster.
///
/// Every query issues a fresh metadata request, nothing is served from cache.
/// Must be constructed using [`ClusterBuilder`].
#[derive(Debug)]
pub struct KafkaCluster {
    brokers: Arc<BrokerConnector>,
    reassignment_timeout_ms: i32,
}

impl KafkaCluster {
    async fn metadata(&self, topics: Option<Vec<String>>) -> Result<MetadataResponse> {
        let response = self.brokers.request_metadata(topics).await?;
        maybe_throttle("metadata", response.throttle_time_ms);
        Ok(response)
    }

    async fn controller_id(&self) -> Result<i32> {
        self.metadata(Some(vec![]))
            .await?
            .controller_id
            .filter(|id| *id >= 0)
            .ok_or_else(|| Error::InvalidResponse("cluster reports no controller".to_string()))
    }
}

#[async_trait]
impl ClusterApi for KafkaCluster {
    async fn id(&self) -> Result<String> {
        self.metadata(Some(vec![]))
            .await?
            .cluster_id
            .ok_or_else(|| Error::InvalidResponse("cluster reports no cluster ID".to_string()))
    }

    async fn controller(&self) -> Result<Broker> {
        let id = self.controller_id().await?;
        self.broker(id).await
    }

    async fn brokers(&self) -> Result<Vec<Broker>> {
        let response = self
            .metadata(Some(vec![]))
            .await
            .map_err(|e| Error::BrokerQueryFailed(Box::new(e)))?;

        let mut brokers = response
            .brokers
            .iter()
            .map(|b| Broker::from(&BrokerEndpoint::from(b)))
            .collect::<Vec<_>>();
        brokers.sort_by_key(|b| b.id);
        Ok(brokers)
    }

    async fn topics(&self) -> Result<Vec<String>> {
        let response = self.metadata(None).await?;

        let mut topics = response
            .topics
            .into_iter()
            .filter(|t| !matches!(t.is_internal, Some(true)))
            .map(|t| t.name)
            .collect::<Vec<_>>();
        topics.sort();
        Ok(topics)
    }

    async fn describe_topic(&self, name: &str) -> Result<Vec<TopicPartitionInfo>> {
        let response = self.metadata(Some(vec![name.to_string()])).await?;

        let topic = response
            .topics
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::TopicNotFound(name.to_string()))?;

        check_topic(name, topic.error)?;

        let mut partitions = topic
            .partitions
            .into_iter()
            .map(|p| partition_info(name, p))
            .collect::<Vec<_>>();
        partitions.sort_by_key(|p| p.partition());
        Ok(partitions)
    }

    async fn describe_all_topics(&self) -> Result<Vec<TopicPartitionInfo>> {
        let response = self.metadata(None).await?;

        let mut partitions = vec![];
        for topic in response.topics {
            if matches!(topic.is_internal, Some(true)) {
                continue;
            }
            check_topic(&topic.name, topic.error)?;
            let name = topic.name;
            partitions.extend(
                topic
                    .partitions
                    .into_iter()
                    .map(|p| partition_info(&name, p)),
            );
        }

        partitions.sort_by(|a, b| a.topic_partition.cmp(&b.topic_partition));
        Ok(partitions)
    }

    async fn reassign_partitions(&self, request: &ReassignmentRequest) -> Result<()> {
        if request.is_empty() {
            debug!("empty reassignment, nothing to submit");
            return Ok(());
        }

        let mut topics: BTreeMap<&str, Vec<ReassignablePartition>> = BTreeMap::new();
        for p in request.partitions() {
            topics
                .entry(p.topic.as_str())
                .or_default()
                .push(ReassignablePartition {
                    partition_index: p.partition,
                    replicas: Some(p.replicas.clone()),
                    tagged_fields: None,
                });
        }
        let body = AlterPartitionReassignmentsRequest {
            timeout_ms: self.reassignment_timeout_ms,
            topics: topics
                .into_iter()
                .map(|(name, partitions)| ReassignableTopic {
                    name: name.to_string(),
                    partitions,
                    tagged_fields: None,
                })
                .collect(),
            tagged_fields: None,
        };

        let controller = self.controller_id().await?;
        let broker = self.brokers.connect(controller).await?;

        info!(
            controller,
            partitions = request.partitions().len(),
            "submitting partition reassignment",
        );
        let response = broker.request(&body).await?;
        maybe_throttle("alter_partition_reassignments", Some(response.throttle_time_ms));

        if let Some(protocol_error) = response.error {
            error!(e=%protocol_error, msg=?response.error_message, "reassignment rejected");
            return Err(Error::ServerError {
                protocol_error,
                error_message: response.error_message,
                request: RequestContext::Cluster,
            });
        }

        let mut first = None;
        for topic in response.responses {
            for partition in topic.partitions {
                let Some(protocol_error) = partition.error else {
                    continue;
                };
                error!(
                    topic = %topic.name,
                    partition = partition.partition_index,
                    e = %protocol_error,
                    msg = ?partition.error_message,
                    "partition reassignment rejected",
                );
                if first.is_none() {
                    first = Some(Error::ServerError {
                        protocol_error,
                        error_message: partition.error_message,
                        request: RequestContext::Partition(
                            topic.name.clone(),
                            partition.partition_index,
                        ),
                    });
                }
            }
        }

        match first {
            Some(e) => Err(e),
            None => {
                info!(
                    partitions = request.partitions().len(),
                    "partition reassignment accepted"
                );
                Ok(())
            }
        }
    }
}

fn check_topic(name: &str, error: Option<ProtocolError>) -> Result<()> {
    match error {
        None => Ok(()),
        Some(ProtocolError::UnknownTopicOrPartition) => Err(Error::TopicNotFound(name.to_string())),
        Some(protocol_error) => Err(Error::ServerError {
            protocol_error,
            error_message: None,
            request: RequestContext::Topic(name.to_string()),
        }),
    }
}

fn partition_info(topic: &str, p: MetadataResponsePartition) -> TopicPartitionInfo {
    if let Some(e) = p.error {
        debug!(topic, partition = p.partition_index, e = %e, "partition reports error");
    }
    TopicPartitionInfo {
        topic_partition: TopicPartition::new(topic, p.partition_index),
        replication: p.replica_nodes.len(),
        leader: (p.leader_id >= 0).then_some(p.leader_id),
        replicas: p.replica_nodes,
        isr: p.isr_nodes,
    }
}

fn maybe_throttle(api: &'static str, throttle_time_ms: Option<i32>) {
    if let Some(ms) = throttle_time_ms.filter(|ms| *ms > 0) {
        warn!(api, throttle_time_ms = ms, "broker throttled the request");
    }
}
