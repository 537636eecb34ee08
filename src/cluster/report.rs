//! Projections of existing cluster state used by the reporting commands.

use std::collections::BTreeMap;

use super::{Broker, BrokerId};
use crate::topic::{PartitionReplicas, TopicBrokerDistribution, TopicPartitionInfo};

/// Counts replicas and leaderships per broker.
///
/// Every broker shows up, including those hosting nothing. Replicas on brokers
/// missing from `brokers` (e.g. decommissioned ones) are still reported.
pub fn broker_distribution(
    brokers: &[Broker],
    partitions: &[TopicPartitionInfo],
) -> Vec<TopicBrokerDistribution> {
    let mut by_broker: BTreeMap<BrokerId, TopicBrokerDistribution> = BTreeMap::new();
    for broker in brokers {
        slot(&mut by_broker, broker.id);
    }

    for partition in partitions {
        for &replica in &partition.replicas {
            slot(&mut by_broker, replica).replicas += 1;
        }
        if let Some(leader) = partition.leader {
            slot(&mut by_broker, leader).leaders += 1;
        }
    }

    by_broker.into_values().collect()
}

fn slot(
    map: &mut BTreeMap<BrokerId, TopicBrokerDistribution>,
    broker: BrokerId,
) -> &mut TopicBrokerDistribution {
    map.entry(broker).or_insert(TopicBrokerDistribution {
        broker,
        replicas: 0,
        leaders: 0,
    })
}

/// Current replica lists, sorted by (topic, partition).
pub fn replica_distribution(partitions: &[TopicPartitionInfo]) -> Vec<PartitionReplicas> {
    let mut res = partitions
        .iter()
        .map(|p| PartitionReplicas::new(p.topic(), p.partition(), p.replicas.clone()))
        .collect::<Vec<_>>();
    res.sort();
    res
}

/// Keeps the partitions with a replica on `broker`.
pub fn hosted_by(partitions: Vec<TopicPartitionInfo>, broker: BrokerId) -> Vec<TopicPartitionInfo> {
    partitions
        .into_iter()
        .filter(|p| p.replicas.contains(&broker))
        .collect()
}
