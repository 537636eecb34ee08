use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use parking_lot::RwLock;
use tracing::info;

use crate::cluster::{Broker, BrokerId};
use crate::protocol::messages::MetadataResponseBroker;

/// Last known address and rack of every broker.
#[derive(Debug, Default)]
pub struct BrokerTopology {
    brokers: RwLock<BTreeMap<BrokerId, BrokerEndpoint>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub id: BrokerId,
    pub host: String,
    pub port: i32,
    pub rack: Option<String>,
}

impl Display for BrokerEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<&MetadataResponseBroker> for BrokerEndpoint {
    fn from(b: &MetadataResponseBroker) -> Self {
        Self {
            id: b.node_id,
            host: b.host.clone(),
            port: b.port,
            rack: b.rack.clone(),
        }
    }
}

impl From<&BrokerEndpoint> for Broker {
    fn from(b: &BrokerEndpoint) -> Self {
        Broker::new(b.id, b.rack.clone().unwrap_or_default())
    }
}

impl BrokerTopology {
    pub fn is_empty(&self) -> bool {
        self.brokers.read().is_empty()
    }

    pub fn get_broker(&self, id: BrokerId) -> Option<BrokerEndpoint> {
        self.brokers.read().get(&id).cloned()
    }

    /// All known brokers, sorted by ID.
    pub fn get_brokers(&self) -> Vec<BrokerEndpoint> {
        self.brokers.read().values().cloned().collect()
    }

    /// Replaces the topology with the brokers of a metadata response.
    ///
    /// Brokers absent from `brokers` are dropped, a full metadata response
    /// always lists every live broker.
    pub fn update(&self, brokers: &[MetadataResponseBroker]) {
        let mut topology = self.brokers.write();

        let before = topology.len();
        topology.retain(|id, _| brokers.iter().any(|b| b.node_id == *id));
        if topology.len() != before {
            info!(
                removed = before - topology.len(),
                "Brokers left the cluster",
            );
        }

        for broker in brokers {
            let new = BrokerEndpoint::from(broker);
            match topology.entry(broker.node_id) {
                Entry::Occupied(mut o) => {
                    let current = o.get_mut();
                    if *current != new {
                        info!(
                            broker = broker.node_id,
                            current = %current,
                            new = %new,
                            rack = ?new.rack,
                            "Broker update",
                        );
                        *current = new;
                    }
                }
                Entry::Vacant(v) => {
                    info!(
                        broker = broker.node_id,
                        new = %new,
                        rack = ?new.rack,
                        "New broker",
                    );
                    v.insert(new);
                }
            }
        }
    }
}
