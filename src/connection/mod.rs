//! Broker connections and the broker topology they are resolved through.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::BufStream;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cluster::BrokerId;
use crate::messenger::{Messenger, RequestError};
use crate::protocol::messages::{MetadataRequest, MetadataRequestTopic, MetadataResponse};

mod topology;

pub use topology::{BrokerEndpoint, BrokerTopology};

pub type BrokerConnection = Arc<Messenger<BufStream<TcpStream>>>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("Connecting to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error("No bootstrap brokers configured")]
    NoBootstrapBrokers,

    #[error("None of the known brokers is reachable: {0}")]
    NoReachableBroker(#[source] Box<Error>),

    #[error("Broker {0} is not part of the cluster topology")]
    UnknownBroker(BrokerId),

    #[error("Metadata request failed: {0}")]
    Metadata(#[from] RequestError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Opens connections to brokers, starting from a bootstrap list.
#[derive(Debug)]
pub struct BrokerConnector {
    bootstrap_brokers: Vec<String>,

    client_id: Arc<str>,

    max_message_size: usize,

    timeout: Duration,

    pub(crate) topology: BrokerTopology,

    /// Connection used for cluster-wide metadata requests.
    cached_arbitrary_broker: Mutex<Option<BrokerConnection>>,
}

impl BrokerConnector {
    pub fn new(
        bootstrap_brokers: Vec<String>,
        client_id: Arc<str>,
        max_message_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            bootstrap_brokers,
            client_id,
            max_message_size,
            timeout,
            topology: BrokerTopology::default(),
            cached_arbitrary_broker: Mutex::new(None),
        }
    }

    /// Fetches metadata and refreshes the broker topology with it.
    ///
    /// `None` asks for every topic, an empty list for brokers only.
    pub async fn request_metadata(&self, topics: Option<Vec<String>>) -> Result<MetadataResponse> {
        let request = MetadataRequest {
            topics: topics.map(|t| {
                t.into_iter()
                    .map(|name| MetadataRequestTopic { name })
                    .collect()
            }),
            allow_auto_topic_creation: Some(false),
        };

        let broker = self.get_arbitrary().await?;
        let response = match broker.request(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(e=%e, "metadata request failed, dropping cached connection");
                self.invalidate().await;
                return Err(e.into());
            }
        };

        self.topology.update(&response.brokers);
        Ok(response)
    }

    /// Reloads the broker topology.
    pub async fn refresh_metadata(&self) -> Result<()> {
        let response = self.request_metadata(Some(vec![])).await?;
        debug!(
            brokers = response.brokers.len(),
            controller = ?response.controller_id,
            "refreshed broker topology",
        );
        Ok(())
    }

    /// Connects to a specific broker, refreshing the topology once if the
    /// broker is not known yet.
    pub async fn connect(&self, broker_id: BrokerId) -> Result<BrokerConnection> {
        let endpoint = match self.topology.get_broker(broker_id) {
            Some(endpoint) => endpoint,
            None => {
                self.refresh_metadata().await?;
                self.topology
                    .get_broker(broker_id)
                    .ok_or(Error::UnknownBroker(broker_id))?
            }
        };

        self.connect_addr(&endpoint.to_string()).await
    }

    /// Returns the cached metadata connection, establishing one if needed.
    ///
    /// Known brokers are tried before the bootstrap list.
    async fn get_arbitrary(&self) -> Result<BrokerConnection> {
        let mut cached = self.cached_arbitrary_broker.lock().await;
        if let Some(broker) = cached.as_ref() {
            return Ok(Arc::clone(broker));
        }

        let mut candidates = self
            .topology
            .get_brokers()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        candidates.extend(self.bootstrap_brokers.iter().cloned());
        if candidates.is_empty() {
            return Err(Error::NoBootstrapBrokers);
        }

        let mut last_err = None;
        for addr in candidates {
            match self.connect_addr(&addr).await {
                Ok(broker) => {
                    *cached = Some(Arc::clone(&broker));
                    return Ok(broker);
                }
                Err(e) => {
                    warn!(addr=%addr, e=%e, "broker unreachable, trying next");
                    last_err = Some(e);
                }
            }
        }

        Err(Error::NoReachableBroker(Box::new(
            last_err.unwrap_or(Error::NoBootstrapBrokers),
        )))
    }

    async fn invalidate(&self) {
        *self.cached_arbitrary_broker.lock().await = None;
    }

    async fn connect_addr(&self, addr: &str) -> Result<BrokerConnection> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::Timeout {
                addr: addr.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|source| Error::Connect {
                addr: addr.to_string(),
                source,
            })?;
        stream.set_nodelay(true).map_err(|source| Error::Connect {
            addr: addr.to_string(),
            source,
        })?;

        info!(addr, "Established broker connection");

        Ok(Arc::new(Messenger::new(
            BufStream::new(stream),
            Arc::clone(&self.client_id),
            self.max_message_size,
            self.timeout,
        )))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn connector(bootstrap: Vec<String>) -> BrokerConnector {
        BrokerConnector::new(
            bootstrap,
            Arc::from("test"),
            1024,
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn no_bootstrap_brokers() {
        let err = connector(vec![]).refresh_metadata().await.unwrap_err();
        assert_matches!(err, Error::NoBootstrapBrokers);
    }

    #[tokio::test]
    async fn unreachable_bootstrap_broker() {
        // bind and drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = connector(vec![addr]).refresh_metadata().await.unwrap_err();
        assert_matches!(err, Error::NoReachableBroker(_));
    }
}
