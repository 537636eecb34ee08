use thiserror::Error;

pub use crate::messenger::RequestError;
pub use crate::protocol::error::Error as ProtocolError;

use super::BrokerId;

/// What a failed request was about, to diagnose without re-querying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestContext {
    /// A cluster-wide request (metadata, controller lookup).
    Cluster,

    /// A request specific to a certain topic.
    Topic(String),

    /// A request specific to a certain partition.
    Partition(String, i32),
}

impl std::fmt::Display for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cluster => write!(f, "cluster"),
            Self::Topic(topic) => write!(f, "topic '{topic}'"),
            Self::Partition(topic, partition) => write!(f, "partition {topic}/{partition}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("No brokers available to build a replica ring")]
    EmptyTopology,

    #[error("Partition {topic}/{partition} needs {replication} replicas but only {brokers} brokers are available")]
    InsufficientBrokers {
        topic: String,
        partition: i32,
        replication: usize,
        brokers: usize,
    },

    #[error("Partition {topic}/{partition} has a replication factor of 0")]
    InvalidReplicationFactor { topic: String, partition: i32 },

    #[error("Topic '{0}' not found")]
    TopicNotFound(String),

    #[error("Broker {0} not found")]
    BrokerNotFound(BrokerId),

    #[error("Broker {0} appears more than once")]
    DuplicateBroker(BrokerId),

    #[error("Cannot enumerate brokers: {0}")]
    BrokerQueryFailed(#[source] Box<Error>),

    #[error("No topics to plan for")]
    NoTopics,

    #[error("Connection error: {0}")]
    Connection(#[from] crate::connection::Error),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error(
        "Server error {protocol_error:?} for {request}: {}",
        .error_message.as_deref().unwrap_or("<no message>")
    )]
    ServerError {
        protocol_error: ProtocolError,
        error_message: Option<String>,
        request: RequestContext,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
