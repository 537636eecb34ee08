//! Error codes returned by brokers.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_error_codes>

use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[non_exhaustive]
pub enum Error {
    #[error("The server experienced an unexpected error when processing the request.")]
    UnknownServerError,

    #[error("This server does not host this topic-partition.")]
    UnknownTopicOrPartition,

    #[error("There is no leader for this topic-partition as we are in the middle of a leadership election.")]
    LeaderNotAvailable,

    #[error("For requests intended only for the leader, this error indicates that the broker is not the current leader.")]
    NotLeaderOrFollower,

    #[error("The request timed out.")]
    RequestTimedOut,

    #[error("Topic authorization failed.")]
    TopicAuthorizationFailed,

    #[error("Cluster authorization failed.")]
    ClusterAuthorizationFailed,

    #[error("The version of API is not supported.")]
    UnsupportedVersion,

    #[error("Number of partitions is below 1.")]
    InvalidPartitions,

    #[error("Replication factor is below 1 or larger than the number of available brokers.")]
    InvalidReplicationFactor,

    #[error("Replica assignment is invalid.")]
    InvalidReplicaAssignment,

    #[error("This is not the correct controller for this cluster.")]
    NotController,

    #[error("This most likely occurs because of a request being malformed by the client library or the message was sent to an incompatible broker.")]
    InvalidRequest,

    #[error("A partition reassignment is in progress.")]
    ReassignmentInProgress,

    #[error("No partition reassignment is in progress.")]
    NoReassignmentInProgress,

    #[error("Unknown error code: {0}")]
    Unknown(i16),
}

impl Error {
    /// Maps a wire error code, `0` meaning "no error".
    pub fn new(code: i16) -> Option<Self> {
        match code {
            0 => None,
            -1 => Some(Self::UnknownServerError),
            3 => Some(Self::UnknownTopicOrPartition),
            5 => Some(Self::LeaderNotAvailable),
            6 => Some(Self::NotLeaderOrFollower),
            7 => Some(Self::RequestTimedOut),
            29 => Some(Self::TopicAuthorizationFailed),
            31 => Some(Self::ClusterAuthorizationFailed),
            35 => Some(Self::UnsupportedVersion),
            37 => Some(Self::InvalidPartitions),
            38 => Some(Self::InvalidReplicationFactor),
            39 => Some(Self::InvalidReplicaAssignment),
            41 => Some(Self::NotController),
            42 => Some(Self::InvalidRequest),
            60 => Some(Self::ReassignmentInProgress),
            85 => Some(Self::NoReassignmentInProgress),
            _ => Some(Self::Unknown(code)),
        }
    }

    pub fn code(&self) -> i16 {
        match self {
            Self::UnknownServerError => -1,
            Self::UnknownTopicOrPartition => 3,
            Self::LeaderNotAvailable => 5,
            Self::NotLeaderOrFollower => 6,
            Self::RequestTimedOut => 7,
            Self::TopicAuthorizationFailed => 29,
            Self::ClusterAuthorizationFailed => 31,
            Self::UnsupportedVersion => 35,
            Self::InvalidPartitions => 37,
            Self::InvalidReplicationFactor => 38,
            Self::InvalidReplicaAssignment => 39,
            Self::NotController => 41,
            Self::InvalidRequest => 42,
            Self::ReassignmentInProgress => 60,
            Self::NoReassignmentInProgress => 85,
            Self::Unknown(code) => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn zero_is_no_error() {
        assert_eq!(Error::new(0), None);
    }

    proptest! {
        #[test]
        fn roundtrip_known_codes(err: Error) {
            let err = match err {
                Error::Unknown(code) => match Error::new(code) {
                    Some(err) => err,
                    None => return Ok(()),
                },
                _ => err,
            };
            prop_assert_eq!(Error::new(err.code()), Some(err));
        }
    }
}
