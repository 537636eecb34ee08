//! The subset of the Kafka wire protocol needed to inspect a cluster and
//! submit partition reassignments.
//!
//! # References
//! - <https://kafka.apache.org/protocol>

pub mod api_key;
pub mod api_version;
pub mod error;
pub mod messages;
pub mod primitives;
pub mod traits;
