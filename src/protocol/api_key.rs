//! ApiKey to tag request types.
//!
//! Only the admin APIs this crate speaks get their own variant.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_api_keys>

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum ApiKey {
    Metadata,
    AlterPartitionReassignments,
    Unknown(i16),
}

impl From<i16> for ApiKey {
    fn from(key: i16) -> Self {
        match key {
            3 => Self::Metadata,
            45 => Self::AlterPartitionReassignments,
            _ => Self::Unknown(key),
        }
    }
}

impl From<ApiKey> for i16 {
    fn from(key: ApiKey) -> Self {
        match key {
            ApiKey::Metadata => 3,
            ApiKey::AlterPartitionReassignments => 45,
            ApiKey::Unknown(code) => code,
        }
    }
}
