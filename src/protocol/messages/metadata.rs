use std::io::{Read, Write};

use super::{
    read_versioned_array, write_versioned_array, ReadVersionedError, ReadVersionedType,
    RequestBody, WriteVersionedError, WriteVersionedType,
};
use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    error::Error,
    traits::{ReadType, WriteType},
};
#[cfg(test)]
use proptest::prelude::*;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct MetadataRequest {
    /// The topics to fetch metadata for
    ///
    /// Requests data for all topics if None, and for no topic at all (brokers
    /// and controller only) if empty.
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "proptest::option::of(prop::collection::vec(any::<MetadataRequestTopic>(), 0..2))")
    )]
    pub topics: Option<Vec<MetadataRequestTopic>>,

    /// If this is true, the broker may auto-create topics that we requested
    /// which do not already exist, if it is configured to do so.
    ///
    /// Added in version 4
    pub allow_auto_topic_creation: Option<bool>,
}

impl RequestBody for MetadataRequest {
    type ResponseBody = MetadataResponse;

    const API_KEY: ApiKey = ApiKey::Metadata;

    /// v2 brings the cluster ID, v4 lets us turn off auto-creation.
    const API_VERSION: ApiVersion = ApiVersion::new(4);

    const FIRST_TAGGED_FIELD_IN_REQUEST_VERSION: ApiVersion = ApiVersion::new(9);
}

impl<W> WriteVersionedType<W> for MetadataRequest
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        if v < 4 && self.allow_auto_topic_creation.is_some() {
            return Err(WriteVersionedError::FieldNotAvailable {
                version,
                field: "allow_auto_topic_creation".to_string(),
            });
        }

        write_versioned_array(writer, version, self.topics.as_deref())?;
        if v >= 4 {
            // brokers default to auto-creating
            self.allow_auto_topic_creation.unwrap_or(true).write(writer)?;
        }
        Ok(())
    }
}

impl<R> ReadVersionedType<R> for MetadataRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        let topics = read_versioned_array(reader, version)?;
        let allow_auto_topic_creation = (v >= 4).then(|| bool::read(reader)).transpose()?;

        Ok(Self {
            topics,
            allow_auto_topic_creation,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct MetadataRequestTopic {
    /// The topic name
    pub name: String,
}

impl<W> WriteVersionedType<W> for MetadataRequestTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        assert!(version.0 <= 4);
        Ok(self.name.write(writer)?)
    }
}

impl<R> ReadVersionedType<R> for MetadataRequestTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        assert!(version.0 <= 4);
        Ok(Self {
            name: String::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct MetadataResponse {
    /// The duration in milliseconds for which the request was throttled due to
    /// a quota violation, or zero if the request did not violate any quota.
    ///
    /// Added in version 3
    pub throttle_time_ms: Option<i32>,

    /// Each broker in the response
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<MetadataResponseBroker>(), 0..2)")
    )]
    pub brokers: Vec<MetadataResponseBroker>,

    /// The cluster ID that responding broker belongs to.
    ///
    /// Added in version 2
    pub cluster_id: Option<String>,

    /// The ID of the controller broker.
    ///
    /// Added in version 1
    pub controller_id: Option<i32>,

    /// Each topic in the response
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<MetadataResponseTopic>(), 0..2)")
    )]
    pub topics: Vec<MetadataResponseTopic>,
}

impl<R> ReadVersionedType<R> for MetadataResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        let throttle_time_ms = (v >= 3).then(|| i32::read(reader)).transpose()?;
        let brokers = read_versioned_array(reader, version)?.unwrap_or_default();
        let cluster_id = if v >= 2 {
            ReadType::read(reader)?
        } else {
            None
        };
        let controller_id = (v >= 1).then(|| i32::read(reader)).transpose()?;
        let topics = read_versioned_array(reader, version)?.unwrap_or_default();

        Ok(Self {
            throttle_time_ms,
            brokers,
            cluster_id,
            controller_id,
            topics,
        })
    }
}

// brokers write these, we only need it for the fake broker in tests
impl<W> WriteVersionedType<W> for MetadataResponse
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        if v >= 3 {
            self.throttle_time_ms.unwrap_or_default().write(writer)?;
        }
        write_versioned_array(writer, version, Some(&self.brokers))?;
        if v >= 2 {
            self.cluster_id.write(writer)?;
        }
        if v >= 1 {
            // -1 is what brokers send for "no controller"
            self.controller_id.unwrap_or(-1).write(writer)?;
        }
        write_versioned_array(writer, version, Some(&self.topics))?;

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct MetadataResponseBroker {
    /// The broker ID
    pub node_id: i32,

    /// The broker hostname
    pub host: String,

    /// The broker port
    pub port: i32,

    /// The rack of the broker, or null if it has not been assigned to a rack.
    ///
    /// Added in version 1
    pub rack: Option<String>,
}

impl<R> ReadVersionedType<R> for MetadataResponseBroker
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        let node_id = i32::read(reader)?;
        let host = String::read(reader)?;
        let port = i32::read(reader)?;
        let rack = if v >= 1 {
            ReadType::read(reader)?
        } else {
            None
        };

        Ok(Self {
            node_id,
            host,
            port,
            rack,
        })
    }
}

impl<W> WriteVersionedType<W> for MetadataResponseBroker
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        self.node_id.write(writer)?;
        self.host.write(writer)?;
        self.port.write(writer)?;
        if v >= 1 {
            self.rack.write(writer)?;
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct MetadataResponseTopic {
    /// The topic error if any
    pub error: Option<Error>,

    /// The topic name
    pub name: String,

    /// True if the topic is internal
    ///
    /// Added in version 1
    pub is_internal: Option<bool>,

    /// Each partition in the topic
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<MetadataResponsePartition>(), 0..2)")
    )]
    pub partitions: Vec<MetadataResponsePartition>,
}

impl<R> ReadVersionedType<R> for MetadataResponseTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        let error = Error::new(i16::read(reader)?);
        let name = String::read(reader)?;
        let is_internal = (v >= 1).then(|| bool::read(reader)).transpose()?;
        let partitions = read_versioned_array(reader, version)?.unwrap_or_default();

        Ok(Self {
            error,
            name,
            is_internal,
            partitions,
        })
    }
}

impl<W> WriteVersionedType<W> for MetadataResponseTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        self.error.map(|e| e.code()).unwrap_or_default().write(writer)?;
        self.name.write(writer)?;
        if v >= 1 {
            self.is_internal.unwrap_or_default().write(writer)?;
        }
        write_versioned_array(writer, version, Some(&self.partitions))?;

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct MetadataResponsePartition {
    /// The partition error if any
    pub error: Option<Error>,

    /// The partition index
    pub partition_index: i32,

    /// The ID of the leader broker
    pub leader_id: i32,

    /// The set of all nodes that host this partition
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<i32>(), 0..2)")
    )]
    pub replica_nodes: Vec<i32>,

    /// The set of all nodes that are in sync with the leader for this partition
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<i32>(), 0..2)")
    )]
    pub isr_nodes: Vec<i32>,
}

impl<R> ReadVersionedType<R> for MetadataResponsePartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        Ok(Self {
            error: Error::new(i16::read(reader)?),
            partition_index: i32::read(reader)?,
            leader_id: i32::read(reader)?,
            replica_nodes: ReadType::read(reader)?,
            isr_nodes: ReadType::read(reader)?,
        })
    }
}

impl<W> WriteVersionedType<W> for MetadataResponsePartition
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        self.error.map(|e| e.code()).unwrap_or_default().write(writer)?;
        self.partition_index.write(writer)?;
        self.leader_id.write(writer)?;
        self.replica_nodes.write(writer)?;
        self.isr_nodes.write(writer)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::protocol::messages::test_utils::{assert_write_versioned, test_roundtrip_versioned};

    use super::*;

    test_roundtrip_versioned!(
        MetadataResponse,
        ApiVersion(0),
        ApiVersion(4),
        test_roundtrip_metadata_response
    );

    test_roundtrip_versioned!(
        MetadataRequest,
        ApiVersion(0),
        ApiVersion(4),
        test_roundtrip_metadata_request
    );

    #[test]
    fn request_all_topics_without_auto_creation() {
        let req = MetadataRequest {
            topics: None,
            allow_auto_topic_creation: Some(false),
        };

        assert_write_versioned!(req, 4, vec![0xff, 0xff, 0xff, 0xff, 0]);
    }

    #[test]
    fn request_auto_creation_unavailable_before_v4() {
        let req = MetadataRequest {
            topics: Some(vec![]),
            allow_auto_topic_creation: Some(false),
        };

        let err = req
            .write_versioned(&mut Vec::new(), ApiVersion::new(2))
            .unwrap_err();
        assert!(matches!(
            err,
            WriteVersionedError::FieldNotAvailable { .. }
        ));
    }

    #[test]
    fn read_response_v4() {
        let mut buf = vec![];
        // throttle_time_ms
        buf.extend_from_slice(&0i32.to_be_bytes());
        // brokers: [1, "b1", 9092, "r1"]
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&[0, 2, b'b', b'1']);
        buf.extend_from_slice(&9092i32.to_be_bytes());
        buf.extend_from_slice(&[0, 2, b'r', b'1']);
        // cluster_id: null
        buf.extend_from_slice(&(-1i16).to_be_bytes());
        // controller_id
        buf.extend_from_slice(&1i32.to_be_bytes());
        // topics: [unknown topic "t" without partitions]
        buf.extend_from_slice(&1i32.to_be_bytes());
        buf.extend_from_slice(&3i16.to_be_bytes());
        buf.extend_from_slice(&[0, 1, b't']);
        buf.push(0);
        buf.extend_from_slice(&0i32.to_be_bytes());

        let got = MetadataResponse::read_versioned(&mut Cursor::new(buf), ApiVersion::new(4))
            .unwrap();

        assert_eq!(
            got,
            MetadataResponse {
                throttle_time_ms: Some(0),
                brokers: vec![MetadataResponseBroker {
                    node_id: 1,
                    host: "b1".to_string(),
                    port: 9092,
                    rack: Some("r1".to_string()),
                }],
                cluster_id: None,
                controller_id: Some(1),
                topics: vec![MetadataResponseTopic {
                    error: Some(Error::UnknownTopicOrPartition),
                    name: "t".to_string(),
                    is_internal: Some(false),
                    partitions: vec![],
                }],
            }
        );
    }
}
