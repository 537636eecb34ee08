use std::io::{Read, Write};

use super::{
    read_compact_versioned_array, write_compact_versioned_array, ReadVersionedError,
    ReadVersionedType, RequestBody, WriteVersionedError, WriteVersionedType,
};
use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    error::Error,
    primitives::{read_compact_len, write_compact_len, TaggedFields},
    traits::{ReadCompactType, ReadType, WriteCompactType, WriteType},
};
#[cfg(test)]
use proptest::prelude::*;

/// Moves partition replicas, sent to the controller.
///
/// Only version 0 exists; it is flexible from the start.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct AlterPartitionReassignmentsRequest {
    /// The time in ms to wait for the request to complete.
    pub timeout_ms: i32,

    /// The topics to reassign.
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<ReassignableTopic>(), 0..2)")
    )]
    pub topics: Vec<ReassignableTopic>,

    /// The tagged fields.
    pub tagged_fields: Option<TaggedFields>,
}

impl RequestBody for AlterPartitionReassignmentsRequest {
    type ResponseBody = AlterPartitionReassignmentsResponse;

    const API_KEY: ApiKey = ApiKey::AlterPartitionReassignments;

    const API_VERSION: ApiVersion = ApiVersion::new(0);

    const FIRST_TAGGED_FIELD_IN_REQUEST_VERSION: ApiVersion = ApiVersion::new(0);
}

impl<W> WriteVersionedType<W> for AlterPartitionReassignmentsRequest
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        assert_eq!(version.0, 0);

        self.timeout_ms.write(writer)?;
        write_compact_versioned_array(writer, version, Some(&self.topics))?;
        self.tagged_fields.write(writer)?;

        Ok(())
    }
}

impl<R> ReadVersionedType<R> for AlterPartitionReassignmentsRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        assert_eq!(version.0, 0);

        Ok(Self {
            timeout_ms: i32::read(reader)?,
            topics: read_compact_versioned_array(reader, version)?.unwrap_or_default(),
            tagged_fields: Some(TaggedFields::read(reader)?),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ReassignableTopic {
    /// The topic name.
    pub name: String,

    /// The partitions to reassign.
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<ReassignablePartition>(), 0..2)")
    )]
    pub partitions: Vec<ReassignablePartition>,

    /// The tagged fields.
    pub tagged_fields: Option<TaggedFields>,
}

impl<W> WriteVersionedType<W> for ReassignableTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.name.write_compact(writer)?;
        write_compact_versioned_array(writer, version, Some(&self.partitions))?;
        self.tagged_fields.write(writer)?;

        Ok(())
    }
}

impl<R> ReadVersionedType<R> for ReassignableTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            name: String::read_compact(reader)?,
            partitions: read_compact_versioned_array(reader, version)?.unwrap_or_default(),
            tagged_fields: Some(TaggedFields::read(reader)?),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ReassignablePartition {
    /// The partition index.
    pub partition_index: i32,

    /// The replicas to place the partitions on, or null to cancel a pending
    /// reassignment for this partition.
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "proptest::option::of(prop::collection::vec(any::<i32>(), 0..2))")
    )]
    pub replicas: Option<Vec<i32>>,

    /// The tagged fields.
    pub tagged_fields: Option<TaggedFields>,
}

impl<W> WriteVersionedType<W> for ReassignablePartition
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.partition_index.write(writer)?;
        match &self.replicas {
            Some(replicas) => replicas.write_compact(writer)?,
            None => write_compact_len(writer, None)?,
        }
        self.tagged_fields.write(writer)?;

        Ok(())
    }
}

impl<R> ReadVersionedType<R> for ReassignablePartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let partition_index = i32::read(reader)?;
        let replicas = match read_compact_len(reader)? {
            None => None,
            Some(len) => {
                let mut replicas = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    replicas.push(i32::read(reader)?);
                }
                Some(replicas)
            }
        };

        Ok(Self {
            partition_index,
            replicas,
            tagged_fields: Some(TaggedFields::read(reader)?),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct AlterPartitionReassignmentsResponse {
    /// The duration in milliseconds for which the request was throttled due to
    /// a quota violation, or zero if the request did not violate any quota.
    pub throttle_time_ms: i32,

    /// The top-level error, if any.
    pub error: Option<Error>,

    /// The top-level error message, if any.
    pub error_message: Option<String>,

    /// The responses to topics to reassign.
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<ReassignableTopicResponse>(), 0..2)")
    )]
    pub responses: Vec<ReassignableTopicResponse>,

    /// The tagged fields.
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for AlterPartitionReassignmentsResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        assert_eq!(version.0, 0);

        Ok(Self {
            throttle_time_ms: i32::read(reader)?,
            error: Error::new(i16::read(reader)?),
            error_message: ReadCompactType::read_compact(reader)?,
            responses: read_compact_versioned_array(reader, version)?.unwrap_or_default(),
            tagged_fields: Some(TaggedFields::read(reader)?),
        })
    }
}

// brokers write these, we only need it for the fake broker in tests
impl<W> WriteVersionedType<W> for AlterPartitionReassignmentsResponse
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        assert_eq!(version.0, 0);

        self.throttle_time_ms.write(writer)?;
        self.error.map(|e| e.code()).unwrap_or_default().write(writer)?;
        self.error_message.write_compact(writer)?;
        write_compact_versioned_array(writer, version, Some(&self.responses))?;
        self.tagged_fields.write(writer)?;

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ReassignableTopicResponse {
    /// The topic name.
    pub name: String,

    /// The responses to partitions to reassign.
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<ReassignablePartitionResponse>(), 0..2)")
    )]
    pub partitions: Vec<ReassignablePartitionResponse>,

    /// The tagged fields.
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for ReassignableTopicResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            name: String::read_compact(reader)?,
            partitions: read_compact_versioned_array(reader, version)?.unwrap_or_default(),
            tagged_fields: Some(TaggedFields::read(reader)?),
        })
    }
}

impl<W> WriteVersionedType<W> for ReassignableTopicResponse
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.name.write_compact(writer)?;
        write_compact_versioned_array(writer, version, Some(&self.partitions))?;
        self.tagged_fields.write(writer)?;

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ReassignablePartitionResponse {
    /// The partition index.
    pub partition_index: i32,

    /// The error for this partition, if any.
    pub error: Option<Error>,

    /// The error message for this partition, if any.
    pub error_message: Option<String>,

    /// The tagged fields.
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for ReassignablePartitionResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            partition_index: i32::read(reader)?,
            error: Error::new(i16::read(reader)?),
            error_message: ReadCompactType::read_compact(reader)?,
            tagged_fields: Some(TaggedFields::read(reader)?),
        })
    }
}

impl<W> WriteVersionedType<W> for ReassignablePartitionResponse
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.partition_index.write(writer)?;
        self.error.map(|e| e.code()).unwrap_or_default().write(writer)?;
        self.error_message.write_compact(writer)?;
        self.tagged_fields.write(writer)?;

        Ok(())
    }
}
