//! The binary scheme codec: declarative encode/decode of the request and
//! response payloads needed to join a consumer group, fetch records and
//! manage committed offsets.
//!
//! Every wire shape in this module follows the same three primitives:
//! fixed-width big-endian integers, length-prefixed strings/byte-arrays
//! (`-1` denotes `null`), and `int32`-counted arrays (`-1` denotes `null`).

use std::mem;
use std::str;
use std::borrow::{Cow, ToOwned};

use bytes::{BufMut, ByteOrder, Bytes, BytesMut};
use nom::{be_i16, be_i32};

use errors::Result;

#[macro_use]
mod header;
mod schema;
mod message;
mod metadata;
mod fetch;
mod offset;
mod group;
mod api_versions;

pub use self::header::{RequestHeader, ResponseHeader, parse_response_header};
pub use self::schema::{Schema, MAX_CODEC_ARRAY_LEN};
pub use self::message::{Message, MessageSet, MessageTimestamp, Compression, parse_message_set};
pub use self::metadata::{MetadataRequest, MetadataResponse, BrokerMetadata, TopicMetadata,
                         PartitionMetadata, parse_metadata_response};
pub use self::fetch::{FetchRequest, FetchTopic, FetchPartition, FetchResponse, TopicData,
                      PartitionData, parse_fetch_response};
pub use self::offset::{ListOffsetsRequest, ListOffsetsTopic, ListOffsetsPartition,
                       ListOffsetsResponse, ListOffsetsTopicResponse, ListOffsetsPartitionResponse,
                       OffsetCommitRequest, OffsetCommitTopic, OffsetCommitPartition,
                       OffsetCommitResponse, OffsetCommitTopicResponse,
                       OffsetCommitPartitionResponse, OffsetFetchRequest, OffsetFetchTopic,
                       OffsetFetchResponse, OffsetFetchTopicResponse, OffsetFetchPartitionResponse,
                       FetchOffset, parse_list_offsets_response, parse_offset_commit_response,
                       parse_offset_fetch_response};
pub use self::group::{GroupCoordinatorRequest, GroupCoordinatorResponse, JoinGroupRequest,
                      JoinGroupProtocol, JoinGroupMember, JoinGroupResponse, SyncGroupRequest,
                      SyncGroupAssignment, SyncGroupResponse, HeartbeatRequest, HeartbeatResponse,
                      LeaveGroupRequest, LeaveGroupResponse, parse_group_coordinator_response,
                      parse_join_group_response, parse_sync_group_response,
                      parse_heartbeat_response, parse_leave_group_response};
pub use self::api_versions::{ApiVersionsRequest, ApiVersionsResponse, SupportedApiVersion,
                             parse_api_versions_response};

/// Numeric type aliases used throughout the protocol, kept distinct from
/// plain `i32`/`i64` so a signature documents intent.
pub type ApiKey = i16;
pub type ApiVersion = i16;
pub type CorrelationId = i32;
pub type ErrorCode = i16;
pub type GenerationId = i32;
pub type PartitionId = i32;
pub type Offset = i64;
pub type Timestamp = i64;

/// The numeric codes that the `ApiKey` field in a request header can take,
/// restricted to the RPCs this crate's Wire Client exposes (spec.md §6) plus
/// the handful of broker-admin keys kept only so `ApiKeys` stays an
/// exhaustive mirror of the real protocol table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i16)]
pub enum ApiKeys {
    Produce = 0,
    Fetch = 1,
    ListOffsets = 2,
    Metadata = 3,
    LeaderAndIsr = 4,
    StopReplica = 5,
    UpdateMetadata = 6,
    ControlledShutdown = 7,
    OffsetCommit = 8,
    OffsetFetch = 9,
    GroupCoordinator = 10,
    JoinGroup = 11,
    Heartbeat = 12,
    LeaveGroup = 13,
    SyncGroup = 14,
    DescribeGroups = 15,
    ListGroups = 16,
    SaslHandshake = 17,
    ApiVersions = 18,
    CreateTopics = 19,
    DeleteTopics = 20,
}

impl From<i16> for ApiKeys {
    fn from(v: i16) -> Self {
        unsafe { mem::transmute(v) }
    }
}

/// Acknowledgement requirements for a produce request. The producer path
/// itself is out of scope for this crate (spec.md §1); the type is kept
/// because `RequiredAcks` values appear in a few shared wire-level tables.
#[derive(Debug, Copy, Clone)]
#[repr(i16)]
pub enum RequiredAcks {
    None = 0,
    One = 1,
    All = -1,
}

/// Errors reported by a remote Kafka broker. See
/// [Kafka Errors](http://kafka.apache.org/protocol.html).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i16)]
pub enum KafkaCode {
    Unknown = -1,
    None = 0,
    OffsetOutOfRange = 1,
    CorruptMessage = 2,
    UnknownTopicOrPartition = 3,
    InvalidMessageSize = 4,
    LeaderNotAvailable = 5,
    NotLeaderForPartition = 6,
    RequestTimedOut = 7,
    BrokerNotAvailable = 8,
    ReplicaNotAvailable = 9,
    MessageSizeTooLarge = 10,
    StaleControllerEpoch = 11,
    OffsetMetadataTooLarge = 12,
    NetworkException = 13,
    GroupLoadInProgress = 14,
    GroupCoordinatorNotAvailable = 15,
    NotCoordinatorForGroup = 16,
    InvalidTopic = 17,
    RecordListTooLarge = 18,
    NotEnoughReplicas = 19,
    NotEnoughReplicasAfterAppend = 20,
    InvalidRequiredAcks = 21,
    IllegalGeneration = 22,
    InconsistentGroupProtocol = 23,
    InvalidGroupId = 24,
    UnknownMemberId = 25,
    InvalidSessionTimeout = 26,
    RebalanceInProgress = 27,
    InvalidCommitOffsetSize = 28,
    TopicAuthorizationFailed = 29,
    GroupAuthorizationFailed = 30,
    ClusterAuthorizationFailed = 31,
    InvalidTimestamp = 32,
    UnsupportedSaslMechanism = 33,
    IllegalSaslState = 34,
    UnsupportedVersion = 35,
    TopicAlreadyExists = 36,
    InvalidPartitions = 37,
    InvalidReplicationFactor = 38,
    InvalidReplicaAssignment = 39,
    InvalidConfig = 40,
    NotController = 41,
    InvalidRequest = 42,
    UnsupportedForMessageFormat = 43,
    PolicyViolation = 44,
}

impl From<i16> for KafkaCode {
    fn from(v: i16) -> Self {
        unsafe { mem::transmute(v) }
    }
}

impl KafkaCode {
    /// Coordinator-transitional errors the consumer core retries by
    /// re-discovering the coordinator and/or re-running `subscribe`,
    /// per spec.md §7. These never surface to the caller of `poll`.
    pub fn is_retriable(&self) -> bool {
        match *self {
            KafkaCode::GroupCoordinatorNotAvailable |
            KafkaCode::NotCoordinatorForGroup |
            KafkaCode::RebalanceInProgress |
            KafkaCode::IllegalGeneration |
            KafkaCode::UnknownMemberId |
            KafkaCode::GroupLoadInProgress |
            KafkaCode::NetworkException |
            KafkaCode::RequestTimedOut => true,
            _ => false,
        }
    }
}

/// A trait implemented by every request type so the Wire Client can encode
/// it generically over the wire's byte order.
pub trait Encodable {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()>;
}

/// Tags a nom parse failure with the structural position it occurred at, so
/// a decode error names what it was trying to parse rather than a bare byte
/// offset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseTag {
    RequestHeader,
    ResponseHeader,
    Metadata,
    MetadataBrokers,
    MetadataTopics,
    MetadataPartitions,
    Fetch,
    FetchTopics,
    FetchPartitions,
    Message,
    MessageSet,
    MessageCrc,
    ListOffsets,
    ListOffsetsTopics,
    ListOffsetsPartitions,
    OffsetCommit,
    OffsetFetch,
    GroupCoordinator,
    JoinGroup,
    JoinGroupMembers,
    SyncGroup,
    Heartbeat,
    LeaveGroup,
    ApiVersionsResponse,
    ApiVersion,
}

/// Extension methods used by every `Encodable` impl to write the codec's
/// three wire primitives (nullable string, nullable bytes, counted array).
pub trait WriteExt: BufMut + Sized {
    fn put_str<T: ByteOrder, S: AsRef<str>>(&mut self, s: Option<S>) -> Result<()> {
        match s {
            Some(s) => {
                let bytes = s.as_ref().as_bytes();
                self.put_i16::<T>(bytes.len() as i16);
                self.put_slice(bytes);
            }
            None => self.put_i16::<T>(-1),
        }
        Ok(())
    }

    fn put_bytes<T: ByteOrder, B: AsRef<[u8]>>(&mut self, b: Option<B>) -> Result<()> {
        match b {
            Some(b) => {
                let bytes = b.as_ref();
                self.put_i32::<T>(bytes.len() as i32);
                self.put_slice(bytes);
            }
            None => self.put_i32::<T>(-1),
        }
        Ok(())
    }

    fn put_array<T: ByteOrder, I, F>(&mut self, items: I, mut f: F) -> Result<()>
        where I: IntoIterator,
              I::IntoIter: ExactSizeIterator,
              F: FnMut(&mut Self, I::Item) -> Result<()>
    {
        let iter = items.into_iter();
        self.put_i32::<T>(iter.len() as i32);
        for item in iter {
            f(self, item)?;
        }
        Ok(())
    }
}

impl<B: BufMut> WriteExt for B {}

named!(pub parse_str<Option<Cow<str>>>,
    do_parse!(
        len: be_i16
     >> s: cond!(len > 0, map!(map_res!(take!(len), str::from_utf8), Cow::from))
     >> (s)
    )
);

named!(pub parse_string<String>,
    do_parse!(
        len: be_i16
     >> s: cond_reduce!(len > 0, map!(map_res!(take!(len), str::from_utf8), ToOwned::to_owned))
     >> (s)
    )
);

named!(pub parse_bytes<Option<Bytes>>,
    do_parse!(
        len: be_i32
     >> s: cond!(len > 0, map!(take!(len), |b: &[u8]| Bytes::from(b)))
     >> (s)
    )
);

/// Predicate used as `verify!(be_i32, array_len_ok)` ahead of every
/// `length_count!`-based array parser in this crate, so a corrupt or
/// hostile length prefix is rejected before the inner parser ever
/// allocates (spec.md §4.1, array-length DoS protection).
pub fn array_len_ok(n: i32) -> bool {
    n >= 0 && (n as usize) <= MAX_CODEC_ARRAY_LEN
}

#[cfg(test)]
mod tests {
    use nom::{IResult, Needed, ErrorKind};

    use super::*;

    #[test]
    fn test_parse_str() {
        assert_eq!(parse_str(b"\0"), IResult::Incomplete(Needed::Size(2)));
        assert_eq!(parse_str(b"\xff\xff"), IResult::Done(&b""[..], None));
        assert_eq!(parse_str(b"\0\0"), IResult::Done(&b""[..], None));
        assert_eq!(parse_str(b"\0\x04test"),
                   IResult::Done(&b""[..], Some(Cow::from("test"))));
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse_string(b"\0"), IResult::Incomplete(Needed::Size(2)));
        assert_eq!(parse_string(b"\xff\xff"),
                   IResult::Error(ErrorKind::CondReduce));
        assert_eq!(parse_string(b"\0\0"), IResult::Error(ErrorKind::CondReduce));
        assert_eq!(parse_string(b"\0\x04test"),
                   IResult::Done(&b""[..], "test".to_owned()));
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes(b"\0"), IResult::Incomplete(Needed::Size(4)));
        assert_eq!(parse_bytes(b"\xff\xff\xff\xff"),
                   IResult::Done(&b""[..], None));
        assert_eq!(parse_bytes(b"\0\0\0\0"), IResult::Done(&b""[..], None));
        assert_eq!(parse_bytes(b"\0\0\0\x04test"),
                   IResult::Done(&b""[..], Some(Bytes::from(&b"test"[..]))));
    }

    #[test]
    fn test_kafka_code_retriable() {
        assert!(KafkaCode::RebalanceInProgress.is_retriable());
        assert!(KafkaCode::UnknownMemberId.is_retriable());
        assert!(!KafkaCode::OffsetOutOfRange.is_retriable());
        assert!(!KafkaCode::UnknownTopicOrPartition.is_retriable());
    }
}
