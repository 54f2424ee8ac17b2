//! Frames every RPC the Wire Client speaks into a pair of enums so a single
//! `tokio_service::Service` can carry all of them over one connection pool,
//! and names the small value types (`TopicPartition`, `FetchRecords`) shared
//! between the Wire Client and the Consumer Core.

use std::borrow::Cow;
use std::collections::HashMap;

use bytes::{BytesMut, ByteOrder};

use errors::Result;
use protocol::{ApiKey, ApiKeys, ApiVersion, ApiVersionsRequest, ApiVersionsResponse,
               CorrelationId, Encodable, FetchOffset, FetchPartition, FetchRequest, FetchResponse,
               FetchTopic, GenerationId, GroupCoordinatorRequest, GroupCoordinatorResponse,
               HeartbeatRequest, HeartbeatResponse, JoinGroupProtocol, JoinGroupRequest,
               JoinGroupResponse, LeaveGroupRequest, LeaveGroupResponse, ListOffsetsPartition,
               ListOffsetsRequest, ListOffsetsResponse, ListOffsetsTopic, MessageSet,
               OffsetCommitPartition, OffsetCommitRequest, OffsetCommitResponse,
               OffsetCommitTopic, OffsetFetchRequest, OffsetFetchResponse, OffsetFetchTopic,
               PartitionId, RequestHeader, SyncGroupAssignment, SyncGroupRequest,
               SyncGroupResponse};

/// A single partition of a topic. Compared by both fields (spec.md's
/// `TopicPartition` value type).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TopicPartition<'a> {
    pub topic_name: Cow<'a, str>,
    pub partition: PartitionId,
}

impl<'a> TopicPartition<'a> {
    pub fn new<S: Into<Cow<'a, str>>>(topic_name: S, partition: PartitionId) -> Self {
        TopicPartition {
            topic_name: topic_name.into(),
            partition: partition,
        }
    }

    pub fn into_owned(self) -> TopicPartition<'static> {
        TopicPartition {
            topic_name: Cow::Owned(self.topic_name.into_owned()),
            partition: self.partition,
        }
    }
}

/// The result of a `Fetch` RPC: the record batch that arrived for every
/// partition that succeeded (spec.md's `map topic → (partition →
/// RecordBatch[])`, flattened to a `TopicPartition` key so it composes
/// directly with `FetchPartiallyFailed`'s per-partition error map).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchRecords(pub HashMap<TopicPartition<'static>, MessageSet>);

impl FetchRecords {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&mut self, other: FetchRecords) {
        self.0.extend(other.0);
    }
}

/// Every request the Wire Client can send, dispatched to the RPC's
/// `ApiKeys` by `api_key()` and encoded generically by `Encodable`.
pub enum KafkaRequest<'a> {
    Fetch(FetchRequest<'a>),
    ListOffsets(ListOffsetsRequest<'a>),
    Metadata(::protocol::MetadataRequest<'a>),
    OffsetCommit(OffsetCommitRequest<'a>),
    OffsetFetch(OffsetFetchRequest<'a>),
    GroupCoordinator(GroupCoordinatorRequest<'a>),
    JoinGroup(JoinGroupRequest<'a>),
    Heartbeat(HeartbeatRequest<'a>),
    LeaveGroup(LeaveGroupRequest<'a>),
    SyncGroup(SyncGroupRequest<'a>),
    ApiVersions(ApiVersionsRequest<'a>),
}

impl<'a> KafkaRequest<'a> {
    pub fn api_key(&self) -> ApiKey {
        (match *self {
             KafkaRequest::Fetch(..) => ApiKeys::Fetch,
             KafkaRequest::ListOffsets(..) => ApiKeys::ListOffsets,
             KafkaRequest::Metadata(..) => ApiKeys::Metadata,
             KafkaRequest::OffsetCommit(..) => ApiKeys::OffsetCommit,
             KafkaRequest::OffsetFetch(..) => ApiKeys::OffsetFetch,
             KafkaRequest::GroupCoordinator(..) => ApiKeys::GroupCoordinator,
             KafkaRequest::JoinGroup(..) => ApiKeys::JoinGroup,
             KafkaRequest::Heartbeat(..) => ApiKeys::Heartbeat,
             KafkaRequest::LeaveGroup(..) => ApiKeys::LeaveGroup,
             KafkaRequest::SyncGroup(..) => ApiKeys::SyncGroup,
             KafkaRequest::ApiVersions(..) => ApiKeys::ApiVersions,
         }) as ApiKey
    }

    pub fn api_version(&self) -> ApiVersion {
        match *self {
            KafkaRequest::Fetch(ref req) => req.header.api_version,
            KafkaRequest::ListOffsets(ref req) => req.header.api_version,
            KafkaRequest::Metadata(ref req) => req.header.api_version,
            KafkaRequest::OffsetCommit(ref req) => req.header.api_version,
            KafkaRequest::OffsetFetch(ref req) => req.header.api_version,
            KafkaRequest::GroupCoordinator(ref req) => req.header.api_version,
            KafkaRequest::JoinGroup(ref req) => req.header.api_version,
            KafkaRequest::Heartbeat(ref req) => req.header.api_version,
            KafkaRequest::LeaveGroup(ref req) => req.header.api_version,
            KafkaRequest::SyncGroup(ref req) => req.header.api_version,
            KafkaRequest::ApiVersions(ref req) => req.header.api_version,
        }
    }

    pub fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        match self {
            KafkaRequest::Fetch(req) => req.encode::<T>(dst),
            KafkaRequest::ListOffsets(req) => req.encode::<T>(dst),
            KafkaRequest::Metadata(req) => req.encode::<T>(dst),
            KafkaRequest::OffsetCommit(req) => req.encode::<T>(dst),
            KafkaRequest::OffsetFetch(req) => req.encode::<T>(dst),
            KafkaRequest::GroupCoordinator(req) => req.encode::<T>(dst),
            KafkaRequest::JoinGroup(req) => req.encode::<T>(dst),
            KafkaRequest::Heartbeat(req) => req.encode::<T>(dst),
            KafkaRequest::LeaveGroup(req) => req.encode::<T>(dst),
            KafkaRequest::SyncGroup(req) => req.encode::<T>(dst),
            KafkaRequest::ApiVersions(req) => req.encode::<T>(dst),
        }
    }

    fn header<'b>(api_key: ApiKeys,
                  api_version: ApiVersion,
                  correlation_id: CorrelationId,
                  client_id: Option<Cow<'b, str>>)
                  -> RequestHeader<'b> {
        RequestHeader {
            api_key: api_key as ApiKey,
            api_version: api_version,
            correlation_id: correlation_id,
            client_id: client_id,
        }
    }

    pub fn fetch(api_version: ApiVersion,
                 correlation_id: CorrelationId,
                 client_id: Option<Cow<'a, str>>,
                 max_wait_time: i32,
                 min_bytes: i32,
                 topics: HashMap<String, Vec<(PartitionId, i64, i32)>>)
                 -> Self {
        let topics = topics
            .into_iter()
            .map(|(topic_name, partitions)| {
                FetchTopic {
                    topic_name: topic_name,
                    partitions: partitions
                        .into_iter()
                        .map(|(partition, fetch_offset, max_bytes)| {
                                 FetchPartition {
                                     partition: partition,
                                     fetch_offset: fetch_offset,
                                     max_bytes: max_bytes,
                                 }
                             })
                        .collect(),
                }
            })
            .collect();

        KafkaRequest::Fetch(FetchRequest {
                                 header: Self::header(ApiKeys::Fetch,
                                                       api_version,
                                                       correlation_id,
                                                       client_id),
                                 replica_id: -1,
                                 max_wait_time: max_wait_time,
                                 min_bytes: min_bytes,
                                 topics: topics,
                             })
    }

    pub fn list_offsets(api_version: ApiVersion,
                        correlation_id: CorrelationId,
                        client_id: Option<Cow<'a, str>>,
                        topics: HashMap<String, Vec<PartitionId>>,
                        offset: FetchOffset)
                        -> Self {
        let topics = topics
            .into_iter()
            .map(|(topic_name, partitions)| {
                ListOffsetsTopic {
                    topic_name: topic_name,
                    partitions: partitions
                        .into_iter()
                        .map(|partition| {
                                 ListOffsetsPartition {
                                     partition: partition,
                                     timestamp: offset,
                                     max_num_offsets: 1,
                                 }
                             })
                        .collect(),
                }
            })
            .collect();

        KafkaRequest::ListOffsets(ListOffsetsRequest {
                                      header: Self::header(ApiKeys::ListOffsets,
                                                            api_version,
                                                            correlation_id,
                                                            client_id),
                                      replica_id: -1,
                                      topics: topics,
                                  })
    }

    pub fn fetch_metadata<S: AsRef<str>>(api_version: ApiVersion,
                                        correlation_id: CorrelationId,
                                        client_id: Option<Cow<'a, str>>,
                                        topic_names: &[S])
                                        -> Self {
        KafkaRequest::Metadata(::protocol::MetadataRequest {
                                    header: Self::header(ApiKeys::Metadata,
                                                          api_version,
                                                          correlation_id,
                                                          client_id),
                                    topics: topic_names
                                        .iter()
                                        .map(|s| s.as_ref().to_owned())
                                        .collect(),
                                })
    }

    pub fn offset_commit(api_version: ApiVersion,
                         correlation_id: CorrelationId,
                         client_id: Option<Cow<'a, str>>,
                         group_id: String,
                         generation_id: GenerationId,
                         member_id: String,
                         retention_time: i64,
                         topics: HashMap<String, Vec<(PartitionId, i64)>>)
                         -> Self {
        let topics = topics
            .into_iter()
            .map(|(topic_name, partitions)| {
                OffsetCommitTopic {
                    topic_name: topic_name,
                    partitions: partitions
                        .into_iter()
                        .map(|(partition, offset)| {
                                 OffsetCommitPartition {
                                     partition: partition,
                                     offset: offset,
                                     metadata: None,
                                 }
                             })
                        .collect(),
                }
            })
            .collect();

        KafkaRequest::OffsetCommit(OffsetCommitRequest {
                                       header: Self::header(ApiKeys::OffsetCommit,
                                                             api_version,
                                                             correlation_id,
                                                             client_id),
                                       group_id: group_id,
                                       generation_id: generation_id,
                                       member_id: member_id,
                                       retention_time: retention_time,
                                       topics: topics,
                                   })
    }

    pub fn offset_fetch(api_version: ApiVersion,
                        correlation_id: CorrelationId,
                        client_id: Option<Cow<'a, str>>,
                        group_id: String,
                        topics: HashMap<String, Vec<PartitionId>>)
                        -> Self {
        let topics = topics
            .into_iter()
            .map(|(topic_name, partitions)| {
                     OffsetFetchTopic {
                         topic_name: topic_name,
                         partitions: partitions,
                     }
                 })
            .collect();

        KafkaRequest::OffsetFetch(OffsetFetchRequest {
                                      header: Self::header(ApiKeys::OffsetFetch,
                                                            api_version,
                                                            correlation_id,
                                                            client_id),
                                      group_id: group_id,
                                      topics: topics,
                                  })
    }

    pub fn group_coordinator(api_version: ApiVersion,
                             correlation_id: CorrelationId,
                             client_id: Option<Cow<'a, str>>,
                             group_id: Cow<'a, str>)
                             -> Self {
        KafkaRequest::GroupCoordinator(GroupCoordinatorRequest {
                                            header: Self::header(ApiKeys::GroupCoordinator,
                                                                  api_version,
                                                                  correlation_id,
                                                                  client_id),
                                            group_id: group_id.into_owned(),
                                        })
    }

    pub fn join_group(api_version: ApiVersion,
                      correlation_id: CorrelationId,
                      client_id: Option<Cow<'a, str>>,
                      group_id: Cow<'a, str>,
                      session_timeout: i32,
                      rebalance_timeout: i32,
                      member_id: Cow<'a, str>,
                      protocol_type: Cow<'a, str>,
                      group_protocols: Vec<JoinGroupProtocol>)
                      -> Self {
        KafkaRequest::JoinGroup(JoinGroupRequest {
                                     header: Self::header(ApiKeys::JoinGroup,
                                                           api_version,
                                                           correlation_id,
                                                           client_id),
                                     group_id: group_id.into_owned(),
                                     session_timeout: session_timeout,
                                     rebalance_timeout: rebalance_timeout,
                                     member_id: member_id.into_owned(),
                                     protocol_type: protocol_type.into_owned(),
                                     group_protocols: group_protocols,
                                 })
    }

    pub fn heartbeat(api_version: ApiVersion,
                     correlation_id: CorrelationId,
                     client_id: Option<Cow<'a, str>>,
                     group_id: Cow<'a, str>,
                     generation_id: GenerationId,
                     member_id: Cow<'a, str>)
                     -> Self {
        KafkaRequest::Heartbeat(HeartbeatRequest {
                                     header: Self::header(ApiKeys::Heartbeat,
                                                           api_version,
                                                           correlation_id,
                                                           client_id),
                                     group_id: group_id.into_owned(),
                                     generation_id: generation_id,
                                     member_id: member_id.into_owned(),
                                 })
    }

    pub fn leave_group(api_version: ApiVersion,
                       correlation_id: CorrelationId,
                       client_id: Option<Cow<'a, str>>,
                       group_id: Cow<'a, str>,
                       member_id: Cow<'a, str>)
                       -> Self {
        KafkaRequest::LeaveGroup(LeaveGroupRequest {
                                      header: Self::header(ApiKeys::LeaveGroup,
                                                            api_version,
                                                            correlation_id,
                                                            client_id),
                                      group_id: group_id.into_owned(),
                                      member_id: member_id.into_owned(),
                                  })
    }

    pub fn sync_group(api_version: ApiVersion,
                      correlation_id: CorrelationId,
                      client_id: Option<Cow<'a, str>>,
                      group_id: Cow<'a, str>,
                      generation_id: GenerationId,
                      member_id: Cow<'a, str>,
                      group_assignment: Vec<SyncGroupAssignment>)
                      -> Self {
        KafkaRequest::SyncGroup(SyncGroupRequest {
                                     header: Self::header(ApiKeys::SyncGroup,
                                                           api_version,
                                                           correlation_id,
                                                           client_id),
                                     group_id: group_id.into_owned(),
                                     generation_id: generation_id,
                                     member_id: member_id.into_owned(),
                                     group_assignment: group_assignment,
                                 })
    }

    pub fn api_versions(correlation_id: CorrelationId, client_id: Option<Cow<'a, str>>) -> Self {
        KafkaRequest::ApiVersions(ApiVersionsRequest {
                                      header: Self::header(ApiKeys::ApiVersions,
                                                            0,
                                                            correlation_id,
                                                            client_id),
                                  })
    }
}

/// Every response the Wire Client's transport can decode, paired with the
/// request that produced it by the correlation id the transport tracks.
#[derive(Clone, Debug, PartialEq)]
pub enum KafkaResponse {
    Fetch(FetchResponse),
    ListOffsets(ListOffsetsResponse),
    Metadata(::protocol::MetadataResponse),
    OffsetCommit(OffsetCommitResponse),
    OffsetFetch(OffsetFetchResponse),
    GroupCoordinator(GroupCoordinatorResponse),
    JoinGroup(JoinGroupResponse),
    Heartbeat(HeartbeatResponse),
    LeaveGroup(LeaveGroupResponse),
    SyncGroup(SyncGroupResponse),
    ApiVersions(ApiVersionsResponse),
}

impl KafkaResponse {
    /// Used to build an `ErrorKind::UnexpectedResponse` message when a
    /// response doesn't match the variant a caller pattern-matched for.
    pub fn api_key(&self) -> String {
        match *self {
            KafkaResponse::Fetch(..) => "Fetch",
            KafkaResponse::ListOffsets(..) => "ListOffsets",
            KafkaResponse::Metadata(..) => "Metadata",
            KafkaResponse::OffsetCommit(..) => "OffsetCommit",
            KafkaResponse::OffsetFetch(..) => "OffsetFetch",
            KafkaResponse::GroupCoordinator(..) => "GroupCoordinator",
            KafkaResponse::JoinGroup(..) => "JoinGroup",
            KafkaResponse::Heartbeat(..) => "Heartbeat",
            KafkaResponse::LeaveGroup(..) => "LeaveGroup",
            KafkaResponse::SyncGroup(..) => "SyncGroup",
            KafkaResponse::ApiVersions(..) => "ApiVersions",
        }.to_owned()
    }
}
