use bytes::{BufMut, ByteOrder, BytesMut};

use nom::{be_i16, be_i32, be_i64};

use errors::Result;
use protocol::{ErrorCode, GenerationId, Offset, ParseTag, PartitionId, RequestHeader,
               ResponseHeader, WriteExt, array_len_ok, parse_response_header, parse_str,
               parse_string};

/// The two timestamp sentinels `ListOffsets` accepts in place of a wall-clock
/// time, used by the consumer core's `seekToBeginning`/`seekToEnd` (spec.md
/// §4.5.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOffset {
    Earliest,
    Latest,
    Timestamp(i64),
}

impl FetchOffset {
    fn value(&self) -> i64 {
        match *self {
            FetchOffset::Earliest => -2,
            FetchOffset::Latest => -1,
            FetchOffset::Timestamp(ts) => ts,
        }
    }
}

/// `ListOffsets => replica_id [topics]` (api key 2, v0+).
#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsRequest<'a> {
    pub header: RequestHeader<'a>,
    pub replica_id: i32,
    pub topics: Vec<ListOffsetsTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsTopic {
    pub topic_name: String,
    pub partitions: Vec<ListOffsetsPartition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsPartition {
    pub partition: PartitionId,
    pub timestamp: FetchOffset,
    pub max_num_offsets: i32,
}

impl<'a> ::protocol::Encodable for ListOffsetsRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;

        dst.put_i32::<T>(self.replica_id);
        dst.put_array::<T, _, _>(self.topics, |buf, topic| {
            buf.put_str::<T, _>(Some(topic.topic_name))?;
            buf.put_array::<T, _, _>(topic.partitions, |buf, partition| {
                buf.put_i32::<T>(partition.partition);
                buf.put_i64::<T>(partition.timestamp.value());
                buf.put_i32::<T>(partition.max_num_offsets);
                Ok(())
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsResponse {
    pub header: ResponseHeader,
    pub topics: Vec<ListOffsetsTopicResponse>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsTopicResponse {
    pub topic_name: String,
    pub partitions: Vec<ListOffsetsPartitionResponse>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetsPartitionResponse {
    pub partition: PartitionId,
    pub error_code: ErrorCode,
    pub offsets: Vec<Offset>,
}

named!(pub parse_list_offsets_response<ListOffsetsResponse>,
    parse_tag!(ParseTag::ListOffsets,
        do_parse!(
            header: parse_response_header
         >> topics: parse_tag!(ParseTag::ListOffsetsTopics,
                length_count!(verify!(be_i32, array_len_ok), parse_list_offsets_topic_response))
         >> (ListOffsetsResponse { header: header, topics: topics })
        )
    )
);

named!(parse_list_offsets_topic_response<ListOffsetsTopicResponse>,
    do_parse!(
        topic_name: parse_string
     >> partitions: parse_tag!(ParseTag::ListOffsetsPartitions,
            length_count!(verify!(be_i32, array_len_ok), parse_list_offsets_partition_response))
     >> (ListOffsetsTopicResponse { topic_name: topic_name, partitions: partitions })
    )
);

named!(parse_list_offsets_partition_response<ListOffsetsPartitionResponse>,
    do_parse!(
        partition: be_i32
     >> error_code: be_i16
     >> offsets: length_count!(verify!(be_i32, array_len_ok), be_i64)
     >> (ListOffsetsPartitionResponse {
            partition: partition,
            error_code: error_code,
            offsets: offsets,
        })
    )
);

/// `OffsetCommit => group_id generation_id member_id retention_time [topics]`
/// (api key 8, v2 — spec.md §4.5.5). `retention_time` was added at v2
/// (letting a commit override the broker's `offsets.retention.minutes` on a
/// per-request basis) and only removed again at v5; this crate targets v2,
/// so the field is mandatory here.
#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitRequest<'a> {
    pub header: RequestHeader<'a>,
    pub group_id: String,
    pub generation_id: GenerationId,
    pub member_id: String,
    pub retention_time: i64,
    pub topics: Vec<OffsetCommitTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitTopic {
    pub topic_name: String,
    pub partitions: Vec<OffsetCommitPartition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitPartition {
    pub partition: PartitionId,
    pub offset: Offset,
    pub metadata: Option<String>,
}

impl<'a> ::protocol::Encodable for OffsetCommitRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;

        dst.put_str::<T, _>(Some(self.group_id))?;
        dst.put_i32::<T>(self.generation_id);
        dst.put_str::<T, _>(Some(self.member_id))?;
        dst.put_i64::<T>(self.retention_time);
        dst.put_array::<T, _, _>(self.topics, |buf, topic| {
            buf.put_str::<T, _>(Some(topic.topic_name))?;
            buf.put_array::<T, _, _>(topic.partitions, |buf, partition| {
                buf.put_i32::<T>(partition.partition);
                buf.put_i64::<T>(partition.offset);
                buf.put_str::<T, _>(partition.metadata)
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitResponse {
    pub header: ResponseHeader,
    pub topics: Vec<OffsetCommitTopicResponse>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitTopicResponse {
    pub topic_name: String,
    pub partitions: Vec<OffsetCommitPartitionResponse>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetCommitPartitionResponse {
    pub partition: PartitionId,
    pub error_code: ErrorCode,
}

named!(pub parse_offset_commit_response<OffsetCommitResponse>,
    parse_tag!(ParseTag::OffsetCommit,
        do_parse!(
            header: parse_response_header
         >> topics: length_count!(verify!(be_i32, array_len_ok), parse_offset_commit_topic_response)
         >> (OffsetCommitResponse { header: header, topics: topics })
        )
    )
);

named!(parse_offset_commit_topic_response<OffsetCommitTopicResponse>,
    do_parse!(
        topic_name: parse_string
     >> partitions: length_count!(verify!(be_i32, array_len_ok), parse_offset_commit_partition_response)
     >> (OffsetCommitTopicResponse { topic_name: topic_name, partitions: partitions })
    )
);

named!(parse_offset_commit_partition_response<OffsetCommitPartitionResponse>,
    do_parse!(
        partition: be_i32
     >> error_code: be_i16
     >> (OffsetCommitPartitionResponse { partition: partition, error_code: error_code })
    )
);

/// `OffsetFetch => group_id [topics]` (api key 9, v1+).
#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchRequest<'a> {
    pub header: RequestHeader<'a>,
    pub group_id: String,
    pub topics: Vec<OffsetFetchTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchTopic {
    pub topic_name: String,
    pub partitions: Vec<PartitionId>,
}

impl<'a> ::protocol::Encodable for OffsetFetchRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;

        dst.put_str::<T, _>(Some(self.group_id))?;
        dst.put_array::<T, _, _>(self.topics, |buf, topic| {
            buf.put_str::<T, _>(Some(topic.topic_name))?;
            buf.put_array::<T, _, _>(topic.partitions, |buf, partition| {
                buf.put_i32::<T>(partition);
                Ok(())
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchResponse {
    pub header: ResponseHeader,
    pub topics: Vec<OffsetFetchTopicResponse>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchTopicResponse {
    pub topic_name: String,
    pub partitions: Vec<OffsetFetchPartitionResponse>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OffsetFetchPartitionResponse {
    pub partition: PartitionId,
    pub offset: Offset,
    pub metadata: Option<String>,
    pub error_code: ErrorCode,
}

named!(pub parse_offset_fetch_response<OffsetFetchResponse>,
    parse_tag!(ParseTag::OffsetFetch,
        do_parse!(
            header: parse_response_header
         >> topics: length_count!(verify!(be_i32, array_len_ok), parse_offset_fetch_topic_response)
         >> (OffsetFetchResponse { header: header, topics: topics })
        )
    )
);

named!(parse_offset_fetch_topic_response<OffsetFetchTopicResponse>,
    do_parse!(
        topic_name: parse_string
     >> partitions: length_count!(verify!(be_i32, array_len_ok), parse_offset_fetch_partition_response)
     >> (OffsetFetchTopicResponse { topic_name: topic_name, partitions: partitions })
    )
);

named!(parse_offset_fetch_partition_response<OffsetFetchPartitionResponse>,
    do_parse!(
        partition: be_i32
     >> offset: be_i64
     >> metadata: parse_str
     >> error_code: be_i16
     >> (OffsetFetchPartitionResponse {
            partition: partition,
            offset: offset,
            metadata: metadata.map(|c| c.into_owned()),
            error_code: error_code,
        })
    )
);

#[cfg(test)]
mod tests {
    use bytes::{BigEndian, BytesMut};
    use nom::IResult;

    use super::*;
    use protocol::{ApiKey, ApiKeys, Encodable, RequestHeader};

    #[test]
    fn test_encode_list_offsets_request() {
        let req = ListOffsetsRequest {
            header: RequestHeader {
                api_key: ApiKeys::ListOffsets as ApiKey,
                api_version: 0,
                correlation_id: 1,
                client_id: Some("client".into()),
            },
            replica_id: -1,
            topics: vec![ListOffsetsTopic {
                             topic_name: "t".to_owned(),
                             partitions: vec![ListOffsetsPartition {
                                                  partition: 0,
                                                  timestamp: FetchOffset::Latest,
                                                  max_num_offsets: 1,
                                              }],
                         }],
        };

        let mut buf = BytesMut::with_capacity(128);

        req.encode::<BigEndian>(&mut buf).unwrap();

        assert!(buf.len() > 0);
    }

    #[test]
    fn test_encode_offset_commit_request() {
        let req = OffsetCommitRequest {
            header: RequestHeader {
                api_key: ApiKeys::OffsetCommit as ApiKey,
                api_version: 2,
                correlation_id: 1,
                client_id: Some("client".into()),
            },
            group_id: "g".to_owned(),
            generation_id: 1,
            member_id: "m".to_owned(),
            retention_time: -1,
            topics: vec![OffsetCommitTopic {
                             topic_name: "t".to_owned(),
                             partitions: vec![OffsetCommitPartition {
                                                  partition: 0,
                                                  offset: 10,
                                                  metadata: None,
                                              }],
                         }],
        };

        let mut buf = BytesMut::with_capacity(128);

        req.encode::<BigEndian>(&mut buf).unwrap();

        assert!(buf.len() > 0);
    }

    #[test]
    fn test_parse_offset_fetch_response() {
        let data: Vec<u8> = vec![
            0, 0, 0, 9, // correlation_id
            0, 0, 0, 1, // topics len
                0, 1, 116, // topic_name "t"
                0, 0, 0, 1, // partitions len
                    0, 0, 0, 0, // partition
                    0, 0, 0, 0, 0, 0, 0, 10, // offset
                    0xff, 0xff, // metadata (null)
                    0, 0, // error_code
        ];

        match parse_offset_fetch_response(&data[..]) {
            IResult::Done(rest, resp) => {
                assert!(rest.is_empty());
                assert_eq!(resp.topics[0].partitions[0].offset, 10);
                assert_eq!(resp.topics[0].partitions[0].metadata, None);
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }
}
