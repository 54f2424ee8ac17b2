use bytes::{BufMut, ByteOrder, BytesMut};

use nom::{be_i16, be_i32, be_i64};

use errors::Result;
use protocol::{ApiVersion, Encodable, ErrorCode, Offset, PartitionId, ParseTag, RequestHeader,
               ResponseHeader, MessageSet, WriteExt, array_len_ok, parse_message_set,
               parse_response_header, parse_string};

/// `Fetch => replica_id max_wait_time min_bytes [topics]` (api key 1, v0+).
#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest<'a> {
    pub header: RequestHeader<'a>,
    pub replica_id: i32,
    pub max_wait_time: i32,
    pub min_bytes: i32,
    pub topics: Vec<FetchTopic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchTopic {
    pub topic_name: String,
    pub partitions: Vec<FetchPartition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchPartition {
    pub partition: PartitionId,
    pub fetch_offset: Offset,
    pub max_bytes: i32,
}

impl<'a> Encodable for FetchRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;

        dst.put_i32::<T>(self.replica_id);
        dst.put_i32::<T>(self.max_wait_time);
        dst.put_i32::<T>(self.min_bytes);
        dst.put_array::<T, _, _>(self.topics, |buf, topic| {
            buf.put_str::<T, _>(Some(topic.topic_name))?;
            buf.put_array::<T, _, _>(topic.partitions, |buf, partition| {
                buf.put_i32::<T>(partition.partition);
                buf.put_i64::<T>(partition.fetch_offset);
                buf.put_i32::<T>(partition.max_bytes);
                Ok(())
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchResponse {
    pub header: ResponseHeader,
    pub throttle_time: Option<i32>,
    pub topics: Vec<TopicData>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicData {
    pub topic_name: String,
    pub partitions: Vec<PartitionData>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PartitionData {
    pub partition: PartitionId,
    pub error_code: ErrorCode,
    /// The offset at the end of the log for this partition.
    pub highwater_mark_offset: Offset,
    pub message_set: MessageSet,
}

named_args!(pub parse_fetch_response(api_version: ApiVersion)<FetchResponse>,
    parse_tag!(ParseTag::Fetch,
        do_parse!(
            header: parse_response_header
         >> throttle_time: cond!(api_version > 0, be_i32)
         >> topics: parse_tag!(ParseTag::FetchTopics,
                length_count!(verify!(be_i32, array_len_ok), apply!(parse_fetch_topic_data, api_version)))
         >> (FetchResponse {
                header: header,
                throttle_time: throttle_time,
                topics: topics,
            })
        )
    )
);

named_args!(parse_fetch_topic_data(api_version: ApiVersion)<TopicData>,
    do_parse!(
        topic_name: parse_string
     >> partitions: parse_tag!(ParseTag::FetchPartitions,
            length_count!(verify!(be_i32, array_len_ok), apply!(parse_fetch_partition_data, api_version)))
     >> (TopicData {
            topic_name: topic_name,
            partitions: partitions,
        })
    )
);

named_args!(parse_fetch_partition_data(api_version: ApiVersion)<PartitionData>,
    do_parse!(
        partition: be_i32
     >> error_code: be_i16
     >> offset: be_i64
     >> message_set: length_value!(be_i32, apply!(parse_message_set, api_version))
     >> (PartitionData {
            partition: partition,
            error_code: error_code,
            highwater_mark_offset: offset,
            message_set: message_set,
        })
    )
);

#[cfg(test)]
mod tests {
    use bytes::{BigEndian, BytesMut};

    use super::*;
    use protocol::*;

    #[test]
    fn test_encode_fetch_request() {
        let req = FetchRequest {
            header: RequestHeader {
                api_key: ApiKeys::Fetch as ApiKey,
                api_version: 0,
                correlation_id: 1,
                client_id: Some("client".into()),
            },
            replica_id: -1,
            max_wait_time: 1000,
            min_bytes: 1,
            topics: vec![FetchTopic {
                             topic_name: "t".to_owned(),
                             partitions: vec![FetchPartition {
                                                  partition: 0,
                                                  fetch_offset: 10,
                                                  max_bytes: 1024,
                                              }],
                         }],
        };

        let mut buf = BytesMut::with_capacity(128);

        req.encode::<BigEndian>(&mut buf).unwrap();

        assert!(buf.len() > 0);
    }
}
