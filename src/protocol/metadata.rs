use bytes::{BufMut, ByteOrder, BytesMut};
use nom::{be_i16, be_i32};

use errors::Result;
use protocol::{Encodable, ErrorCode, ParseTag, PartitionId, RequestHeader, ResponseHeader,
               WriteExt, array_len_ok, parse_response_header, parse_string};

/// `Metadata => [topics]` (api key 3, v2 — spec.md §6).
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataRequest<'a> {
    pub header: RequestHeader<'a>,
    pub topics: Vec<String>,
}

impl<'a> Encodable for MetadataRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        dst.put_array::<T, _, _>(self.topics, |buf, topic| buf.put_str::<T, _>(Some(topic)))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetadataResponse {
    pub header: ResponseHeader,
    pub brokers: Vec<BrokerMetadata>,
    pub topics: Vec<TopicMetadata>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrokerMetadata {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicMetadata {
    pub error_code: ErrorCode,
    pub topic_name: String,
    pub partitions: Vec<PartitionMetadata>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PartitionMetadata {
    pub error_code: ErrorCode,
    pub partition_id: PartitionId,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

named!(pub parse_metadata_response<MetadataResponse>,
    parse_tag!(ParseTag::Metadata,
        do_parse!(
            header: parse_response_header
         >> brokers: parse_tag!(ParseTag::MetadataBrokers,
                length_count!(verify!(be_i32, array_len_ok), parse_broker_metadata))
         >> topics: parse_tag!(ParseTag::MetadataTopics,
                length_count!(verify!(be_i32, array_len_ok), parse_topic_metadata))
         >> (MetadataResponse {
                header: header,
                brokers: brokers,
                topics: topics,
            })
        )
    )
);

named!(parse_broker_metadata<BrokerMetadata>,
    do_parse!(
        node_id: be_i32
     >> host: parse_string
     >> port: be_i32
     >> (BrokerMetadata { node_id: node_id, host: host, port: port })
    )
);

named!(parse_topic_metadata<TopicMetadata>,
    do_parse!(
        error_code: be_i16
     >> topic_name: parse_string
     >> partitions: parse_tag!(ParseTag::MetadataPartitions,
            length_count!(verify!(be_i32, array_len_ok), parse_partition_metadata))
     >> (TopicMetadata {
            error_code: error_code,
            topic_name: topic_name,
            partitions: partitions,
        })
    )
);

named!(parse_partition_metadata<PartitionMetadata>,
    do_parse!(
        error_code: be_i16
     >> partition_id: be_i32
     >> leader: be_i32
     >> replicas: length_count!(verify!(be_i32, array_len_ok), be_i32)
     >> isr: length_count!(verify!(be_i32, array_len_ok), be_i32)
     >> (PartitionMetadata {
            error_code: error_code,
            partition_id: partition_id,
            leader: leader,
            replicas: replicas,
            isr: isr,
        })
    )
);

#[cfg(test)]
mod tests {
    use bytes::{BigEndian, BytesMut};
    use nom::IResult;

    use super::*;
    use protocol::*;

    #[test]
    fn test_encode_metadata_request() {
        let req = MetadataRequest {
            header: RequestHeader {
                api_key: ApiKeys::Metadata as ApiKey,
                api_version: 2,
                correlation_id: 1,
                client_id: Some("client".into()),
            },
            topics: vec!["my-topic".to_owned()],
        };

        let mut buf = BytesMut::with_capacity(128);

        req.encode::<BigEndian>(&mut buf).unwrap();

        assert!(buf.len() > 0);
    }

    #[test]
    fn test_parse_metadata_response() {
        let data: Vec<u8> = vec![
            0, 0, 0, 7, // correlation_id
            0, 0, 0, 1, // brokers len
                0, 0, 0, 1, // node_id
                0, 9, 108, 111, 99, 97, 108, 104, 111, 115, 116, // host "localhost"
                0, 0, 35, 132, // port 9092
            0, 0, 0, 1, // topics len
                0, 0, // error_code
                0, 2, 116, 49, // topic_name "t1"
                0, 0, 0, 1, // partitions len
                    0, 0, // error_code
                    0, 0, 0, 0, // partition_id
                    0, 0, 0, 1, // leader
                    0, 0, 0, 1, 0, 0, 0, 1, // replicas [1]
                    0, 0, 0, 1, 0, 0, 0, 1, // isr [1]
        ];

        match parse_metadata_response(&data[..]) {
            IResult::Done(rest, resp) => {
                assert!(rest.is_empty());
                assert_eq!(resp.brokers.len(), 1);
                assert_eq!(resp.brokers[0].host, "localhost");
                assert_eq!(resp.topics[0].topic_name, "t1");
                assert_eq!(resp.topics[0].partitions[0].leader, 1);
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }
}
