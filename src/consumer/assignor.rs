//! Partition assignment strategies (spec.md §4.4): turning the set of
//! topics each group member subscribed to into a per-member partition
//! assignment, carried as opaque bytes inside `JoinGroup`/`SyncGroup`.

use std::collections::HashMap;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};

use nom::{IResult, be_i16, be_i32};

use errors::{ErrorKind, Result};
use protocol::{PartitionId, Schema, SchemaByteOrder, WriteExt, array_len_ok, parse_bytes,
               parse_string};
use client::Cluster;
use network::TopicPartition;
use consumer::protocol::ConsumerProtocol;

/// The partition assignment algorithms this crate can select via
/// `ConsumerConfig::assignment_strategy` and offer as the `protocol_name`
/// of a `JoinGroup` protocol entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignmentStrategy {
    /// Contiguous partition ranges per topic, handed to subscribers sorted
    /// by member id. The only strategy this crate guarantees to offer.
    Range,
}

impl AssignmentStrategy {
    pub fn name(&self) -> &'static str {
        match *self {
            AssignmentStrategy::Range => "range",
        }
    }
}

impl Default for AssignmentStrategy {
    fn default() -> Self {
        AssignmentStrategy::Range
    }
}

impl FromStr for AssignmentStrategy {
    type Err = ::errors::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "range" => Ok(AssignmentStrategy::Range),
            _ => bail!(ErrorKind::UnsupportedAssignmentStrategy(s.to_owned())),
        }
    }
}

/// The topics a member subscribed to, serialized as the `metadata` bytes
/// of its `JoinGroup` protocol entry (spec.md §6: `version, [topics],
/// user_data`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subscription {
    pub version: i16,
    pub topics: Vec<String>,
    pub user_data: Option<Bytes>,
}

impl Schema for Subscription {
    fn encode_to(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_i16::<SchemaByteOrder>(self.version);
        buf.put_array::<SchemaByteOrder, _, _>(self.topics.clone(),
                                               |buf, topic| buf.put_str::<SchemaByteOrder, _>(Some(topic)))?;
        buf.put_bytes::<SchemaByteOrder, _>(self.user_data.clone())
    }

    fn decode_from(buf: &[u8]) -> Result<Self> {
        match parse_subscription(buf) {
            IResult::Done(_, subscription) => Ok(subscription),
            _ => Err(ErrorKind::CodecError("subscription").into()),
        }
    }
}

named!(parse_subscription<Subscription>,
    do_parse!(
        version: be_i16
     >> topics: length_count!(verify!(be_i32, array_len_ok), parse_string)
     >> user_data: parse_bytes
     >> (Subscription { version: version, topics: topics, user_data: user_data })
    )
);

/// The partitions assigned to a single member, serialized as the
/// `member_assignment` bytes of a `SyncGroup` response (spec.md §6:
/// `version, [(topic, [partition])], user_data`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assignment {
    pub version: i16,
    pub partitions: Vec<TopicPartition<'static>>,
    pub user_data: Option<Bytes>,
}

impl Schema for Assignment {
    fn encode_to(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_i16::<SchemaByteOrder>(self.version);

        let mut by_topic: Vec<(String, Vec<PartitionId>)> = Vec::new();

        for tp in &self.partitions {
            match by_topic.iter_mut().find(|&&mut (ref topic, _)| topic.as_str() == tp.topic_name.as_ref()) {
                Some(&mut (_, ref mut partitions)) => {
                    partitions.push(tp.partition);
                    continue;
                }
                None => {}
            }

            by_topic.push((tp.topic_name.clone().into_owned(), vec![tp.partition]));
        }

        buf.put_array::<SchemaByteOrder, _, _>(by_topic, |buf, (topic_name, partitions)| {
            buf.put_str::<SchemaByteOrder, _>(Some(topic_name))?;
            buf.put_array::<SchemaByteOrder, _, _>(partitions, |buf, partition| {
                buf.put_i32::<SchemaByteOrder>(partition);
                Ok(())
            })
        })?;

        buf.put_bytes::<SchemaByteOrder, _>(self.user_data.clone())
    }

    fn decode_from(buf: &[u8]) -> Result<Self> {
        match parse_assignment(buf) {
            IResult::Done(_, assignment) => Ok(assignment),
            _ => Err(ErrorKind::CodecError("assignment").into()),
        }
    }
}

named!(parse_assignment_topic<(String, Vec<PartitionId>)>,
    do_parse!(
        topic_name: parse_string
     >> partitions: length_count!(verify!(be_i32, array_len_ok), be_i32)
     >> (topic_name, partitions)
    )
);

named!(parse_assignment<Assignment>,
    do_parse!(
        version: be_i16
     >> topics: length_count!(verify!(be_i32, array_len_ok), parse_assignment_topic)
     >> user_data: parse_bytes
     >> (Assignment {
            version: version,
            partitions: topics.into_iter()
                .flat_map(|(topic_name, partitions)| {
                    partitions.into_iter()
                        .map(move |partition| TopicPartition::new(topic_name.clone(), partition).into_owned())
                })
                .collect(),
            user_data: user_data,
        })
    )
);

/// Computes a per-member `Assignment` from every member's declared
/// `Subscription` and the cluster's current partition layout (spec.md
/// §4.4). Implementations must be deterministic given the same cluster
/// view and member set, and must cover every partition of every
/// subscribed topic exactly once.
pub trait PartitionAssignor {
    fn name(&self) -> &'static str;

    fn strategy(&self) -> AssignmentStrategy;

    fn subscription(&self, topics: Vec<String>) -> Subscription {
        Subscription {
            version: ConsumerProtocol::VERSION,
            topics: topics,
            user_data: None,
        }
    }

    fn assign(&self, cluster: &Cluster, subscriptions: HashMap<String, Subscription>) -> HashMap<String, Assignment>;
}

/// The mandatory `range` strategy: for each subscribed topic, sort the
/// subscribing members by member id and hand out contiguous partition
/// ranges, distributing any remainder to the first members in that order.
#[derive(Clone, Copy, Debug, Default)]
pub struct RangeAssignor;

impl PartitionAssignor for RangeAssignor {
    fn name(&self) -> &'static str {
        "range"
    }

    fn strategy(&self) -> AssignmentStrategy {
        AssignmentStrategy::Range
    }

    fn assign(&self, cluster: &Cluster, subscriptions: HashMap<String, Subscription>) -> HashMap<String, Assignment> {
        let mut members_by_topic: HashMap<String, Vec<String>> = HashMap::new();

        for (member_id, subscription) in &subscriptions {
            for topic in &subscription.topics {
                members_by_topic
                    .entry(topic.clone())
                    .or_insert_with(Vec::new)
                    .push(member_id.clone());
            }
        }

        let mut assignments: HashMap<String, Assignment> = subscriptions
            .keys()
            .map(|member_id| {
                (member_id.clone(),
                 Assignment {
                     version: ConsumerProtocol::VERSION,
                     partitions: Vec::new(),
                     user_data: None,
                 })
            })
            .collect();

        for (topic, mut members) in members_by_topic {
            members.sort();

            let mut partitions: Vec<PartitionId> = cluster
                .partitions_for_topic(&topic)
                .iter()
                .map(|partition| partition.partition)
                .collect();

            if partitions.is_empty() || members.is_empty() {
                continue;
            }

            partitions.sort();

            let partitions_per_member = partitions.len() / members.len();
            let members_with_extra = partitions.len() % members.len();

            let mut start = 0;

            for (idx, member_id) in members.iter().enumerate() {
                let count = partitions_per_member + if idx < members_with_extra { 1 } else { 0 };
                let end = start + count;

                if let Some(assignment) = assignments.get_mut(member_id) {
                    assignment.partitions
                        .extend(partitions[start..end]
                                    .iter()
                                    .map(|&partition| TopicPartition::new(topic.clone(), partition)));
                }

                start = end;
            }
        }

        assignments
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BigEndian, BytesMut};

    use client::{Broker, BrokerRef, PartitionInfo};

    use super::*;

    struct FakeCluster {
        partitions: Vec<PartitionInfo>,
        empty: Vec<PartitionInfo>,
    }

    impl Cluster for FakeCluster {
        fn brokers(&self) -> &[Broker] {
            &[]
        }

        fn find_broker(&self, _broker_ref: BrokerRef) -> Option<&Broker> {
            None
        }

        fn partitions_for_topic(&self, topic_name: &str) -> &[PartitionInfo] {
            if topic_name == "my-topic" {
                &self.partitions
            } else {
                &self.empty
            }
        }

        fn leader_for(&self, _topic_name: &str, _partition: PartitionId) -> Option<&Broker> {
            None
        }
    }

    #[test]
    fn test_subscription_roundtrip() {
        let subscription = Subscription {
            version: 0,
            topics: vec!["foo".to_owned(), "bar".to_owned()],
            user_data: None,
        };

        let mut buf = BytesMut::with_capacity(64);

        subscription.encode_to(&mut buf).unwrap();

        let decoded = Subscription::decode_from(&buf[..]).unwrap();

        assert_eq!(decoded, subscription);
    }

    #[test]
    fn test_assignment_roundtrip() {
        let assignment = Assignment {
            version: 0,
            partitions: vec![TopicPartition::new("foo".to_owned(), 0),
                             TopicPartition::new("foo".to_owned(), 1)],
            user_data: None,
        };

        let mut buf = BytesMut::with_capacity(64);

        assignment.encode_to(&mut buf).unwrap();

        let decoded = Assignment::decode_from(&buf[..]).unwrap();

        assert_eq!(decoded, assignment);
    }

    #[test]
    fn test_range_assignor_even_split() {
        let cluster = FakeCluster {
            partitions: vec![PartitionInfo { partition: 0, leader: BrokerRef(0) },
                             PartitionInfo { partition: 1, leader: BrokerRef(0) },
                             PartitionInfo { partition: 2, leader: BrokerRef(0) },
                             PartitionInfo { partition: 3, leader: BrokerRef(0) }],
            empty: vec![],
        };

        let mut subscriptions = HashMap::new();

        subscriptions.insert("m1".to_owned(),
                             Subscription { version: 0, topics: vec!["my-topic".to_owned()], user_data: None });
        subscriptions.insert("m2".to_owned(),
                             Subscription { version: 0, topics: vec!["my-topic".to_owned()], user_data: None });

        let assignor = RangeAssignor;
        let assignment = assignor.assign(&cluster, subscriptions);

        assert_eq!(assignment["m1"].partitions.len(), 2);
        assert_eq!(assignment["m2"].partitions.len(), 2);

        let mut all: Vec<PartitionId> = assignment
            .values()
            .flat_map(|a| a.partitions.iter().map(|tp| tp.partition))
            .collect();
        all.sort();

        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_range_assignor_uneven_split_favors_lexicographic_order() {
        let cluster = FakeCluster {
            partitions: vec![PartitionInfo { partition: 0, leader: BrokerRef(0) },
                             PartitionInfo { partition: 1, leader: BrokerRef(0) },
                             PartitionInfo { partition: 2, leader: BrokerRef(0) }],
            empty: vec![],
        };

        let mut subscriptions = HashMap::new();

        subscriptions.insert("m1".to_owned(),
                             Subscription { version: 0, topics: vec!["my-topic".to_owned()], user_data: None });
        subscriptions.insert("m2".to_owned(),
                             Subscription { version: 0, topics: vec!["my-topic".to_owned()], user_data: None });

        let assignor = RangeAssignor;
        let assignment = assignor.assign(&cluster, subscriptions);

        assert_eq!(assignment["m1"].partitions.len(), 2);
        assert_eq!(assignment["m2"].partitions.len(), 1);
    }
}
