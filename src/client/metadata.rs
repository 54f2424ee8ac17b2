use std::collections::HashMap;

use protocol::{ApiKey, ApiVersion, KafkaCode, MetadataResponse, PartitionId, SupportedApiVersion};
use client::cluster::{Broker, BrokerRef, Cluster, PartitionInfo};

/// The cluster view the Wire Client refreshes wholesale on every `Metadata`
/// request and hands out as `Rc<Metadata>` to every in-flight RPC so they
/// all see a consistent snapshot (spec.md §4.3).
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    brokers: Vec<Broker>,
    topics: HashMap<String, TopicPartitions>,
}

/// A topic's partitions as reported by the last `Metadata` response, minus
/// any partitions currently in a leader election (`error_code !=
/// UnknownTopicOrPartition`/`LeaderNotAvailable` are kept; the rest are
/// dropped until the next refresh).
#[derive(Clone, Debug, Default)]
pub struct TopicPartitions {
    pub partitions: Vec<PartitionInfo>,
}

impl Metadata {
    pub fn with_fallback_api_versions(&self, api_versions: UsableApiVersions) -> Self {
        let brokers = self.brokers
            .iter()
            .cloned()
            .map(|b| b.with_api_versions(api_versions.0.clone()))
            .collect();

        Metadata { brokers: brokers, topics: self.topics.clone() }
    }

    pub fn with_api_versions(&self, per_broker: HashMap<BrokerRef, UsableApiVersions>) -> Self {
        let brokers = self.brokers
            .iter()
            .enumerate()
            .map(|(idx, b)| {
                     let api_versions = per_broker
                         .get(&BrokerRef(idx))
                         .cloned()
                         .unwrap_or_default();

                     b.clone().with_api_versions(api_versions.0)
                 })
            .collect();

        Metadata { brokers: brokers, topics: self.topics.clone() }
    }
}

impl Cluster for Metadata {
    fn brokers(&self) -> &[Broker] {
        &self.brokers
    }

    fn find_broker(&self, broker_ref: BrokerRef) -> Option<&Broker> {
        self.brokers.get(broker_ref.0)
    }

    fn partitions_for_topic(&self, topic_name: &str) -> &[PartitionInfo] {
        self.topics
            .get(topic_name)
            .map(|tp| tp.partitions.as_slice())
            .unwrap_or(&[])
    }

    fn leader_for(&self, topic_name: &str, partition: PartitionId) -> Option<&Broker> {
        self.partitions_for_topic(topic_name)
            .iter()
            .find(|p| p.partition == partition)
            .and_then(|p| self.find_broker(p.leader))
    }
}

impl From<MetadataResponse> for Metadata {
    fn from(resp: MetadataResponse) -> Self {
        let brokers: Vec<Broker> = resp.brokers
            .iter()
            .map(|b| Broker::new(b.node_id, &b.host, b.port as u16))
            .collect();

        let broker_ref_for = |node_id: i32| -> Option<BrokerRef> {
            brokers
                .iter()
                .position(|b| b.id() == node_id)
                .map(BrokerRef)
        };

        let topics = resp.topics
            .into_iter()
            .filter(|t| t.error_code == KafkaCode::None as i16)
            .map(|t| {
                let partitions = t.partitions
                    .iter()
                    .filter(|p| p.error_code == KafkaCode::None as i16)
                    .filter_map(|p| {
                        broker_ref_for(p.leader)
                            .map(|leader| {
                                     PartitionInfo {
                                         partition: p.partition_id,
                                         leader: leader,
                                     }
                                 })
                    })
                    .collect();

                (t.topic_name, TopicPartitions { partitions: partitions })
            })
            .collect();

        Metadata { brokers: brokers, topics: topics }
    }
}

/// The API versions a single broker reported via `ApiVersions`, keyed by
/// `ApiKey`.
#[derive(Clone, Debug, Default)]
pub struct UsableApiVersions(pub Vec<(ApiKey, ApiVersion)>);

impl UsableApiVersions {
    pub fn new(api_versions: Vec<SupportedApiVersion>) -> Self {
        UsableApiVersions(api_versions
                               .into_iter()
                               .map(|v| (v.api_key, v.max_version))
                               .collect())
    }
}

