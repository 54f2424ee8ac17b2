use std::net::SocketAddr;

use protocol::{ApiKey, ApiVersion, PartitionId};

/// A lightweight, `Copy` handle into a `Metadata`'s broker table. Kept
/// distinct from `Broker` itself so cached partition metadata can reference
/// a broker without an `Rc` back-pointer into the table that owns it
/// (spec.md §9, "no cyclic ownership").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BrokerRef(pub usize);

/// A known cluster member: its broker id, network address, and (once
/// discovered) the highest request version it supports per API.
#[derive(Clone, Debug, PartialEq)]
pub struct Broker {
    id: i32,
    host: String,
    port: u16,
    api_versions: Vec<(ApiKey, ApiVersion)>,
}

impl Broker {
    pub fn new(id: i32, host: &str, port: u16) -> Self {
        Broker {
            id: id,
            host: host.to_owned(),
            port: port,
            api_versions: Vec::new(),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("broker address")
    }

    pub fn with_api_versions(mut self, api_versions: Vec<(ApiKey, ApiVersion)>) -> Self {
        self.api_versions = api_versions;
        self
    }

    /// The highest request version this broker has advertised support for
    /// a given API, if it has been discovered (`ApiVersions` RPC or the
    /// configured fallback).
    pub fn api_version(&self, api_key: ApiKey) -> Option<ApiVersion> {
        self.api_versions
            .iter()
            .find(|&&(key, _)| key == api_key)
            .map(|&(_, version)| version)
    }
}

/// A partition's cached leadership, as reported by the last `Metadata`
/// response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionInfo {
    pub partition: PartitionId,
    pub leader: BrokerRef,
}

/// Read-only view over the cached cluster state the Wire Client and
/// Consumer Core consult to route a request (spec.md §4.3).
pub trait Cluster {
    fn brokers(&self) -> &[Broker];

    fn find_broker(&self, broker_ref: BrokerRef) -> Option<&Broker>;

    fn partitions_for_topic(&self, topic_name: &str) -> &[PartitionInfo];

    fn leader_for(&self, topic_name: &str, partition: PartitionId) -> Option<&Broker>;
}
