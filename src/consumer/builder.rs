//! Builds a `ConsumerConfig`/`ClientConfig` pair and an owned reactor
//! `Core`, and hands them to `KafkaConsumer::from_config`, mirroring the
//! teacher's `client::ClientBuilder`.

use std::net::SocketAddr;

use tokio_core::reactor::Core;

use client::{ClientConfig, KafkaVersion};
use consumer::{AssignmentStrategy, AutoOffsetReset, ConsumerConfig, KafkaConsumer,
               PartitionAssignor, RangeAssignor};
use errors::Result;

/// Builds a `KafkaConsumer` (spec.md §6 configuration table). Every
/// `with_*` method mutates and returns `self`, the same fluent style as
/// `ClientBuilder`.
pub struct ConsumerBuilder {
    client_config: ClientConfig,
    consumer_config: ConsumerConfig,
    assignors: Vec<Box<PartitionAssignor>>,
}

impl ConsumerBuilder {
    pub fn from_hosts<I, S>(hosts: I, group_id: S) -> Self
        where I: Iterator<Item = SocketAddr>,
              S: Into<String>
    {
        ConsumerBuilder {
            client_config: ClientConfig::new(hosts),
            consumer_config: ConsumerConfig::new(group_id),
            assignors: vec![Box::new(RangeAssignor::default())],
        }
    }

    pub fn with_client_id(mut self, client_id: String) -> Self {
        self.client_config.client_id = Some(client_id);
        self
    }

    pub fn with_request_timeout(mut self, millis: u64) -> Self {
        self.client_config.request_timeout = millis;
        self
    }

    pub fn with_api_version_request(mut self, enabled: bool) -> Self {
        self.client_config.api_version_request = enabled;
        self
    }

    pub fn with_broker_version_fallback(mut self, version: KafkaVersion) -> Self {
        self.client_config.broker_version_fallback = version;
        self
    }

    pub fn with_assignment_strategy(mut self, strategy: AssignmentStrategy) -> Self {
        self.consumer_config.assignment_strategy = strategy;
        self
    }

    /// Replaces the default `RangeAssignor` with the given assignors, in
    /// preference order (spec.md §4.4: the protocol a member offers the
    /// group is the first entry whose name the group leader also
    /// supports).
    pub fn with_assignors(mut self, assignors: Vec<Box<PartitionAssignor>>) -> Self {
        self.assignors = assignors;
        self
    }

    pub fn with_session_timeout(mut self, millis: u64) -> Self {
        self.consumer_config.session_timeout = millis;
        self
    }

    pub fn with_rebalance_timeout(mut self, millis: u64) -> Self {
        self.consumer_config.rebalance_timeout = millis;
        self
    }

    pub fn with_heartbeat_interval(mut self, millis: u64) -> Self {
        self.consumer_config.heartbeat_interval = millis;
        self
    }

    pub fn with_retry_backoff(mut self, millis: u64) -> Self {
        self.consumer_config.retry_backoff = millis;
        self
    }

    pub fn with_enable_auto_commit(mut self, enabled: bool) -> Self {
        self.consumer_config.enable_auto_commit = enabled;
        self
    }

    pub fn with_auto_commit_interval(mut self, millis: u64) -> Self {
        self.consumer_config.auto_commit_interval = millis;
        self
    }

    pub fn with_auto_offset_reset(mut self, reset: AutoOffsetReset) -> Self {
        self.consumer_config.auto_offset_reset = reset;
        self
    }

    pub fn with_fetch_max_wait(mut self, millis: u64) -> Self {
        self.consumer_config.fetch_max_wait = millis;
        self
    }

    pub fn with_fetch_min_bytes(mut self, bytes: i32) -> Self {
        self.consumer_config.fetch_min_bytes = bytes;
        self
    }

    pub fn with_max_poll_records(mut self, max: usize) -> Self {
        self.consumer_config.max_poll_records = max;
        self
    }

    /// Spins up the owned reactor `Core` the consumer will block on for
    /// every RPC (spec.md §5) and builds the `KafkaConsumer`.
    pub fn build<'a>(self) -> Result<KafkaConsumer<'a>> {
        let core = Core::new()?;

        Ok(KafkaConsumer::from_config(self.client_config, self.consumer_config, self.assignors, core))
    }
}

