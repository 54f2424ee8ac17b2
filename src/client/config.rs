use std::net::SocketAddr;
use std::time::Duration;

use tokio_timer::Timer;

use client::KafkaVersion;

pub const DEFAULT_REQUEST_TIMEOUT_MILLS: u64 = 30_000;
pub const DEFAULT_METADATA_MAX_AGE_MILLS: u64 = 300_000;
pub const DEFAULT_MAX_CONNECTION_IDLE_TIMEOUT_MILLIS: u64 = 600_000;

/// Everything the Wire Client needs that isn't specific to a single group
/// membership (spec.md §6's client-level configuration table). Group
/// membership settings (`group_id`, session/rebalance timeouts, auto-commit)
/// live on `consumer::ConsumerConfig` instead, matching the teacher's split
/// between `ClientConfig` and `ConsumerConfig`.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Bootstrap broker addresses.
    pub hosts: Vec<SocketAddr>,
    pub client_id: Option<String>,
    /// How long a single RPC may remain in flight before it is canceled.
    pub request_timeout: u64,
    /// How long cached cluster metadata may be reused before a refresh is
    /// forced.
    pub metadata_max_age: u64,
    pub max_connection_idle: u64,
    /// Query every broker for its supported API versions up front rather
    /// than assuming `broker_version_fallback`.
    pub api_version_request: bool,
    pub broker_version_fallback: KafkaVersion,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            hosts: Vec::new(),
            client_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_MILLS,
            metadata_max_age: DEFAULT_METADATA_MAX_AGE_MILLS,
            max_connection_idle: DEFAULT_MAX_CONNECTION_IDLE_TIMEOUT_MILLIS,
            api_version_request: true,
            broker_version_fallback: KafkaVersion::default(),
        }
    }
}

impl ClientConfig {
    pub fn new<I>(hosts: I) -> Self
        where I: IntoIterator<Item = SocketAddr>
    {
        ClientConfig { hosts: hosts.into_iter().collect(), ..Default::default() }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    pub fn metadata_max_age(&self) -> Duration {
        Duration::from_millis(self.metadata_max_age)
    }

    pub fn max_connection_idle(&self) -> Duration {
        Duration::from_millis(self.max_connection_idle)
    }

    pub fn timer(&self) -> Timer {
        Timer::default()
    }
}
