use std::net::SocketAddr;

use tokio_core::reactor::Handle;

use client::{ClientConfig, KafkaClient, KafkaVersion};

/// Builds a `ClientConfig` and hands it to `KafkaClient::from_config`,
/// mirroring the teacher's `ClientBuilder`.
pub struct ClientBuilder<'a> {
    config: ClientConfig,
    handle: Handle,
    _marker: ::std::marker::PhantomData<&'a ()>,
}

impl<'a> ClientBuilder<'a> {
    pub fn from_hosts<I>(hosts: I, handle: Handle) -> Self
        where I: Iterator<Item = SocketAddr>
    {
        ClientBuilder {
            config: ClientConfig::new(hosts),
            handle: handle,
            _marker: ::std::marker::PhantomData,
        }
    }

    pub fn with_client_id(mut self, client_id: String) -> Self {
        self.config.client_id = Some(client_id);
        self
    }

    pub fn with_request_timeout(mut self, millis: u64) -> Self {
        self.config.request_timeout = millis;
        self
    }

    pub fn with_api_version_request(mut self, enabled: bool) -> Self {
        self.config.api_version_request = enabled;
        self
    }

    pub fn with_broker_version_fallback(mut self, version: KafkaVersion) -> Self {
        self.config.broker_version_fallback = version;
        self
    }

    pub fn build(self) -> KafkaClient<'a> {
        KafkaClient::from_config(self.config, self.handle)
    }
}
