#![recursion_limit="128"]

#![cfg_attr(feature="clippy", feature(plugin))]
#![cfg_attr(feature="clippy", plugin(clippy))]

#![allow(dead_code)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
extern crate bytes;
#[macro_use]
extern crate nom;
extern crate crc;
extern crate time;
extern crate rand;
extern crate serde;
#[macro_use]
extern crate serde_derive;

extern crate futures;
extern crate tokio_core;
extern crate tokio_io;
extern crate tokio_service;
extern crate tokio_timer;

#[cfg(test)]
extern crate pretty_env_logger;

#[macro_use]
pub mod errors;
#[macro_use]
mod protocol;
mod network;
mod client;
mod consumer;

pub mod consts {
    pub use client::{DEFAULT_MAX_CONNECTION_IDLE_TIMEOUT_MILLIS, DEFAULT_METADATA_MAX_AGE_MILLS,
                     DEFAULT_REQUEST_TIMEOUT_MILLS};
    pub use consumer::{DEFAULT_AUTO_COMMIT_INTERVAL_MILLIS, DEFAULT_FETCH_MAX_WAIT_MILLIS,
                       DEFAULT_FETCH_MIN_BYTES, DEFAULT_HEARTBEAT_INTERVAL_MILLIS,
                       DEFAULT_MAX_POLL_RECORDS, DEFAULT_OFFSET_RETENTION_MILLIS,
                       DEFAULT_REBALANCE_TIMEOUT_MILLIS, DEFAULT_RETRY_BACKOFF_MILLIS,
                       DEFAULT_SESSION_TIMEOUT_MILLIS};
}

pub use errors::{Error, ErrorKind};
pub use protocol::{FetchOffset, PartitionId, RequiredAcks};
pub use network::{FetchRecords, TopicPartition};
pub use client::{Broker, BrokerRef, Client, ClientBuilder, ClientConfig, Cluster, KafkaClient,
                 KafkaVersion, Metadata, PartitionOffset, StaticBoxFuture};
pub use consumer::{AutoOffsetReset, Consumer, ConsumerBuilder, ConsumerConfig, KafkaConsumer,
                   PartitionAssignor, RangeAssignor};
