mod version;
mod config;
mod cluster;
mod metadata;
mod service;
mod middleware;
mod client;
mod builder;

pub use self::version::KafkaVersion;
pub use self::config::{ClientConfig, DEFAULT_MAX_CONNECTION_IDLE_TIMEOUT_MILLIS,
                       DEFAULT_METADATA_MAX_AGE_MILLS, DEFAULT_REQUEST_TIMEOUT_MILLS};
pub use self::cluster::{Broker, BrokerRef, Cluster, PartitionInfo};
pub use self::metadata::{Metadata, TopicPartitions, UsableApiVersions};
pub use self::service::{FutureResponse, KafkaService};
pub use self::middleware::InFlightMiddleware;
pub use self::client::{Client, CommitOffsets, ConsumerGroup, ConsumerGroupAssignment,
                       ConsumerGroupMember, ConsumerGroupProtocol, FetchGroupOffsets,
                       FetchOffsets, FetchRecordsFuture, Generation, GroupCoordinator, Heartbeat,
                       JoinGroup, KafkaClient, LeaveGroup, LoadMetadata, PartitionOffset,
                       StaticBoxFuture, SyncGroup, ToStaticBoxFuture};
pub use self::builder::ClientBuilder;
