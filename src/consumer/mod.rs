mod config;
mod protocol;
mod assignor;
mod subscriptions;
mod fetcher;
mod coordinator;
mod consumer;
mod builder;

pub use self::config::{AutoOffsetReset, ConsumerConfig, DEFAULT_AUTO_COMMIT_INTERVAL_MILLIS,
                       DEFAULT_FETCH_MAX_WAIT_MILLIS, DEFAULT_FETCH_MIN_BYTES,
                       DEFAULT_HEARTBEAT_INTERVAL_MILLIS, DEFAULT_MAX_POLL_RECORDS,
                       DEFAULT_OFFSET_RETENTION_MILLIS, DEFAULT_REBALANCE_TIMEOUT_MILLIS,
                       DEFAULT_RETRY_BACKOFF_MILLIS, DEFAULT_SESSION_TIMEOUT_MILLIS};
pub use self::protocol::{CONSUMER_PROTOCOL, ConsumerProtocol};
pub use self::assignor::{Assignment, AssignmentStrategy, PartitionAssignor, RangeAssignor,
                         Subscription};
pub use self::subscriptions::Subscriptions;
pub use self::fetcher::Fetcher;
pub use self::coordinator::{ConsumerCoordinator, Coordinator};
pub use self::consumer::{Consumer, KafkaConsumer};
pub use self::builder::ConsumerBuilder;
