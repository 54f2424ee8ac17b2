use std::time::Duration;

use consumer::AssignmentStrategy;
use protocol::FetchOffset;

pub const DEFAULT_SESSION_TIMEOUT_MILLIS: u64 = 30_000;
pub const DEFAULT_REBALANCE_TIMEOUT_MILLIS: u64 = 60_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_MILLIS: u64 = 3_000;
pub const DEFAULT_RETRY_BACKOFF_MILLIS: u64 = 100;
pub const DEFAULT_AUTO_COMMIT_INTERVAL_MILLIS: u64 = 5_000;
pub const DEFAULT_FETCH_MAX_WAIT_MILLIS: u64 = 500;
pub const DEFAULT_FETCH_MIN_BYTES: i32 = 1;
pub const DEFAULT_MAX_POLL_RECORDS: usize = 500;
/// `OFFSET_RETENTION_MS` default (spec.md §6), passed through as
/// `OffsetCommit`'s `retention_time` field. `-1` defers to the broker's own
/// `offsets.retention.minutes` instead of overriding it per-request.
pub const DEFAULT_OFFSET_RETENTION_MILLIS: i64 = -1;

/// `AUTO_OFFSET_RESET` (spec.md §4.5.2): what a newly assigned partition
/// with no known stored offset resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoOffsetReset {
    Earliest,
    Latest,
    /// Don't guess; surface the missing position as an error instead.
    None,
}

impl AutoOffsetReset {
    pub fn to_fetch_offset(&self) -> Option<FetchOffset> {
        match *self {
            AutoOffsetReset::Earliest => Some(FetchOffset::Earliest),
            AutoOffsetReset::Latest => Some(FetchOffset::Latest),
            AutoOffsetReset::None => None,
        }
    }
}

impl Default for AutoOffsetReset {
    fn default() -> Self {
        AutoOffsetReset::Latest
    }
}

/// Everything the Consumer Core needs beyond the Wire Client's connection
/// settings (spec.md §6): group membership timing, auto-commit cadence,
/// and fetch sizing.
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    pub group_id: String,
    pub assignment_strategy: AssignmentStrategy,
    pub session_timeout: u64,
    pub rebalance_timeout: u64,
    pub heartbeat_interval: u64,
    pub retry_backoff: u64,
    pub enable_auto_commit: bool,
    pub auto_commit_interval: u64,
    pub auto_offset_reset: AutoOffsetReset,
    pub fetch_max_wait: u64,
    pub fetch_min_bytes: i32,
    pub max_poll_records: usize,
    pub offset_retention: i64,
}

impl ConsumerConfig {
    pub fn new<S: Into<String>>(group_id: S) -> Self {
        ConsumerConfig {
            group_id: group_id.into(),
            assignment_strategy: AssignmentStrategy::default(),
            session_timeout: DEFAULT_SESSION_TIMEOUT_MILLIS,
            rebalance_timeout: DEFAULT_REBALANCE_TIMEOUT_MILLIS,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL_MILLIS,
            retry_backoff: DEFAULT_RETRY_BACKOFF_MILLIS,
            enable_auto_commit: true,
            auto_commit_interval: DEFAULT_AUTO_COMMIT_INTERVAL_MILLIS,
            auto_offset_reset: AutoOffsetReset::default(),
            fetch_max_wait: DEFAULT_FETCH_MAX_WAIT_MILLIS,
            fetch_min_bytes: DEFAULT_FETCH_MIN_BYTES,
            max_poll_records: DEFAULT_MAX_POLL_RECORDS,
            offset_retention: DEFAULT_OFFSET_RETENTION_MILLIS,
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout)
    }

    pub fn rebalance_timeout(&self) -> Duration {
        Duration::from_millis(self.rebalance_timeout)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff)
    }

    pub fn auto_commit_interval(&self) -> Duration {
        Duration::from_millis(self.auto_commit_interval)
    }

    pub fn fetch_max_wait(&self) -> Duration {
        Duration::from_millis(self.fetch_max_wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConsumerConfig::new("my-group");

        assert_eq!(config.group_id, "my-group");
        assert_eq!(config.assignment_strategy, AssignmentStrategy::Range);
        assert!(config.enable_auto_commit);
        assert_eq!(config.auto_offset_reset, AutoOffsetReset::Latest);
    }

    #[test]
    fn test_auto_offset_reset_to_fetch_offset() {
        assert_eq!(AutoOffsetReset::Earliest.to_fetch_offset(), Some(FetchOffset::Earliest));
        assert_eq!(AutoOffsetReset::Latest.to_fetch_offset(), Some(FetchOffset::Latest));
        assert_eq!(AutoOffsetReset::None.to_fetch_offset(), None);
    }
}
