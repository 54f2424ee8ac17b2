//! The Consumer Core: a blocking facade over the Wire Client and the group
//! coordinator that implements the public surface spec.md §4.5 describes
//! (`subscribe`, `assign`, `poll`, `commitSync`, `seek*`, `pause`/`resume`,
//! `close`).
//!
//! Every method drives its futures to completion on an owned
//! `tokio_core::reactor::Core` rather than returning a future itself
//! (spec.md §5: "single-threaded, cooperative" — a caller polls this
//! consumer the way it would a blocking client, with no implicit
//! background thread).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::Future;
use tokio_core::reactor::{Core, Timeout};

use errors::{Error, ErrorKind, Result};
use protocol::{FetchOffset, KafkaCode, Offset, PartitionId};
use network::{FetchRecords, TopicPartition};
use client::{Broker, Client, ClientConfig, Generation, KafkaClient};
use consumer::{ConsumerConfig, ConsumerCoordinator, Coordinator, Fetcher, PartitionAssignor,
               Subscriptions};

/// A member cannot rejoin a group forever on a flaky network; this bounds
/// the retry loop `subscribe`'s initial join (and a heartbeat's implicit
/// rejoin) will run before giving up and propagating the last error.
const MAX_JOIN_GROUP_ATTEMPTS: u32 = 5;

/// The public operations of the Consumer Core (spec.md §4.5). Split out as
/// a trait, mirroring `Coordinator`, so the blocking `KafkaConsumer` and a
/// future mock implementation can share the same call sites in tests.
pub trait Consumer {
    /// Subscribe to the given topics under dynamic group assignment
    /// (spec.md §4.5.1). Replaces any prior subscription or manual
    /// assignment.
    fn subscribe(&self, topics: Vec<String>) -> Result<()>;

    /// Manually assign the given partitions, bypassing group coordination
    /// (spec.md §4.5.2).
    fn assign(&self, partitions: Vec<TopicPartition<'static>>) -> Result<()>;

    /// Leave the group (if joined) and clear all subscription, assignment,
    /// and position state (spec.md §4.5.5).
    fn unsubscribe(&self) -> Result<()>;

    /// Drive one round of heartbeats and fetch the active partitions'
    /// next records (spec.md §4.5.3).
    fn poll(&self, timeout_ms: u64) -> Result<FetchRecords>;

    /// Commit the given offsets, or every assigned partition's current
    /// position if `None` (spec.md §4.5.3 `commitSync`).
    fn commit_sync(&self, offsets: Option<HashMap<TopicPartition<'static>, Offset>>) -> Result<()>;

    /// Overrides the fetch position of an assigned partition (spec.md
    /// §4.5.2 `seek`).
    fn seek(&self, topic: &str, partition: PartitionId, offset: Offset) -> Result<()>;

    fn seek_to_beginning(&self, partitions: Vec<TopicPartition<'static>>) -> Result<()>;

    fn seek_to_end(&self, partitions: Vec<TopicPartition<'static>>) -> Result<()>;

    /// The next offset `poll` will fetch for an assigned partition.
    fn position(&self, topic: &str, partition: PartitionId) -> Result<Offset>;

    fn pause(&self, partitions: &[TopicPartition<'static>]);

    fn resume(&self, partitions: &[TopicPartition<'static>]);

    fn assignment(&self) -> Vec<TopicPartition<'static>>;

    fn subscription(&self) -> Vec<String>;

    /// Leaves the group and releases resources. Idempotent; also run
    /// implicitly by `Drop` if a caller never calls it explicitly.
    fn close(&self) -> Result<()>;
}

/// A blocking Kafka consumer group client (spec.md §2, §4.5). Built only
/// through `ConsumerBuilder`.
pub struct KafkaConsumer<'a> {
    core: RefCell<Core>,
    client: KafkaClient<'a>,
    coordinator: RefCell<ConsumerCoordinator<'a>>,
    fetcher: Fetcher<'a>,
    subscriptions: Rc<RefCell<Subscriptions>>,
    config: ConsumerConfig,
    /// The topics last passed to `subscribe`, kept so a heartbeat failure
    /// can drive an automatic rejoin (spec.md §4.5.6) without the caller
    /// having to resubmit them.
    subscribed_topics: RefCell<Vec<String>>,
    last_heartbeat: Cell<Instant>,
    last_auto_commit: Cell<Instant>,
    closed: Cell<bool>,
}

impl<'a> KafkaConsumer<'a>
    where Self: 'static
{
    pub fn from_config(client_config: ClientConfig,
                       consumer_config: ConsumerConfig,
                       assignors: Vec<Box<PartitionAssignor>>,
                       core: Core)
                       -> Self {
        let handle = core.handle();
        let client = KafkaClient::from_config(client_config, handle.clone());
        let subscriptions = Rc::new(RefCell::new(Subscriptions::new()));

        let coordinator = ConsumerCoordinator::new(client.clone(),
                                                   consumer_config.group_id.clone(),
                                                   subscriptions.clone(),
                                                   consumer_config.session_timeout(),
                                                   consumer_config.rebalance_timeout(),
                                                   consumer_config.heartbeat_interval(),
                                                   consumer_config.retry_backoff(),
                                                   assignors);

        let fetcher = Fetcher::new(client.clone());

        let now = Instant::now();

        KafkaConsumer {
            core: RefCell::new(core),
            client: client,
            coordinator: RefCell::new(coordinator),
            fetcher: fetcher,
            subscriptions: subscriptions,
            config: consumer_config,
            subscribed_topics: RefCell::new(Vec::new()),
            last_heartbeat: Cell::new(now),
            last_auto_commit: Cell::new(now),
            closed: Cell::new(false),
        }
    }

    fn block_on<F>(&self, future: F) -> Result<F::Item>
        where F: Future<Error = Error>
    {
        self.core.borrow_mut().run(future)
    }

    fn sleep(&self, duration: Duration) -> Result<()> {
        let timeout = Timeout::new(duration, self.client.handle())?;
        self.block_on(timeout.map_err(Error::from))
    }

    /// Rebuilds a `TopicPartition<'a>` list tied to this consumer's Wire
    /// Client lifetime from the `'static` partitions `Subscriptions`
    /// stores, the way `Fetcher::list_offsets` rebuilds its own
    /// `flat_partitions` before calling into `Client`.
    fn to_client_partitions(&self, partitions: &[TopicPartition<'static>]) -> Vec<TopicPartition<'a>> {
        partitions
            .iter()
            .map(|tp| TopicPartition::new(tp.topic_name.clone().into_owned(), tp.partition))
            .collect()
    }

    fn to_client_offsets(&self,
                        offsets: &HashMap<TopicPartition<'static>, Offset>)
                        -> HashMap<TopicPartition<'a>, Offset> {
        offsets
            .iter()
            .map(|(tp, &offset)| {
                     (TopicPartition::new(tp.topic_name.clone().into_owned(), tp.partition), offset)
                 })
            .collect()
    }

    fn resolve_coordinator(&self) -> Result<Broker> {
        if let Some(broker) = self.coordinator.borrow().coordinator_broker() {
            return Ok(broker);
        }

        let future = self.client.group_coordinator(self.config.group_id.clone().into());
        self.block_on(future)
    }

    /// Runs `JoinGroup`/`SyncGroup`, retrying a retriable failure (spec.md
    /// §7: `RebalanceInProgress`, `UnknownMemberId`, ...) up to
    /// `MAX_JOIN_GROUP_ATTEMPTS` times with the configured retry backoff
    /// between attempts.
    fn join_group_with_retry(&self) -> Result<()> {
        let mut attempt = 0;

        loop {
            let future = self.coordinator.borrow_mut().join_group();

            match self.block_on(future) {
                Ok(()) => {
                    self.last_heartbeat.set(Instant::now());
                    return Ok(());
                }
                Err(err) => {
                    attempt += 1;

                    if attempt >= MAX_JOIN_GROUP_ATTEMPTS || !is_retriable(&err) {
                        return Err(err);
                    }

                    warn!("retriable error joining group `{}` (attempt {}/{}): {}, retrying",
                          self.config.group_id,
                          attempt,
                          MAX_JOIN_GROUP_ATTEMPTS,
                          err);

                    self.sleep(self.config.retry_backoff())?;
                }
            }
        }
    }

    /// Fetches the group's committed offsets for `partitions` and seeds
    /// each partition's position; any partition with no committed offset
    /// (or an unknown one, `-1`) falls through to `auto_reset_offsets`
    /// (spec.md §4.5.2 step 3).
    fn initialize_offsets(&self, partitions: Vec<TopicPartition<'static>>) -> Result<()> {
        let coordinator = self.resolve_coordinator()?;
        let client_partitions = self.to_client_partitions(&partitions);

        let future = self.client
            .fetch_group_offsets(&coordinator, self.config.group_id.clone().into(), client_partitions);
        let committed = self.block_on(future)?;

        let mut unresolved = Vec::new();

        for tp in &partitions {
            match committed.get(tp).cloned() {
                Some(offset) if offset >= 0 => {
                    self.subscriptions.borrow_mut().set_position(tp, offset)?;
                }
                _ => unresolved.push(tp.clone()),
            }
        }

        if !unresolved.is_empty() {
            self.auto_reset_offsets(unresolved)?;
        }

        Ok(())
    }

    /// Resolves a position for partitions with no committed offset using
    /// the configured `AUTO_OFFSET_RESET` policy; with `AutoOffsetReset::None`
    /// this surfaces as `OffsetOutOfRange`, matching a real broker's
    /// response to fetching from an unknown position (spec.md §4.5.2 edge
    /// case: "no committed offset and auto.offset.reset = none").
    fn auto_reset_offsets(&self, partitions: Vec<TopicPartition<'static>>) -> Result<()> {
        let policy = match self.config.auto_offset_reset.to_fetch_offset() {
            Some(policy) => policy,
            None => bail!(ErrorKind::KafkaError(KafkaCode::OffsetOutOfRange)),
        };

        let future = self.fetcher.list_offsets(partitions.clone(), policy);
        let offsets = self.block_on(future)?;

        for tp in &partitions {
            let offset = offsets.get(tp).cloned().unwrap_or(-1);

            if offset < 0 {
                bail!(ErrorKind::KafkaError(KafkaCode::OffsetOutOfRange));
            }

            self.subscriptions.borrow_mut().set_position(tp, offset)?;
        }

        Ok(())
    }

    fn seek_to(&self, partitions: Vec<TopicPartition<'static>>, at: FetchOffset) -> Result<()> {
        for tp in &partitions {
            if !self.subscriptions.borrow().is_assigned(tp) {
                bail!(ErrorKind::UnknownTopicOrPartition(tp.topic_name.clone().into_owned(), tp.partition));
            }
        }

        let future = self.fetcher.list_offsets(partitions.clone(), at);
        let offsets = self.block_on(future)?;

        for tp in &partitions {
            let offset = offsets.get(tp).cloned().unwrap_or(-1);
            self.subscriptions.borrow_mut().set_position(tp, offset)?;
        }

        Ok(())
    }

    /// Sends a heartbeat if the configured interval has elapsed since the
    /// last one (spec.md §4.5.3 step 1). A failed heartbeat triggers an
    /// automatic rejoin with the previously subscribed topics rather than
    /// surfacing the error to the caller, since `poll` is meant to keep a
    /// dynamically-assigned consumer alive across transient coordinator
    /// hiccups on its own.
    fn maybe_heartbeat(&self) -> Result<()> {
        if !self.coordinator.borrow().is_stable() {
            return Ok(());
        }

        let interval = self.coordinator.borrow().heartbeat_interval();
        let now = Instant::now();

        if now.duration_since(self.last_heartbeat.get()) < interval {
            return Ok(());
        }

        let future = self.coordinator.borrow().heartbeat();

        match self.block_on(future) {
            Ok(()) => {
                self.last_heartbeat.set(now);
                Ok(())
            }
            Err(err) => {
                warn!("heartbeat failed for group `{}`: {}, rejoining",
                      self.config.group_id,
                      err);

                self.rejoin_with_previous_topics()
            }
        }
    }

    fn rejoin_with_previous_topics(&self) -> Result<()> {
        let topics = self.subscribed_topics.borrow().clone();

        if topics.is_empty() {
            return Ok(());
        }

        self.subscribe(topics)
    }

    /// `poll` on a dynamically-subscribed consumer is only meaningful once
    /// the group has stabilized; a manually-assigned consumer has no group
    /// to stabilize and is always pollable (spec.md §4.5.6).
    fn ensure_pollable(&self) -> Result<()> {
        if self.subscriptions.borrow().has_subscription() && !self.coordinator.borrow().is_stable() {
            bail!(ErrorKind::IllegalState("poll called before the consumer group has stabilized"));
        }

        Ok(())
    }

    fn maybe_auto_commit(&self) -> Result<()> {
        if !self.config.enable_auto_commit {
            return Ok(());
        }

        let interval = self.config.auto_commit_interval();
        let now = Instant::now();

        if now.duration_since(self.last_auto_commit.get()) < interval {
            return Ok(());
        }

        self.commit_sync(None)?;
        self.last_auto_commit.set(now);

        Ok(())
    }

    /// Advances each fetched partition's position past the last record
    /// delivered (spec.md §4.5.3 step 4); a partition with an empty batch
    /// keeps its prior position.
    fn advance_positions(&self, records: &FetchRecords) -> Result<()> {
        for (tp, message_set) in &records.0 {
            if let Some(max_offset) = message_set.max_offset() {
                self.subscriptions.borrow_mut().set_position(tp, max_offset)?;
            }
        }

        Ok(())
    }

    /// Runs the fetch RPC and, on an `OffsetOutOfRange` partial failure,
    /// recovers in place (spec.md §4.5.4) rather than surfacing the whole
    /// batch as lost.
    fn fetch_with_recovery(&self,
                           positions: HashMap<TopicPartition<'static>, Offset>,
                           timeout: Duration)
                           -> Result<FetchRecords> {
        let future = self.fetcher.fetch(positions, timeout, self.config.fetch_min_bytes);

        match self.block_on(future) {
            Ok(records) => Ok(records),
            Err(err) => match err.into_partial_fetch() {
                Ok((partial, errors)) => self.recover_partial_fetch(partial, errors, timeout),
                Err(other) => Err(other),
            },
        }
    }

    /// Splits a fetch's per-partition errors into the ones this recovery
    /// path can repair (`OffsetOutOfRange`) and everything else, asks the
    /// brokers for each repairable partition's current valid offsets, seeks
    /// to them, commits the new positions, and re-fetches just those
    /// partitions once. Whatever is still missing or still erroring after
    /// that single retry is folded into the final `FetchPartiallyFailed`
    /// alongside every record that did arrive, recoverable or not.
    fn recover_partial_fetch(&self,
                             partial: FetchRecords,
                             errors: HashMap<TopicPartition<'static>, Error>,
                             timeout: Duration)
                             -> Result<FetchRecords> {
        let (recoverable, mut remaining) = partition_fetch_errors(errors);

        if recoverable.is_empty() {
            bail!(ErrorKind::FetchPartiallyFailed(partial, Box::new(remaining)));
        }

        let mut merged = partial;

        let repositioned = self.resolve_valid_offsets(&recoverable)?;

        for (tp, offset) in &repositioned {
            self.subscriptions.borrow_mut().set_position(tp, *offset)?;
        }

        if let Err(err) = self.commit_sync(Some(repositioned.clone())) {
            warn!("failed to commit recovered offsets for group `{}`: {}",
                  self.config.group_id,
                  err);
        }

        let refetch_positions: HashMap<TopicPartition<'static>, Offset> = repositioned
            .into_iter()
            .map(|(tp, offset)| (tp, offset + 1))
            .collect();

        let refetch = self.fetcher.fetch(refetch_positions, timeout, self.config.fetch_min_bytes);

        match self.block_on(refetch) {
            Ok(records) => merged.merge(records),
            Err(err) => match err.into_partial_fetch() {
                Ok((partial2, errors2)) => {
                    merged.merge(partial2);
                    remaining.extend(errors2);
                }
                Err(other) => return Err(other),
            },
        }

        if remaining.is_empty() {
            Ok(merged)
        } else {
            bail!(ErrorKind::FetchPartiallyFailed(merged, Box::new(remaining)));
        }
    }

    /// Resolves the current valid offset of each given partition. The spec
    /// asks the brokers for "current valid offsets", falling back to
    /// `EARLIEST` only for partitions that still come back unknown — read
    /// literally this implies the first query already uses a different
    /// policy than `EARLIEST`, so this queries `LATEST` first (the offset a
    /// healthy partition's log end actually sits at) and only asks for
    /// `EARLIEST` on whatever `LATEST` couldn't resolve (see DESIGN.md).
    fn resolve_valid_offsets(&self,
                            partitions: &[TopicPartition<'static>])
                            -> Result<HashMap<TopicPartition<'static>, Offset>> {
        let future = self.fetcher.list_offsets(partitions.to_vec(), FetchOffset::Latest);
        let offsets = self.block_on(future)?;

        let mut resolved = HashMap::new();
        let mut need_earliest = Vec::new();

        for tp in partitions {
            match offsets.get(tp).cloned() {
                Some(offset) if offset >= 0 => {
                    resolved.insert(tp.clone(), offset);
                }
                _ => need_earliest.push(tp.clone()),
            }
        }

        if !need_earliest.is_empty() {
            let earliest_future = self.fetcher.list_offsets(need_earliest.clone(), FetchOffset::Earliest);
            let earliest_offsets = self.block_on(earliest_future)?;

            for tp in &need_earliest {
                let offset = earliest_offsets.get(tp).cloned().unwrap_or(0);
                resolved.insert(tp.clone(), offset);
            }
        }

        Ok(resolved)
    }
}

impl<'a> Consumer for KafkaConsumer<'a>
    where Self: 'static
{
    fn subscribe(&self, topics: Vec<String>) -> Result<()> {
        if topics.is_empty() {
            bail!(ErrorKind::InvalidArgument("subscribe requires a non-empty topic list".to_owned()));
        }

        *self.subscribed_topics.borrow_mut() = topics.clone();
        self.subscriptions.borrow_mut().subscribe(topics);

        self.join_group_with_retry()?;

        let missing = self.subscriptions.borrow().missing_positions();

        if !missing.is_empty() {
            self.initialize_offsets(missing)?;
        }

        Ok(())
    }

    fn assign(&self, partitions: Vec<TopicPartition<'static>>) -> Result<()> {
        if partitions.is_empty() {
            bail!(ErrorKind::InvalidArgument("assign requires a non-empty partition set".to_owned()));
        }

        self.subscriptions.borrow_mut().assign(partitions)?;

        let missing = self.subscriptions.borrow().missing_positions();

        if !missing.is_empty() {
            self.initialize_offsets(missing)?;
        }

        Ok(())
    }

    fn unsubscribe(&self) -> Result<()> {
        if self.subscriptions.borrow().has_subscription() {
            let future = self.coordinator.borrow_mut().leave_group();

            if let Err(err) = self.block_on(future) {
                warn!("failed to leave group `{}` cleanly: {}", self.config.group_id, err);
            }
        }

        self.subscriptions.borrow_mut().unsubscribe();
        self.subscribed_topics.borrow_mut().clear();

        Ok(())
    }

    fn poll(&self, timeout_ms: u64) -> Result<FetchRecords> {
        self.maybe_heartbeat()?;
        self.ensure_pollable()?;

        let active = self.subscriptions.borrow().active_partitions();

        if active.is_empty() {
            self.maybe_auto_commit()?;
            return Ok(FetchRecords::default());
        }

        let positions: HashMap<TopicPartition<'static>, Offset> = {
            let subscriptions = self.subscriptions.borrow();

            active
                .iter()
                .filter_map(|tp| subscriptions.position(tp).map(|offset| (tp.clone(), offset + 1)))
                .collect()
        };

        if positions.is_empty() {
            self.maybe_auto_commit()?;
            return Ok(FetchRecords::default());
        }

        match self.fetch_with_recovery(positions, Duration::from_millis(timeout_ms)) {
            Ok(records) => {
                self.advance_positions(&records)?;
                self.maybe_auto_commit()?;
                Ok(records)
            }
            Err(err) => match err.into_partial_fetch() {
                Ok((partial, errors)) => {
                    self.advance_positions(&partial)?;
                    self.maybe_auto_commit()?;
                    Err(ErrorKind::FetchPartiallyFailed(partial, Box::new(errors)).into())
                }
                Err(other) => Err(other),
            },
        }
    }

    fn commit_sync(&self, offsets: Option<HashMap<TopicPartition<'static>, Offset>>) -> Result<()> {
        let offsets = offsets.unwrap_or_else(|| self.subscriptions.borrow().all_positions());

        if offsets.is_empty() {
            return Ok(());
        }

        let generation = self.coordinator
            .borrow()
            .generation()
            .ok_or_else(|| Error::from(ErrorKind::IllegalState("commitSync requires a stable group membership")))?;

        let coordinator_broker = self.resolve_coordinator()?;
        let client_offsets = self.to_client_offsets(&offsets);

        let future = self.client
            .commit_offsets(&coordinator_broker, generation, self.config.offset_retention, client_offsets);
        self.block_on(future)
    }

    fn seek(&self, topic: &str, partition: PartitionId, offset: Offset) -> Result<()> {
        let tp = TopicPartition::new(topic.to_owned(), partition);

        if !self.subscriptions.borrow().is_assigned(&tp) {
            bail!(ErrorKind::UnknownTopicOrPartition(topic.to_owned(), partition));
        }

        self.subscriptions.borrow_mut().set_position(&tp, offset)
    }

    fn seek_to_beginning(&self, partitions: Vec<TopicPartition<'static>>) -> Result<()> {
        self.seek_to(partitions, FetchOffset::Earliest)
    }

    fn seek_to_end(&self, partitions: Vec<TopicPartition<'static>>) -> Result<()> {
        self.seek_to(partitions, FetchOffset::Latest)
    }

    fn position(&self, topic: &str, partition: PartitionId) -> Result<Offset> {
        let tp = TopicPartition::new(topic.to_owned(), partition);
        let subscriptions = self.subscriptions.borrow();

        if !subscriptions.is_assigned(&tp) {
            bail!(ErrorKind::UnknownTopicOrPartition(topic.to_owned(), partition));
        }

        subscriptions
            .position(&tp)
            .map(|offset| offset + 1)
            .ok_or_else(|| {
                            ErrorKind::IllegalState("position requested before the partition's offset is known")
                                .into()
                        })
    }

    fn pause(&self, partitions: &[TopicPartition<'static>]) {
        self.subscriptions.borrow_mut().pause(partitions);
    }

    fn resume(&self, partitions: &[TopicPartition<'static>]) {
        self.subscriptions.borrow_mut().resume(partitions);
    }

    fn assignment(&self) -> Vec<TopicPartition<'static>> {
        self.subscriptions.borrow().assigned_partitions()
    }

    fn subscription(&self) -> Vec<String> {
        self.subscriptions.borrow().topics()
    }

    fn close(&self) -> Result<()> {
        if self.closed.get() {
            return Ok(());
        }

        self.closed.set(true);
        self.unsubscribe()
    }
}

impl<'a> Drop for KafkaConsumer<'a>
    where Self: 'static
{
    fn drop(&mut self) {
        if !self.closed.get() {
            warn!("consumer for group `{}` dropped without calling close(); the coordinator won't evict this member until the session timeout elapses",
                  self.config.group_id);

            let _ = self.unsubscribe();
        }
    }
}

/// Splits a fetch's per-partition error map into the subset this recovery
/// path knows how to repair (`OffsetOutOfRange`, spec.md §4.5.4) and
/// everything else, which must propagate unchanged.
fn partition_fetch_errors(errors: HashMap<TopicPartition<'static>, Error>)
                         -> (Vec<TopicPartition<'static>>, HashMap<TopicPartition<'static>, Error>) {
    let mut recoverable = Vec::new();
    let mut remaining = HashMap::new();

    for (tp, err) in errors {
        if is_offset_out_of_range(&err) {
            recoverable.push(tp);
        } else {
            remaining.insert(tp, err);
        }
    }

    (recoverable, remaining)
}

fn is_offset_out_of_range(err: &Error) -> bool {
    match *err.kind() {
        ErrorKind::KafkaError(KafkaCode::OffsetOutOfRange) => true,
        _ => false,
    }
}

fn is_retriable(err: &Error) -> bool {
    match *err.kind() {
        ErrorKind::KafkaError(code) => code.is_retriable(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(topic: &str, partition: i32) -> TopicPartition<'static> {
        TopicPartition::new(topic.to_owned(), partition)
    }

    fn kafka_error(code: KafkaCode) -> Error {
        ErrorKind::KafkaError(code).into()
    }

    #[test]
    fn test_is_offset_out_of_range_matches_only_that_code() {
        assert!(is_offset_out_of_range(&kafka_error(KafkaCode::OffsetOutOfRange)));
        assert!(!is_offset_out_of_range(&kafka_error(KafkaCode::NotLeaderForPartition)));
        assert!(!is_offset_out_of_range(&Error::from(ErrorKind::Canceled)));
    }

    #[test]
    fn test_is_retriable_delegates_to_kafka_code() {
        assert!(is_retriable(&kafka_error(KafkaCode::RebalanceInProgress)));
        assert!(!is_retriable(&kafka_error(KafkaCode::OffsetOutOfRange)));
        assert!(!is_retriable(&Error::from(ErrorKind::Canceled)));
    }

    #[test]
    fn test_partition_fetch_errors_splits_recoverable_from_the_rest() {
        let mut errors = HashMap::new();
        errors.insert(tp("foo", 0), kafka_error(KafkaCode::OffsetOutOfRange));
        errors.insert(tp("foo", 1), kafka_error(KafkaCode::NotLeaderForPartition));

        let (recoverable, remaining) = partition_fetch_errors(errors);

        assert_eq!(recoverable, vec![tp("foo", 0)]);
        assert_eq!(remaining.len(), 1);
        assert!(remaining.contains_key(&tp("foo", 1)));
    }

    #[test]
    fn test_partition_fetch_errors_all_recoverable_leaves_nothing_remaining() {
        let mut errors = HashMap::new();
        errors.insert(tp("foo", 0), kafka_error(KafkaCode::OffsetOutOfRange));

        let (recoverable, remaining) = partition_fetch_errors(errors);

        assert_eq!(recoverable, vec![tp("foo", 0)]);
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_into_partial_fetch_roundtrips_through_error() {
        let mut errors = HashMap::new();
        errors.insert(tp("foo", 0), kafka_error(KafkaCode::OffsetOutOfRange));

        let err: Error = ErrorKind::FetchPartiallyFailed(FetchRecords::default(), Box::new(errors)).into();

        let (partial, errors) = err.into_partial_fetch().expect("a FetchPartiallyFailed error");

        assert!(partial.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_into_partial_fetch_passes_other_errors_through() {
        let err = kafka_error(KafkaCode::NotLeaderForPartition);

        assert!(err.into_partial_fetch().is_err());
    }
}
