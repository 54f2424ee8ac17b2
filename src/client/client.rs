use std::mem;
use std::rc::Rc;
use std::borrow::Cow;
use std::cell::RefCell;
use std::net::{SocketAddr, ToSocketAddrs};
use std::collections::HashMap;
use std::iter::FromIterator;
use std::time::Duration;

use bytes::Bytes;

use rand::{self, Rng};

use futures::{Async, IntoFuture, Poll};
use futures::future::{self, Future};
use futures::unsync::oneshot;
use tokio_core::reactor::{Handle, Timeout};
use tokio_service::Service;

use errors::{Error, ErrorKind, Result};
use protocol::{ApiKeys, CorrelationId, ErrorCode, FetchOffset, GenerationId, JoinGroupMember,
               JoinGroupProtocol, KafkaCode, Offset, PartitionId, SyncGroupAssignment};
use network::{FetchRecords, KafkaRequest, KafkaResponse, TopicPartition};
use client::{Broker, BrokerRef, Cluster, ClientBuilder, ClientConfig, KafkaService, Metadata};
use client::metadata::UsableApiVersions;
use client::middleware::InFlightMiddleware;

/// The Wire Client's public RPC surface (spec.md §4.2): every operation the
/// Consumer Core drives to join a group, track cluster metadata, fetch
/// records, and manage committed offsets.
pub trait Client<'a>: 'static {
    /// Fetch records for the given partitions starting at the given
    /// offsets.
    fn fetch(&self,
             offsets: HashMap<TopicPartition<'a>, Offset>,
             max_wait_time: Duration,
             min_bytes: i32)
             -> FetchRecordsFuture;

    /// Look up valid offsets for the given partitions at the given
    /// timestamp/sentinel (used for seek-to-earliest/latest and for
    /// recovering from `OffsetOutOfRange`).
    fn fetch_offsets(&self,
                     partitions: Vec<TopicPartition<'a>>,
                     offset: FetchOffset)
                     -> FetchOffsets;

    /// Load (or refresh) cluster metadata.
    fn load_metadata(&mut self) -> LoadMetadata<'a>;

    /// Discover the current coordinator of the consumer group.
    fn group_coordinator(&self, group_id: Cow<'a, str>) -> GroupCoordinator;

    /// Join the consumer group.
    fn join_group(&self,
                  coordinator: &Broker,
                  group_id: Cow<'a, str>,
                  session_timeout: i32,
                  rebalance_timeout: i32,
                  member_id: Cow<'a, str>,
                  protocol_type: Cow<'a, str>,
                  group_protocols: Vec<ConsumerGroupProtocol>)
                  -> JoinGroup;

    /// Send heartbeat to the consumer group.
    fn heartbeat(&self, coordinator: &Broker, generation: Generation) -> Heartbeat;

    /// Leave the current consumer group.
    fn leave_group(&self, coordinator: &Broker, generation: Generation) -> LeaveGroup;

    /// Sync the current consumer group, computing (leader) or receiving
    /// (follower) the partition assignment.
    fn sync_group(&self,
                  coordinator: &Broker,
                  generation: Generation,
                  group_assignment: Option<Vec<ConsumerGroupAssignment>>)
                  -> SyncGroup;

    /// Commit offsets for the given partitions to the group coordinator.
    /// `retention_time` overrides the broker's `offsets.retention.minutes`
    /// for these commits; `-1` defers to the broker default (spec.md §6
    /// `OFFSET_RETENTION_MS`).
    fn commit_offsets(&self,
                      coordinator: &Broker,
                      generation: Generation,
                      retention_time: i64,
                      offsets: HashMap<TopicPartition<'a>, Offset>)
                      -> CommitOffsets;

    /// Fetch the group's last committed offsets for the given partitions.
    fn fetch_group_offsets(&self,
                          coordinator: &Broker,
                          group_id: Cow<'a, str>,
                          partitions: Vec<TopicPartition<'a>>)
                          -> FetchGroupOffsets;
}

pub type FetchRecordsFuture = StaticBoxFuture<FetchRecords>;
pub type FetchOffsets = StaticBoxFuture<HashMap<String, Vec<PartitionOffset>>>;

#[derive(Clone, Debug)]
pub struct PartitionOffset {
    pub partition: PartitionId,
    pub offset: Offset,
}

pub type GroupCoordinator = StaticBoxFuture<Broker>;
pub type JoinGroup = StaticBoxFuture<ConsumerGroup>;
pub type ConsumerGroupProtocol = JoinGroupProtocol;
pub type Heartbeat = StaticBoxFuture<()>;
pub type CommitOffsets = StaticBoxFuture<()>;
pub type FetchGroupOffsets = StaticBoxFuture<HashMap<TopicPartition<'static>, Offset>>;

pub struct ConsumerGroup {
    pub group_id: String,
    pub generation_id: GenerationId,
    pub protocol: String,
    pub leader_id: String,
    pub member_id: String,
    pub members: Vec<ConsumerGroupMember>,
}

impl ConsumerGroup {
    pub fn is_leader(&self) -> bool {
        self.leader_id == self.member_id
    }

    pub fn generation(&self) -> Generation {
        Generation {
            group_id: self.group_id.clone(),
            generation_id: self.generation_id,
            member_id: self.member_id.clone(),
            protocol: self.protocol.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Generation {
    pub group_id: String,
    pub generation_id: GenerationId,
    pub member_id: String,
    pub protocol: String,
}

pub type ConsumerGroupMember = JoinGroupMember;
pub type LeaveGroup = StaticBoxFuture<String>;
pub type ConsumerGroupAssignment = SyncGroupAssignment;
pub type SyncGroup = StaticBoxFuture<Bytes>;

/// A Kafka client that communicates with the cluster over the Wire
/// Client's RPC surface. Cheaply `Clone`-able: every clone shares the same
/// connection pool, metadata cache and correlation-id counter via `Rc`.
#[derive(Clone)]
pub struct KafkaClient<'a> {
    inner: Rc<Inner<'a>>,
}

struct Inner<'a> {
    config: ClientConfig,
    handle: Handle,
    service: InFlightMiddleware<KafkaService<'a>>,
    state: Rc<RefCell<State>>,
}

#[derive(Default)]
struct State {
    correlation_id: CorrelationId,
    metadata_status: MetadataStatus,
}

enum MetadataStatus {
    Loading(RefCell<Vec<oneshot::Sender<Rc<Metadata>>>>),
    Loaded(Rc<Metadata>),
}

impl Default for MetadataStatus {
    fn default() -> Self {
        MetadataStatus::Loading(RefCell::new(Vec::new()))
    }
}

impl<'a> KafkaClient<'a>
    where Self: 'static
{
    pub fn from_hosts<I>(hosts: I, handle: Handle) -> ClientBuilder<'a>
        where I: Iterator<Item = SocketAddr>
    {
        ClientBuilder::from_hosts(hosts, handle)
    }

    pub fn from_config(config: ClientConfig, handle: Handle) -> KafkaClient<'a> {
        trace!("create client from config: {:?}", config);

        let service =
            InFlightMiddleware::new(KafkaService::new(handle.clone(), config.max_connection_idle()));

        let inner = Rc::new(Inner {
                                config: config,
                                handle: handle.clone(),
                                service: service,
                                state: Rc::new(RefCell::new(State::default())),
                            });

        let mut client = KafkaClient { inner: inner };

        client.refresh_metadata();

        client
    }

    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn metadata(&self) -> GetMetadata {
        (*self.inner.state).borrow().metadata()
    }

    pub fn refresh_metadata(&mut self) {
        let handle = self.inner.handle.clone();

        handle.spawn(self.load_metadata()
                         .map(|metadata| {
                                  trace!("auto loaded metadata, {:?}", metadata);
                              })
                         .map_err(|err| {
                                      warn!("fail to load metadata, {}", err);
                                  }));
    }
}

impl<'a> Client<'a> for KafkaClient<'a>
    where Self: 'static
{
    fn fetch(&self,
             offsets: HashMap<TopicPartition<'a>, Offset>,
             max_wait_time: Duration,
             min_bytes: i32)
             -> FetchRecordsFuture {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| inner.fetch(metadata, offsets, max_wait_time, min_bytes));
        FetchRecordsFuture::new(future)
    }

    fn fetch_offsets(&self,
                     partitions: Vec<TopicPartition<'a>>,
                     offset: FetchOffset)
                     -> FetchOffsets {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| {
                          let topics = inner.topics_by_broker(metadata, partitions);
                          inner.fetch_offsets(topics, offset)
                      });
        FetchOffsets::new(future)
    }

    fn load_metadata(&mut self) -> LoadMetadata<'a> {
        if self.inner.config.metadata_max_age > 0 {
            let handle = self.inner.handle.clone();
            let timeout = Timeout::new(self.inner.config.metadata_max_age(), &handle);

            match timeout {
                Ok(timeout) => {
                    let inner = self.inner.clone();
                    let future = timeout
                        .map_err(Error::from)
                        .and_then(move |_| LoadMetadata::new(inner.clone()))
                        .map(|_| ())
                        .map_err(|_| ());

                    handle.spawn(future);
                }
                Err(err) => {
                    warn!("fail to create timeout, {}", err);
                }
            }
        }

        LoadMetadata::new(self.inner.clone())
    }

    fn group_coordinator(&self, group_id: Cow<'a, str>) -> GroupCoordinator {
        let inner = self.inner.clone();
        let future = self.metadata()
            .and_then(move |metadata| inner.group_coordinator(metadata, group_id));
        GroupCoordinator::new(future)
    }

    fn join_group(&self,
                  coordinator: &Broker,
                  group_id: Cow<'a, str>,
                  session_timeout: i32,
                  rebalance_timeout: i32,
                  member_id: Cow<'a, str>,
                  protocol_type: Cow<'a, str>,
                  group_protocols: Vec<ConsumerGroupProtocol>)
                  -> JoinGroup {
        self.inner.join_group(coordinator,
                             group_id,
                             session_timeout,
                             rebalance_timeout,
                             member_id,
                             protocol_type,
                             group_protocols)
    }

    fn heartbeat(&self, coordinator: &Broker, generation: Generation) -> Heartbeat {
        self.inner.heartbeat(coordinator,
                            generation.group_id.into(),
                            generation.generation_id,
                            generation.member_id.into())
    }

    fn leave_group(&self, coordinator: &Broker, generation: Generation) -> LeaveGroup {
        self.inner
            .leave_group(coordinator, generation.group_id.into(), generation.member_id.into())
    }

    fn sync_group(&self,
                  coordinator: &Broker,
                  generation: Generation,
                  group_assignment: Option<Vec<ConsumerGroupAssignment>>)
                  -> SyncGroup {
        self.inner.sync_group(coordinator,
                             generation.group_id.into(),
                             generation.generation_id,
                             generation.member_id.into(),
                             group_assignment)
    }

    fn commit_offsets(&self,
                      coordinator: &Broker,
                      generation: Generation,
                      retention_time: i64,
                      offsets: HashMap<TopicPartition<'a>, Offset>)
                      -> CommitOffsets {
        self.inner.commit_offsets(coordinator, generation, retention_time, offsets)
    }

    fn fetch_group_offsets(&self,
                          coordinator: &Broker,
                          group_id: Cow<'a, str>,
                          partitions: Vec<TopicPartition<'a>>)
                          -> FetchGroupOffsets {
        self.inner.fetch_group_offsets(coordinator, group_id, partitions)
    }
}

impl<'a> Inner<'a>
    where Self: 'static
{
    fn next_correlation_id(&self) -> CorrelationId {
        (*self.state).borrow_mut().next_correlation_id()
    }

    fn client_id(&self) -> Option<Cow<'a, str>> {
        self.config.client_id.clone().map(Cow::from)
    }

    pub fn metadata(&self) -> GetMetadata {
        (*self.state).borrow().metadata()
    }

    /// Choose the node with the fewest outstanding requests which is at
    /// least eligible for connection.
    pub fn least_loaded_broker(&self, metadata: Rc<Metadata>) -> Result<(SocketAddr, BrokerRef)> {
        let mut brokers: Vec<(usize, Broker)> =
            metadata.brokers().iter().cloned().enumerate().collect();

        rand::thread_rng().shuffle(&mut brokers);

        let mut in_flight_requests = usize::max_value();
        let mut found = None;

        for (idx, broker) in brokers {
            for addr in broker.addr().to_socket_addrs()? {
                match self.service.in_flight_requests(&addr) {
                    Some(0) => return Ok((addr, BrokerRef(idx))),
                    Some(n) if n < in_flight_requests => {
                        in_flight_requests = n;
                        found = Some((addr, BrokerRef(idx)));
                    }
                    _ => {}
                }
            }
        }

        found.ok_or_else(|| {
                              warn!("not found any broker");
                              ErrorKind::KafkaError(KafkaCode::BrokerNotAvailable).into()
                          })
    }

    fn fetch_metadata<S>(&self, topic_names: &[S]) -> FetchMetadata
        where S: AsRef<str>
    {
        debug!("fetch metadata for topics: {:?}",
               topic_names.iter().map(AsRef::as_ref).collect::<Vec<_>>());

        let responses = {
            let mut responses = Vec::new();

            for addr in &self.config.hosts {
                let request = KafkaRequest::fetch_metadata(0,
                                                           self.next_correlation_id(),
                                                           self.client_id(),
                                                           topic_names);

                let response = self.service
                    .call((*addr, request))
                    .and_then(|res| if let KafkaResponse::Metadata(res) = res {
                                  future::ok(Rc::new(Metadata::from(res)))
                              } else {
                                  future::err(ErrorKind::UnexpectedResponse(res.api_key()).into())
                              });

                responses.push(response);
            }

            responses
        };

        FetchMetadata::new(future::select_ok(responses).map(|(metadata, _)| metadata))
    }

    fn fetch_api_versions(&self, broker: &Broker) -> FetchApiVersions {
        debug!("fetch API versions for broker: {:?}", broker);

        let addr = broker.addr().to_socket_addrs().unwrap().next().unwrap();
        let request = KafkaRequest::api_versions(self.next_correlation_id(), self.client_id());

        let response = self.service
            .call((addr, request))
            .and_then(|res| if let KafkaResponse::ApiVersions(res) = res {
                          future::ok(UsableApiVersions::new(res.api_versions))
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key()).into())
                      });

        FetchApiVersions::new(response)
    }

    fn load_api_versions(&self, metadata: Rc<Metadata>) -> LoadApiVersions {
        trace!("load API versions from brokers, {:?}", metadata.brokers());

        let responses = {
            let mut responses = Vec::new();

            for (idx, broker) in metadata.brokers().iter().enumerate() {
                let broker_ref = BrokerRef(idx);
                let response = self.fetch_api_versions(broker)
                    .map(move |api_versions| (broker_ref, api_versions));

                responses.push(response);
            }

            responses
        };
        let responses = future::join_all(responses).map(HashMap::from_iter);

        LoadApiVersions::new(StaticBoxFuture::new(responses))
    }

    fn fetch(&self,
             metadata: Rc<Metadata>,
             offsets: HashMap<TopicPartition<'a>, Offset>,
             max_wait_time: Duration,
             min_bytes: i32)
             -> FetchRecordsFuture {
        let mut by_broker: HashMap<(SocketAddr, i16), HashMap<String, Vec<(PartitionId, i64, i32)>>> =
            HashMap::new();

        for (tp, offset) in offsets {
            if let Some(broker) = metadata.leader_for(&tp.topic_name, tp.partition) {
                let addr = broker.addr().to_socket_addrs().unwrap().next().unwrap();
                let api_version = broker.api_version(ApiKeys::Fetch as i16).unwrap_or_default();

                by_broker
                    .entry((addr, api_version))
                    .or_insert_with(HashMap::new)
                    .entry(tp.topic_name.into_owned())
                    .or_insert_with(Vec::new)
                    .push((tp.partition, offset, 1024 * 1024));
            }
        }

        let responses = by_broker
            .into_iter()
            .map(|((addr, api_version), topics)| {
                let request = KafkaRequest::fetch(api_version,
                                                  self.next_correlation_id(),
                                                  self.client_id(),
                                                  max_wait_time.as_millis() as i32,
                                                  min_bytes,
                                                  topics);

                self.service
                    .call((addr, request))
                    .and_then(|res| if let KafkaResponse::Fetch(res) = res {
                                  let mut records = FetchRecords::default();
                                  let mut errors: HashMap<TopicPartition<'static>, Error> =
                                      HashMap::new();

                                  for topic in res.topics {
                                      for partition in topic.partitions {
                                          let tp = TopicPartition::new(topic.topic_name.clone(),
                                                                       partition.partition)
                                              .into_owned();

                                          if partition.error_code == KafkaCode::None as ErrorCode {
                                              records.0.insert(tp, partition.message_set);
                                          } else {
                                              errors.insert(tp,
                                                           ErrorKind::KafkaError(partition
                                                                                     .error_code
                                                                                     .into())
                                                               .into());
                                          }
                                      }
                                  }

                                  future::ok((records, errors))
                              } else {
                                  future::err(ErrorKind::UnexpectedResponse(res.api_key()).into())
                              })
            })
            .collect::<Vec<_>>();

        // Every per-broker partition error is carried alongside the records
        // that did arrive rather than failing the whole `join_all`, so one
        // broker's `OffsetOutOfRange` doesn't discard another broker's
        // successful partitions (spec.md §4.5.4, §8 property 3).
        let merged = future::join_all(responses).and_then(|parts| {
            let mut records = FetchRecords::default();
            let mut errors: HashMap<TopicPartition<'static>, Error> = HashMap::new();

            for (part_records, part_errors) in parts {
                records.merge(part_records);
                errors.extend(part_errors);
            }

            if errors.is_empty() {
                future::ok(records)
            } else {
                future::err(ErrorKind::FetchPartiallyFailed(records, Box::new(errors)).into())
            }
        });

        FetchRecordsFuture::new(merged)
    }

    fn topics_by_broker(&self,
                        metadata: Rc<Metadata>,
                        topic_partitions: Vec<TopicPartition<'a>>)
                        -> Topics {
        let mut topics = HashMap::new();

        for topic_partition in topic_partitions {
            if let Some(broker) = metadata.leader_for(&topic_partition.topic_name,
                                                      topic_partition.partition) {
                let addr = broker.addr().to_socket_addrs().unwrap().next().unwrap();
                let api_version = broker
                    .api_version(ApiKeys::ListOffsets as i16)
                    .unwrap_or_default();
                topics
                    .entry((addr, api_version))
                    .or_insert_with(HashMap::new)
                    .entry(topic_partition.topic_name.into_owned())
                    .or_insert_with(Vec::new)
                    .push(topic_partition.partition);
            }
        }

        topics
    }

    fn fetch_offsets(&self, topics: Topics, offset: FetchOffset) -> FetchOffsets {
        let responses = {
            let mut responses = Vec::new();

            for ((addr, api_version), topics) in topics {
                let request = KafkaRequest::list_offsets(api_version,
                                                         self.next_correlation_id(),
                                                         self.client_id(),
                                                         topics,
                                                         offset);
                let response = self.service
                    .call((addr, request))
                    .and_then(|res| {
                        if let KafkaResponse::ListOffsets(res) = res {
                            let topics = res.topics
                                .into_iter()
                                .map(|topic| {
                                    let partitions = topic
                                        .partitions
                                        .into_iter()
                                        .flat_map(|partition| if partition.error_code ==
                                                                 KafkaCode::None as ErrorCode {
                                                      Ok(PartitionOffset {
                                                             partition: partition.partition,
                                                             offset: partition
                                                                 .offsets
                                                                 .into_iter()
                                                                 .next()
                                                                 .unwrap_or(-1),
                                                         })
                                                  } else {
                                                      Err(ErrorKind::KafkaError(partition
                                                                                    .error_code
                                                                                    .into()))
                                                  })
                                        .collect();

                                    (topic.topic_name, partitions)
                                })
                                .collect::<Vec<(String, Vec<PartitionOffset>)>>();

                            Ok(topics)
                        } else {
                            bail!(ErrorKind::UnexpectedResponse(res.api_key()))
                        }
                    });

                responses.push(response);
            }

            responses
        };

        let offsets = future::join_all(responses).map(|responses| {
            responses
                .into_iter()
                .fold(HashMap::new(), |mut offsets, topics| {
                    for (topic_name, partitions) in topics {
                        offsets
                            .entry(topic_name)
                            .or_insert_with(Vec::new)
                            .extend(partitions);
                    }
                    offsets
                })
        });

        FetchOffsets::new(offsets)
    }

    fn group_coordinator(&self,
                         metadata: Rc<Metadata>,
                         group_id: Cow<'a, str>)
                         -> GroupCoordinator {
        debug!("discover group coordinator of group `{}`", group_id);

        let addr = {
            match self.least_loaded_broker(metadata) {
                Ok((addr, _)) => addr,
                Err(err) => return GroupCoordinator::err(err),
            }
        };

        let request = KafkaRequest::group_coordinator(0,
                                                       self.next_correlation_id(),
                                                       self.client_id(),
                                                       group_id);

        let response = self.service
            .call((addr, request))
            .and_then(|res| if let KafkaResponse::GroupCoordinator(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(Broker::new(res.coordinator_id,
                                                     &res.coordinator_host,
                                                     res.coordinator_port as u16))
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key()).into())
                      });

        GroupCoordinator::new(response)
    }

    fn join_group(&self,
                  coordinator: &Broker,
                  group_id: Cow<'a, str>,
                  session_timeout: i32,
                  rebalance_timeout: i32,
                  member_id: Cow<'a, str>,
                  protocol_type: Cow<'a, str>,
                  group_protocols: Vec<ConsumerGroupProtocol>)
                  -> JoinGroup {
        debug!("member `{}` join group `{}`", member_id, group_id);

        let addr = coordinator.addr().to_socket_addrs().unwrap().next().unwrap();
        let api_version = coordinator
            .api_version(ApiKeys::JoinGroup as i16)
            .unwrap_or(1);

        let joined_group_id: String = (*group_id).to_owned();

        let request = KafkaRequest::join_group(api_version,
                                               self.next_correlation_id(),
                                               self.client_id(),
                                               group_id,
                                               session_timeout,
                                               rebalance_timeout,
                                               member_id,
                                               protocol_type,
                                               group_protocols);

        let response = self.service
            .call((addr, request))
            .and_then(move |res| if let KafkaResponse::JoinGroup(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(ConsumerGroup {
                                             group_id: joined_group_id,
                                             generation_id: res.generation_id,
                                             protocol: res.group_protocol,
                                             leader_id: res.leader_id,
                                             member_id: res.member_id,
                                             members: res.members,
                                         })
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key()).into())
                      });

        JoinGroup::new(response)
    }

    fn heartbeat(&self,
                 coordinator: &Broker,
                 group_id: Cow<'a, str>,
                 generation_id: GenerationId,
                 member_id: Cow<'a, str>)
                 -> Heartbeat {
        debug!("member `{}` send heartbeat to group `{}`", member_id, group_id);

        let addr = coordinator.addr().to_socket_addrs().unwrap().next().unwrap();
        let request = KafkaRequest::heartbeat(0,
                                              self.next_correlation_id(),
                                              self.client_id(),
                                              group_id,
                                              generation_id,
                                              member_id);

        let response = self.service
            .call((addr, request))
            .and_then(move |res| if let KafkaResponse::Heartbeat(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(())
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key()).into())
                      });

        Heartbeat::new(response)
    }

    fn leave_group(&self,
                   coordinator: &Broker,
                   group_id: Cow<'a, str>,
                   member_id: Cow<'a, str>)
                   -> LeaveGroup {
        debug!("member `{}` leave group `{}`", member_id, group_id);

        let addr = coordinator.addr().to_socket_addrs().unwrap().next().unwrap();
        let left_group_id: String = (*group_id).to_owned();

        let request = KafkaRequest::leave_group(0,
                                                self.next_correlation_id(),
                                                self.client_id(),
                                                group_id,
                                                member_id);

        let response = self.service
            .call((addr, request))
            .and_then(move |res| if let KafkaResponse::LeaveGroup(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(left_group_id)
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key()).into())
                      });

        LeaveGroup::new(response)
    }

    fn sync_group(&self,
                  coordinator: &Broker,
                  group_id: Cow<'a, str>,
                  generation_id: GenerationId,
                  member_id: Cow<'a, str>,
                  group_assignment: Option<Vec<ConsumerGroupAssignment>>)
                  -> SyncGroup {
        debug!("sync group `{}` # {} with member `{}`",
               group_id,
               generation_id,
               member_id);

        let addr = coordinator.addr().to_socket_addrs().unwrap().next().unwrap();

        let request = KafkaRequest::sync_group(0,
                                               self.next_correlation_id(),
                                               self.client_id(),
                                               group_id,
                                               generation_id,
                                               member_id,
                                               group_assignment.unwrap_or_default());

        let response = self.service
            .call((addr, request))
            .and_then(move |res| if let KafkaResponse::SyncGroup(res) = res {
                          if res.error_code == KafkaCode::None as ErrorCode {
                              future::ok(res.member_assignment)
                          } else {
                              future::err(ErrorKind::KafkaError(res.error_code.into()).into())
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key()).into())
                      });

        SyncGroup::new(response)
    }

    fn commit_offsets(&self,
                      coordinator: &Broker,
                      generation: Generation,
                      retention_time: i64,
                      offsets: HashMap<TopicPartition<'a>, Offset>)
                      -> CommitOffsets {
        let addr = coordinator.addr().to_socket_addrs().unwrap().next().unwrap();

        let mut topics: HashMap<String, Vec<(PartitionId, i64)>> = HashMap::new();
        for (tp, offset) in offsets {
            topics
                .entry(tp.topic_name.into_owned())
                .or_insert_with(Vec::new)
                .push((tp.partition, offset));
        }

        let request = KafkaRequest::offset_commit(2,
                                                  self.next_correlation_id(),
                                                  self.client_id(),
                                                  generation.group_id,
                                                  generation.generation_id,
                                                  generation.member_id,
                                                  retention_time,
                                                  topics);

        let response = self.service
            .call((addr, request))
            .and_then(|res| if let KafkaResponse::OffsetCommit(res) = res {
                          let failed = res.topics
                              .iter()
                              .flat_map(|t| t.partitions.iter())
                              .find(|p| p.error_code != KafkaCode::None as ErrorCode)
                              .map(|p| p.error_code);

                          match failed {
                              Some(code) => future::err(ErrorKind::KafkaError(code.into()).into()),
                              None => future::ok(()),
                          }
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key()).into())
                      });

        CommitOffsets::new(response)
    }

    fn fetch_group_offsets(&self,
                          coordinator: &Broker,
                          group_id: Cow<'a, str>,
                          partitions: Vec<TopicPartition<'a>>)
                          -> FetchGroupOffsets {
        let addr = coordinator.addr().to_socket_addrs().unwrap().next().unwrap();

        let mut topics: HashMap<String, Vec<PartitionId>> = HashMap::new();
        for tp in partitions {
            topics
                .entry(tp.topic_name.into_owned())
                .or_insert_with(Vec::new)
                .push(tp.partition);
        }

        let request = KafkaRequest::offset_fetch(1,
                                                 self.next_correlation_id(),
                                                 self.client_id(),
                                                 group_id.into_owned(),
                                                 topics);

        let response = self.service
            .call((addr, request))
            .and_then(|res| if let KafkaResponse::OffsetFetch(res) = res {
                          let mut offsets = HashMap::new();

                          for topic in res.topics {
                              for partition in topic.partitions {
                                  if partition.error_code == KafkaCode::None as ErrorCode {
                                      offsets.insert(TopicPartition::new(topic.topic_name.clone(),
                                                                         partition.partition)
                                                          .into_owned(),
                                                     partition.offset);
                                  }
                              }
                          }

                          future::ok(offsets)
                      } else {
                          future::err(ErrorKind::UnexpectedResponse(res.api_key()).into())
                      });

        FetchGroupOffsets::new(response)
    }
}

type Topics = HashMap<(SocketAddr, ::protocol::ApiVersion), HashMap<String, Vec<PartitionId>>>;

impl State {
    pub fn next_correlation_id(&mut self) -> CorrelationId {
        self.correlation_id = self.correlation_id.wrapping_add(1);
        self.correlation_id - 1
    }

    pub fn metadata(&self) -> GetMetadata {
        let (sender, receiver) = oneshot::channel();

        match self.metadata_status {
            MetadataStatus::Loading(ref senders) => senders.borrow_mut().push(sender),
            MetadataStatus::Loaded(ref metadata) => drop(sender.send(metadata.clone())),
        }

        GetMetadata::new(receiver.map_err(|_| ErrorKind::Canceled.into()))
    }

    pub fn refresh_metadata(&mut self) {
        if let MetadataStatus::Loaded(_) = self.metadata_status {
            self.metadata_status = MetadataStatus::Loading(Default::default());
        }
    }

    pub fn update_metadata(&mut self, metadata: Rc<Metadata>) {
        let status = mem::replace(&mut self.metadata_status,
                                  MetadataStatus::Loaded(metadata.clone()));

        if let MetadataStatus::Loading(senders) = status {
            for sender in senders.into_inner() {
                drop(sender.send(metadata.clone()));
            }
        }
    }
}

/// The future of loaded metadata.
pub struct LoadMetadata<'a> {
    state: Loading,
    inner: Rc<Inner<'a>>,
}

pub enum Loading {
    Metadata(FetchMetadata),
    ApiVersions(Rc<Metadata>, LoadApiVersions),
    Finished(Rc<Metadata>),
}

impl<'a> LoadMetadata<'a>
    where Self: 'static
{
    fn new(inner: Rc<Inner<'a>>) -> LoadMetadata<'a> {
        let fetch_metadata = inner.fetch_metadata::<&str>(&[]);

        (*inner.state).borrow_mut().refresh_metadata();

        LoadMetadata {
            state: Loading::Metadata(fetch_metadata),
            inner: inner,
        }
    }
}

impl<'a> Future for LoadMetadata<'a>
    where Self: 'static
{
    type Item = Rc<Metadata>;
    type Error = Error;

    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        loop {
            let state;

            match self.state {
                Loading::Metadata(ref mut future) => {
                    match future.poll() {
                        Ok(Async::Ready(metadata)) => {
                            let inner = self.inner.clone();

                            if inner.config.api_version_request {
                                state = Loading::ApiVersions(metadata.clone(),
                                                             inner.load_api_versions(metadata));
                            } else {
                                let fallback_api_versions =
                                    inner.config.broker_version_fallback.api_versions();

                                let metadata =
                                    Rc::new(metadata.with_fallback_api_versions(fallback_api_versions));

                                state = Loading::Finished(metadata);
                            }
                        }
                        Ok(Async::NotReady) => return Ok(Async::NotReady),
                        Err(err) => return Err(err),
                    }
                }
                Loading::ApiVersions(ref metadata, ref mut future) => {
                    match future.poll() {
                        Ok(Async::Ready(api_versions)) => {
                            let metadata = Rc::new(metadata.with_api_versions(api_versions));
                            state = Loading::Finished(metadata);
                        }
                        Ok(Async::NotReady) => return Ok(Async::NotReady),
                        Err(err) => return Err(err),
                    }
                }
                Loading::Finished(ref metadata) => {
                    (*self.inner.state)
                        .borrow_mut()
                        .update_metadata(metadata.clone());

                    return Ok(Async::Ready(metadata.clone()));
                }
            }

            self.state = state;
        }
    }
}

/// A boxed future with the crate's `Error` type, used throughout the Wire
/// Client so each RPC's concrete future type stays hidden behind a simple
/// alias (teacher's `StaticBoxFuture`).
pub struct StaticBoxFuture<T = (), E = Error>(Box<Future<Item = T, Error = E> + 'static>)
    where T: 'static,
          E: 'static;

impl<T, E> StaticBoxFuture<T, E> {
    pub fn new<F>(inner: F) -> Self
        where F: IntoFuture<Item = T, Error = E> + 'static,
              T: 'static,
              E: 'static
    {
        StaticBoxFuture(Box::new(inner.into_future()))
    }

    pub fn ok(item: T) -> Self {
        StaticBoxFuture(Box::new(future::ok(item)))
    }

    pub fn err(err: E) -> Self {
        StaticBoxFuture(Box::new(future::err(err)))
    }
}

impl<T, E> From<ErrorKind> for StaticBoxFuture<T, E>
    where E: From<ErrorKind>
{
    fn from(err: ErrorKind) -> Self {
        Self::err(err.into())
    }
}

impl<T, E> Future for StaticBoxFuture<T, E> {
    type Item = T;
    type Error = E;

    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        self.0.poll()
    }
}

pub type GetMetadata = StaticBoxFuture<Rc<Metadata>>;
pub type FetchMetadata = StaticBoxFuture<Rc<Metadata>>;
pub type FetchApiVersions = StaticBoxFuture<UsableApiVersions>;
pub type LoadApiVersions = StaticBoxFuture<HashMap<BrokerRef, UsableApiVersions>>;

/// Lets any `Future` be boxed up as a `StaticBoxFuture` with `.static_boxed()`,
/// the way `InFlightMiddleware` does to erase its upstream service's future
/// type.
pub trait ToStaticBoxFuture: Future {
    fn static_boxed(self) -> StaticBoxFuture<Self::Item, Self::Error>
        where Self: Sized + 'static
    {
        StaticBoxFuture::new(self)
    }
}

impl<F: Future> ToStaticBoxFuture for F {}
