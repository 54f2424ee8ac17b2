use std::mem;
use std::rc::Rc;
use std::cell::RefCell;
use std::time::Duration;
use std::iter::FromIterator;
use std::collections::{HashMap, HashSet};

use futures::Future;

use errors::{ErrorKind, Result};
use protocol::{KafkaCode, Schema};
use client::{Broker, Client, ConsumerGroupAssignment, ConsumerGroupMember, ConsumerGroupProtocol,
             Generation, KafkaClient, Metadata, StaticBoxFuture};
use consumer::{Assignment, CONSUMER_PROTOCOL, PartitionAssignor, Subscription, Subscriptions};

/// Manages the coordination process with the consumer group coordinator
/// (spec.md §4.3/§4.5.1-§4.5.3): joining and leaving the group, computing
/// or receiving the partition assignment, and sending the heartbeats that
/// keep the member's session alive between `poll()` calls.
pub trait Coordinator {
    /// Join the consumer group, running the full `JoinGroup`/`SyncGroup`
    /// handshake and (for the leader) computing the assignment.
    fn join_group(&mut self) -> JoinGroup;

    /// Send a single heartbeat to the coordinator for the current
    /// generation. Resolves immediately to `()` if the member isn't
    /// currently stable (nothing to heartbeat yet) rather than erroring,
    /// since `poll()` may race a rebalance in flight.
    fn heartbeat(&self) -> Heartbeat;

    /// Leave the current consumer group.
    fn leave_group(&mut self) -> LeaveGroup;

    /// Whether the member currently believes it holds a stable group
    /// membership (has a coordinator and generation to heartbeat with).
    fn is_stable(&self) -> bool;

    /// The generation of the current stable membership, if any.
    fn generation(&self) -> Option<Generation>;

    /// The coordinator broker of the current stable membership, if any.
    fn coordinator_broker(&self) -> Option<Broker>;

    /// The shared subscription/assignment state this coordinator updates
    /// as group membership changes.
    fn subscriptions(&self) -> Rc<RefCell<Subscriptions>>;
}

pub type JoinGroup = StaticBoxFuture;
pub type LeaveGroup = StaticBoxFuture;
pub type Heartbeat = StaticBoxFuture;

/// Manages the coordination process with the consumer coordinator.
pub struct ConsumerCoordinator<'a> {
    inner: Rc<Inner<'a>>,
}

struct Inner<'a> {
    client: KafkaClient<'a>,
    group_id: String,
    subscriptions: Rc<RefCell<Subscriptions>>,
    session_timeout: Duration,
    rebalance_timeout: Duration,
    heartbeat_interval: Duration,
    retry_backoff: Duration,
    assignors: Vec<Box<PartitionAssignor>>,
    state: Rc<RefCell<State>>,
}

enum State {
    /// the client is not part of a group
    Unjoined,
    /// the client has begun rebalancing
    Rebalancing,
    /// the client has joined and is sending heartbeats
    Stable {
        coordinator: Broker,
        generation: Generation,
    },
}

impl State {
    pub fn member_id(&self) -> Option<String> {
        if let State::Stable { ref generation, .. } = *self {
            Some(generation.member_id.clone())
        } else {
            None
        }
    }

    pub fn rebalance(&mut self) -> Self {
        mem::replace(self, State::Rebalancing)
    }

    pub fn joined(&mut self, coordinator: Broker, generation: Generation) -> State {
        mem::replace(self,
                     State::Stable {
                         coordinator: coordinator,
                         generation: generation,
                     })
    }

    pub fn leave(&mut self) -> Self {
        mem::replace(self, State::Unjoined)
    }
}

impl<'a> ConsumerCoordinator<'a> {
    pub fn new(client: KafkaClient<'a>,
               group_id: String,
               subscriptions: Rc<RefCell<Subscriptions>>,
               session_timeout: Duration,
               rebalance_timeout: Duration,
               heartbeat_interval: Duration,
               retry_backoff: Duration,
               assignors: Vec<Box<PartitionAssignor>>)
               -> Self {
        ConsumerCoordinator {
            inner: Rc::new(Inner {
                               client: client,
                               group_id: group_id,
                               subscriptions: subscriptions,
                               session_timeout: session_timeout,
                               rebalance_timeout: rebalance_timeout,
                               heartbeat_interval: heartbeat_interval,
                               retry_backoff: retry_backoff,
                               assignors: assignors,
                               state: Rc::new(RefCell::new(State::Unjoined)),
                           }),
        }
    }

    /// The configured heartbeat interval (spec.md §4.5.3: how often
    /// `poll()` should drive a heartbeat tick while stable).
    pub fn heartbeat_interval(&self) -> Duration {
        self.inner.heartbeat_interval
    }

    /// The configured session timeout (spec.md §4.5.6: how long a missed
    /// heartbeat window may last before the coordinator evicts the
    /// member).
    pub fn session_timeout(&self) -> Duration {
        self.inner.session_timeout
    }

    pub fn retry_backoff(&self) -> Duration {
        self.inner.retry_backoff
    }
}

impl<'a> Inner<'a>
    where Self: 'static
{
    fn group_protocols(&self) -> Vec<ConsumerGroupProtocol> {
        let topics: Vec<String> = self.subscriptions.borrow().topics().into_iter().collect();

        self.assignors
            .iter()
            .flat_map(move |assignor| {
                let subscription = assignor.subscription(topics.clone());

                Schema::serialize(&subscription)
                    .map_err(|err| warn!("fail to serialize subscription, {}", err))
                    .ok()
                    .map(|metadata| {
                             ConsumerGroupProtocol {
                                 protocol_name: assignor.name().into(),
                                 protocol_metadata: metadata.into(),
                             }
                         })
            })
            .collect()
    }

    fn perform_assignment(&self,
                          metadata: &Metadata,
                          group_protocol: &str,
                          members: &[ConsumerGroupMember])
                          -> Result<Vec<ConsumerGroupAssignment>> {
        let strategy = group_protocol.parse()?;
        let assignor = self.assignors
            .iter()
            .find(|assignor| assignor.strategy() == strategy)
            .ok_or_else(|| ErrorKind::UnsupportedAssignmentStrategy(group_protocol.to_owned()))?;

        let mut subscribed_topics = HashSet::new();
        let mut subscriptions = HashMap::new();

        for member in members {
            let subscription: Subscription = Schema::deserialize(member.member_metadata.as_ref())?;

            subscribed_topics.extend(subscription.topics.iter().cloned());
            subscriptions.insert(member.member_id.clone(), subscription);
        }

        let assignment = assignor.assign(metadata, subscriptions);

        // A custom assignor may have assigned partitions of topics no
        // member explicitly subscribed to; fold those into the group's
        // subscribed set so a later metadata refresh doesn't trigger a
        // spurious rebalance over them.

        let mut assigned_topics = HashSet::new();

        assigned_topics.extend(assignment
                                   .values()
                                   .flat_map(|member| {
                                                 member.partitions
                                                     .iter()
                                                     .map(|tp| tp.topic_name.clone().into_owned())
                                             }));

        let not_assigned_topics = &subscribed_topics - &assigned_topics;

        if !not_assigned_topics.is_empty() {
            warn!("the following subscribed topics are not assigned to any members in group `{}`: {}",
                  self.group_id,
                  Vec::from_iter(not_assigned_topics.iter().cloned())
                      .as_slice()
                      .join(","));
        }

        let newly_added_topics = &assigned_topics - &subscribed_topics;

        if !newly_added_topics.is_empty() {
            info!("the following not-subscribed topics are assigned to group `{}`, and their metadata will be fetched from the brokers: {}",
                  self.group_id,
                  Vec::from_iter(newly_added_topics.iter().cloned())
                      .as_slice()
                      .join(","));

            subscribed_topics.extend(assigned_topics);
        }

        self.subscriptions
            .borrow_mut()
            .group_subscribe(subscribed_topics.iter().map(String::as_str));

        let mut group_assignment = Vec::new();

        for (member_id, assignment) in assignment {
            group_assignment.push(ConsumerGroupAssignment {
                                      member_id: member_id,
                                      member_assignment: Schema::serialize(&assignment)?.into(),
                                  })
        }

        Ok(group_assignment)
    }

    fn synced_group(&self, assignment: Assignment, coordinator: Broker, generation: Generation) -> Result<()> {
        trace!("member `{}` synced up to generation # {} with {} partitions: {:?}",
               generation.member_id,
               generation.generation_id,
               assignment.partitions.len(),
               assignment.partitions);

        self.subscriptions
            .borrow_mut()
            .assign_from_subscribed(assignment.partitions)?;

        self.state.borrow_mut().joined(coordinator, generation);

        Ok(())
    }
}

impl<'a> Coordinator for ConsumerCoordinator<'a>
    where Self: 'static
{
    fn join_group(&mut self) -> JoinGroup {
        self.inner.state.borrow_mut().rebalance();

        let inner = self.inner.clone();
        let client = self.inner.client.clone();
        let member_id = self.inner.state.borrow().member_id().unwrap_or_default();
        let group_id = self.inner.group_id.clone();
        let session_timeout = self.inner.session_timeout;
        let rebalance_timeout = self.inner.rebalance_timeout;
        let group_protocols = self.inner.group_protocols();
        let state = self.inner.state.clone();

        debug!("member `{}` is joining the `{}` group", member_id, group_id);

        let future = self.inner
            .client
            .metadata()
            .join(self.inner.client.group_coordinator(group_id.clone().into()))
            .and_then(move |(metadata, coordinator)| {
                client
                    .join_group(&coordinator,
                                group_id.clone().into(),
                                session_timeout.as_millis() as i32,
                                rebalance_timeout.as_millis() as i32,
                                member_id.clone().into(),
                                CONSUMER_PROTOCOL.into(),
                                group_protocols)
                    .and_then(move |consumer_group| {
                        let generation = consumer_group.generation();

                        let group_assignment = if !consumer_group.is_leader() {
                            debug!("member `{}` joined group `{}` as follower",
                                   member_id,
                                   group_id);

                            None
                        } else {
                            debug!("member `{}` joined group `{}` as leader",
                                   member_id,
                                   group_id);

                            match inner.perform_assignment(&metadata,
                                                           &consumer_group.protocol,
                                                           &consumer_group.members) {
                                Ok(group_assignment) => Some(group_assignment),
                                Err(err) => return JoinGroup::err(err),
                            }
                        };

                        let sync_coordinator = coordinator.clone();

                        let future = client
                            .sync_group(&coordinator, generation.clone(), group_assignment)
                            .and_then(move |assignment| {
                                          debug!("group `{}` synced up", group_id);

                                          inner.synced_group(Schema::deserialize(&assignment[..])?,
                                                             sync_coordinator,
                                                             generation)
                                      });

                        JoinGroup::new(future)
                    })
            })
            .map_err(move |err| {
                         warn!("fail to join group, {}", err);

                         state.borrow_mut().leave();

                         err
                     });

        JoinGroup::new(future)
    }

    fn heartbeat(&self) -> Heartbeat {
        let state = self.inner.state.borrow();

        if let State::Stable { ref coordinator, ref generation } = *state {
            Heartbeat::new(self.inner.client.heartbeat(coordinator, generation.clone()))
        } else {
            Heartbeat::ok(())
        }
    }

    fn leave_group(&mut self) -> LeaveGroup {
        let state = self.inner.state.borrow_mut().leave();

        if let State::Stable { coordinator, generation } = state {
            let group_id = self.inner.group_id.clone();

            debug!("member `{}` is leaving the `{}` group",
                   generation.member_id,
                   group_id);

            LeaveGroup::new(self.inner
                                .client
                                .leave_group(&coordinator, generation)
                                .map(|group_id| {
                                         debug!("member has left the `{}` group", group_id);
                                     }))
        } else {
            LeaveGroup::err(ErrorKind::KafkaError(KafkaCode::GroupLoadInProgress).into())
        }
    }

    fn is_stable(&self) -> bool {
        match *self.inner.state.borrow() {
            State::Stable { .. } => true,
            _ => false,
        }
    }

    fn generation(&self) -> Option<Generation> {
        match *self.inner.state.borrow() {
            State::Stable { ref generation, .. } => Some(generation.clone()),
            _ => None,
        }
    }

    fn coordinator_broker(&self) -> Option<Broker> {
        match *self.inner.state.borrow() {
            State::Stable { ref coordinator, .. } => Some(coordinator.clone()),
            _ => None,
        }
    }

    fn subscriptions(&self) -> Rc<RefCell<Subscriptions>> {
        self.inner.subscriptions.clone()
    }
}
