//! Tracks what a consumer is subscribed to, which partitions of that
//! subscription it currently owns, and the fetch position/pause state of
//! each owned partition (spec.md §3 "GroupState"/"FetchPosition"/
//! invariants, §4.5.5 `unsubscribe`).

use std::collections::{HashMap, HashSet};

use errors::{ErrorKind, Result};
use protocol::Offset;
use network::TopicPartition;

/// Per-partition state tracked only while the partition is assigned: its
/// fetch position (spec.md "FetchPosition": the offset of the last
/// consumed record, `None` until `assign`'s offset-initialization step
/// resolves it) and whether it is currently excluded from the active
/// fetch set by `pause`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PartitionState {
    position: Option<Offset>,
    paused: bool,
}

/// The subscription/assignment/position state of a single `KafkaConsumer`
/// (spec.md §3 Data Model). Owned outright (no borrowed data) so it can
/// live behind an `Rc<RefCell<_>>` shared between the coordinator and the
/// fetch loop without a lifetime threading through every consumer type.
#[derive(Clone, Debug, Default)]
pub struct Subscriptions {
    /// The topics this consumer asked to consume via `subscribe`. `None`
    /// when unsubscribed or when only manual `assign` has ever been used.
    subscription: Option<HashSet<String>>,
    /// The superset of topics subscribed to across the whole group, as
    /// widened by a custom assignor (spec.md's `perform_assignment` note);
    /// tracked so a future metadata refresh can cover topics this member
    /// doesn't itself subscribe to but was handed partitions of.
    group_subscription: HashSet<String>,
    assignment: HashMap<TopicPartition<'static>, PartitionState>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Subscriptions::default()
    }

    /// Record a dynamic subscription (spec.md §4.5.1 step 2). Does not by
    /// itself change the assigned set — that happens when `sync_group`
    /// completes and calls `assign_from_subscribed`.
    pub fn subscribe<I: IntoIterator<Item = String>>(&mut self, topics: I) {
        self.subscription = Some(topics.into_iter().collect());
    }

    /// Whether `subscribe` has ever been called without an intervening
    /// `unsubscribe` (dynamic assignment mode, as opposed to manual
    /// `assign`-only use).
    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    /// The topics currently subscribed to, in no particular order.
    pub fn topics(&self) -> Vec<String> {
        self.subscription
            .as_ref()
            .map(|topics| topics.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn group_subscribe<'a, I: IntoIterator<Item = &'a str>>(&mut self, topics: I) {
        self.group_subscription = topics.into_iter().map(String::from).collect();
    }

    /// Clears subscription, assignment, and offsets (spec.md §4.5.5).
    /// Idempotent and safe on a partially-initialized instance.
    pub fn unsubscribe(&mut self) {
        self.subscription = None;
        self.group_subscription.clear();
        self.assignment.clear();
    }

    /// Sets the assigned partition set, validating that every partition's
    /// topic is within the current subscription when one is active
    /// (spec.md §4.5: `assign` fails with `UnknownTopicOrPartition` if
    /// topics ∉ subscription; manual-assignment mode, with no active
    /// subscription, has nothing to validate against).
    ///
    /// Positions and pause state are preserved for partitions that remain
    /// assigned across the call and dropped for partitions that are not
    /// re-assigned.
    pub fn assign(&mut self, partitions: Vec<TopicPartition<'static>>) -> Result<()> {
        if let Some(ref subscription) = self.subscription {
            for tp in &partitions {
                if !subscription.contains(tp.topic_name.as_ref()) {
                    bail!(ErrorKind::UnknownTopicOrPartition(tp.topic_name.clone().into_owned(), tp.partition));
                }
            }
        }

        let mut assignment = HashMap::with_capacity(partitions.len());

        for tp in partitions {
            let state = self.assignment.get(&tp).cloned().unwrap_or_default();
            assignment.insert(tp, state);
        }

        self.assignment = assignment;

        Ok(())
    }

    /// Like `assign`, but the partition set comes from the assignor's
    /// result after a successful `sync_group` (spec.md §4.5.1 step 6),
    /// rather than from a caller-driven manual `assign` call.
    pub fn assign_from_subscribed(&mut self, partitions: Vec<TopicPartition<'static>>) -> Result<()> {
        self.assign(partitions)
    }

    pub fn is_assigned(&self, tp: &TopicPartition<'static>) -> bool {
        self.assignment.contains_key(tp)
    }

    pub fn assigned_partitions(&self) -> Vec<TopicPartition<'static>> {
        self.assignment.keys().cloned().collect()
    }

    /// Partitions currently assigned but not paused — the set `poll`
    /// should actually fetch (spec.md §4.5.3 step 2).
    pub fn active_partitions(&self) -> Vec<TopicPartition<'static>> {
        self.assignment
            .iter()
            .filter(|&(_, state)| !state.paused)
            .map(|(tp, _)| tp.clone())
            .collect()
    }

    pub fn paused_partitions(&self) -> Vec<TopicPartition<'static>> {
        self.assignment
            .iter()
            .filter(|&(_, state)| state.paused)
            .map(|(tp, _)| tp.clone())
            .collect()
    }

    /// Excludes the given partitions from the active fetch set without
    /// removing them from the assignment (spec.md §4.5: `pause`). Unknown
    /// partitions are silently ignored, matching the operation's "none"
    /// failure contract.
    pub fn pause<'a, I: IntoIterator<Item = &'a TopicPartition<'static>>>(&mut self, partitions: I) {
        for tp in partitions {
            if let Some(state) = self.assignment.get_mut(tp) {
                state.paused = true;
            }
        }
    }

    /// Removes the given partitions from the paused set (spec.md §4.5:
    /// `resume`; §9 design notes — the PHP original's `resume` indexed
    /// `pausedTopicPartitions` by the literal string `"topic"` instead of
    /// the partition's actual topic, a typo. This removes by the real
    /// `(topic, partition)` key, which is the documented intended
    /// behavior, not a literal re-implementation of the bug).
    pub fn resume<'a, I: IntoIterator<Item = &'a TopicPartition<'static>>>(&mut self, partitions: I) {
        for tp in partitions {
            if let Some(state) = self.assignment.get_mut(tp) {
                state.paused = false;
            }
        }
    }

    pub fn position(&self, tp: &TopicPartition<'static>) -> Option<Offset> {
        self.assignment.get(tp).and_then(|state| state.position)
    }

    /// Sets the stored position directly (used by `seek`/`seekToBeginning`/
    /// `seekToEnd`/auto-reset, all of which override the position without
    /// it having come from a just-delivered batch).
    pub fn set_position(&mut self, tp: &TopicPartition<'static>, offset: Offset) -> Result<()> {
        match self.assignment.get_mut(tp) {
            Some(state) => {
                state.position = Some(offset);
                Ok(())
            }
            None => bail!(ErrorKind::UnknownTopicOrPartition(tp.topic_name.clone().into_owned(), tp.partition)),
        }
    }

    /// Every partition currently missing a position: the set `assign`'s
    /// offset-initialization step and the fetch-recovery path need to
    /// resolve before the first fetch (spec.md §3 invariant).
    pub fn missing_positions(&self) -> Vec<TopicPartition<'static>> {
        self.assignment
            .iter()
            .filter(|&(_, state)| state.position.is_none())
            .map(|(tp, _)| tp.clone())
            .collect()
    }

    /// The positions of every assigned partition that has one, as the map
    /// `poll`'s fetch step and `commitSync`'s no-argument form both build
    /// requests from.
    pub fn all_positions(&self) -> HashMap<TopicPartition<'static>, Offset> {
        self.assignment
            .iter()
            .filter_map(|(tp, state)| state.position.map(|offset| (tp.clone(), offset)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(topic: &str, partition: i32) -> TopicPartition<'static> {
        TopicPartition::new(topic.to_owned(), partition)
    }

    #[test]
    fn test_assign_rejects_unsubscribed_topic() {
        let mut subscriptions = Subscriptions::new();
        subscriptions.subscribe(vec!["foo".to_owned()]);

        let err = subscriptions.assign(vec![tp("bar", 0)]);

        assert!(err.is_err());
    }

    #[test]
    fn test_assign_accepts_subscribed_topic() {
        let mut subscriptions = Subscriptions::new();
        subscriptions.subscribe(vec!["foo".to_owned()]);

        assert!(subscriptions.assign(vec![tp("foo", 0), tp("foo", 1)]).is_ok());
        assert_eq!(subscriptions.assigned_partitions().len(), 2);
    }

    #[test]
    fn test_pause_excludes_from_active_but_not_assigned() {
        let mut subscriptions = Subscriptions::new();
        subscriptions.assign(vec![tp("foo", 0), tp("foo", 1)]).unwrap();

        subscriptions.pause(&[tp("foo", 0)]);

        assert_eq!(subscriptions.assigned_partitions().len(), 2);
        assert_eq!(subscriptions.active_partitions(), vec![tp("foo", 1)]);
    }

    #[test]
    fn test_resume_removes_from_paused_by_exact_partition() {
        let mut subscriptions = Subscriptions::new();
        subscriptions.assign(vec![tp("foo", 0), tp("foo", 1)]).unwrap();
        subscriptions.pause(&[tp("foo", 0), tp("foo", 1)]);

        subscriptions.resume(&[tp("foo", 0)]);

        let mut active = subscriptions.active_partitions();
        active.sort_by_key(|tp| tp.partition);
        assert_eq!(active, vec![tp("foo", 0)]);
    }

    #[test]
    fn test_unsubscribe_clears_everything() {
        let mut subscriptions = Subscriptions::new();
        subscriptions.subscribe(vec!["foo".to_owned()]);
        subscriptions.assign(vec![tp("foo", 0)]).unwrap();
        subscriptions.set_position(&tp("foo", 0), 42).unwrap();

        subscriptions.unsubscribe();

        assert!(!subscriptions.has_subscription());
        assert!(subscriptions.assigned_partitions().is_empty());
    }

    #[test]
    fn test_position_tracks_set_position() {
        let mut subscriptions = Subscriptions::new();
        subscriptions.assign(vec![tp("foo", 0)]).unwrap();

        assert_eq!(subscriptions.position(&tp("foo", 0)), None);

        subscriptions.set_position(&tp("foo", 0), 41).unwrap();

        assert_eq!(subscriptions.position(&tp("foo", 0)), Some(41));
    }
}
