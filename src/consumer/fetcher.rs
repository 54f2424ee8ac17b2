//! A thin adapter over the Wire Client's fetch-related RPCs (spec.md
//! §4.2's `fetch`/`fetchTopicPartitionOffsets`), reshaping their
//! `TopicPartition`/topic-keyed result types into the flat
//! `TopicPartition → Offset` maps the Consumer Core's `poll` and
//! `seekToBeginning`/`seekToEnd` want to work with. The partial-failure
//! recovery algorithm of spec.md §4.5.4 lives in `consumer.rs`, not here,
//! since it also needs the coordinator's `commitSync` — this module only
//! wraps what a single RPC round-trip can do.

use std::collections::HashMap;
use std::time::Duration;

use futures::Future;

use errors::Error;
use protocol::{FetchOffset, Offset};
use network::TopicPartition;
use client::{Client, FetchRecordsFuture, KafkaClient};

pub struct Fetcher<'a> {
    client: KafkaClient<'a>,
}

impl<'a> Fetcher<'a> {
    pub fn new(client: KafkaClient<'a>) -> Self {
        Fetcher { client: client }
    }

    /// Issue the fetch RPC for the given positions (spec.md §4.2 `fetch`).
    pub fn fetch(&self,
                 positions: HashMap<TopicPartition<'static>, Offset>,
                 max_wait_time: Duration,
                 min_bytes: i32)
                 -> FetchRecordsFuture {
        let offsets = positions
            .into_iter()
            .map(|(tp, offset)| (TopicPartition::new(tp.topic_name.into_owned(), tp.partition), offset))
            .collect();

        self.client.fetch(offsets, max_wait_time, min_bytes)
    }

    /// Resolves the given partitions to the offset matching `at` (spec.md
    /// §4.2 `fetchTopicPartitionOffsets`; used by `seekToBeginning`,
    /// `seekToEnd`, `assign`'s auto-reset step, and the §4.5.4 recovery
    /// path, always with an explicit policy rather than the consumer's
    /// configured auto-reset).
    pub fn list_offsets(&self,
                        partitions: Vec<TopicPartition<'static>>,
                        at: FetchOffset)
                        -> Box<Future<Item = HashMap<TopicPartition<'static>, Offset>, Error = Error>> {
        let by_topic: HashMap<String, Vec<i32>> = partitions
            .iter()
            .fold(HashMap::new(), |mut acc, tp| {
                acc.entry(tp.topic_name.clone().into_owned()).or_insert_with(Vec::new).push(tp.partition);
                acc
            });

        let flat_partitions: Vec<TopicPartition<'a>> = partitions
            .iter()
            .map(|tp| TopicPartition::new(tp.topic_name.clone().into_owned(), tp.partition))
            .collect();

        let future = self.client
            .fetch_offsets(flat_partitions, at)
            .map(move |offsets_by_topic| {
                let mut result = HashMap::new();

                for (topic, partition_offsets) in offsets_by_topic {
                    if !by_topic.contains_key(&topic) {
                        continue;
                    }

                    for partition_offset in partition_offsets {
                        result.insert(TopicPartition::new(topic.clone(), partition_offset.partition),
                                     partition_offset.offset);
                    }
                }

                result
            });

        Box::new(future)
    }
}
