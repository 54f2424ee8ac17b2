//! The crate's error taxonomy (spec.md §7).
//!
//! `KafkaCode`, the numeric error codes a broker reports, lives in
//! `protocol` since it's part of the wire format; this module wraps it
//! (and every other failure mode the consumer core surfaces) in a single
//! `error_chain!`-generated `Error`/`ErrorKind` pair.

use std::collections::HashMap;

use network::{FetchRecords, TopicPartition};
use protocol::KafkaCode;

error_chain!{
    foreign_links {
        IoError(::std::io::Error);
        ParseError(::nom::ErrorKind);
    }

    errors {
        /// A broker rejected a request with a non-zero error code. Whether
        /// this is worth retrying is `KafkaCode::is_retriable()`, not a
        /// separate `ErrorKind` variant.
        KafkaError(code: KafkaCode) {
            description("kafka broker error")
            display("kafka broker error: {:?}", code)
        }

        /// A malformed or truncated wire payload; carries a short static
        /// description of what was being decoded.
        CodecError(reason: &'static str) {
            description("codec error")
            display("codec error: {}", reason)
        }

        /// A record, offset lookup, or assignment referenced a topic or
        /// partition not present in the cached cluster metadata.
        UnknownTopicOrPartition(topic: String, partition: i32) {
            description("unknown topic or partition")
            display("unknown topic or partition: {}-{}", topic, partition)
        }

        /// `PartitionAssignor::assign` produced a result that leaves one or
        /// more joining members with no partitions and the strategy in use
        /// doesn't tolerate that (spec.md §4.4 edge cases).
        EmptyAssignment {
            description("assignment strategy produced an empty assignment")
        }

        /// None of the assignment strategy names offered in `JoinGroup`
        /// overlap with the strategies this member supports.
        UnsupportedAssignmentStrategy(name: String) {
            description("unsupported assignment strategy")
            display("unsupported assignment strategy: {}", name)
        }

        /// An operation that requires a stable group membership (fetch,
        /// commit) was called while the consumer is unsubscribed or mid
        /// rebalance (spec.md §4.5.6: "Commits and fetches are rejected
        /// outside ASSIGNED").
        IllegalState(reason: &'static str) {
            description("illegal consumer state")
            display("illegal consumer state: {}", reason)
        }

        /// An argument violates a precondition the caller is expected to
        /// satisfy itself (an empty topic/partition list, an unparsable
        /// config value) rather than something a retry or rebalance can
        /// repair (spec.md §7, "user errors").
        InvalidArgument(reason: String) {
            description("invalid argument")
            display("invalid argument: {}", reason)
        }

        /// No broker in the cached cluster metadata is acting as this
        /// group's coordinator, or the coordinator it names isn't in the
        /// broker list.
        BrokerNotFound(broker_id: i32) {
            description("broker not found")
            display("broker not found: {}", broker_id)
        }

        /// A response didn't match the request that was sent for it
        /// (wrong correlation id, wrong response shape).
        UnexpectedResponse(reason: String) {
            description("unexpected response")
            display("unexpected response: {}", reason)
        }

        /// The in-flight request was dropped before a response arrived,
        /// typically because the client or consumer was shut down.
        Canceled {
            description("request canceled")
        }

        /// A `poll` fetched some partitions successfully and failed on
        /// others; `partial` carries the records that did arrive so a
        /// caller need not lose them to retry the rest (spec.md §4.5.4,
        /// §8 property 3). Boxed so the recursive `Error` reference in
        /// the map doesn't make `ErrorKind` infinitely sized.
        FetchPartiallyFailed(partial: FetchRecords, errors: Box<HashMap<TopicPartition<'static>, Error>>) {
            description("fetch partially failed")
        }
    }
}

impl From<KafkaCode> for ErrorKind {
    fn from(code: KafkaCode) -> Self {
        ErrorKind::KafkaError(code)
    }
}

impl Error {
    /// Decomposes a `FetchPartiallyFailed` error back into its partial
    /// result and per-partition error map, for the fetch recovery path
    /// (spec.md §4.5.4) that needs to act on the partial batch before
    /// deciding whether to retry or propagate. Any other error is handed
    /// straight back unchanged.
    pub fn into_partial_fetch(self) -> ::std::result::Result<(FetchRecords, HashMap<TopicPartition<'static>, Error>), Error> {
        match self {
            Error(ErrorKind::FetchPartiallyFailed(partial, errors), _) => Ok((partial, *errors)),
            other => Err(other),
        }
    }
}
