//! The `protocol_type` consumer groups speak (spec.md §4.3): a plain marker
//! so `JoinGroup`'s `protocol_type` field reads the same way a Java client's
//! does, with no behavior of its own.

/// The single `protocol_type` this crate's groups join with. Kafka uses
/// the same constant to let brokers tell consumer groups apart from other
/// group protocols (Kafka Connect, etc).
pub const CONSUMER_PROTOCOL: &str = "consumer";

/// Marker type for the `consumer` group protocol; exists so call sites can
/// name the protocol without repeating the string constant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumerProtocol;

impl ConsumerProtocol {
    /// The `Subscription`/`Assignment` payload version this crate encodes
    /// (spec.md §6).
    pub const VERSION: i16 = 0;
}
