//! The binary scheme codec proper (spec.md §4.1): a small trait that lets a
//! structured value describe its own wire encoding, so the group-membership
//! payloads embedded inside `JoinGroup`/`SyncGroup` (themselves opaque
//! `bytes` fields of the outer protocol, see `protocol::group`) can be
//! serialized and parsed without a bespoke request/response type for each
//! one.

use bytes::{BigEndian, Bytes, BytesMut};

use errors::Result;

/// Maximum element count accepted for any counted array this codec parses.
/// Guards against a corrupt or hostile length prefix triggering an
/// unbounded allocation before the bytes backing it have even arrived.
pub const MAX_CODEC_ARRAY_LEN: usize = 1_000_000;

/// A value that knows how to encode itself to, and parse itself from, the
/// codec's binary wire format. `Subscription` and `MemberAssignment`
/// (`consumer::assignor`) are the two scheme-level payloads this crate
/// needs; `protocol::message`, `protocol::fetch` and friends implement the
/// lower-level `Encodable` trait directly since their shapes are fixed
/// protocol requests/responses rather than user-composable schemes.
pub trait Schema: Sized {
    /// Encode `self` into `buf` using the codec's big-endian wire format.
    fn encode_to(&self, buf: &mut BytesMut) -> Result<()>;

    /// Parse a value of `Self` out of `buf`, which must contain exactly one
    /// encoded value (trailing bytes are an error — the embedding protocol
    /// field is always length-prefixed by its own request/response shape).
    fn decode_from(buf: &[u8]) -> Result<Self>;

    /// Encode `self` as a standalone `Bytes` value, ready to embed as the
    /// opaque `member_metadata`/`member_assignment` field of a `JoinGroup`
    /// or `SyncGroup` request.
    fn serialize(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(64);
        self.encode_to(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Parse a value of `Self` out of the opaque bytes returned by the
    /// coordinator in a `JoinGroup`/`SyncGroup` response.
    fn deserialize(buf: &[u8]) -> Result<Self> {
        Self::decode_from(buf)
    }
}

/// Shorthand used by every `Schema::encode_to` implementation; kept as a
/// type alias rather than a generic parameter on `Schema` itself because
/// every scheme payload this crate defines is big-endian, matching the
/// rest of the Kafka wire protocol.
pub type SchemaByteOrder = BigEndian;
