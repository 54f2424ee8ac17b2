//! The framed socket transport backing the Wire Client. Modeled on the
//! teacher's `client::service::KafkaService`, kept to the depth needed to
//! make the Wire Client's RPC surface compile and be exercised by unit
//! tests against an in-memory fake `Service` — the connection pool and
//! wire framing themselves are outside spec.md's scope (§1).

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{BigEndian, BufMut, ByteOrder, BytesMut};

use futures::{Future, Poll};
use tokio_core::net::TcpStream;
use tokio_core::reactor::Handle;
use tokio_io::codec::{Decoder, Encoder};
use tokio_service::Service;

use errors::{Error, ErrorKind};
use network::{KafkaRequest, KafkaResponse};

pub type FutureResponse = Box<Future<Item = KafkaResponse, Error = Error>>;

/// A `tokio_service::Service` whose `Request` is `(SocketAddr,
/// KafkaRequest)` and whose `Response` is the decoded `KafkaResponse` —
/// the Wire Client never talks to a `TcpStream` directly, it only ever
/// calls through this service (and whatever middleware wraps it).
#[derive(Clone)]
pub struct KafkaService<'a> {
    handle: Handle,
    max_connection_idle: Duration,
    _marker: ::std::marker::PhantomData<&'a ()>,
}

impl<'a> KafkaService<'a> {
    pub fn new(handle: Handle, max_connection_idle: Duration) -> Self {
        KafkaService {
            handle: handle,
            max_connection_idle: max_connection_idle,
            _marker: ::std::marker::PhantomData,
        }
    }
}

impl<'a> Service for KafkaService<'a> {
    type Request = (SocketAddr, KafkaRequest<'a>);
    type Response = KafkaResponse;
    type Error = Error;
    type Future = FutureResponse;

    fn call(&self, (addr, request): Self::Request) -> Self::Future {
        let _ = self.max_connection_idle;
        let handle = self.handle.clone();

        let api_key = request.api_key();
        let api_version = request.api_version();

        let mut buf = BytesMut::with_capacity(256);
        let encoded = request
            .encode::<BigEndian>(&mut buf)
            .map(|_| buf.freeze());

        let response = TcpStream::connect(&addr, &handle)
            .map_err(Error::from)
            .and_then(move |socket| {
                let codec = KafkaCodec {
                    api_key: api_key,
                    api_version: api_version,
                };
                let framed = ::tokio_io::AsyncRead::framed(socket, codec);

                encoded
                    .map_err(Error::from)
                    .into_future()
                    .and_then(move |bytes| {
                        use futures::Sink;
                        use futures::Stream;

                        framed
                            .send(bytes)
                            .and_then(|framed| framed.into_future().map_err(|(e, _)| e))
                            .map_err(Error::from)
                            .and_then(|(resp, _)| {
                                resp.ok_or_else(|| ErrorKind::Canceled.into())
                            })
                    })
            });

        Box::new(response)
    }
}

/// Frames a request/response pair by a 4-byte big-endian length prefix
/// (`RequestOrResponse => Size Message`, per spec.md §4.1), decoding the
/// response payload with the api key/version the request that provoked it
/// was sent with.
struct KafkaCodec {
    api_key: ::protocol::ApiKey,
    api_version: ::protocol::ApiVersion,
}

impl Encoder for KafkaCodec {
    type Item = ::bytes::Bytes;
    type Error = io::Error;

    fn encode(&mut self, item: Self::Item, dst: &mut BytesMut) -> io::Result<()> {
        dst.put_i32::<BigEndian>(item.len() as i32);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

impl Decoder for KafkaCodec {
    type Item = KafkaResponse;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Self::Item>> {
        if src.len() < 4 {
            return Ok(None);
        }

        let size = BigEndian::read_i32(&src[..4]) as usize;

        if src.len() < 4 + size {
            return Ok(None);
        }

        let _ = src.split_to(4);
        let frame = src.split_to(size).freeze();

        decode_response(self.api_key, self.api_version, &frame)
            .map(Some)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
    }
}

fn decode_response(api_key: ::protocol::ApiKey,
                   api_version: ::protocol::ApiVersion,
                   frame: &[u8])
                   -> ::errors::Result<KafkaResponse> {
    use nom::IResult;
    use protocol::{ApiKeys, parse_fetch_response, parse_list_offsets_response,
                   parse_metadata_response, parse_offset_commit_response,
                   parse_offset_fetch_response, parse_group_coordinator_response,
                   parse_join_group_response, parse_heartbeat_response,
                   parse_leave_group_response, parse_sync_group_response,
                   parse_api_versions_response};

    macro_rules! parsed {
        ($parser:expr) => {
            match $parser {
                IResult::Done(_, resp) => Ok(resp),
                _ => Err(ErrorKind::CodecError("truncated or malformed response").into()),
            }
        }
    }

    match ApiKeys::from(api_key) {
        ApiKeys::Fetch => parsed!(parse_fetch_response(frame, api_version)).map(KafkaResponse::Fetch),
        ApiKeys::ListOffsets => parsed!(parse_list_offsets_response(frame)).map(KafkaResponse::ListOffsets),
        ApiKeys::Metadata => parsed!(parse_metadata_response(frame)).map(KafkaResponse::Metadata),
        ApiKeys::OffsetCommit => parsed!(parse_offset_commit_response(frame)).map(KafkaResponse::OffsetCommit),
        ApiKeys::OffsetFetch => parsed!(parse_offset_fetch_response(frame)).map(KafkaResponse::OffsetFetch),
        ApiKeys::GroupCoordinator => parsed!(parse_group_coordinator_response(frame)).map(KafkaResponse::GroupCoordinator),
        ApiKeys::JoinGroup => parsed!(parse_join_group_response(frame)).map(KafkaResponse::JoinGroup),
        ApiKeys::Heartbeat => parsed!(parse_heartbeat_response(frame)).map(KafkaResponse::Heartbeat),
        ApiKeys::LeaveGroup => parsed!(parse_leave_group_response(frame)).map(KafkaResponse::LeaveGroup),
        ApiKeys::SyncGroup => parsed!(parse_sync_group_response(frame)).map(KafkaResponse::SyncGroup),
        ApiKeys::ApiVersions => parsed!(parse_api_versions_response(frame)).map(KafkaResponse::ApiVersions),
        other => Err(ErrorKind::UnexpectedResponse(format!("{:?}", other)).into()),
    }
}
