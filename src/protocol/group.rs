use bytes::{Bytes, BufMut, ByteOrder, BytesMut};

use nom::{be_i16, be_i32};

use errors::Result;
use protocol::{Encodable, ErrorCode, GenerationId, ParseTag, RequestHeader, ResponseHeader,
               WriteExt, array_len_ok, parse_bytes, parse_response_header, parse_string};

/// `GroupCoordinator => group_id` (api key 10, v0). Finds the broker acting
/// as coordinator for a consumer group (spec.md §4.3).
#[derive(Clone, Debug, PartialEq)]
pub struct GroupCoordinatorRequest<'a> {
    pub header: RequestHeader<'a>,
    pub group_id: String,
}

impl<'a> Encodable for GroupCoordinatorRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;
        dst.put_str::<T, _>(Some(self.group_id))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupCoordinatorResponse {
    pub header: ResponseHeader,
    pub error_code: ErrorCode,
    pub coordinator_id: i32,
    pub coordinator_host: String,
    pub coordinator_port: i32,
}

named!(pub parse_group_coordinator_response<GroupCoordinatorResponse>,
    parse_tag!(ParseTag::GroupCoordinator,
        do_parse!(
            header: parse_response_header
         >> error_code: be_i16
         >> coordinator_id: be_i32
         >> coordinator_host: parse_string
         >> coordinator_port: be_i32
         >> (GroupCoordinatorResponse {
                header: header,
                error_code: error_code,
                coordinator_id: coordinator_id,
                coordinator_host: coordinator_host,
                coordinator_port: coordinator_port,
            })
        )
    )
);

/// `JoinGroup => group_id session_timeout [rebalance_timeout] member_id
/// protocol_type [group_protocols]` (api key 11, v1). Each group protocol
/// carries an opaque, codec-encoded `Subscription` (`consumer::assignor`) as
/// its metadata bytes; this module treats that payload as plain `Bytes`.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinGroupRequest<'a> {
    pub header: RequestHeader<'a>,
    pub group_id: String,
    pub session_timeout: i32,
    pub rebalance_timeout: i32,
    pub member_id: String,
    pub protocol_type: String,
    pub group_protocols: Vec<JoinGroupProtocol>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinGroupProtocol {
    pub protocol_name: String,
    pub metadata: Bytes,
}

impl<'a> Encodable for JoinGroupRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;

        dst.put_str::<T, _>(Some(self.group_id))?;
        dst.put_i32::<T>(self.session_timeout);
        dst.put_i32::<T>(self.rebalance_timeout);
        dst.put_str::<T, _>(Some(self.member_id))?;
        dst.put_str::<T, _>(Some(self.protocol_type))?;
        dst.put_array::<T, _, _>(self.group_protocols, |buf, protocol| {
            buf.put_str::<T, _>(Some(protocol.protocol_name))?;
            buf.put_bytes::<T, _>(Some(protocol.metadata))
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinGroupResponse {
    pub header: ResponseHeader,
    pub error_code: ErrorCode,
    pub generation_id: GenerationId,
    pub group_protocol: String,
    pub leader_id: String,
    pub member_id: String,
    pub members: Vec<JoinGroupMember>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinGroupMember {
    pub member_id: String,
    pub member_metadata: Bytes,
}

impl JoinGroupResponse {
    /// `true` when this member is the group's leader and so must compute
    /// the partition assignment in the following `SyncGroup` (spec.md
    /// §4.5.1 step 2).
    pub fn is_leader(&self) -> bool {
        self.leader_id == self.member_id
    }
}

named!(pub parse_join_group_response<JoinGroupResponse>,
    parse_tag!(ParseTag::JoinGroup,
        do_parse!(
            header: parse_response_header
         >> error_code: be_i16
         >> generation_id: be_i32
         >> group_protocol: parse_string
         >> leader_id: parse_string
         >> member_id: parse_string
         >> members: parse_tag!(ParseTag::JoinGroupMembers,
                length_count!(verify!(be_i32, array_len_ok), parse_join_group_member))
         >> (JoinGroupResponse {
                header: header,
                error_code: error_code,
                generation_id: generation_id,
                group_protocol: group_protocol,
                leader_id: leader_id,
                member_id: member_id,
                members: members,
            })
        )
    )
);

named!(parse_join_group_member<JoinGroupMember>,
    do_parse!(
        member_id: parse_string
     >> member_metadata: parse_bytes
     >> (JoinGroupMember {
            member_id: member_id,
            member_metadata: member_metadata.unwrap_or_default(),
        })
    )
);

/// `SyncGroup => group_id generation_id member_id [group_assignment]` (api
/// key 14, v0). Only the leader sends a non-empty `group_assignment`;
/// followers send an empty array and receive their slice of the computed
/// assignment back in the response (spec.md §4.5.1 step 3).
#[derive(Clone, Debug, PartialEq)]
pub struct SyncGroupRequest<'a> {
    pub header: RequestHeader<'a>,
    pub group_id: String,
    pub generation_id: GenerationId,
    pub member_id: String,
    pub group_assignment: Vec<SyncGroupAssignment>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyncGroupAssignment {
    pub member_id: String,
    pub member_assignment: Bytes,
}

impl<'a> Encodable for SyncGroupRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;

        dst.put_str::<T, _>(Some(self.group_id))?;
        dst.put_i32::<T>(self.generation_id);
        dst.put_str::<T, _>(Some(self.member_id))?;
        dst.put_array::<T, _, _>(self.group_assignment, |buf, assignment| {
            buf.put_str::<T, _>(Some(assignment.member_id))?;
            buf.put_bytes::<T, _>(Some(assignment.member_assignment))
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyncGroupResponse {
    pub header: ResponseHeader,
    pub error_code: ErrorCode,
    pub member_assignment: Bytes,
}

named!(pub parse_sync_group_response<SyncGroupResponse>,
    parse_tag!(ParseTag::SyncGroup,
        do_parse!(
            header: parse_response_header
         >> error_code: be_i16
         >> member_assignment: parse_bytes
         >> (SyncGroupResponse {
                header: header,
                error_code: error_code,
                member_assignment: member_assignment.unwrap_or_default(),
            })
        )
    )
);

/// `Heartbeat => group_id generation_id member_id` (api key 12, v0).
#[derive(Clone, Debug, PartialEq)]
pub struct HeartbeatRequest<'a> {
    pub header: RequestHeader<'a>,
    pub group_id: String,
    pub generation_id: GenerationId,
    pub member_id: String,
}

impl<'a> Encodable for HeartbeatRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;

        dst.put_str::<T, _>(Some(self.group_id))?;
        dst.put_i32::<T>(self.generation_id);
        dst.put_str::<T, _>(Some(self.member_id))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeartbeatResponse {
    pub header: ResponseHeader,
    pub error_code: ErrorCode,
}

named!(pub parse_heartbeat_response<HeartbeatResponse>,
    parse_tag!(ParseTag::Heartbeat,
        do_parse!(
            header: parse_response_header
         >> error_code: be_i16
         >> (HeartbeatResponse { header: header, error_code: error_code })
        )
    )
);

/// `LeaveGroup => group_id member_id` (api key 13, v0).
#[derive(Clone, Debug, PartialEq)]
pub struct LeaveGroupRequest<'a> {
    pub header: RequestHeader<'a>,
    pub group_id: String,
    pub member_id: String,
}

impl<'a> Encodable for LeaveGroupRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)?;

        dst.put_str::<T, _>(Some(self.group_id))?;
        dst.put_str::<T, _>(Some(self.member_id))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeaveGroupResponse {
    pub header: ResponseHeader,
    pub error_code: ErrorCode,
}

named!(pub parse_leave_group_response<LeaveGroupResponse>,
    parse_tag!(ParseTag::LeaveGroup,
        do_parse!(
            header: parse_response_header
         >> error_code: be_i16
         >> (LeaveGroupResponse { header: header, error_code: error_code })
        )
    )
);

#[cfg(test)]
mod tests {
    use bytes::{BigEndian, Bytes, BytesMut};
    use nom::IResult;

    use super::*;
    use protocol::{ApiKey, ApiKeys, RequestHeader};

    fn header(api_key: ApiKeys, api_version: i16) -> RequestHeader<'static> {
        RequestHeader {
            api_key: api_key as ApiKey,
            api_version: api_version,
            correlation_id: 1,
            client_id: Some("client".into()),
        }
    }

    #[test]
    fn test_encode_join_group_request() {
        let req = JoinGroupRequest {
            header: header(ApiKeys::JoinGroup, 1),
            group_id: "g".to_owned(),
            session_timeout: 10_000,
            rebalance_timeout: 30_000,
            member_id: "".to_owned(),
            protocol_type: "consumer".to_owned(),
            group_protocols: vec![JoinGroupProtocol {
                                       protocol_name: "range".to_owned(),
                                       metadata: Bytes::from(&b"meta"[..]),
                                   }],
        };

        let mut buf = BytesMut::with_capacity(128);

        req.encode::<BigEndian>(&mut buf).unwrap();

        assert!(buf.len() > 0);
    }

    #[test]
    fn test_join_group_response_is_leader() {
        let resp = JoinGroupResponse {
            header: ResponseHeader { correlation_id: 1 },
            error_code: 0,
            generation_id: 1,
            group_protocol: "range".to_owned(),
            leader_id: "m1".to_owned(),
            member_id: "m1".to_owned(),
            members: vec![],
        };

        assert!(resp.is_leader());
    }

    #[test]
    fn test_parse_sync_group_response() {
        let data: Vec<u8> = vec![
            0, 0, 0, 1, // correlation_id
            0, 0, // error_code
            0, 0, 0, 4, 1, 2, 3, 4, // member_assignment
        ];

        match parse_sync_group_response(&data[..]) {
            IResult::Done(rest, resp) => {
                assert!(rest.is_empty());
                assert_eq!(resp.member_assignment, Bytes::from(&[1, 2, 3, 4][..]));
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }
}
