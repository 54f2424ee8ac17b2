use bytes::{ByteOrder, BytesMut};

use nom::{be_i16, be_i32};

use errors::Result;
use protocol::{ApiKey, ApiVersion, Encodable, ErrorCode, ParseTag, RequestHeader, ResponseHeader,
               array_len_ok, parse_response_header};

/// `ApiVersions =>` (api key 18, v0, empty body). Used to discover which
/// request versions a broker speaks before the Wire Client commits to a
/// version for the rest of the session (spec.md §6).
#[derive(Clone, Debug, PartialEq)]
pub struct ApiVersionsRequest<'a> {
    pub header: RequestHeader<'a>,
}

impl<'a> Encodable for ApiVersionsRequest<'a> {
    fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        self.header.encode::<T>(dst)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiVersionsResponse {
    pub header: ResponseHeader,
    pub error_code: ErrorCode,
    pub api_versions: Vec<SupportedApiVersion>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SupportedApiVersion {
    pub api_key: ApiKey,
    pub min_version: ApiVersion,
    pub max_version: ApiVersion,
}

named!(pub parse_api_versions_response<ApiVersionsResponse>,
    parse_tag!(ParseTag::ApiVersionsResponse,
        do_parse!(
            header: parse_response_header
         >> error_code: be_i16
         >> api_versions: length_count!(verify!(be_i32, array_len_ok), parse_api_version)
         >> (ApiVersionsResponse {
                header: header,
                error_code: error_code,
                api_versions: api_versions,
            })
        )
    )
);

named!(parse_api_version<SupportedApiVersion>,
    parse_tag!(ParseTag::ApiVersion,
        do_parse!(
            api_key: be_i16
         >> min_version: be_i16
         >> max_version: be_i16
         >> (SupportedApiVersion {
                api_key: api_key,
                min_version: min_version,
                max_version: max_version,
            })
        )
    )
);

#[cfg(test)]
mod tests {
    use bytes::{BigEndian, BytesMut};

    use nom::IResult;

    use super::*;
    use protocol::*;

    #[test]
    fn test_encode_api_versions_request() {
        let req = ApiVersionsRequest {
            header: RequestHeader {
                api_key: ApiKeys::ApiVersions as ApiKey,
                api_version: 0,
                correlation_id: 123,
                client_id: Some("client".into()),
            },
        };

        let mut buf = BytesMut::with_capacity(128);

        req.encode::<BigEndian>(&mut buf).unwrap();

        assert_eq!(&buf[..],
                   &[0, 18, 0, 0, 0, 0, 0, 123, 0, 6, 99, 108, 105, 101, 110, 116][..]);
    }

    #[test]
    fn test_parse_api_versions_response() {
        let data: Vec<u8> = vec![
            0, 0, 0, 123, // correlation_id
            0, 0,         // error_code
            0, 0, 0, 1,
                0, 1,     // api_key
                0, 2,     // min_version
                0, 3,     // max_version
        ];

        match parse_api_versions_response(&data[..]) {
            IResult::Done(rest, resp) => {
                assert!(rest.is_empty());
                assert_eq!(resp.header.correlation_id, 123);
                assert_eq!(resp.api_versions.len(), 1);
                assert_eq!(resp.api_versions[0].min_version, 2);
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }
}
