use std::borrow::Cow;

use bytes::{BufMut, ByteOrder, BytesMut};
use nom::be_i32;

use errors::Result;
use protocol::{ApiKey, ApiVersion, CorrelationId, ParseTag, WriteExt, parse_str};

/// `RequestHeader => api_key api_version correlation_id client_id`
#[derive(Clone, Debug, PartialEq)]
pub struct RequestHeader<'a> {
    pub api_key: ApiKey,
    pub api_version: ApiVersion,
    pub correlation_id: CorrelationId,
    pub client_id: Option<Cow<'a, str>>,
}

impl<'a> RequestHeader<'a> {
    pub fn encode<T: ByteOrder>(self, dst: &mut BytesMut) -> Result<()> {
        dst.put_i16::<T>(self.api_key);
        dst.put_i16::<T>(self.api_version);
        dst.put_i32::<T>(self.correlation_id);
        dst.put_str::<T, _>(self.client_id)
    }
}

/// `ResponseHeader => correlation_id`
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseHeader {
    pub correlation_id: CorrelationId,
}

named!(pub parse_response_header<ResponseHeader>,
    parse_tag!(ParseTag::ResponseHeader,
        do_parse!(
            correlation_id: be_i32
         >> (ResponseHeader { correlation_id: correlation_id })
        )
    )
);

/// Tags a `nom` combinator's failure with a `ParseTag` so a decode error
/// names the structural position it occurred at.
macro_rules! parse_tag (
    ($i:expr, $tag:expr, $submac:ident!( $($args:tt)* )) => (
        add_error!($i, ::nom::ErrorKind::Custom($tag as u32), $submac!($($args)*))
    );
    ($i:expr, $tag:expr, $f:expr) => (
        parse_tag!($i, $tag, call!($f))
    );
);

#[cfg(test)]
mod tests {
    use bytes::{BigEndian, BytesMut};

    use super::*;

    #[test]
    fn test_encode_request_header() {
        let header = RequestHeader {
            api_key: 18,
            api_version: 0,
            correlation_id: 123,
            client_id: Some("client".into()),
        };

        let mut buf = BytesMut::with_capacity(64);

        header.encode::<BigEndian>(&mut buf).unwrap();

        assert_eq!(&buf[..],
                   &[0, 18, 0, 0, 0, 0, 0, 123, 0, 6, 99, 108, 105, 101, 110, 116][..]);
    }

    #[test]
    fn test_parse_response_header() {
        use nom::IResult;

        assert_eq!(parse_response_header(&[0, 0, 0, 123][..]),
                   IResult::Done(&b""[..], ResponseHeader { correlation_id: 123 }));
    }
}
