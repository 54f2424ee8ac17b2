use std::mem;

use bytes::{BufMut, ByteOrder, Bytes, BytesMut};

use nom::{be_i32, be_i64, be_i8};

use time;

use crc::crc32;

use errors::Result;
use protocol::{ApiVersion, Offset, ParseTag, Timestamp, WriteExt, array_len_ok, parse_bytes};

pub const TIMESTAMP_TYPE_MASK: i8 = 0x08;
pub const COMPRESSION_CODEC_MASK: i8 = 0x07;

/// One `MessageSet` is the run of records a single `Fetch` response
/// partition entry carries (spec.md's "record batch").
///
/// `MessageSet => [Offset MessageSize Message]`
#[derive(Clone, Debug, PartialEq, Default)]
pub struct MessageSet {
    pub messages: Vec<Message>,
}

impl MessageSet {
    /// The offset of the last record in this batch, if any — the value
    /// the consumer core stores as the new position after a successful
    /// fetch (spec.md §4.5.3 step 4).
    pub fn max_offset(&self) -> Option<Offset> {
        self.messages.iter().map(|m| m.offset).max()
    }
}

/// `Message => Crc MagicByte Attributes [Timestamp] Key Value`
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub offset: Offset,
    pub timestamp: Option<MessageTimestamp>,
    pub compression: Compression,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MessageTimestamp {
    CreateTime(Timestamp),
    LogAppendTime(Timestamp),
}

impl MessageTimestamp {
    pub fn value(&self) -> Timestamp {
        match *self {
            MessageTimestamp::CreateTime(v) |
            MessageTimestamp::LogAppendTime(v) => v,
        }
    }
}

impl Default for MessageTimestamp {
    fn default() -> Self {
        let ts = time::now_utc().to_timespec();

        MessageTimestamp::CreateTime(ts.sec * 1000_000 + ts.nsec as Timestamp / 1000)
    }
}

/// The compression codec recorded in a message's attribute byte. Decoding
/// a compressed batch's inner records is out of scope for this crate (see
/// DESIGN.md): a compressed `Message`'s `value` is the opaque compressed
/// payload, not the decompressed inner `MessageSet`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Snappy,
    LZ4,
}

impl From<i8> for Compression {
    fn from(v: i8) -> Self {
        match v & COMPRESSION_CODEC_MASK {
            1 => Compression::Gzip,
            2 => Compression::Snappy,
            3 => Compression::LZ4,
            _ => Compression::None,
        }
    }
}

impl Compression {
    fn code(&self) -> i8 {
        match *self {
            Compression::None => 0,
            Compression::Gzip => 1,
            Compression::Snappy => 2,
            Compression::LZ4 => 3,
        }
    }
}

pub struct MessageSetEncoder {
    api_version: ApiVersion,
}

impl MessageSetEncoder {
    pub fn new(api_version: ApiVersion) -> Self {
        MessageSetEncoder { api_version: api_version }
    }

    pub fn encode<T: ByteOrder>(&self, message_set: MessageSet, buf: &mut BytesMut) -> Result<()> {
        buf.put_array::<T, _, _>(message_set.messages,
                                 |buf, message| self.encode_message::<T>(message, buf))
    }

    fn encode_message<T: ByteOrder>(&self, message: Message, buf: &mut BytesMut) -> Result<()> {
        buf.put_i64::<T>(message.offset);
        let size_off = buf.len();
        buf.put_i32::<T>(0);
        let crc_off = buf.len();
        buf.put_i32::<T>(0);
        let data_off = buf.len();
        buf.put_i8(self.api_version as i8);
        buf.put_i8((message.compression.code() & COMPRESSION_CODEC_MASK) |
                   if let Some(MessageTimestamp::LogAppendTime(_)) = message.timestamp {
                       TIMESTAMP_TYPE_MASK
                   } else {
                       0
                   });

        if self.api_version > 0 {
            buf.put_i64::<T>(message.timestamp.unwrap_or_default().value());
        }

        buf.put_bytes::<T, _>(message.key)?;
        buf.put_bytes::<T, _>(message.value)?;

        let size = buf.len() - crc_off;
        let crc = crc32::checksum_ieee(&buf[data_off..]);

        T::write_i32(&mut buf[size_off..], size as i32);
        T::write_i32(&mut buf[crc_off..], crc as i32);

        Ok(())
    }
}

named_args!(pub parse_message_set(api_version: ApiVersion)<MessageSet>,
    parse_tag!(ParseTag::MessageSet,
        do_parse!(
            messages: length_count!(verify!(be_i32, array_len_ok), apply!(parse_message, api_version))
         >> (MessageSet { messages: messages })
        )
    )
);

named_args!(parse_message(api_version: ApiVersion)<Message>,
    parse_tag!(ParseTag::Message,
        do_parse!(
            offset: be_i64
         >> size: be_i32
         >> data: peek!(take!(size))
         >> _crc: parse_tag!(ParseTag::MessageCrc,
            verify!(be_i32, |checksum: i32| {
                let crc = crc32::checksum_ieee(&data[mem::size_of::<i32>()..]);

                if crc != checksum as u32 {
                    trace!("message checksum mismatched, expected={}, current={}", crc, checksum as u32);
                }

                crc == checksum as u32
            }))
         >> _magic: be_i8
         >> attrs: be_i8
         >> timestamp: cond!(api_version > 0, be_i64)
         >> key: parse_bytes
         >> value: parse_bytes
         >> (Message {
                offset: offset,
                timestamp: timestamp.map(|ts| if (attrs & TIMESTAMP_TYPE_MASK) == 0 {
                    MessageTimestamp::CreateTime(ts)
                } else {
                    MessageTimestamp::LogAppendTime(ts)
                }),
                compression: Compression::from(attrs),
                key: key,
                value: value,
            })
        )
    )
);

#[cfg(test)]
mod tests {
    use bytes::{BigEndian, BytesMut};
    use nom::IResult;

    use super::*;

    #[test]
    fn test_roundtrip_uncompressed_message_set() {
        let message_set = MessageSet {
            messages: vec![Message {
                               offset: 0,
                               timestamp: Some(MessageTimestamp::CreateTime(42)),
                               compression: Compression::None,
                               key: None,
                               value: Some(Bytes::from(&b"hello"[..])),
                           },
                           Message {
                               offset: 1,
                               timestamp: Some(MessageTimestamp::CreateTime(43)),
                               compression: Compression::None,
                               key: None,
                               value: Some(Bytes::from(&b"world"[..])),
                           }],
        };

        let mut buf = BytesMut::with_capacity(256);

        MessageSetEncoder::new(1)
            .encode::<BigEndian>(message_set.clone(), &mut buf)
            .unwrap();

        match parse_message_set(&buf[..], 1) {
            IResult::Done(rest, parsed) => {
                assert!(rest.is_empty());
                assert_eq!(parsed.messages.len(), 2);
                assert_eq!(parsed.messages[0].value, message_set.messages[0].value);
                assert_eq!(parsed.max_offset(), Some(1));
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_message_set_has_no_max_offset() {
        assert_eq!(MessageSet::default().max_offset(), None);
    }
}
