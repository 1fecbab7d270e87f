//! Decoder for close-delimited bodies.
//!
//! HTTP/1.0 messages may carry a body with no length information at all: the
//! body is simply everything until the peer closes the stream. Selecting this
//! framing forbids connection reuse, since there is no way to tell where the
//! body ends short of the close itself.

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseDecoder {
    eof: bool,
}

impl CloseDecoder {
    pub fn new() -> Self {
        Self { eof: false }
    }
}

impl Decoder for CloseDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.eof {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        Ok(Some(PayloadItem::Chunk(src.split_to(src.len()).freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            return self.decode(src);
        }

        self.eof = true;
        Ok(Some(PayloadItem::Eof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_everything_until_close() {
        let mut buffer = BytesMut::from(&b"partial"[..]);
        let mut decoder = CloseDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&chunk.as_bytes().unwrap()[..], b"partial");

        // more data before the close
        buffer.extend_from_slice(b" tail");
        let chunk = decoder.decode_eof(&mut buffer).unwrap().unwrap();
        assert_eq!(&chunk.as_bytes().unwrap()[..], b" tail");

        let eof = decoder.decode_eof(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
    }

    #[test]
    fn close_without_data_is_empty_body() {
        let mut buffer = BytesMut::new();
        let mut decoder = CloseDecoder::new();

        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert!(decoder.decode_eof(&mut buffer).unwrap().unwrap().is_eof());
    }
}
