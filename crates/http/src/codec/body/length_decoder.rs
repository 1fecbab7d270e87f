//! Decoder for bodies framed by a `Content-Length` header.
//!
//! The remaining-length counter makes over-reading impossible by
//! construction: once `length` reaches zero the decoder only ever reports
//! end-of-body, and the buffer split never takes more than the remainder.

use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// bytes of the body still to be read
    length: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.length == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.length, src.len() as u64);
        let bytes = src.split_to(len as usize).freeze();

        self.length -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            // the peer closed the stream before delivering the declared length
            None => Err(ParseError::invalid_body(format!("stream ended with {} body bytes outstanding", self.length))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_declared_length() {
        let mut buffer = BytesMut::from(&b"hello worldGET /next"[..]);
        let mut decoder = LengthDecoder::new(11);

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap().len(), 11);
        assert_eq!(&chunk.as_bytes().unwrap()[..], b"hello world");

        // pipelined bytes after the body stay untouched
        assert_eq!(&buffer[..], b"GET /next");

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn never_yields_more_than_declared_total() {
        let mut buffer = BytesMut::from(&b"abc"[..]);
        let mut decoder = LengthDecoder::new(10);

        let mut total = 0usize;
        while let Some(item) = decoder.decode(&mut buffer).unwrap() {
            match item {
                PayloadItem::Chunk(bytes) => total += bytes.len(),
                PayloadItem::Eof => break,
            }
            buffer.extend_from_slice(b"defghij___extra");
        }

        assert_eq!(total, 10);
    }

    #[test]
    fn empty_buffer_needs_more() {
        let mut buffer = BytesMut::new();
        let mut decoder = LengthDecoder::new(5);
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn truncated_body_at_eof_is_an_error() {
        let mut buffer = BytesMut::from(&b"abc"[..]);
        let mut decoder = LengthDecoder::new(5);

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap().len(), 3);

        assert!(decoder.decode_eof(&mut buffer).is_err());
    }
}
