//! The request-side decoder state machine.
//!
//! A connection decodes an alternating sequence of heads and bodies. The
//! `payload_decoder` field is the state: `None` while a head is being parsed,
//! `Some` while the matching body is being streamed. The decoder emits the
//! head together with its framing decision, then payload items until the
//! end-of-body marker, then returns to head parsing for the next (possibly
//! pipelined) request.

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, RequestFraming, RequestHeader};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Whether the decoder is mid-body rather than between messages.
    pub fn is_decoding_payload(&self) -> bool {
        self.payload_decoder.is_some()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder, payload_decoder: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, RequestFraming)>;
    type Error = ParseError;

    /// Decodes the next message part from the buffer.
    ///
    /// - `Ok(Some(Message::Header(_)))`: a complete head plus framing decision
    /// - `Ok(Some(Message::Payload(_)))`: a body chunk or end-of-body marker
    /// - `Ok(None)`: need more data
    /// - `Err(_)`: structured rejection
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // stream payload while a body is in flight
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    // body finished, back to head parsing
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        // parse the next request head
        let message = match self.header_decoder.decode(src)? {
            Some((header, framing)) => {
                self.payload_decoder = Some(framing.body().into());
                Some(Message::Header((header, framing)))
            }
            None => None,
        };

        Ok(message)
    }

    /// End-of-stream handling: a close-delimited body ends cleanly, a body or
    /// head cut off mid-way is a structured truncation error, and an empty
    /// buffer between requests is a clean close.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode_eof(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.header_decoder.decode_eof(src)? {
            Some((header, framing)) => {
                self.payload_decoder = Some(framing.body().into());
                Some(Message::Header((header, framing)))
            }
            None => None,
        };

        Ok(message)
    }
}
