//! Body codecs.
//!
//! Each framing mode has a decoder for the request side and an encoder for
//! the response side; [`PayloadDecoder`] and [`PayloadEncoder`] dispatch to
//! the strategy selected by the negotiated [`crate::protocol::PayloadSize`]:
//!
//! - fixed length (`Content-Length`)
//! - chunked transfer encoding (RFC 7230)
//! - close-delimited (rest of stream)
//! - no body

mod chunked_decoder;
mod chunked_encoder;
mod close_decoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
