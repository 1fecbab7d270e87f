//! Wire codecs.
//!
//! Streaming encode/decode of HTTP/1.x messages over `tokio_util::codec`:
//!
//! - [`RequestDecoder`]: request heads + framed bodies off the read half.
//!   The `Decoder` contract carries the buffer-cursor discipline: a decode
//!   attempt either consumes complete items out of the buffer or consumes
//!   nothing and reports "need more", so consumed bytes are never presented
//!   twice and incomplete input is never busy-looped on.
//! - [`ResponseEncoder`]: response heads + framed bodies onto the write half.

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
