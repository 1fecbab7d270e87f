//! Head codecs.
//!
//! - [`HeaderDecoder`]: incremental request-line + header-block parsing with
//!   phase-tagged rejections, size caps and post-parse validation
//! - [`HeaderEncoder`]: status line + header serialization with framing
//!   headers kept consistent with the payload size

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
