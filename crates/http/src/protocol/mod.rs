//! Core HTTP protocol abstractions.
//!
//! This module holds the vocabulary the rest of the crate is written in:
//!
//! - [`Message`], [`PayloadItem`], [`PayloadSize`] — the head/payload message
//!   shapes flowing through the codecs
//! - [`RequestHeader`] / [`ResponseHead`] — parsed heads
//! - [`RequestFraming`] — the per-request keep-alive/upgrade/body decision,
//!   derived once from the head and immutable afterwards
//! - [`ParseError`], [`SendError`], [`HttpError`] — the error taxonomy
//!   (phase-tagged malformed requests, response contract violations, io)
//! - [`body`] — streaming request bodies

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod framing;
pub use framing::RequestFraming;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
