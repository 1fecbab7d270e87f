//! Request body streaming.
//!
//! The body of a request is streamed to the application instead of being
//! buffered: [`ReqBody`] is the consumer half implementing `http_body::Body`,
//! [`ReqBodySender`] is the producer half that the connection drives
//! concurrently with the application call. The two communicate over channels
//! so the connection task remains the only reader of the transport, and the
//! sender's drain step keeps framing aligned when the application leaves part
//! of the body unread.

mod req_body;

pub use req_body::ReqBody;
pub use req_body::ReqBodySender;
