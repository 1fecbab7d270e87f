//! HTTP response head handling.
//!
//! The head of a response is represented as `http::Response<()>`; the body is
//! streamed separately through the response writer.

use http::Response;

/// Type alias for the header portion of an HTTP response.
pub type ResponseHead = Response<()>;
