use http::StatusCode;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// A request-side failure.
///
/// Malformed-input variants are tagged with the parse phase that was active
/// when the defect was detected: a broken request line and a broken header
/// block are different defects and map to different diagnostics.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid request line: {reason}")]
    InvalidRequestLine { reason: String },

    #[error("malformed headers: {reason}")]
    MalformedHeaders { reason: String },

    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("missing host header in {version:?} request")]
    MissingHost { version: http::Version },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_request_line<S: ToString>(str: S) -> Self {
        Self::InvalidRequestLine { reason: str.to_string() }
    }

    pub fn malformed_headers<S: ToString>(str: S) -> Self {
        Self::MalformedHeaders { reason: str.to_string() }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn missing_host(version: http::Version) -> Self {
        Self::MissingHost { version }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// The status of the best-effort error response for this rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ParseError::TooLargeHeader { .. } | ParseError::TooManyHeaders { .. } => {
                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
            }
            ParseError::InvalidVersion(_) => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether this is the peer dropping the connection rather than speaking
    /// broken HTTP.
    pub fn is_peer_reset(&self) -> bool {
        matches!(
            self,
            ParseError::Io { source }
                if matches!(
                    source.kind(),
                    io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
                )
        )
    }
}

/// A response-side failure.
///
/// `PayloadTooLong` and `ContentLengthMismatch` are response-contract
/// violations: the application declared one body length and produced another.
/// They are surfaced loudly instead of silently truncating or padding the
/// stream.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("response head already sent")]
    HeadersSent,

    #[error("payload exceeds declared content-length: declared {declared}, written {written}")]
    PayloadTooLong { declared: u64, written: u64 },

    #[error("content-length mismatch at finalize: declared {declared}, written {written}")]
    ContentLengthMismatch { declared: u64, written: u64 },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn is_peer_reset(&self) -> bool {
        matches!(
            self,
            SendError::Io { source }
                if matches!(
                    source.kind(),
                    io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
                )
        )
    }

    /// Whether the application broke the declared-length contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, SendError::PayloadTooLong { .. } | SendError::ContentLengthMismatch { .. })
    }
}
