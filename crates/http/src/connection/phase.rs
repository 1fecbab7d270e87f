//! The connection phase machine.
//!
//! One connection is always in exactly one phase; transitions are a pure
//! function of (current phase, event) so the lifecycle is testable without
//! any I/O. `Stopping` is terminal: once a connection decided to stop, no
//! event moves it anywhere else, which preserves the diagnostic state of a
//! fatal error instead of resetting it for a next request that will never
//! come.

use crate::protocol::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// waiting for the first byte of a (possibly reused) connection's next request
    #[default]
    AwaitingRequest,
    /// reading the request line
    ParsingRequestLine,
    /// reading the header block
    ParsingHeaders,
    /// the application owns the request
    ApplicationRunning,
    /// the connection is shutting down, no further requests
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// first bytes of a new request arrived
    BytesArrived,
    /// the request line parsed completely
    RequestLineParsed,
    /// the header block parsed completely
    HeadersParsed,
    /// the response was finalized, the connection may be reused
    ResponseFinalized,
    /// fatal condition, the connection will not serve another request
    ConnectionStopping,
}

impl ConnectionPhase {
    /// Applies one event. Events that make no sense in the current phase
    /// leave the phase unchanged.
    #[must_use]
    pub fn step(self, event: PhaseEvent) -> ConnectionPhase {
        use ConnectionPhase::*;
        use PhaseEvent::*;

        match (self, event) {
            (Stopping, _) => Stopping,
            (_, ConnectionStopping) => Stopping,
            (AwaitingRequest, BytesArrived) => ParsingRequestLine,
            (ParsingRequestLine, RequestLineParsed) => ParsingHeaders,
            (ParsingHeaders, HeadersParsed) => ApplicationRunning,
            (ApplicationRunning, ResponseFinalized) => AwaitingRequest,
            (phase, _) => phase,
        }
    }

    /// The phase a parse rejection was detected in, from its tag.
    pub fn of_parse_error(error: &ParseError) -> ConnectionPhase {
        match error {
            ParseError::InvalidRequestLine { .. }
            | ParseError::InvalidMethod
            | ParseError::InvalidUri
            | ParseError::InvalidVersion(_) => ConnectionPhase::ParsingRequestLine,
            _ => ConnectionPhase::ParsingHeaders,
        }
    }

    #[inline]
    pub fn is_stopping(&self) -> bool {
        matches!(self, ConnectionPhase::Stopping)
    }

    /// Whether the connection is between requests, with nothing in flight.
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, ConnectionPhase::AwaitingRequest)
    }
}
