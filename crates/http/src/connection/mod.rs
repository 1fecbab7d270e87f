//! Connection handling.
//!
//! [`HttpConnection`] owns one connection's request loop and composes the
//! pieces around it:
//!
//! - [`ConnectionPhase`]: the explicit per-connection state machine
//! - the timeout controller (internal) with [`TimeoutAction`]: the single
//!   armed deadline bounding every suspension point
//! - [`ResponseWriter`]: response-state invariants (frozen heads, declared
//!   length enforcement, idempotent finalize)
//! - [`LifecycleHooks`] / [`Lifetime`]: per-request hooks and the exactly-once
//!   end-of-connection notification
//! - [`ConnectionConfig`]: timeout tuning

mod config;
mod http_connection;
mod lifecycle;
mod phase;
mod response_writer;
mod timeout;

pub use config::ConnectionConfig;
pub use http_connection::HttpConnection;
pub use lifecycle::{EndReason, LifecycleHooks, Lifetime};
pub use phase::{ConnectionPhase, PhaseEvent};
pub use response_writer::ResponseWriter;
pub use timeout::TimeoutAction;
