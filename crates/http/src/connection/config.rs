//! Connection tuning knobs.

use std::time::Duration;

/// Default time to wait for the next request on a reused connection.
const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time allowed for reading a request head once bytes started arriving.
const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time allowed for discarding an unread request body.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-connection configuration.
///
/// Each timeout bounds one kind of suspension point in the connection loop;
/// only one deadline is armed at a time, so these never stack.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    keep_alive_timeout: Duration,
    header_read_timeout: Duration,
    request_timeout: Option<Duration>,
    drain_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            header_read_timeout: DEFAULT_HEADER_READ_TIMEOUT,
            request_timeout: None,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the keep-alive timeout: how long a reused connection may sit idle
    /// before it is closed.
    pub fn with_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    /// Sets the header read timeout: how long a request head may trickle in.
    pub fn with_header_read_timeout(mut self, timeout: Duration) -> Self {
        self.header_read_timeout = timeout;
        self
    }

    /// Sets a request timeout. When set, an application call exceeding it is
    /// aborted and the connection closes after a best-effort 408.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the drain timeout: how long discarding an unread request body may
    /// take before the connection is closed instead of reused.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        self.keep_alive_timeout
    }

    pub fn header_read_timeout(&self) -> Duration {
        self.header_read_timeout
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }
}
