//! The connection's deadline controller.
//!
//! A connection has at most one armed deadline at any time; arming a new one
//! replaces the previous one, so only the most recent bound is ever enforced.
//! Each deadline carries the action to take on expiry: close the connection
//! (idle waits, header reads, drains) or abort the in-flight request
//! (application call under a request timeout).

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant};

/// What expiry of the armed deadline means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutAction {
    /// drop the connection after the current phase
    CloseConnection,
    /// interrupt the in-flight application call
    AbortActiveRequest,
}

#[derive(Debug, Default)]
pub(crate) struct TimeoutController {
    armed: Option<Armed>,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    deadline: Instant,
    action: TimeoutAction,
}

impl TimeoutController {
    pub fn new() -> Self {
        Self { armed: None }
    }

    /// Arms the deadline, replacing any previously armed one.
    pub fn arm(&mut self, after: Duration, action: TimeoutAction) {
        self.armed = Some(Armed { deadline: Instant::now() + after, action });
    }

    /// Cancels the armed deadline, if any.
    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// The armed deadline, for callers that need to build their own wait.
    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|armed| armed.deadline)
    }

    /// Drives `fut` under the armed deadline.
    ///
    /// Yields the future's output, or the armed action if the deadline fires
    /// first. With nothing armed the future runs unbounded.
    pub async fn bound<F: Future>(&self, fut: F) -> Result<F::Output, TimeoutAction> {
        match self.armed {
            Some(Armed { deadline, action }) => time::timeout_at(deadline, fut).await.map_err(|_| action),
            None => Ok(fut.await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[tokio::test(start_paused = true)]
    async fn expiry_yields_the_armed_action() {
        let mut timeout = TimeoutController::new();
        timeout.arm(Duration::from_secs(5), TimeoutAction::CloseConnection);

        let result = timeout.bound(pending::<()>()).await;
        assert_eq!(result.unwrap_err(), TimeoutAction::CloseConnection);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_before_expiry_passes_through() {
        let mut timeout = TimeoutController::new();
        timeout.arm(Duration::from_secs(5), TimeoutAction::CloseConnection);

        let result = timeout.bound(async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_previous_deadline() {
        let mut timeout = TimeoutController::new();
        timeout.arm(Duration::from_secs(1), TimeoutAction::CloseConnection);
        // the one-second bound is gone; only the latest is enforced
        timeout.arm(Duration::from_secs(60), TimeoutAction::AbortActiveRequest);

        let result = timeout
            .bound(async {
                time::sleep(Duration::from_secs(30)).await;
                "finished"
            })
            .await;
        assert_eq!(result.unwrap(), "finished");
    }

    #[tokio::test(start_paused = true)]
    async fn rearmed_action_is_the_one_reported() {
        let mut timeout = TimeoutController::new();
        timeout.arm(Duration::from_secs(60), TimeoutAction::CloseConnection);
        timeout.arm(Duration::from_secs(1), TimeoutAction::AbortActiveRequest);

        let result = timeout.bound(pending::<()>()).await;
        assert_eq!(result.unwrap_err(), TimeoutAction::AbortActiveRequest);
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_runs_unbounded() {
        let mut timeout = TimeoutController::new();
        timeout.arm(Duration::from_millis(1), TimeoutAction::CloseConnection);
        timeout.disarm();

        let result = timeout
            .bound(async {
                time::sleep(Duration::from_secs(3600)).await;
                "still here"
            })
            .await;
        assert_eq!(result.unwrap(), "still here");
    }
}
