//! Per-request lifecycle hooks and end-of-connection notification.
//!
//! Applications register hooks during their call through a [`LifecycleHooks`]
//! handle found in the request's extensions. On-starting hooks run after the
//! application returns but before anything is flushed, so they may still
//! legally touch the response; on-completed hooks run after the response path
//! is decided and are best-effort: their failures are reported, never fatal
//! to the connection.
//!
//! [`Lifetime`] is the seam to the embedding server's drain accounting: the
//! connection reports exactly once, on exit, whether it ended gracefully or
//! through a socket-level shutdown.

use std::error::Error;
use std::sync::{Arc, Mutex};

type HookError = Box<dyn Error + Send + Sync>;
type Hook = Box<dyn FnOnce() -> Result<(), HookError> + Send>;

/// Handle for registering per-request lifecycle hooks.
///
/// Cloneable; the connection keeps one clone and places another in the
/// request's extensions for the application to find.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    on_starting: Vec<Hook>,
    on_completed: Vec<Hook>,
}

impl std::fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("LifecycleHooks")
            .field("on_starting", &inner.on_starting.len())
            .field("on_completed", &inner.on_completed.len())
            .finish()
    }
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a hook to run before the response head is flushed.
    pub fn on_starting<F>(&self, hook: F)
    where
        F: FnOnce() -> Result<(), HookError> + Send + 'static,
    {
        self.lock().on_starting.push(Box::new(hook));
    }

    /// Registers a hook to run after the request completed.
    pub fn on_completed<F>(&self, hook: F)
    where
        F: FnOnce() -> Result<(), HookError> + Send + 'static,
    {
        self.lock().on_completed.push(Box::new(hook));
    }

    /// Runs on-starting hooks in registration order, stopping at the first
    /// failure, which the caller records against the request.
    pub(crate) fn fire_on_starting(&self) -> Result<(), HookError> {
        let hooks = std::mem::take(&mut self.lock().on_starting);
        for hook in hooks {
            hook()?;
        }
        Ok(())
    }

    /// Runs all on-completed hooks in registration order, collecting every
    /// failure; none of them stops the others.
    pub(crate) fn fire_on_completed(&self) -> Vec<HookError> {
        let hooks = std::mem::take(&mut self.lock().on_completed);
        let mut failures = Vec::new();
        for hook in hooks {
            if let Err(e) = hook() {
                failures.push(e);
            }
        }
        failures
    }
}

/// Why a connection's processing loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// the loop ended cleanly (peer closed between requests, keep-alive off,
    /// idle timeout)
    Graceful,
    /// the loop ended through an error or a forcible disconnect
    SocketShutdown,
}

/// End-of-connection notification, delivered exactly once per connection.
pub trait Lifetime: Send + Sync {
    fn end(&self, reason: EndReason);
}

impl<F> Lifetime for F
where
    F: Fn(EndReason) + Send + Sync,
{
    fn end(&self, reason: EndReason) {
        self(reason);
    }
}
