//! Per-request context: caller identity, deadline and cooperative cancellation
//!
//! Every outbound provider call is raced against the context so a cancelled
//! or expired request returns promptly and drops its in-flight calls.

use crate::errors::{RegistryError, Result};
use crate::types::User;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Handle that cancels every context cloned from the one it was created with
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }
}

/// Request-scoped values threaded through a resolution
#[derive(Debug, Clone)]
pub struct RequestContext {
    user: Option<User>,
    user_agent: Option<String>,
    deadline: Option<Instant>,
    cancel_rx: watch::Receiver<bool>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Context that can never be cancelled and has no deadline
    pub fn new() -> Self {
        // Sender dropped right away: `changed()` errors and we park forever.
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            user: None,
            user_agent: None,
            deadline: None,
            cancel_rx,
        }
    }

    /// Context paired with a handle that cancels it
    pub fn cancellable() -> (Self, CancelHandle) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let ctx = Self {
            user: None,
            user_agent: None,
            deadline: None,
            cancel_rx,
        };
        (
            ctx,
            CancelHandle {
                cancel_tx: Arc::new(cancel_tx),
            },
        )
    }

    /// Attach the requesting user
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    /// Attach the client's user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set an absolute deadline; an earlier existing deadline is kept
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Set a deadline relative to now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Requesting user, if authenticated
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Client user agent, if supplied
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Absolute deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check for cancellation or an expired deadline
    pub fn is_done(&self) -> bool {
        *self.cancel_rx.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&self) {
        let mut cancel_rx = self.cancel_rx.clone();
        loop {
            if *cancel_rx.borrow_and_update() {
                return;
            }
            if cancel_rx.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }

    /// Resolves with the reason once the request is cancelled or expired
    pub async fn done(&self) -> RegistryError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancelled() => RegistryError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => RegistryError::DeadlineExceeded,
            },
            None => {
                self.cancelled().await;
                RegistryError::Cancelled
            }
        }
    }

    /// Run `fut` unless the request is cancelled or expires first
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if *self.cancel_rx.borrow() {
            return Err(RegistryError::Cancelled);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            res = fut => res,
        }
    }
}
