//! Per-dial context: cancellation, an optional absolute deadline and an
//! optional name-resolution trace hook.
//!
//! Contexts form a tree. [`DialContext::child`] derives a context whose
//! cancellation token is a child of the parent's, so cancelling a parent
//! finishes every descendant while cancelling a child leaves the parent
//! untouched. Deadlines only ever shrink down the tree.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::dns::DnsTrace;

/// Why a context finished.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context canceled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Clone, Default)]
pub struct DialContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    trace: Option<Arc<dyn DnsTrace>>,
}

impl DialContext {
    /// A background context: never cancelled, no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind this context to an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set the deadline, keeping the current one if it is earlier.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_trace(mut self, trace: Arc<dyn DnsTrace>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Derive a context that is cancelled with this one but can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            trace: self.trace.clone(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancels this context when the guard is dropped.
    pub fn drop_guard(&self) -> DropGuard {
        self.cancel.clone().drop_guard()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn trace(&self) -> Option<&dyn DnsTrace> {
        self.trace.as_deref()
    }

    /// `Some` once the context is cancelled or past its deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves when the context finishes, with the reason.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => ContextError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                ContextError::Cancelled
            }
        }
    }
}

impl fmt::Debug for DialContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("deadline", &self.deadline)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}
