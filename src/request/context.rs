//! Caller-supplied cancellation for a request.
//!
//! A [`RequestContext`] bundles a cancellation token with an optional
//! deadline. Attached to a request it bounds the dispatch and the reads of
//! the resulting response body. Rate-limiter admission never observes it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context stopped a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// [`RequestContext::cancel`] was called (on this context or a parent).
    Cancelled,
    /// The deadline passed.
    DeadlineExceeded,
}

/// Cancellation token plus optional deadline.
///
/// Clones share the same token, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Creates a context with no deadline that is only stopped by `cancel`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context around an existing token.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Creates a context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_at(Instant::now() + timeout)
    }

    /// Creates a context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::new().deadline_at(deadline)
    }

    /// Returns a copy whose deadline is the earlier of the current one and `deadline`.
    #[must_use]
    pub fn deadline_at(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self {
            token: self.token.clone(),
            deadline: Some(deadline),
        }
    }

    /// Derives a context cancelled together with this one, but whose own
    /// `cancel` does not reach the parent.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and every child derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The underlying token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns why the context is done, or `None` while it is still live.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            Some(ContextError::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(ContextError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Runs `future` until it completes or the context is done.
    ///
    /// # Errors
    ///
    /// Returns the [`ContextError`] that stopped the future.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, ContextError> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(ContextError::Cancelled),
            () = deadline_elapsed(self.deadline) => Err(ContextError::DeadlineExceeded),
            output = future => Ok(output),
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
