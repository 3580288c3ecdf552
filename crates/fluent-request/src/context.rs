//! Cancellation and deadline context attached to a request

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{HttpError, Result};

/// Cancellation token plus an optional deadline
///
/// Every I/O step of a request (sending it and reading the response body)
/// runs under its context. Cancelling the token fails the step with
/// [`HttpError::Cancelled`]; reaching the deadline fails it with
/// [`HttpError::Timeout`]. Clones share the same token.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Context driven by the given cancellation token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Set an absolute deadline
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now
    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    /// Cancellation token of this context
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Deadline of this context, if any
    pub fn get_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel the context
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drive `fut` until it completes, the token is cancelled or the deadline passes.
    pub(crate) async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(HttpError::Cancelled),
            _ = deadline => Err(HttpError::Timeout),
            res = fut => res,
        }
    }
}
