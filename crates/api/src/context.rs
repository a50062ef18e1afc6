//! Cancellation and deadlines for a single exchange.
//!
//! A [`Context`] is cheap to clone; clones share cancellation state. Every
//! request is bound to the context it was built with, and execution races
//! the network exchange against it.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{ApiError, Result};

#[derive(Clone, Debug)]
pub struct Context {
    cancelled: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Cancels the [`Context`] it was created with, and every clone of it.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        let (_sender, cancelled) = watch::channel(false);
        Self {
            cancelled,
            deadline: None,
        }
    }

    pub fn with_cancel() -> (Self, CancelHandle) {
        let (sender, cancelled) = watch::channel(false);
        (
            Self {
                cancelled,
                deadline: None,
            },
            CancelHandle { sender },
        )
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Stacked deadlines keep the earliest one.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolves once the context is cancelled. Never resolves for a context
    /// whose handle was dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut cancelled = self.cancelled.clone();
        if cancelled.wait_for(|flag| *flag).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Checks cancellation and deadline without waiting.
    pub fn err(&self) -> Option<ApiError> {
        if self.is_cancelled() {
            Some(ApiError::Cancelled)
        } else if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            Some(ApiError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Drives `work` to completion unless the context is cancelled or its
    /// deadline passes first.
    pub async fn run<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancelled() => Err(ApiError::Cancelled),
                result = work => result,
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .map_err(|_| ApiError::DeadlineExceeded)?,
            None => guarded.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = Context::background();
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();
        let result = ctx.run(async { Ok(()) }).await;
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_during_run() {
        let (ctx, handle) = Context::with_cancel();
        let clone = ctx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let result = clone
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ApiError::Cancelled)));
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_cancel() {
        let (ctx, handle) = Context::with_cancel();
        drop(handle);
        let value = ctx.run(async { Ok("done") }).await.unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ApiError::DeadlineExceeded)));
    }

    #[test]
    fn test_earliest_deadline_wins() {
        let now = Instant::now();
        let early = now + Duration::from_secs(1);
        let late = now + Duration::from_secs(60);

        let ctx = Context::background().with_deadline(early).with_deadline(late);
        assert_eq!(ctx.deadline(), Some(early));
    }
}
