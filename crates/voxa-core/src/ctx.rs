// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-call cancellation and deadline context.
//!
//! Every provider adapter and store call takes a [`CallCtx`] explicitly;
//! there are no ambient globals for timeouts. A turn creates one context
//! with its deadline and hands child tokens to each external call, so a
//! client disconnect or an elapsed deadline cancels all in-flight work.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::VoxaError;

/// Cancellation token plus optional deadline, passed through every
/// suspension point.
#[derive(Debug, Clone)]
pub struct CallCtx {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    /// Original timeout, kept for error reporting.
    timeout: Option<Duration>,
}

impl CallCtx {
    /// A context with no deadline that can only be cancelled explicitly.
    pub fn unbounded() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            timeout: None,
        }
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
            timeout: Some(timeout),
        }
    }

    /// A child context sharing the deadline; cancelling the parent cancels
    /// the child but not vice versa.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            timeout: self.timeout,
        }
    }

    /// A child context with its own deadline `timeout` from now, still
    /// cancelled by the parent.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: Some(Instant::now() + timeout),
            timeout: Some(timeout),
        }
    }

    /// Cancels this context and all children.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Runs `fut` racing it against cancellation and the deadline.
    ///
    /// Returns `Canceled` if the token fires first and `DeadlineExceeded`
    /// if the deadline elapses first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, VoxaError>
    where
        F: std::future::Future<Output = T>,
    {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => Err(VoxaError::Canceled),
                    _ = tokio::time::sleep_until(deadline) => Err(VoxaError::DeadlineExceeded {
                        duration: self.timeout.unwrap_or_default(),
                    }),
                    out = fut => Ok(out),
                }
            }
            None => {
                tokio::select! {
                    _ = self.cancel.cancelled() => Err(VoxaError::Canceled),
                    out = fut => Ok(out),
                }
            }
        }
    }

    /// Fails fast when the context is already cancelled or expired.
    pub fn check(&self) -> Result<(), VoxaError> {
        if self.cancel.is_cancelled() {
            return Err(VoxaError::Canceled);
        }
        if let Some(remaining) = self.remaining() {
            if remaining.is_zero() {
                return Err(VoxaError::DeadlineExceeded {
                    duration: self.timeout.unwrap_or_default(),
                });
            }
        }
        Ok(())
    }
}

impl Default for CallCtx {
    fn default() -> Self {
        Self::unbounded()
    }
}
