// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token-bucket rate limiting with named buckets per model.
//!
//! Adapters call [`RateLimiter::wait`] before issuing a provider request.
//! Buckets are registered by name (usually a model id); names with no
//! registered bucket pass through unlimited. `wait` is cancellable through
//! the caller's [`CallCtx`].

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::ctx::CallCtx;
use crate::error::VoxaError;

/// Refill policy for one named bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    /// Maximum tokens the bucket holds.
    pub capacity: u32,
    /// Tokens added per `interval`.
    pub refill: u32,
    pub interval: Duration,
}

impl BucketConfig {
    /// `n` requests per second.
    pub fn per_second(n: u32) -> Self {
        Self { capacity: n, refill: n, interval: Duration::from_secs(1) }
    }

    /// `n` requests per arbitrary interval (e.g. 5 per 300 ms).
    pub fn per_interval(n: u32, interval: Duration) -> Self {
        Self { capacity: n, refill: n, interval }
    }
}

#[derive(Debug)]
struct Bucket {
    config: BucketConfig,
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(config: BucketConfig) -> Self {
        Self {
            config,
            tokens: f64::from(config.capacity),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill);
        let rate = f64::from(self.config.refill) / self.config.interval.as_secs_f64();
        self.tokens =
            (self.tokens + elapsed.as_secs_f64() * rate).min(f64::from(self.config.capacity));
        self.last_refill = now;
    }

    /// Takes one token, or returns how long until one is available.
    fn try_take(&mut self) -> Result<(), Duration> {
        let now = Instant::now();
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }
        let rate = f64::from(self.config.refill) / self.config.interval.as_secs_f64();
        let deficit = 1.0 - self.tokens;
        Err(Duration::from_secs_f64(deficit / rate))
    }
}

/// Process-wide limiter with one token bucket per registered name.
#[derive(Debug, Default, Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<String, Arc<Mutex<Bucket>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the bucket for `name`.
    pub fn configure(&self, name: &str, config: BucketConfig) {
        self.buckets
            .insert(name.to_string(), Arc::new(Mutex::new(Bucket::new(config))));
    }

    /// Waits until `name`'s bucket yields a token.
    ///
    /// Unregistered names return immediately. Cancellation and deadline on
    /// `ctx` abort the wait.
    pub async fn wait(&self, ctx: &CallCtx, name: &str) -> Result<(), VoxaError> {
        let Some(bucket) = self.buckets.get(name).map(|b| Arc::clone(&b)) else {
            return Ok(());
        };

        loop {
            ctx.check()?;
            let wait_for = {
                let mut bucket = bucket.lock().await;
                match bucket.try_take() {
                    Ok(()) => return Ok(()),
                    Err(d) => d,
                }
            };
            ctx.run(tokio::time::sleep(wait_for)).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unregistered_names_pass_through() {
        let limiter = RateLimiter::new();
        let ctx = CallCtx::unbounded();
        limiter.wait(&ctx, "unknown-model").await.unwrap();
    }

    #[tokio::test]
    async fn takes_up_to_capacity_without_waiting() {
        let limiter = RateLimiter::new();
        limiter.configure("embeddings", BucketConfig::per_second(50));
        let ctx = CallCtx::unbounded();
        for _ in 0..50 {
            limiter.wait(&ctx, "embeddings").await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_refill_when_exhausted() {
        let limiter = RateLimiter::new();
        limiter.configure(
            "whisper",
            BucketConfig::per_interval(5, Duration::from_millis(300)),
        );
        let ctx = CallCtx::unbounded();
        for _ in 0..5 {
            limiter.wait(&ctx, "whisper").await.unwrap();
        }
        let start = Instant::now();
        limiter.wait(&ctx, "whisper").await.unwrap();
        // One token refills in 300ms / 5 = 60ms.
        assert!(Instant::now().duration_since(start) >= Duration::from_millis(59));
    }

    #[tokio::test]
    async fn wait_is_cancellable() {
        let limiter = RateLimiter::new();
        limiter.configure("slow", BucketConfig::per_interval(1, Duration::from_secs(3600)));
        let ctx = CallCtx::unbounded();
        limiter.wait(&ctx, "slow").await.unwrap();

        let ctx2 = ctx.child();
        ctx2.cancel();
        let err = limiter.wait(&ctx2, "slow").await.unwrap_err();
        assert!(matches!(err, VoxaError::Canceled));
    }
}
