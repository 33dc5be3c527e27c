//! Token-bucket admission: a refill rate plus a burst allowance.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, instrument};
use url::Url;

use super::{AdmissionError, Limiter};

/// Token bucket shared across tasks.
///
/// Each admission takes one token. When none is available the caller
/// reserves the next one and sleeps until it has been refilled, so
/// concurrent callers are served in reservation order.
#[derive(Debug)]
pub struct TokenBucket {
    /// Tokens added per second. Infinite means unlimited.
    rate: f64,
    /// Maximum tokens the bucket holds.
    burst: u32,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    /// May go negative while reservations are outstanding.
    tokens: f64,
    last: Instant,
}

impl TokenBucket {
    /// Creates a full bucket refilling at `rate` tokens per second.
    #[must_use]
    pub fn new(rate: f64, burst: u32) -> Self {
        Self::with_tokens(rate, burst, f64::from(burst))
    }

    /// Creates an empty bucket: the first admission already waits for a refill.
    #[must_use]
    pub fn drained(rate: f64, burst: u32) -> Self {
        Self::with_tokens(rate, burst, 0.0)
    }

    /// Creates a bucket that admits everything immediately.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::with_tokens(f64::INFINITY, 0, 0.0)
    }

    fn with_tokens(rate: f64, burst: u32, tokens: f64) -> Self {
        Self {
            rate: rate.max(0.0),
            burst,
            state: Mutex::new(BucketState {
                tokens,
                last: Instant::now(),
            }),
        }
    }

    /// Tokens added per second.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Bucket capacity.
    #[must_use]
    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Takes a token, returning how long the caller must wait before using it.
    pub(super) fn reserve(&self) -> Result<Duration, AdmissionError> {
        if self.rate.is_infinite() {
            return Ok(Duration::ZERO);
        }
        if self.burst == 0 {
            return Err(AdmissionError::BurstExceeded {
                requested: 1,
                burst: self.burst,
            });
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(f64::from(self.burst));
        state.last = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return Ok(Duration::ZERO);
        }
        if self.rate == 0.0 {
            return Err(AdmissionError::Exhausted);
        }
        match Duration::try_from_secs_f64((1.0 - state.tokens) / self.rate) {
            Ok(wait) => {
                state.tokens -= 1.0;
                Ok(wait)
            }
            Err(_) => Err(AdmissionError::Exhausted),
        }
    }
}

#[async_trait]
impl Limiter for TokenBucket {
    #[instrument(skip(self), fields(url = %url))]
    async fn admit(&self, url: &Url) -> Result<(), AdmissionError> {
        let delay = self.reserve()?;
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis(), "waiting for limiter token");
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}
