//! Per-host admission: one token bucket for every host seen.
//!
//! Requests to different hosts never wait on each other. Requests to the
//! same host share that host's bucket, so they are spaced by its refill rate
//! and served in reservation order.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};
use url::Url;

use super::{AdmissionError, Limiter, TokenBucket};

/// Rate limiter keyed by the lowercased URL host.
///
/// Buckets are created lazily on a host's first request and start full, so
/// the first `burst` requests to a host go out immediately.
#[derive(Debug)]
pub struct DomainLimiter {
    rate: f64,
    burst: u32,
    hosts: DashMap<String, TokenBucket>,
}

impl DomainLimiter {
    /// Creates a limiter keeping at least `spacing` between requests to one
    /// host. A zero spacing never delays.
    #[must_use]
    pub fn new(spacing: Duration) -> Self {
        let rate = if spacing.is_zero() {
            f64::INFINITY
        } else {
            1.0 / spacing.as_secs_f64()
        };
        Self::per_host(rate, 1)
    }

    /// Creates a limiter giving every host its own bucket of `burst` tokens
    /// refilled at `rate` per second.
    #[must_use]
    pub fn per_host(rate: f64, burst: u32) -> Self {
        debug!(rate, burst, "creating per-host limiter");
        Self {
            rate,
            burst,
            hosts: DashMap::new(),
        }
    }

    /// Tokens added per second to each host's bucket.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Number of hosts with a bucket.
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    fn reserve(&self, host: &str) -> Result<Duration, AdmissionError> {
        if let Some(bucket) = self.hosts.get(host) {
            return bucket.reserve();
        }
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| TokenBucket::new(self.rate, self.burst))
            .reserve()
    }
}

#[async_trait]
impl Limiter for DomainLimiter {
    #[instrument(skip(self), fields(host))]
    async fn admit(&self, url: &Url) -> Result<(), AdmissionError> {
        let host = host_key(url);
        tracing::Span::current().record("host", host.as_str());

        let delay = self.reserve(&host)?;
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis(), "spacing request to host");
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

fn host_key(url: &Url) -> String {
    url.host_str().map(str::to_lowercase).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaces_same_host() {
        let limiter = DomainLimiter::new(Duration::from_secs(1));
        let start = Instant::now();

        limiter.admit(&url("https://example.com/1")).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(10));

        limiter.admit(&url("https://example.com/2")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hosts_are_independent_and_case_insensitive() {
        let limiter = DomainLimiter::new(Duration::from_secs(1));
        let start = Instant::now();

        limiter.admit(&url("https://a.com/1")).await.unwrap();
        limiter.admit(&url("https://b.com/1")).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(10));
        assert_eq!(limiter.host_count(), 2);

        limiter.admit(&url("https://A.com/2")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(900));
        assert_eq!(limiter.host_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_spacing_never_delays() {
        let limiter = DomainLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.admit(&url("https://example.com/x")).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_same_host_served_in_reservation_order() {
        let limiter = std::sync::Arc::new(DomainLimiter::new(Duration::from_millis(500)));
        let start = Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = std::sync::Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.admit(&url("https://example.com/")).await.unwrap();
                    Instant::now().duration_since(start)
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap());
        }
        finished.sort();
        assert!(finished[0] < Duration::from_millis(10));
        assert!(finished[1] >= Duration::from_millis(500));
        assert!(finished[2] >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_host_burst_then_spacing() {
        let limiter = DomainLimiter::per_host(2.0, 2);
        let start = Instant::now();
        limiter.admit(&url("https://example.com/1")).await.unwrap();
        limiter.admit(&url("https://example.com/2")).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(10));

        limiter.admit(&url("https://example.com/3")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_zero_burst_rejects_per_host() {
        let limiter = DomainLimiter::per_host(1.0, 0);
        let err = limiter.admit(&url("https://example.com/")).await.unwrap_err();
        assert!(matches!(err, AdmissionError::BurstExceeded { burst: 0, .. }));
    }
}
