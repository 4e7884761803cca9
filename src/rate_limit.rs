//! Single-flight rate gate for the metadata service (C1).
//!
//! `MetadataAdapter` must not issue two outbound requests to the metadata
//! service (AcoustID or MusicBrainz) less than one second apart. The cover
//! art host and lyrics service are exempt (§4.4: "not the cover art host").
//! This is new relative to the teacher, which only had an ad-hoc
//! `tokio::time::sleep` inline in `enrichment/service.rs`; it is pulled out
//! here so every client that needs spacing shares one gate and one set of
//! tests.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum spacing between permits. Cloning is cheap (`Arc`-backed
/// internally via the owning `Mutex`); share one instance across every call
/// site that must respect the same spacing.
pub struct RateGate {
    min_spacing: Duration,
    last_permit: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_permit: Mutex::new(None),
        }
    }

    /// MusicBrainz/AcoustID spacing: at least 1 second between requests.
    pub fn metadata_service() -> Self {
        Self::new(Duration::from_secs(1))
    }

    /// Block until it is this caller's turn, then record the permit time.
    /// Callers on the same `RateGate` are served in the order they call
    /// `acquire`, since the lock is held for the sleep.
    pub async fn acquire(&self) {
        let mut last = self.last_permit.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_spacing {
                tokio::time::sleep(self.min_spacing - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Retry policy for transport-level failures against the metadata service:
/// fixed delay, bounded attempts, and a predicate distinguishing retryable
/// failures from a clean miss (e.g. HTTP 404).
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// `MAX_RETRIES=3`, fixed 10s delay, per §4.4.
    pub fn metadata_service() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(10),
        }
    }

    /// Run `op` up to `max_retries + 1` times, retrying only while
    /// `is_retryable` returns true for the error it produced. The operation
    /// itself decides what is retryable (e.g. a 404 should not be retried).
    pub async fn run<T, E, F, Fut>(&self, is_retryable: impl Fn(&E) -> bool, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn rate_gate_spaces_consecutive_acquires() {
        let gate = RateGate::new(Duration::from_millis(100));
        let start = Instant::now();
        gate.acquire().await;
        gate.acquire().await;
        gate.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_stops_after_max_retries() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(1),
        };
        let attempts_clone = attempts.clone();
        let result: Result<(), &str> = policy
            .run(|_e| true, || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err("boom")
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_policy_does_not_retry_non_retryable() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_retries: 3,
            delay: Duration::from_millis(1),
        };
        let attempts_clone = attempts.clone();
        let result: Result<(), &str> = policy
            .run(|_e| false, || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err("not found")
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
