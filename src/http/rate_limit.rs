use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ConfigError, TransportError};

pub struct AdmissionGate {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    rate: u32,
}

impl AdmissionGate {
    pub fn per_second(rate: u32) -> Result<Self, ConfigError> {
        let rate_nz = NonZeroU32::new(rate)
            .ok_or_else(|| ConfigError::invalid("transport.rate_per_second", "must be > 0"))?;
        let quota = Quota::per_second(rate_nz).allow_burst(NonZeroU32::MIN);

        debug!(rate = rate, "Admission gate initialised with burst 1");

        Ok(Self {
            limiter: RateLimiter::direct(quota),
            rate,
        })
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    pub async fn acquire_or_cancel(&self, cancel: &CancellationToken) -> Result<(), TransportError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            _ = self.limiter.until_ready() => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[test]
    fn test_zero_rate_rejected() {
        assert!(AdmissionGate::per_second(0).is_err());
    }

    #[tokio::test]
    async fn test_five_per_second_spaces_acquisitions() {
        let gate = AdmissionGate::per_second(5).unwrap();
        let start = Instant::now();

        for _ in 0..5 {
            gate.acquire().await;
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(795), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_the_bucket() {
        let gate = Arc::new(AdmissionGate::per_second(10).unwrap());
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move { gate.acquire().await })
            })
            .collect();

        for h in handles {
            h.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(295));
    }

    #[tokio::test]
    async fn test_cancelled_acquire_returns_promptly() {
        let gate = AdmissionGate::per_second(1).unwrap();
        gate.acquire().await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let start = Instant::now();
        let result = gate.acquire_or_cancel(&cancel).await;
        assert!(matches!(result, Err(TransportError::Cancelled)));
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
