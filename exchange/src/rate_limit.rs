//! Request-weight rate limiting.
//!
//! The venue budgets 1200 request weights per minute. Every REST call in this
//! crate costs one token; `acquire` suspends until the bucket can pay.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token bucket with time-interpolated refill.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Bucket refilling `refill` tokens every `per`, holding at most
    /// `capacity`. Starts full.
    pub fn new(capacity: u32, refill: u32, per: Duration) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_per_sec: f64::from(refill) / per.as_secs_f64(),
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// The venue's spot REST budget: 1200 weights per rolling minute.
    pub fn spot_default() -> Self {
        Self::new(1200, 1200, Duration::from_secs(60))
    }

    /// Take `n` tokens, waiting for refill when the bucket is short.
    pub async fn acquire(&self, n: u32) {
        let need = f64::from(n).min(self.capacity);
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                state.last_refill = now;
                if state.tokens >= need {
                    state.tokens -= need;
                    return;
                }
                Duration::from_secs_f64((need - state.tokens) / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }
}
