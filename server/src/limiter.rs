//! Per-connection token-bucket admission control.

use std::time::Instant;

/// Continuous token bucket. Refill is computed lazily from elapsed time at
/// each `consume` call, so bursts up to `max_tokens` are admitted and the
/// sustained rate is capped at `refill_rate` tokens per second.
#[derive(Debug)]
pub struct RateLimiter {
    max_tokens: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            max_tokens,
            refill_rate,
            tokens: max_tokens,
            last_refill: Instant::now(),
        }
    }

    /// Tries to consume `amount` tokens. Returns whether the message is
    /// admitted; rejection is a boolean signal, never an error.
    pub fn consume(&mut self, amount: f64) -> bool {
        self.consume_at(amount, Instant::now())
    }

    fn consume_at(&mut self, amount: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= amount {
            self.tokens -= amount;
            true
        } else {
            false
        }
    }
}
