use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Exponential backoff with jitter for transient upstream failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_base: f64,
    jitter_factor: f64,
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            backoff_base: cfg.backoff_base.max(1.0),
            jitter_factor: cfg.jitter_factor.clamp(0.0, 1.0),
        }
    }

    /// A policy that never retries
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_base: 1.0,
            jitter_factor: 0.0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Undithered delay before the attempt following `attempt`
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = self.backoff_base.powi(attempt.saturating_sub(1) as i32);
        let millis = self.initial_delay.as_millis() as f64 * exp;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Delay with jitter applied, never above the configured cap
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter_factor == 0.0 {
            return base;
        }
        let jitter =
            rand::thread_rng().gen_range(1.0 - self.jitter_factor..=1.0 + self.jitter_factor);
        let delay = Duration::from_millis((base.as_millis() as f64 * jitter) as u64);
        std::cmp::min(delay, self.max_delay)
    }
}
