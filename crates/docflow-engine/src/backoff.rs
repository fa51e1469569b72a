//! Exponential backoff with optional jitter for the stage retry loop.

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: f64,
    pub max_seconds: f64,
    pub jitter: bool,
}

impl BackoffPolicy {
    /// Sleep duration between attempt `attempt` and `attempt + 1` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> f64 {
        let raw = self.base.powi(attempt as i32 - 1).min(self.max_seconds);
        if self.jitter {
            raw * rand::thread_rng().gen_range(0.5..1.5)
        } else {
            raw
        }
    }
}
