//! Exponential backoff with jitter for retry loops.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest delay ever handed out.
pub const MIN_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackoffConfig {
    #[serde(default = "default_initial_secs")]
    pub initial_secs: f64,
    #[serde(default = "default_max_secs")]
    pub max_secs: f64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Fractional jitter, e.g. 0.1 for +/-10%.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_secs: default_initial_secs(),
            max_secs: default_max_secs(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

fn default_initial_secs() -> f64 {
    2.0
}

fn default_max_secs() -> f64 {
    30.0
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.1
}

/// Stateful backoff calculator. Each call to [`Backoff::next_delay`] advances
/// the attempt counter.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay before jitter for the given attempt, capped at the ceiling.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .config
            .multiplier
            .max(1.0)
            .powi(attempt.min(i32::MAX as u32) as i32);
        let secs = (self.config.initial_secs * exp).min(self.config.max_secs);
        let secs = if secs.is_finite() { secs.max(0.0) } else { self.config.max_secs.max(0.0) };
        Duration::from_secs_f64(secs)
    }

    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay(self.attempt).as_secs_f64();
        self.attempt = self.attempt.saturating_add(1);

        let jitter = self.config.jitter.clamp(0.0, 1.0);
        let factor = if jitter > 0.0 {
            rand::thread_rng().gen_range(-jitter..=jitter)
        } else {
            0.0
        };

        let delay = Duration::from_secs_f64((base * (1.0 + factor)).max(0.0));
        delay.max(MIN_DELAY)
    }

    /// Sleep for the next delay and return it so callers can log it.
    pub async fn wait(&mut self) -> Duration {
        let delay = self.next_delay();
        tokio::time::sleep(delay).await;
        delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
