use std::{future::Future, time::Duration};

use async_trait::async_trait;
use rand::Rng;

use crate::{chat::client::ProviderError, config::structure::RetryConfig};

/// Where the retry loop suspends between attempts.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

/// Hard ceiling on provider calls per generation, whatever the config says.
pub const MAX_ATTEMPTS: u32 = 5;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_secs(2),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.clamp(1, MAX_ATTEMPTS),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_jitter: Duration::from_millis(config.max_jitter_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-indexed), before jitter:
    /// the base delay doubled once per earlier attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    fn jitter(&self) -> Duration {
        match self.max_jitter.is_zero() {
            true => Duration::ZERO,
            false => rand::rng().random_range(Duration::ZERO..self.max_jitter),
        }
    }

    /// `max_attempts` bounded to `1..=MAX_ATTEMPTS`, even for a hand-built policy.
    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts.clamp(1, MAX_ATTEMPTS)
    }

    /// Decides what follows a failed attempt.
    pub fn after_failure<T>(&self, attempt: u32, error: ProviderError) -> AttemptState<T> {
        if !error.is_transient() {
            return AttemptState::Failed {
                error,
                attempts: attempt,
                exhausted: false,
            };
        }

        match attempt >= self.attempt_limit() {
            true => AttemptState::Failed {
                error,
                attempts: attempt,
                exhausted: true,
            },
            false => AttemptState::Waiting {
                attempt,
                delay: self.backoff(attempt) + self.jitter(),
                error,
            },
        }
    }

    /// Drives `operation` through the attempt state machine until it either
    /// succeeds or fails for good.
    pub async fn run<T, F, Fut>(&self, clock: &dyn Clock, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut state = AttemptState::Attempting(1);

        loop {
            state = match state {
                AttemptState::Attempting(attempt) => {
                    log::debug!("provider attempt {attempt}/{}", self.attempt_limit());

                    match operation(attempt).await {
                        Ok(value) => AttemptState::Succeeded {
                            value,
                            attempts: attempt,
                        },
                        Err(error) => self.after_failure(attempt, error),
                    }
                }
                AttemptState::Waiting {
                    attempt,
                    delay,
                    error,
                } => {
                    log::warn!(
                        "transient provider error (attempt {attempt}/{}), retrying in {}ms: {error}",
                        self.attempt_limit(),
                        delay.as_millis()
                    );
                    clock.sleep(delay).await;

                    AttemptState::Attempting(attempt + 1)
                }
                AttemptState::Succeeded { value, attempts } => {
                    return RetryOutcome::Succeeded { value, attempts };
                }
                AttemptState::Failed {
                    error,
                    attempts,
                    exhausted,
                } => {
                    match exhausted {
                        true => log::error!("giving up after {attempts} attempts: {error}"),
                        false => log::error!("provider call failed on attempt {attempts}: {error}"),
                    }

                    return RetryOutcome::Failed {
                        error,
                        attempts,
                        exhausted,
                    };
                }
            };
        }
    }
}

#[derive(Debug)]
pub enum AttemptState<T> {
    /// About to make attempt `n` (1-indexed).
    Attempting(u32),
    /// Attempt failed transiently; sleeping before the next one.
    Waiting {
        attempt: u32,
        delay: Duration,
        error: ProviderError,
    },
    Succeeded {
        value: T,
        attempts: u32,
    },
    Failed {
        error: ProviderError,
        attempts: u32,
        exhausted: bool,
    },
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded {
        value: T,
        attempts: u32,
    },
    Failed {
        error: ProviderError,
        attempts: u32,
        /// True when the last failure was transient but no attempts were left.
        exhausted: bool,
    },
}
