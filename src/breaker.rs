//! Circuit breaker guarding the external market data provider
//!
//! After a run of consecutive failures the breaker opens and every call
//! fails immediately with [`ProviderError::CircuitOpen`], skipping network
//! I/O entirely. Once the cooldown elapses the breaker goes half-open and
//! admits a single trial call; success closes it, failure reopens it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::constants::{BREAKER_COOLDOWN_SECS, BREAKER_FAILURE_THRESHOLD};
use crate::error::ProviderError;

/// Breaker state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls fail fast until the cooldown elapses
    Open,
    /// One trial call is admitted
    HalfOpen,
}

/// Tuning for a [`CircuitBreaker`]
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker
    pub failure_threshold: u32,
    /// How long the breaker stays open before a trial call
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: BREAKER_FAILURE_THRESHOLD,
            cooldown: Duration::from_secs(BREAKER_COOLDOWN_SECS),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// The half-open trial call has been admitted and has not resolved yet
    trial_in_flight: bool,
}

/// Fail-fast guard over a failing dependency
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Admits or rejects a call before any network I/O happens
    pub fn try_acquire(&self) -> Result<(), ProviderError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            // only one trial call may be in flight at a time
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(ProviderError::CircuitOpen)
                } else {
                    inner.trial_in_flight = true;
                    Ok(())
                }
            }
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(())
                } else {
                    Err(ProviderError::CircuitOpen)
                }
            }
        }
    }

    /// Records a successful call, closing the breaker
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    /// Records a failed call, opening the breaker when the threshold is hit
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            // the trial call failed; back to open for another cooldown
            CircuitState::HalfOpen => open(&mut inner),
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    open(&mut inner);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn open(inner: &mut Inner) {
    inner.state = CircuitState::Open;
    inner.opened_at = Some(Instant::now());
    inner.trial_in_flight = false;
}
