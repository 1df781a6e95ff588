//! Circuit breaker guarding the LLM dependency.
//!
//! Two states. Closed: all gated features enabled, errors accumulate in a
//! rolling window. Open: features disabled until a fixed cooldown elapses.
//! Recovery is time-triggered and unconditional; there is no half-open
//! probe of the dependency.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::{info, warn};

/// Rolling lookback for counting dependency errors.
pub const ERROR_WINDOW_SECS: u64 = 60;
/// Number of errors within the window that opens the breaker.
pub const ERROR_THRESHOLD: usize = 5;
/// How long the breaker stays open once tripped.
pub const COOLDOWN_SECS: u64 = 600;

/// Features gated by the breaker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    /// Mention-triggered chat replies.
    Chat,
    /// Scheduled conversation revival.
    Revive,
}

#[derive(Debug)]
struct BreakerInner {
    error_timestamps: VecDeque<u64>,
    cooldown_until: Option<u64>,
    chat_enabled: bool,
    revive_enabled: bool,
}

/// Process-wide breaker instance; one mutex covers every state transition.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                error_timestamps: VecDeque::new(),
                cooldown_until: None,
                chat_enabled: true,
                revive_enabled: true,
            }),
        }
    }

    /// Report one dependency failure observed at `now` (unix seconds).
    ///
    /// Opens the breaker when the pruned window reaches the threshold. While
    /// open, further errors neither extend nor shorten the cooldown.
    pub fn record_error(&self, now: u64) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");

        inner.error_timestamps.push_back(now);
        prune_window(&mut inner.error_timestamps, now);

        if inner.cooldown_until.is_some() {
            return;
        }

        if inner.error_timestamps.len() >= ERROR_THRESHOLD {
            inner.cooldown_until = Some(now + COOLDOWN_SECS);
            inner.chat_enabled = false;
            inner.revive_enabled = false;
            warn!(
                errors = inner.error_timestamps.len(),
                cooldown_secs = COOLDOWN_SECS,
                "circuit breaker opened; AI features disabled"
            );
        }
    }

    /// Periodic recovery check; closes the breaker once the cooldown elapsed.
    pub fn tick(&self, now: u64) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");

        let Some(cooldown_until) = inner.cooldown_until else {
            prune_window(&mut inner.error_timestamps, now);
            return;
        };

        if now >= cooldown_until {
            inner.error_timestamps.clear();
            inner.cooldown_until = None;
            inner.chat_enabled = true;
            inner.revive_enabled = true;
            info!("circuit breaker closed; AI features restored");
        }
    }

    /// Whether a gated feature is currently available.
    pub fn is_enabled(&self, feature: Feature) -> bool {
        let inner = self.inner.lock().expect("breaker mutex poisoned");
        match feature {
            Feature::Chat => inner.chat_enabled,
            Feature::Revive => inner.revive_enabled,
        }
    }

    /// Whether the breaker is currently open.
    pub fn is_open(&self) -> bool {
        self.inner
            .lock()
            .expect("breaker mutex poisoned")
            .cooldown_until
            .is_some()
    }
}

fn prune_window(window: &mut VecDeque<u64>, now: u64) {
    let cutoff = now.saturating_sub(ERROR_WINDOW_SECS);
    while window.front().is_some_and(|&ts| ts < cutoff) {
        window.pop_front();
    }
}
