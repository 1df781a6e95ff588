//! Decides when the watched channel has been silent long enough to revive.
//!
//! A revival cycle starts at the last observed activity and ends when a
//! question is sent; the next cycle only begins once someone speaks again.
//! During configured quiet hours the silence threshold is stretched so the
//! channel is not pinged in the middle of the night.

use std::collections::VecDeque;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use vigil_utils::time::hour_of_day_utc;

/// Minimum silence before a revive may fire, regardless of configuration.
pub const REVIVE_FLOOR_SECS: u64 = 14_400;
/// How many past outputs are kept for duplicate avoidance.
pub const RECENT_OUTPUT_CAP: usize = 10;

const DEFAULT_QUIET_START_HOUR: u32 = 22;
const DEFAULT_QUIET_END_HOUR: u32 = 6;
const DEFAULT_QUIET_MULTIPLIER: f64 = 2.5;

/// Quiet-hours stretch settings, loadable from per-guild configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuietHoursConfig {
    /// Hour of day (UTC) when quiet hours begin, inclusive.
    pub start_hour: u32,
    /// Hour of day (UTC) when quiet hours end, exclusive.
    pub end_hour: u32,
    /// Interval multiplier applied during quiet hours; values below 1.0 are
    /// treated as 1.0 so quiet hours can never shorten the interval.
    pub multiplier: f64,
    pub base_interval_seconds: u64,
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_QUIET_START_HOUR,
            end_hour: DEFAULT_QUIET_END_HOUR,
            multiplier: DEFAULT_QUIET_MULTIPLIER,
            base_interval_seconds: REVIVE_FLOOR_SECS,
        }
    }
}

impl QuietHoursConfig {
    /// Quiet window bounds; an out-of-range stored hour invalidates the
    /// whole window and the compiled defaults apply instead.
    fn quiet_bounds(&self) -> (u32, u32) {
        if self.start_hour > 23 || self.end_hour > 23 {
            (DEFAULT_QUIET_START_HOUR, DEFAULT_QUIET_END_HOUR)
        } else {
            (self.start_hour, self.end_hour)
        }
    }

    /// Whether the given unix timestamp falls inside quiet hours. A span
    /// whose start and end coincide disables quiet hours entirely.
    pub fn is_quiet(&self, unix_secs: u64) -> bool {
        let hour = hour_of_day_utc(unix_secs);
        let (start, end) = self.quiet_bounds();
        if start == end {
            false
        } else if start < end {
            hour >= start && hour < end
        } else {
            // Wraps midnight, e.g. 22..6.
            hour >= start || hour < end
        }
    }

    /// Required silence in seconds at the given moment.
    pub fn effective_interval(&self, unix_secs: u64) -> u64 {
        let base = self.base_interval_seconds.max(REVIVE_FLOOR_SECS);
        if self.is_quiet(unix_secs) {
            (base as f64 * self.multiplier.max(1.0)) as u64
        } else {
            base
        }
    }
}

/// Outcome of one scheduler tick.
#[derive(Debug, PartialEq, Eq)]
pub enum ReviveDecision {
    /// Channel is active, already revived this cycle, or not silent enough.
    Wait,
    /// Silence crossed the threshold; carries the seconds of silence.
    Due { silent_for: u64 },
}

#[derive(Debug, Default)]
struct CycleState {
    last_activity: Option<u64>,
    sent_this_cycle: bool,
    recent_outputs: VecDeque<String>,
}

/// Tracks one watched channel's revival cycle.
#[derive(Debug, Default)]
pub struct ReviveScheduler {
    state: Mutex<CycleState>,
}

/// Case- and punctuation-insensitive form used for duplicate comparison.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

impl ReviveScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backfill the activity marker from persisted state. Ignored once any
    /// live activity has been observed.
    pub async fn seed(&self, last_activity: u64) {
        let mut state = self.state.lock().await;
        if state.last_activity.is_none() {
            state.last_activity = Some(last_activity);
        }
    }

    /// Note a human message in the watched channel; resets the cycle.
    pub async fn record_activity(&self, now: u64) {
        let mut state = self.state.lock().await;
        state.last_activity = Some(now);
        state.sent_this_cycle = false;
    }

    /// Evaluate whether a revive is due. With no activity ever observed the
    /// first tick starts the clock instead of firing immediately.
    pub async fn evaluate(&self, now: u64, config: &QuietHoursConfig) -> ReviveDecision {
        let mut state = self.state.lock().await;
        let last = *state.last_activity.get_or_insert(now);
        if state.sent_this_cycle {
            return ReviveDecision::Wait;
        }

        let silent_for = now.saturating_sub(last);
        let required = config.effective_interval(now);
        if silent_for < required {
            debug!(silent_for, required, "channel not silent long enough");
            return ReviveDecision::Wait;
        }
        ReviveDecision::Due { silent_for }
    }

    /// Close the current cycle after a question was sent.
    pub async fn mark_sent(&self) {
        self.state.lock().await.sent_this_cycle = true;
    }

    /// Remember an output for duplicate avoidance, evicting the oldest past
    /// the cap.
    pub async fn store_output(&self, text: &str) {
        let mut state = self.state.lock().await;
        if state.recent_outputs.len() == RECENT_OUTPUT_CAP {
            state.recent_outputs.pop_front();
        }
        state.recent_outputs.push_back(text.to_owned());
    }

    /// Most recent outputs, oldest first.
    pub async fn recent_outputs(&self) -> Vec<String> {
        self.state.lock().await.recent_outputs.iter().cloned().collect()
    }

    /// Whether a candidate matches any remembered output after
    /// normalization.
    pub async fn is_recent_duplicate(&self, candidate: &str) -> bool {
        let normalized = normalize(candidate);
        self.state
            .lock()
            .await
            .recent_outputs
            .iter()
            .any(|past| normalize(past) == normalized)
    }
}
