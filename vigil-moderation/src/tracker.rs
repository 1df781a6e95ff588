//! In-memory sliding windows over recent messages.

use std::collections::{HashMap, VecDeque};

use tokio::sync::RwLock;

/// Per-user history cap; repetition detection reads this window.
pub const USER_WINDOW_CAP: usize = 6;
/// Per-channel history cap used for LLM context.
pub const CHANNEL_WINDOW_CAP: usize = 10;

#[derive(Clone, Debug)]
struct TrackedMessage {
    text: String,
    recorded_at: u64,
}

/// Bounded per-user history of recent message texts and timestamps.
#[derive(Debug, Default)]
pub struct MessageTracker {
    windows: RwLock<HashMap<u64, VecDeque<TrackedMessage>>>,
}

impl MessageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `(text, now)` to the user's window, evicting the oldest entry
    /// past the cap, and return a snapshot of the texts (oldest first).
    pub async fn record(&self, user_id: u64, text: &str, now: u64) -> Vec<String> {
        let mut windows = self.windows.write().await;
        let window = windows.entry(user_id).or_default();

        window.push_back(TrackedMessage {
            text: text.to_owned(),
            recorded_at: now,
        });
        while window.len() > USER_WINDOW_CAP {
            window.pop_front();
        }

        window.iter().map(|entry| entry.text.clone()).collect()
    }

    /// Timestamp of the user's most recent recorded message, if any.
    pub async fn last_recorded_at(&self, user_id: u64) -> Option<u64> {
        let windows = self.windows.read().await;
        windows
            .get(&user_id)
            .and_then(|window| window.back())
            .map(|entry| entry.recorded_at)
    }
}

/// Bounded per-channel history of recent message texts, used as generation
/// context for mention-chat replies.
#[derive(Debug, Default)]
pub struct ChannelHistory {
    windows: RwLock<HashMap<u64, VecDeque<String>>>,
}

impl ChannelHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, channel_id: u64, text: &str) {
        let mut windows = self.windows.write().await;
        let window = windows.entry(channel_id).or_default();
        window.push_back(text.to_owned());
        while window.len() > CHANNEL_WINDOW_CAP {
            window.pop_front();
        }
    }

    /// Snapshot of the channel's recent messages, oldest first.
    pub async fn snapshot(&self, channel_id: u64) -> Vec<String> {
        let windows = self.windows.read().await;
        windows
            .get(&channel_id)
            .map(|window| window.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelHistory, MessageTracker};

    #[tokio::test]
    async fn user_window_never_exceeds_cap() {
        let tracker = MessageTracker::new();
        for i in 0..10u64 {
            let snapshot = tracker.record(1, &format!("msg {i}"), 100 + i).await;
            assert!(snapshot.len() <= 6);
        }
        let snapshot = tracker.record(1, "final", 200).await;
        assert_eq!(snapshot.len(), 6);
        // Oldest entries were evicted first.
        assert_eq!(snapshot[0], "msg 5");
        assert_eq!(snapshot[5], "final");
    }

    #[tokio::test]
    async fn windows_are_per_user() {
        let tracker = MessageTracker::new();
        tracker.record(1, "a", 1).await;
        let snapshot = tracker.record(2, "b", 2).await;
        assert_eq!(snapshot, vec!["b".to_owned()]);
        assert_eq!(tracker.last_recorded_at(1).await, Some(1));
        assert_eq!(tracker.last_recorded_at(3).await, None);
    }

    #[tokio::test]
    async fn channel_history_caps_at_ten() {
        let history = ChannelHistory::new();
        for i in 0..12 {
            history.record(7, &format!("line {i}")).await;
        }
        let snapshot = history.snapshot(7).await;
        assert_eq!(snapshot.len(), 10);
        assert_eq!(snapshot[0], "line 2");
        assert_eq!(snapshot[9], "line 11");
    }
}
