//! Adaptive dead-chat revival scheduling.

pub mod scheduler;

pub use scheduler::{QuietHoursConfig, ReviveDecision, ReviveScheduler};
