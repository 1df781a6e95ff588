//! Per-message enforcement pipeline.
//!
//! One message flows through: immunity check, sliding-window record,
//! heuristic battery, delete/notify, warning increment, escalation. All
//! state writes for a user happen under that user's lock so concurrent
//! messages from the same author cannot lose warning updates.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use vigil_utils::formatting::format_warning_label;

use crate::escalation::{self, WARN_THRESHOLD};
use crate::event::{MessageEvent, RuleConfig};
use crate::gateway::{ActionGateway, GatewayError};
use crate::heuristics::{self, HeuristicRule, RuleInput};
use crate::tracker::MessageTracker;

/// Appended to direct notices for self-harm violations.
const SAFETY_RESOURCES_LINE: &str =
    "If you or someone you know is struggling, support is available: https://findahelpline.com";

/// Durable per-user warning state.
pub trait WarningLedger: Send + Sync {
    /// Record a warning and return the resulting count.
    async fn increment(&self, user_id: u64, reason: &str, now: u64) -> anyhow::Result<u64>;

    async fn current_count(&self, user_id: u64) -> anyhow::Result<u64>;

    async fn reset(&self, user_id: u64) -> anyhow::Result<()>;
}

/// One async mutex per user, created on first use.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: u64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(user_id).or_default())
        };
        lock.lock_owned().await
    }
}

/// What the pipeline did with a message.
#[derive(Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Author holds an immune role; nothing was recorded or evaluated.
    Immune,
    Clean,
    Violation {
        rule: &'static str,
        warning_count: u64,
        /// True when the threshold was reached and the timeout succeeded.
        enforced: bool,
    },
}

/// Run one message through the full pipeline.
///
/// Persistence failures propagate; delivery failures are logged and the
/// pipeline continues, so a broken DM channel never blocks escalation.
#[allow(clippy::too_many_arguments)]
pub async fn handle_message<L, G>(
    event: &MessageEvent,
    config: &RuleConfig,
    rules: &[Box<dyn HeuristicRule>],
    tracker: &MessageTracker,
    locks: &UserLocks,
    ledger: &L,
    gateway: &G,
    now: u64,
) -> anyhow::Result<PipelineOutcome>
where
    L: WarningLedger,
    G: ActionGateway,
{
    if config.is_immune(&event.author_role_ids) {
        return Ok(PipelineOutcome::Immune);
    }

    let _guard = locks.acquire(event.author_id).await;

    let history = tracker.record(event.author_id, &event.text, now).await;

    let input = RuleInput {
        text: &event.text,
        history: &history,
        banned_words: &config.banned_words,
        ping_protected_roles: &config.ping_protected_roles,
        drug_keywords: &config.drug_keywords,
    };
    let Some(violation) = heuristics::evaluate(rules, &input) else {
        // A user can cross the threshold through paths that never trigger a
        // rule here, so the enforcement check runs on clean messages too.
        let count = ledger.current_count(event.author_id).await?;
        escalation::check_and_enforce(ledger, gateway, event.author_id, count).await?;
        return Ok(PipelineOutcome::Clean);
    };

    debug!(
        user_id = %event.author_id,
        rule = violation.rule,
        "message violated moderation rule"
    );

    if violation.delete_message {
        match gateway
            .delete_message(event.channel_id, event.message_id)
            .await
        {
            Ok(()) => {}
            Err(GatewayError::MissingPermissions) => {
                warn!(message_id = %event.message_id, "cannot delete message, missing permissions");
            }
            Err(GatewayError::Delivery(source)) => {
                warn!(?source, message_id = %event.message_id, "failed to delete message");
            }
        }
    }

    let count = ledger
        .increment(event.author_id, &violation.reason, now)
        .await?;

    let channel_text = if violation.impersonal_reaction {
        violation.channel_notice.clone()
    } else {
        format!(
            "<@{}>, {} {}",
            event.author_id,
            violation.channel_notice,
            format_warning_label(count, WARN_THRESHOLD)
        )
    };
    if let Err(source) = gateway
        .send_channel_notice(event.channel_id, &channel_text)
        .await
    {
        warn!(?source, channel_id = %event.channel_id, "failed to send channel notice");
    }

    let mut direct_text = format!(
        "Vigil Warning {count}/{WARN_THRESHOLD}: {}",
        violation.direct_notice
    );
    if violation.include_safety_resources {
        direct_text.push('\n');
        direct_text.push_str(SAFETY_RESOURCES_LINE);
    }
    if let Err(source) = gateway
        .send_direct_notice(event.author_id, &direct_text)
        .await
    {
        warn!(?source, user_id = %event.author_id, "failed to deliver warning DM");
    }

    if let Err(source) = gateway
        .append_mod_log(&format!(
            "Warned <@{}> ({count}/{WARN_THRESHOLD}): {}",
            event.author_id, violation.reason
        ))
        .await
    {
        warn!(?source, "failed to record warning in mod log");
    }

    let enforced =
        escalation::check_and_enforce(ledger, gateway, event.author_id, count).await?;

    Ok(PipelineOutcome::Violation {
        rule: violation.rule,
        warning_count: count,
        enforced,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use super::{PipelineOutcome, UserLocks, WarningLedger, handle_message};
    use crate::escalation::RESTRICTION_SECS;
    use crate::event::{MessageEvent, RuleConfig};
    use crate::gateway::{ActionGateway, GatewayError};
    use crate::heuristics::build_rules;
    use crate::tracker::MessageTracker;

    #[derive(Default)]
    struct MemoryLedger {
        counts: StdMutex<HashMap<u64, u64>>,
        reasons: StdMutex<Vec<String>>,
    }

    impl WarningLedger for MemoryLedger {
        async fn increment(&self, user_id: u64, reason: &str, _now: u64) -> anyhow::Result<u64> {
            self.reasons.lock().unwrap().push(reason.to_owned());
            let mut counts = self.counts.lock().unwrap();
            let count = counts.entry(user_id).or_default();
            *count += 1;
            Ok(*count)
        }

        async fn current_count(&self, user_id: u64) -> anyhow::Result<u64> {
            Ok(*self.counts.lock().unwrap().get(&user_id).unwrap_or(&0))
        }

        async fn reset(&self, user_id: u64) -> anyhow::Result<()> {
            self.counts.lock().unwrap().remove(&user_id);
            Ok(())
        }
    }

    /// Ledger whose writes always fail, as if the store were down.
    struct BrokenLedger;

    impl WarningLedger for BrokenLedger {
        async fn increment(&self, _user_id: u64, _reason: &str, _now: u64) -> anyhow::Result<u64> {
            Err(anyhow::anyhow!("store unavailable"))
        }

        async fn current_count(&self, _user_id: u64) -> anyhow::Result<u64> {
            Err(anyhow::anyhow!("store unavailable"))
        }

        async fn reset(&self, _user_id: u64) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("store unavailable"))
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    enum Action {
        Delete(u64, u64),
        Channel(u64, String),
        Direct(u64, String),
        Timeout(u64, u64),
        ModLog(String),
    }

    #[derive(Default)]
    struct RecordingGateway {
        actions: StdMutex<Vec<Action>>,
        fail_timeouts: bool,
    }

    impl RecordingGateway {
        fn actions(&self) -> Vec<Action> {
            std::mem::take(&mut self.actions.lock().unwrap())
        }
    }

    impl ActionGateway for RecordingGateway {
        async fn delete_message(
            &self,
            channel_id: u64,
            message_id: u64,
        ) -> Result<(), GatewayError> {
            self.actions
                .lock()
                .unwrap()
                .push(Action::Delete(channel_id, message_id));
            Ok(())
        }

        async fn send_channel_notice(
            &self,
            channel_id: u64,
            text: &str,
        ) -> Result<(), GatewayError> {
            self.actions
                .lock()
                .unwrap()
                .push(Action::Channel(channel_id, text.to_owned()));
            Ok(())
        }

        async fn send_direct_notice(&self, user_id: u64, text: &str) -> Result<(), GatewayError> {
            self.actions
                .lock()
                .unwrap()
                .push(Action::Direct(user_id, text.to_owned()));
            Ok(())
        }

        async fn apply_timeout(
            &self,
            user_id: u64,
            duration_secs: u64,
        ) -> Result<(), GatewayError> {
            if self.fail_timeouts {
                return Err(GatewayError::MissingPermissions);
            }
            self.actions
                .lock()
                .unwrap()
                .push(Action::Timeout(user_id, duration_secs));
            Ok(())
        }

        async fn append_mod_log(&self, text: &str) -> Result<(), GatewayError> {
            self.actions
                .lock()
                .unwrap()
                .push(Action::ModLog(text.to_owned()));
            Ok(())
        }
    }

    fn event(text: &str) -> MessageEvent {
        MessageEvent {
            author_id: 42,
            channel_id: 7,
            message_id: 100,
            text: text.to_owned(),
            author_role_ids: vec![],
        }
    }

    fn config() -> RuleConfig {
        RuleConfig::with_overrides(vec!["spamword".to_owned()], vec![], vec![9000])
    }

    #[tokio::test]
    async fn clean_message_touches_nothing() {
        let rules = build_rules();
        let tracker = MessageTracker::new();
        let locks = UserLocks::new();
        let ledger = MemoryLedger::default();
        let gateway = RecordingGateway::default();

        let outcome = handle_message(
            &event("hello there"),
            &config(),
            &rules,
            &tracker,
            &locks,
            &ledger,
            &gateway,
            1000,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PipelineOutcome::Clean);
        assert!(gateway.actions().is_empty());
        assert_eq!(ledger.current_count(42).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn immune_author_skips_evaluation_and_tracking() {
        let rules = build_rules();
        let tracker = MessageTracker::new();
        let locks = UserLocks::new();
        let ledger = MemoryLedger::default();
        let gateway = RecordingGateway::default();

        let mut evt = event("spamword everywhere");
        evt.author_role_ids = vec![9000];

        let outcome = handle_message(
            &evt, &config(), &rules, &tracker, &locks, &ledger, &gateway, 1000,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PipelineOutcome::Immune);
        assert!(gateway.actions().is_empty());
        assert!(tracker.last_recorded_at(42).await.is_none());
    }

    #[tokio::test]
    async fn banned_word_deletes_and_warns() {
        let rules = build_rules();
        let tracker = MessageTracker::new();
        let locks = UserLocks::new();
        let ledger = MemoryLedger::default();
        let gateway = RecordingGateway::default();

        let outcome = handle_message(
            &event("total spamword"),
            &config(),
            &rules,
            &tracker,
            &locks,
            &ledger,
            &gateway,
            1000,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            PipelineOutcome::Violation {
                rule: "banned_word",
                warning_count: 1,
                enforced: false,
            }
        );

        let actions = gateway.actions();
        assert_eq!(actions[0], Action::Delete(7, 100));
        match &actions[1] {
            Action::Channel(7, text) => {
                assert!(text.starts_with("<@42>,"));
                assert!(text.contains("[Warning 1/3]"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
        match &actions[2] {
            Action::Direct(42, text) => assert!(text.starts_with("Vigil Warning 1/3:")),
            other => panic!("unexpected action: {other:?}"),
        }
        assert!(matches!(actions[3], Action::ModLog(_)));
    }

    #[tokio::test]
    async fn third_warning_times_out_and_resets() {
        let rules = build_rules();
        let tracker = MessageTracker::new();
        let locks = UserLocks::new();
        let ledger = MemoryLedger::default();
        let gateway = RecordingGateway::default();

        for i in 0..2 {
            handle_message(
                &event("spamword"),
                &config(),
                &rules,
                &tracker,
                &locks,
                &ledger,
                &gateway,
                1000 + i,
            )
            .await
            .unwrap();
        }
        gateway.actions();

        let outcome = handle_message(
            &event("spamword again"),
            &config(),
            &rules,
            &tracker,
            &locks,
            &ledger,
            &gateway,
            1005,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            PipelineOutcome::Violation {
                rule: "banned_word",
                warning_count: 3,
                enforced: true,
            }
        );
        assert!(
            gateway
                .actions()
                .contains(&Action::Timeout(42, RESTRICTION_SECS))
        );
        assert_eq!(ledger.current_count(42).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_timeout_keeps_warning_count() {
        let rules = build_rules();
        let tracker = MessageTracker::new();
        let locks = UserLocks::new();
        let ledger = MemoryLedger::default();
        let gateway = RecordingGateway {
            fail_timeouts: true,
            ..RecordingGateway::default()
        };

        for i in 0..3 {
            handle_message(
                &event("spamword"),
                &config(),
                &rules,
                &tracker,
                &locks,
                &ledger,
                &gateway,
                1000 + i,
            )
            .await
            .unwrap();
        }

        // Restriction never landed, so the count survives for a retry.
        assert_eq!(ledger.current_count(42).await.unwrap(), 3);

        let outcome = handle_message(
            &event("spamword once more"),
            &config(),
            &rules,
            &tracker,
            &locks,
            &ledger,
            &gateway,
            1010,
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            PipelineOutcome::Violation {
                rule: "banned_word",
                warning_count: 4,
                enforced: false,
            }
        );
    }

    #[tokio::test]
    async fn failed_increment_aborts_before_any_notice() {
        let rules = build_rules();
        let tracker = MessageTracker::new();
        let locks = UserLocks::new();
        let ledger = BrokenLedger;
        let gateway = RecordingGateway::default();

        let result = handle_message(
            &event("total spamword"),
            &config(),
            &rules,
            &tracker,
            &locks,
            &ledger,
            &gateway,
            1000,
        )
        .await;

        // The persistence error propagates; a stale count must never be
        // announced, so nothing after the delete was dispatched.
        assert!(result.is_err());
        assert_eq!(gateway.actions(), vec![Action::Delete(7, 100)]);
    }

    #[tokio::test]
    async fn clean_message_still_enforces_existing_threshold() {
        let rules = build_rules();
        let tracker = MessageTracker::new();
        let locks = UserLocks::new();
        let ledger = MemoryLedger::default();
        let gateway = RecordingGateway::default();

        // Warnings accumulated through some other path.
        ledger.counts.lock().unwrap().insert(42, 3);

        let outcome = handle_message(
            &event("totally innocent"),
            &config(),
            &rules,
            &tracker,
            &locks,
            &ledger,
            &gateway,
            1000,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PipelineOutcome::Clean);
        assert!(
            gateway
                .actions()
                .contains(&Action::Timeout(42, RESTRICTION_SECS))
        );
        assert_eq!(ledger.current_count(42).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn repetition_detected_through_tracker_window() {
        let rules = build_rules();
        let tracker = MessageTracker::new();
        let locks = UserLocks::new();
        let ledger = MemoryLedger::default();
        let gateway = RecordingGateway::default();

        for i in 0..2 {
            let outcome = handle_message(
                &event("same thing"),
                &config(),
                &rules,
                &tracker,
                &locks,
                &ledger,
                &gateway,
                1000 + i,
            )
            .await
            .unwrap();
            assert_eq!(outcome, PipelineOutcome::Clean);
        }

        let outcome = handle_message(
            &event("same thing"),
            &config(),
            &rules,
            &tracker,
            &locks,
            &ledger,
            &gateway,
            1002,
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            PipelineOutcome::Violation {
                rule: "repeated_messages",
                warning_count: 1,
                enforced: false,
            }
        );
    }
}
