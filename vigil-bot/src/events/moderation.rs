use poise::serenity_prelude as serenity;
use tracing::error;

use vigil_core::Data;
use vigil_database::Database;
use vigil_database::impls::bot_config::{
    get_banned_words, get_immune_roles, get_modlog_channel_id, get_ping_protected_roles,
};
use vigil_database::impls::revive_history::set_last_activity;
use vigil_database::impls::warn_log::{append_warn_log, list_recent_warn_log};
use vigil_database::impls::warnings::{
    get_warning_count, increment_warning_count, reset_warning_count,
};
use vigil_moderation::{
    ActionGateway, MessageEvent, PipelineOutcome, RuleConfig, WarningLedger, handle_message,
};
use vigil_utils::time::now_unix_secs;

use crate::gateway::SerenityGateway;

/// Warning storage backed by Postgres, scoped to one guild. Every increment
/// also lands in the append-only audit log.
struct DbLedger<'a> {
    db: &'a Database,
    guild_id: u64,
}

impl WarningLedger for DbLedger<'_> {
    async fn increment(&self, user_id: u64, reason: &str, now: u64) -> anyhow::Result<u64> {
        let count = increment_warning_count(self.db, self.guild_id, user_id).await?;
        append_warn_log(self.db, self.guild_id, user_id, reason, "system", now).await?;
        Ok(count)
    }

    async fn current_count(&self, user_id: u64) -> anyhow::Result<u64> {
        get_warning_count(self.db, self.guild_id, user_id).await
    }

    async fn reset(&self, user_id: u64) -> anyhow::Result<()> {
        reset_warning_count(self.db, self.guild_id, user_id).await
    }
}

/// Run an incoming message through the moderation pipeline and keep the
/// revive scheduler's activity marker current.
pub async fn handle_message_moderation(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) {
    // Ignore bots and webhooks.
    if message.author.bot || message.webhook_id.is_some() {
        return;
    }

    let Some(guild_id) = message.guild_id else {
        return;
    };
    if guild_id.get() != data.guild_id {
        return;
    }

    let now = now_unix_secs();

    // Human chatter in the watched channel resets the revive cycle even if
    // the message later turns out to violate a rule.
    if message.channel_id.get() == data.revive_channel_id {
        data.revive.record_activity(now).await;
        if let Err(source) = set_last_activity(&data.db, data.guild_id, now).await {
            error!(?source, "failed to persist revive activity marker");
        }
    }

    // Keep channel context for mention chat.
    data.channel_history
        .record(message.channel_id.get(), &message.content)
        .await;

    let config = load_rule_config(&data.db, data.guild_id).await;

    let event = MessageEvent {
        author_id: message.author.id.get(),
        channel_id: message.channel_id.get(),
        message_id: message.id.get(),
        text: message.content.clone(),
        author_role_ids: message
            .member
            .as_ref()
            .map(|member| member.roles.iter().map(|role| role.get()).collect())
            .unwrap_or_default(),
    };

    let modlog_channel_id = match get_modlog_channel_id(&data.db, data.guild_id).await {
        Ok(id) => id,
        Err(source) => {
            error!(?source, "failed to read mod log channel config");
            None
        }
    };

    let ledger = DbLedger {
        db: &data.db,
        guild_id: data.guild_id,
    };
    let gateway = SerenityGateway::new(&ctx.http, guild_id, modlog_channel_id);

    match handle_message(
        &event,
        &config,
        &data.rules,
        &data.tracker,
        &data.user_locks,
        &ledger,
        &gateway,
        now,
    )
    .await
    {
        Ok(PipelineOutcome::Violation { enforced: true, .. }) => {
            post_violation_history(&data.db, &gateway, data.guild_id, event.author_id).await;
        }
        Ok(_) => {}
        Err(source) => {
            // A persistence failure means the escalation counter may be
            // stale; operators need to know, not just the log.
            error!(?source, message_id = %message.id, "moderation pipeline failed");
            if let Err(source) = gateway
                .append_mod_log(&format!(
                    "Moderation processing failed for a message from <@{}>; \
                     warning state may be stale.",
                    message.author.id
                ))
                .await
            {
                error!(?source, "failed to surface pipeline failure to mod log");
            }
        }
    }
}

/// Give operators the context behind a timeout: the user's most recent
/// audit-log entries.
async fn post_violation_history(
    db: &Database,
    gateway: &SerenityGateway<'_>,
    guild_id: u64,
    user_id: u64,
) {
    let entries = match list_recent_warn_log(db, guild_id, user_id, 5).await {
        Ok(entries) => entries,
        Err(source) => {
            error!(?source, "failed to load warn log for mod log summary");
            return;
        }
    };
    if entries.is_empty() {
        return;
    }

    let mut lines = vec![format!("Recent violations for <@{user_id}>:")];
    for entry in entries {
        lines.push(format!(
            "- <t:{}:R> {} (by {})",
            entry.created_at, entry.reason, entry.issued_by
        ));
    }
    if let Err(source) = gateway.append_mod_log(&lines.join("\n")).await {
        error!(?source, "failed to post violation history to mod log");
    }
}

/// Snapshot the guild's rule configuration, falling back to compiled
/// defaults when a read fails.
async fn load_rule_config(db: &Database, guild_id: u64) -> RuleConfig {
    let banned_words = match get_banned_words(db, guild_id).await {
        Ok(words) => words,
        Err(source) => {
            error!(?source, "failed to load banned words");
            Vec::new()
        }
    };
    let ping_protected_roles = match get_ping_protected_roles(db, guild_id).await {
        Ok(roles) => roles,
        Err(source) => {
            error!(?source, "failed to load ping-protected roles");
            Vec::new()
        }
    };
    let immune_roles = match get_immune_roles(db, guild_id).await {
        Ok(roles) => roles,
        Err(source) => {
            error!(?source, "failed to load immune roles");
            Vec::new()
        }
    };

    RuleConfig::with_overrides(banned_words, ping_protected_roles, immune_roles)
}
