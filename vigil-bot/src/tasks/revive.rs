use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{debug, error, info, warn};

use vigil_core::Data;
use vigil_database::impls::bot_config::get_config_json;
use vigil_database::impls::revive_history::insert_revive_output;
use vigil_llm::Feature;
use vigil_revive::{QuietHoursConfig, ReviveDecision};
use vigil_utils::time::now_unix_secs;

const TICK_INTERVAL: Duration = Duration::from_secs(600);

/// Configuration key for per-guild quiet-hours overrides.
const QUIET_HOURS_CONFIG_KEY: &str = "revive_quiet_hours";

/// Periodically check the watched channel and post a conversation starter
/// once it has been silent past the threshold.
pub async fn run(ctx: serenity::Context, data: Data) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(source) = tick(&ctx, &data).await {
            error!(?source, "revive tick failed");
        }
    }
}

async fn tick(ctx: &serenity::Context, data: &Data) -> anyhow::Result<()> {
    let now = now_unix_secs();

    let config = match get_config_json::<QuietHoursConfig>(
        &data.db,
        data.guild_id,
        QUIET_HOURS_CONFIG_KEY,
    )
    .await
    {
        Ok(Some(config)) => config,
        Ok(None) => QuietHoursConfig::default(),
        Err(source) => {
            warn!(?source, "failed to load quiet hours config, using defaults");
            QuietHoursConfig::default()
        }
    };

    let ReviveDecision::Due { silent_for } = data.revive.evaluate(now, &config).await else {
        return Ok(());
    };

    if !data.breaker.is_enabled(Feature::Revive) {
        debug!("revive due but LLM breaker is open");
        return Ok(());
    }
    let Some(llm) = &data.llm else {
        debug!("revive due but LLM integration is disabled");
        return Ok(());
    };

    let avoid = data.revive.recent_outputs().await;
    let question = match llm.generate_revive_question(&avoid).await {
        Ok(question) => question,
        Err(source) => {
            error!(?source, "revive question generation failed");
            data.breaker.record_error(now_unix_secs());
            return Ok(());
        }
    };

    // A repeat slips past the prompt sometimes; drop it and leave the cycle
    // open so the next tick tries again.
    if data.revive.is_recent_duplicate(&question).await {
        debug!("generated revive question duplicated recent output, skipping");
        return Ok(());
    }

    let text = match data.revive_role_id {
        Some(role_id) => format!("<@&{role_id}> {question}"),
        None => question.clone(),
    };
    serenity::ChannelId::new(data.revive_channel_id)
        .say(&ctx.http, text)
        .await?;

    info!(silent_for, "revive question posted");
    data.revive.mark_sent().await;
    data.revive.store_output(&question).await;
    if let Err(source) = insert_revive_output(&data.db, data.guild_id, &question, now).await {
        error!(?source, "failed to persist revive output");
    }

    Ok(())
}
