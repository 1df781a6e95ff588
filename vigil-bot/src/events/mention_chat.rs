use poise::serenity_prelude as serenity;
use tracing::{debug, error, warn};

use vigil_core::{Data, Error};
use vigil_database::impls::bot_config::get_banned_words;
use vigil_database::impls::rate_limit::chat_mention_within_limit;
use vigil_llm::Feature;
use vigil_utils::persona::{DEGRADED_MODE_LINE, Tone, persona_line};
use vigil_utils::sanitize::{count_links, sanitize_mentions, strip_links};
use vigil_utils::time::now_unix_secs;

/// Discord message length cap.
const MAX_REPLY_CHARS: usize = 2_000;

/// Reply to messages that mention the bot, guarded by the per-user rate
/// limit and the LLM circuit breaker.
pub async fn handle_message_mention_chat(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<(), Error> {
    if message.author.bot || message.webhook_id.is_some() {
        return Ok(());
    }
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    if guild_id.get() != data.guild_id {
        return Ok(());
    }

    let bot_id = ctx.cache.current_user().id;
    if !message.mentions_user_id(bot_id) {
        return Ok(());
    }

    let Some(llm) = &data.llm else {
        return Ok(());
    };

    let within_limit = match chat_mention_within_limit(
        &data.db,
        data.guild_id,
        message.channel_id.get(),
        message.author.id.get(),
    )
    .await
    {
        Ok(within) => within,
        Err(source) => {
            // Fail open: a cache outage must not mute the bot.
            warn!(?source, "chat rate limit check failed");
            true
        }
    };
    if !within_limit {
        debug!(user_id = %message.author.id, "mention chat rate limit reached");
        message
            .reply(
                ctx,
                persona_line("cooling circuits engaged, ask me again later.", Tone::Warning),
            )
            .await?;
        return Ok(());
    }

    if !data.breaker.is_enabled(Feature::Chat) {
        message.reply(ctx, DEGRADED_MODE_LINE).await?;
        return Ok(());
    }

    let prompt = message
        .content
        .replace(&format!("<@{bot_id}>"), "")
        .replace(&format!("<@!{bot_id}>"), "")
        .trim()
        .to_owned();
    let context = data.channel_history.snapshot(message.channel_id.get()).await;

    let _typing = message.channel_id.start_typing(&ctx.http);

    match llm.generate(&prompt, &context).await {
        Ok(reply) => {
            let reply = sanitize_reply(data, &reply).await;
            message.reply(ctx, reply).await?;
        }
        Err(source) => {
            error!(?source, "mention chat generation failed");
            data.breaker.record_error(now_unix_secs());
            message.reply(ctx, DEGRADED_MODE_LINE).await?;
        }
    }

    Ok(())
}

/// Neutralize mentions and links and veto banned words before the model's
/// output reaches the channel.
async fn sanitize_reply(data: &Data, reply: &str) -> String {
    let links = count_links(reply);
    if links > 0 {
        debug!(links, "removing links from model reply");
    }
    let cleaned = strip_links(&sanitize_mentions(reply));

    let mut banned = match get_banned_words(&data.db, data.guild_id).await {
        Ok(words) => words,
        Err(source) => {
            warn!(?source, "failed to load banned words for reply veto");
            Vec::new()
        }
    };
    if banned.is_empty() {
        banned = vigil_moderation::heuristics::patterns::DEFAULT_BANNED_WORDS
            .iter()
            .map(|word| (*word).to_owned())
            .collect();
    }

    let lowered = cleaned.to_lowercase();
    let tainted = banned.iter().any(|word| {
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == word.as_str())
    });
    if tainted {
        return DEGRADED_MODE_LINE.to_owned();
    }

    if cleaned.chars().count() > MAX_REPLY_CHARS {
        cleaned.chars().take(MAX_REPLY_CHARS).collect()
    } else {
        cleaned
    }
}
