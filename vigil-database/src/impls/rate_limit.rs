use crate::cache::chat_rate_limit_key;
use crate::database::Database;

/// Count a mention-chat hit and report whether the user is still within the
/// configured window limit.
pub async fn chat_mention_within_limit(
    db: &Database,
    guild_id: u64,
    channel_id: u64,
    user_id: u64,
) -> anyhow::Result<bool> {
    let cache = db.cache();
    let key = chat_rate_limit_key(cache, guild_id, channel_id, user_id);
    let count = cache
        .increment_with_window(&key, cache.chat_rate_limit_window())
        .await?;

    Ok(count <= cache.chat_rate_limit_max_hits())
}
