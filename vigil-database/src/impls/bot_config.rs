use anyhow::Context as _;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::cache::{CONFIG_CACHE_TTL, banned_words_key, protected_roles_key};
use crate::database::Database;

/// Read an arbitrary JSON-valued config key for a guild.
///
/// Missing keys and malformed payloads both yield `Ok(None)` so callers can
/// fall back to compiled defaults; malformed payloads are logged as warnings
/// rather than surfaced as errors.
pub async fn get_config_json<T>(
    db: &Database,
    guild_id: u64,
    key: &str,
) -> anyhow::Result<Option<T>>
where
    T: DeserializeOwned,
{
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;

    let raw: Option<String> =
        sqlx::query_scalar("SELECT value FROM bot_config WHERE guild_id = $1 AND key = $2")
            .bind(guild_id_i64)
            .bind(key)
            .fetch_optional(db.pool())
            .await?;

    let Some(raw) = raw else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(source) => {
            warn!(?source, key, "malformed stored config value; using default");
            Ok(None)
        }
    }
}

/// Write an arbitrary JSON-valued config key for a guild.
pub async fn set_config_json<T>(
    db: &Database,
    guild_id: u64,
    key: &str,
    value: &T,
) -> anyhow::Result<()>
where
    T: Serialize,
{
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let payload =
        serde_json::to_string(value).with_context(|| format!("serialize config `{key}`"))?;

    sqlx::query(
        "INSERT INTO bot_config (guild_id, key, value) VALUES ($1, $2, $3)
         ON CONFLICT (guild_id, key) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(guild_id_i64)
    .bind(key)
    .bind(&payload)
    .execute(db.pool())
    .await?;

    Ok(())
}

/// Fetch the guild's banned word list, cached with a short TTL.
///
/// Absent or malformed config yields an empty list; the dispatcher merges in
/// its compiled defaults.
pub async fn get_banned_words(db: &Database, guild_id: u64) -> anyhow::Result<Vec<String>> {
    let cache_key = banned_words_key(db.cache(), guild_id);
    db.cache()
        .get_or_load_json(&cache_key, CONFIG_CACHE_TTL, || async {
            let words: Option<Vec<String>> = get_config_json(db, guild_id, "banned_words").await?;
            Ok(words
                .unwrap_or_default()
                .into_iter()
                .map(|w| w.to_lowercase())
                .collect())
        })
        .await
}

/// Fetch the role ids protected from mass pinging, cached with a short TTL.
pub async fn get_ping_protected_roles(db: &Database, guild_id: u64) -> anyhow::Result<Vec<u64>> {
    let cache_key = protected_roles_key(db.cache(), guild_id);
    db.cache()
        .get_or_load_json(&cache_key, CONFIG_CACHE_TTL, || async {
            let roles: Option<Vec<u64>> =
                get_config_json(db, guild_id, "ping_protected_roles").await?;
            Ok(roles.unwrap_or_default())
        })
        .await
}

/// Fetch the role ids whose holders are immune from moderation heuristics.
pub async fn get_immune_roles(db: &Database, guild_id: u64) -> anyhow::Result<Vec<u64>> {
    let roles: Option<Vec<u64>> = get_config_json(db, guild_id, "immune_roles").await?;
    Ok(roles.unwrap_or_default())
}

/// Fetch the configured moderation log channel, if any.
pub async fn get_modlog_channel_id(db: &Database, guild_id: u64) -> anyhow::Result<Option<u64>> {
    get_config_json(db, guild_id, "modlog_channel_id").await
}
