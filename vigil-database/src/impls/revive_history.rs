use anyhow::Context as _;

use crate::database::Database;

/// Maximum number of revive outputs retained per guild.
pub const REVIVE_HISTORY_CAP: u32 = 10;

/// Store an accepted revive output and prune the history back to the cap,
/// oldest rows first.
pub async fn insert_revive_output(
    db: &Database,
    guild_id: u64,
    content: &str,
    created_at: u64,
) -> anyhow::Result<()> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let created_at_i64 = i64::try_from(created_at).context("created_at out of i64 range")?;

    sqlx::query("INSERT INTO revive_outputs (guild_id, content, created_at) VALUES ($1, $2, $3)")
        .bind(guild_id_i64)
        .bind(content)
        .bind(created_at_i64)
        .execute(db.pool())
        .await?;

    sqlx::query(
        "DELETE FROM revive_outputs
         WHERE guild_id = $1 AND id NOT IN (
             SELECT id FROM revive_outputs
             WHERE guild_id = $1
             ORDER BY id DESC
             LIMIT $2
         )",
    )
    .bind(guild_id_i64)
    .bind(i64::from(REVIVE_HISTORY_CAP))
    .execute(db.pool())
    .await?;

    Ok(())
}

/// List stored revive outputs, newest first.
pub async fn list_recent_revive_outputs(
    db: &Database,
    guild_id: u64,
) -> anyhow::Result<Vec<String>> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;

    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT content FROM revive_outputs
         WHERE guild_id = $1
         ORDER BY id DESC
         LIMIT $2",
    )
    .bind(guild_id_i64)
    .bind(i64::from(REVIVE_HISTORY_CAP))
    .fetch_all(db.pool())
    .await?;

    Ok(rows)
}

/// Persist the last observed activity timestamp for the watched channel so a
/// restart can re-seed the revive scheduler.
pub async fn set_last_activity(db: &Database, guild_id: u64, at: u64) -> anyhow::Result<()> {
    super::bot_config::set_config_json(db, guild_id, "revive_last_activity", &at).await
}

/// Load the persisted last-activity timestamp, if any.
pub async fn get_last_activity(db: &Database, guild_id: u64) -> anyhow::Result<Option<u64>> {
    super::bot_config::get_config_json(db, guild_id, "revive_last_activity").await
}
