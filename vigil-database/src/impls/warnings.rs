use anyhow::Context as _;

use crate::database::Database;

/// Read a user's current warning count (0 when the user has no row).
pub async fn get_warning_count(db: &Database, guild_id: u64, user_id: u64) -> anyhow::Result<u64> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;

    let count: Option<i32> =
        sqlx::query_scalar("SELECT count FROM warnings WHERE guild_id = $1 AND user_id = $2")
            .bind(guild_id_i64)
            .bind(user_id_i64)
            .fetch_optional(db.pool())
            .await?;

    let count = count.unwrap_or(0).max(0);
    Ok(count as u64)
}

/// Increment a user's warning count by exactly one and return the new count.
///
/// The upsert runs as a single statement so concurrent increments for the
/// same user can never lose an update.
pub async fn increment_warning_count(
    db: &Database,
    guild_id: u64,
    user_id: u64,
) -> anyhow::Result<u64> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;

    let count: i32 = sqlx::query_scalar(
        "INSERT INTO warnings (guild_id, user_id, count) VALUES ($1, $2, 1)
         ON CONFLICT (guild_id, user_id) DO UPDATE SET count = warnings.count + 1
         RETURNING count",
    )
    .bind(guild_id_i64)
    .bind(user_id_i64)
    .fetch_one(db.pool())
    .await?;

    u64::try_from(count).context("warning count out of u64 range")
}

/// Reset a user's warning count to zero after an enforced restriction.
pub async fn reset_warning_count(db: &Database, guild_id: u64, user_id: u64) -> anyhow::Result<()> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;

    sqlx::query("UPDATE warnings SET count = 0 WHERE guild_id = $1 AND user_id = $2")
        .bind(guild_id_i64)
        .bind(user_id_i64)
        .execute(db.pool())
        .await?;

    Ok(())
}
