use anyhow::Context as _;

use crate::{database::Database, model::warnings::WarnLogEntry};

#[derive(sqlx::FromRow)]
struct WarnLogRow {
    user_id: i64,
    reason: String,
    issued_by: String,
    created_at: i64,
}

/// Append one entry to the append-only warn audit log.
pub async fn append_warn_log(
    db: &Database,
    guild_id: u64,
    user_id: u64,
    reason: &str,
    issued_by: &str,
    created_at: u64,
) -> anyhow::Result<()> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;
    let created_at_i64 = i64::try_from(created_at).context("created_at out of i64 range")?;

    sqlx::query(
        "INSERT INTO warn_log (guild_id, user_id, reason, issued_by, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(guild_id_i64)
    .bind(user_id_i64)
    .bind(reason)
    .bind(issued_by)
    .bind(created_at_i64)
    .execute(db.pool())
    .await?;

    Ok(())
}

/// List the most recent warn log entries for a user, newest first.
pub async fn list_recent_warn_log(
    db: &Database,
    guild_id: u64,
    user_id: u64,
    limit: u32,
) -> anyhow::Result<Vec<WarnLogEntry>> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;
    let limit_i64 = i64::from(limit.clamp(1, 200));

    let rows: Vec<WarnLogRow> = sqlx::query_as(
        "SELECT user_id, reason, issued_by, created_at
         FROM warn_log
         WHERE guild_id = $1 AND user_id = $2
         ORDER BY created_at DESC, id DESC
         LIMIT $3",
    )
    .bind(guild_id_i64)
    .bind(user_id_i64)
    .bind(limit_i64)
    .fetch_all(db.pool())
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        entries.push(WarnLogEntry {
            user_id: u64::try_from(row.user_id).context("user_id row out of u64 range")?,
            reason: row.reason,
            issued_by: row.issued_by,
            created_at: u64::try_from(row.created_at).context("created_at row out of u64 range")?,
        });
    }

    Ok(entries)
}
