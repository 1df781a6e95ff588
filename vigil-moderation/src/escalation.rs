//! Warning-count escalation: three strikes earns a timeout.

use tracing::{error, info, warn};

use vigil_utils::formatting::format_compact_duration;

use crate::dispatcher::WarningLedger;
use crate::gateway::{ActionGateway, GatewayError};

/// Warnings required before a restriction is applied.
pub const WARN_THRESHOLD: u64 = 3;
/// Restriction duration in seconds.
pub const RESTRICTION_SECS: u64 = 600;

/// Apply the timeout and reset the counter once the threshold is reached.
///
/// The counter is reset only after the restriction succeeds. On failure the
/// count stays at or above the threshold so the next message retries the
/// enforcement instead of silently forgiving the user.
pub async fn check_and_enforce<L, G>(
    ledger: &L,
    gateway: &G,
    user_id: u64,
    count: u64,
) -> anyhow::Result<bool>
where
    L: WarningLedger,
    G: ActionGateway,
{
    if count < WARN_THRESHOLD {
        return Ok(false);
    }

    match gateway.apply_timeout(user_id, RESTRICTION_SECS).await {
        Ok(()) => {
            ledger.reset(user_id).await?;
            info!(user_id = %user_id, "warning threshold reached, timeout applied");
            if let Err(source) = gateway
                .append_mod_log(&format!(
                    "User <@{user_id}> reached {WARN_THRESHOLD} warnings and was timed out for {}.",
                    format_compact_duration(RESTRICTION_SECS)
                ))
                .await
            {
                warn!(?source, "failed to record timeout in mod log");
            }
            Ok(true)
        }
        Err(GatewayError::MissingPermissions) => {
            warn!(user_id = %user_id, "cannot time out user, missing permissions");
            if let Err(source) = gateway
                .append_mod_log(&format!(
                    "Failed to time out <@{user_id}> at {count} warnings: missing permissions."
                ))
                .await
            {
                warn!(?source, "failed to record enforcement failure in mod log");
            }
            Ok(false)
        }
        Err(GatewayError::Delivery(source)) => {
            error!(?source, user_id = %user_id, "failed to apply timeout");
            if let Err(source) = gateway
                .append_mod_log(&format!("Failed to time out <@{user_id}> at {count} warnings."))
                .await
            {
                warn!(?source, "failed to record enforcement failure in mod log");
            }
            Ok(false)
        }
    }
}
