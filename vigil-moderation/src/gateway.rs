//! Contract between the enforcement pipeline and the platform client.

use thiserror::Error;

/// Delivery failures the pipeline tolerates. Permission failures are
/// distinguished so the dispatcher can log them without retrying.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing permissions")]
    MissingPermissions,
    #[error(transparent)]
    Delivery(#[from] anyhow::Error),
}

/// Every side effect the pipeline can request.
///
/// Implementations must treat each call as best-effort delivery; the
/// pipeline never retries and never aborts moderation on a failed call.
pub trait ActionGateway: Send + Sync {
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), GatewayError>;

    async fn send_channel_notice(&self, channel_id: u64, text: &str) -> Result<(), GatewayError>;

    async fn send_direct_notice(&self, user_id: u64, text: &str) -> Result<(), GatewayError>;

    /// Restrict the user from participating for `duration_secs`.
    async fn apply_timeout(&self, user_id: u64, duration_secs: u64) -> Result<(), GatewayError>;

    /// Append a line to the operator audit channel, if one is configured.
    async fn append_mod_log(&self, text: &str) -> Result<(), GatewayError>;
}
