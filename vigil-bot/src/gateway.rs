//! Discord-backed implementation of the enforcement pipeline's side effects.

use poise::serenity_prelude as serenity;
use tracing::error;

use vigil_moderation::{ActionGateway, GatewayError};
use vigil_utils::time::now_unix_secs;

pub struct SerenityGateway<'a> {
    http: &'a serenity::Http,
    guild_id: serenity::GuildId,
    modlog_channel_id: Option<u64>,
}

impl<'a> SerenityGateway<'a> {
    pub fn new(
        http: &'a serenity::Http,
        guild_id: serenity::GuildId,
        modlog_channel_id: Option<u64>,
    ) -> Self {
        Self {
            http,
            guild_id,
            modlog_channel_id,
        }
    }
}

fn map_err(source: serenity::Error) -> GatewayError {
    if is_missing_permissions(&source) {
        GatewayError::MissingPermissions
    } else {
        GatewayError::Delivery(source.into())
    }
}

fn is_missing_permissions(source: &serenity::Error) -> bool {
    matches!(
        source,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 403 || response.error.code == 50013
    )
}

impl ActionGateway for SerenityGateway<'_> {
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), GatewayError> {
        serenity::ChannelId::new(channel_id)
            .delete_message(self.http, serenity::MessageId::new(message_id))
            .await
            .map_err(map_err)
    }

    async fn send_channel_notice(&self, channel_id: u64, text: &str) -> Result<(), GatewayError> {
        serenity::ChannelId::new(channel_id)
            .say(self.http, text)
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn send_direct_notice(&self, user_id: u64, text: &str) -> Result<(), GatewayError> {
        let channel = serenity::UserId::new(user_id)
            .create_dm_channel(self.http)
            .await
            .map_err(map_err)?;
        channel
            .send_message(self.http, serenity::CreateMessage::new().content(text))
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn apply_timeout(&self, user_id: u64, duration_secs: u64) -> Result<(), GatewayError> {
        let until_unix = i64::try_from(now_unix_secs() + duration_secs)
            .map_err(|_| GatewayError::Delivery(anyhow::anyhow!("timeout end out of range")))?;
        let until = serenity::Timestamp::from_unix_timestamp(until_unix)
            .map_err(|source| GatewayError::Delivery(source.into()))?;

        let edit = serenity::EditMember::new().disable_communication_until_datetime(until);
        self.guild_id
            .edit_member(self.http, serenity::UserId::new(user_id), edit)
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn append_mod_log(&self, text: &str) -> Result<(), GatewayError> {
        let Some(channel_id) = self.modlog_channel_id else {
            return Ok(());
        };
        if let Err(source) = serenity::ChannelId::new(channel_id).say(self.http, text).await {
            // A broken mod log must never block moderation itself.
            error!(?source, "failed to post to mod log channel");
        }
        Ok(())
    }
}
