use std::sync::Arc;

use vigil_database::Database;
use vigil_llm::{CircuitBreaker, LlmService};
use vigil_moderation::UserLocks;
use vigil_moderation::heuristics::HeuristicRule;
use vigil_moderation::tracker::{ChannelHistory, MessageTracker};
use vigil_revive::ReviveScheduler;

pub type Error = anyhow::Error;

#[derive(Clone, Debug)]
pub struct Data {
    pub db: Database,
    pub llm: Option<LlmService>,
    pub breaker: Arc<CircuitBreaker>,
    pub rules: Arc<Vec<Box<dyn HeuristicRule>>>,
    pub tracker: Arc<MessageTracker>,
    pub channel_history: Arc<ChannelHistory>,
    pub user_locks: Arc<UserLocks>,
    pub revive: Arc<ReviveScheduler>,
    /// The single guild this deployment serves.
    pub guild_id: u64,
    /// Channel the revive scheduler watches and posts to.
    pub revive_channel_id: u64,
    /// Role mentioned in revive posts, when configured.
    pub revive_role_id: Option<u64>,
}

pub type Context<'a> = poise::Context<'a, Data, Error>;
