mod events;
mod gateway;
mod tasks;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;
use sqlx::postgres::PgPoolOptions;

use vigil_core::{Data, Error};
use vigil_database::{
    CacheService, Database, MIGRATOR, cache::DEFAULT_CHAT_RATE_LIMIT_MAX_HITS,
    cache::DEFAULT_CHAT_RATE_LIMIT_WINDOW, impls::revive_history,
};
use vigil_llm::{CircuitBreaker, LlmService};
use vigil_moderation::UserLocks;
use vigil_moderation::heuristics::build_rules;
use vigil_moderation::tracker::{ChannelHistory, MessageTracker};
use vigil_revive::ReviveScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        let target = metadata.target();

        let within_info_level = *metadata.level() <= tracing::Level::INFO;
        if !within_info_level {
            return false;
        }

        !(target.starts_with("serenity::gateway::bridge::shard_manager")
            || target.starts_with("serenity::gateway::bridge::shard_runner"))
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    // Load the .env file
    dotenvy::dotenv().ok();

    let token = env::var("DISCORD_TOKEN")?;
    let database_url = env::var("DATABASE_URL")?;
    let guild_id = env::var("DISCORD_GUILD_ID")?.parse::<u64>()?;
    let revive_channel_id = env::var("REVIVE_CHANNEL_ID")?.parse::<u64>()?;
    let revive_role_id = match env::var("REVIVE_ROLE_ID") {
        Ok(value) => Some(value.parse::<u64>()?),
        Err(_) => None,
    };

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    info!("PostgreSQL connection established.");

    let redis_enabled = env_bool("REDIS_ENABLED", false);
    let redis_key_prefix =
        env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| "vigil:prod".to_string());

    let mut cache = if redis_enabled {
        match env::var("REDIS_URL") {
            Ok(redis_url) => match CacheService::redis(&redis_url, redis_key_prefix.clone()) {
                Ok(cache) => {
                    info!(key_prefix = %redis_key_prefix, "Redis cache enabled.");
                    cache
                }
                Err(err) => {
                    warn!(?err, key_prefix = %redis_key_prefix, "Failed to initialize Redis cache; continuing with DB-only mode.");
                    CacheService::disabled(redis_key_prefix.clone())
                }
            },
            Err(_) => {
                warn!(key_prefix = %redis_key_prefix, "REDIS_ENABLED=true but REDIS_URL is missing; continuing with DB-only mode.");
                CacheService::disabled(redis_key_prefix.clone())
            }
        }
    } else {
        info!("Redis cache disabled (set REDIS_ENABLED=true to enable).");
        CacheService::disabled(redis_key_prefix.clone())
    };

    let chat_ratelimit_window_seconds = env_u64(
        "CHAT_RATELIMIT_WINDOW_SECONDS",
        DEFAULT_CHAT_RATE_LIMIT_WINDOW.as_secs(),
    );
    let chat_ratelimit_max_hits =
        env_u64("CHAT_RATELIMIT_MAX_HITS", DEFAULT_CHAT_RATE_LIMIT_MAX_HITS);
    cache.configure_chat_rate_limit(
        Duration::from_secs(chat_ratelimit_window_seconds),
        chat_ratelimit_max_hits,
    );
    info!(
        chat_ratelimit_window_seconds = cache.chat_rate_limit_window().as_secs(),
        chat_ratelimit_max_hits = cache.chat_rate_limit_max_hits(),
        "Mention chat rate limit configured."
    );

    if cache.is_redis_enabled() {
        if let Err(err) = cache.ping().await {
            warn!(
                ?err,
                "Redis cache ping failed; cache operations will continue with fallback behavior."
            );
        } else {
            info!("Redis cache health check passed.");
        }
    }

    let db = Database::with_cache(db_pool, cache);

    // Config may have been edited in the database while the bot was down;
    // drop any stale cached copies.
    if let Err(err) =
        vigil_database::cache::invalidate_moderation_config(db.cache(), guild_id).await
    {
        warn!(?err, "failed to invalidate cached moderation config");
    }

    let llm = LlmService::from_env_optional()?;
    if llm.is_some() {
        info!("LLM integration enabled.");
    } else {
        info!("LLM integration disabled (missing/empty OLLAMA_* vars or OLLAMA_ENABLED=false).");
    }

    let auto_run_migrations = env_bool("AUTO_RUN_MIGRATIONS", true);
    if auto_run_migrations {
        MIGRATOR.run(db.pool()).await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![],
            event_handler: |ctx, event, framework, data| {
                Box::pin(handle_event(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, _framework| {
            let db = db.clone();
            let llm = llm.clone();
            Box::pin(async move {
                info!("Vigil is online.");

                let revive = Arc::new(ReviveScheduler::new());

                // Re-seed the revive cycle from persisted state so a restart
                // does not count as fresh activity.
                match revive_history::get_last_activity(&db, guild_id).await {
                    Ok(Some(at)) => revive.seed(at).await,
                    Ok(None) => {}
                    Err(source) => {
                        error!(?source, "failed to load persisted revive activity");
                    }
                }
                match revive_history::list_recent_revive_outputs(&db, guild_id).await {
                    Ok(outputs) => {
                        // Persisted newest-first; replay oldest-first to keep
                        // eviction order.
                        for output in outputs.iter().rev() {
                            revive.store_output(output).await;
                        }
                    }
                    Err(source) => {
                        error!(?source, "failed to load persisted revive outputs");
                    }
                }

                let data = Data {
                    db,
                    llm,
                    breaker: Arc::new(CircuitBreaker::new()),
                    rules: Arc::new(build_rules()),
                    tracker: Arc::new(MessageTracker::new()),
                    channel_history: Arc::new(ChannelHistory::new()),
                    user_locks: Arc::new(UserLocks::new()),
                    revive,
                    guild_id,
                    revive_channel_id,
                    revive_role_id,
                };

                tokio::spawn(tasks::breaker::run(Arc::clone(&data.breaker)));
                tokio::spawn(tasks::revive::run(ctx.clone(), data.clone()));

                Ok(data)
            })
        })
        .build();

    info!("Vigil is connecting...");

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    client.start().await?;
    Ok(())
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(value) => value.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::EventHandler { error, .. } => {
            error!(?error, "event handler error");
        }
        other => {
            error!(?other, "framework error");
        }
    }
}

async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        events::moderation::handle_message_moderation(ctx, data, new_message).await;
        events::mention_chat::handle_message_mention_chat(ctx, data, new_message).await?;
    }

    Ok(())
}
