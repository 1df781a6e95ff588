pub mod bot_config;
pub mod rate_limit;
pub mod revive_history;
pub mod warn_log;
pub mod warnings;
