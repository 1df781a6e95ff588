pub mod breaker;
pub mod revive;
