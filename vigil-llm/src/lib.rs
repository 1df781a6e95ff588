pub mod breaker;
mod client;
mod prompt;

pub use breaker::{CircuitBreaker, Feature};
pub use client::LlmService;
