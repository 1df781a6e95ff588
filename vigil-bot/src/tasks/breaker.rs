use std::sync::Arc;
use std::time::Duration;

use vigil_llm::CircuitBreaker;
use vigil_utils::time::now_unix_secs;

const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically advance the breaker clock so an open circuit closes once its
/// cooldown has elapsed, even with no traffic.
pub async fn run(breaker: Arc<CircuitBreaker>) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        interval.tick().await;
        breaker.tick(now_unix_secs());
    }
}
