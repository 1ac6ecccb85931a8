//! Periodic reclamation of expired token state

use std::sync::Arc;
use std::time::Duration;

use tamarind_persistence::PersistenceService;

/// Start a background task that drops expired blacklist entries and usage
/// windows every `period`. A failed sweep is logged and retried next tick.
pub fn start_cleanup_task(
    persistence: Arc<dyn PersistenceService>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            match persistence.token_cleanup_expired().await {
                Ok(removed) => tracing::debug!("Token cleanup removed {} entries", removed),
                Err(e) => tracing::warn!("Token cleanup failed: {}", e),
            }
        }
    })
}
