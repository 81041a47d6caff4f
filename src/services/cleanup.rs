//! Background cleanup of expired and revoked refresh tokens.

use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use crate::db::{DbPool, refresh_tokens};

/// Configuration for the cleanup service.
#[derive(Clone)]
pub struct CleanupConfig {
    /// Keep expired/revoked tokens this long before soft-deleting them
    pub grace_secs: u64,
    /// How often to run cleanup (in seconds)
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            grace_secs: 24 * 60 * 60,
            interval_secs: 60 * 60,
        }
    }
}

/// Spawn the periodic cleanup task.
pub fn start_cleanup_task(pool: DbPool, config: CleanupConfig) {
    tokio::spawn(async move {
        info!(
            "Starting refresh token cleanup (grace: {}s, interval: {}s)",
            config.grace_secs, config.interval_secs
        );

        let mut ticker = interval(Duration::from_secs(config.interval_secs));
        loop {
            ticker.tick().await;
            match refresh_tokens::cleanup_expired(pool.connection(), config.grace_secs).await {
                Ok(0) => {}
                Ok(n) => info!("Soft-deleted {} stale refresh tokens", n),
                Err(e) => error!("Refresh token cleanup failed: {}", e),
            }
        }
    });
}
