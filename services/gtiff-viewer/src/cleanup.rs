//! Background removal of idle sessions.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::interval;
use tracing::{debug, info};

use crate::metrics;
use crate::state::AppState;

/// Statistics from a cleanup run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CleanupStats {
    /// Sessions removed together with their workspaces
    pub sessions_removed: usize,
    /// Sessions still live after the run
    pub sessions_remaining: usize,
}

/// Periodically expires sessions idle for longer than the TTL.
pub struct CleanupTask {
    state: Arc<AppState>,
    ttl: Option<Duration>,
    interval: Duration,
}

impl CleanupTask {
    pub fn new(state: Arc<AppState>) -> Self {
        let ttl = state.config.session_ttl;
        let interval = state.config.cleanup_interval;
        Self { state, ttl, interval }
    }

    /// Run one expiry sweep.
    pub async fn run_once(&self) -> CleanupStats {
        let Some(ttl) = self.ttl else {
            return CleanupStats {
                sessions_removed: 0,
                sessions_remaining: self.state.sessions.len().await,
            };
        };

        let sessions_removed = self.state.sessions.expire_idle(ttl).await;
        let sessions_remaining = self.state.sessions.len().await;
        metrics::record_sessions(sessions_remaining);

        if sessions_removed > 0 {
            info!(
                removed = sessions_removed,
                remaining = sessions_remaining,
                "Expired idle sessions"
            );
        } else {
            debug!(remaining = sessions_remaining, "No idle sessions to expire");
        }

        CleanupStats {
            sessions_removed,
            sessions_remaining,
        }
    }

    /// Run the cleanup task in a loop.
    pub async fn run_forever(self) {
        let Some(ttl) = self.ttl else {
            info!("Session cleanup disabled");
            return;
        };

        info!(
            ttl_secs = ttl.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Starting session cleanup task"
        );

        let mut ticker = interval(self.interval);
        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }
}
