// Background session expiry loop

use super::SessionManager;
use crate::application::shutdown::ShutdownToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::info;

/// Periodically expires idle sessions
pub struct SessionSweeper {
    manager: Arc<SessionManager>,
    period: Duration,
}

impl SessionSweeper {
    pub fn new(manager: Arc<SessionManager>, period: Duration) -> Self {
        Self { manager, period }
    }

    /// Run until shutdown (spawn with tokio::spawn)
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            period_secs = self.period.as_secs(),
            max_age_minutes = self.manager.session_age_limit(),
            "Session sweeper started"
        );
        let mut tick = interval(self.period);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.manager.expire_stale_sessions();
                }
                _ = shutdown.wait() => {
                    break;
                }
            }
        }
        info!("Session sweeper stopped");
    }
}
