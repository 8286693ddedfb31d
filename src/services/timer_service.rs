use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

use crate::error::Error;
use crate::models::result::SubmitTrigger;
use crate::services::session_service::SessionService;

const TICK: Duration = Duration::from_secs(1);

/// The one-second countdown task of a single session.
pub struct SessionTimer {
    handle: JoinHandle<()>,
}

impl SessionTimer {
    pub fn arm(service: SessionService, token: String) -> Self {
        Self {
            handle: tokio::spawn(run_countdown(service, token)),
        }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Handle that outlives the timer, for observing its task after cancel.
    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }
}

async fn run_countdown(service: SessionService, token: String) {
    let mut interval = tokio::time::interval(TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;

        let tick = match service.tick(&token).await {
            Ok(tick) => tick,
            Err(_) => break,
        };
        if !tick.expired {
            continue;
        }

        // Submit on the next scheduling turn, outside the tick that saw zero.
        tokio::task::yield_now().await;
        match service.finish(&token, SubmitTrigger::Timeout).await {
            Ok(_) => tracing::info!("Quiz auto-submitted on timeout"),
            Err(Error::Conflict(_)) => {
                tracing::debug!("Quiz was submitted before the timeout fired")
            }
            Err(e) => tracing::error!(error = ?e, "Timeout submission failed"),
        }
        break;
    }
}
