//! Background task that periodically returns expired holds to free.
//!
//! Runs in a tokio::spawn loop off the request path. The sweep is one
//! conditional update, so it never races a concurrent commit.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{info, warn};

use super::ledger::SlotLedger;
use crate::shared::shutdown::ShutdownSignal;

/// Start the hold expiry background task.
pub fn start_hold_expiry_task(
    ledger: Arc<SlotLedger>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(check_interval = check_interval_secs, "⏳ Hold expiry task started");

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs.max(1)));
        let stop = shutdown.notified().wait();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = ledger.sweep_expired(Utc::now()).await {
                        warn!(error = %e, "Hold expiry sweep error");
                    }
                }
                _ = &mut stop => {
                    info!("⏳ Hold expiry task shutting down");
                    break;
                }
            }
        }

        info!("⏳ Hold expiry task stopped");
    })
}
