//! Periodic relay board reconciliation.
//!
//! Every tick re-reads every board and corrects cache, store and viewers
//! wherever the hardware disagrees. A board that does not answer is expected
//! steady-state noise: it is counted and logged, and the sweep moves on.

use std::time::Duration;

use relay_boards::BoardCoordinator;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run the reconciliation loop until `cancel` is triggered.
pub async fn run(boards: BoardCoordinator, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_ms = interval.as_millis() as u64, "Board sync job started");

    let mut ticker = tokio::time::interval(interval);
    // A sweep slower than the interval delays the next one instead of bunching.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Board sync job stopping");
                break;
            }
            _ = ticker.tick() => {
                match boards.reconcile_all().await {
                    Ok(summary) if summary.failed > 0 => {
                        tracing::debug!(
                            synced = summary.synced,
                            failed = summary.failed,
                            "Board sync: some boards unreachable"
                        );
                    }
                    Ok(summary) => {
                        tracing::trace!(synced = summary.synced, "Board sync complete");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Board sync: could not list boards");
                    }
                }
            }
        }
    }
}
