//! Background overdue sweep

use std::time::Duration;

use crate::services::LendingService;

/// Run `sweep_overdue` against the service clock every `interval`, forever.
///
/// Failures are logged and the loop keeps going; the next tick retries.
pub async fn run_overdue_sweeper(lending: LendingService, interval: Duration) {
    tracing::info!("🔄 Overdue sweeper started (every {:?})", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = lending.sweep_overdue_now().await {
            tracing::error!("❌ Overdue sweep failed: {}", e);
        }
    }
}

/// Spawn the sweeper when an interval is configured
pub fn spawn_overdue_sweeper(
    lending: LendingService,
    interval: Option<Duration>,
) -> Option<tokio::task::JoinHandle<()>> {
    match interval {
        Some(interval) => Some(tokio::spawn(run_overdue_sweeper(lending, interval))),
        None => {
            tracing::info!("Overdue sweeper disabled; overdue status refreshes only on request");
            None
        }
    }
}
