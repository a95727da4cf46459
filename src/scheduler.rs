// src/scheduler.rs
use std::future::Future;
use std::time::Duration;

use crate::cycle::UpdateOrchestrator;

/// Run cycles back to back with `interval` of idle time after each one, until
/// `shutdown` resolves. The interval is measured from the end of a cycle, so a
/// slow cycle pushes the next one back instead of overlapping it.
///
/// Shutdown interrupts whatever is in progress, including a running cycle.
/// Returns the number of cycles that completed.
pub async fn run_until<F>(orchestrator: &mut UpdateOrchestrator, interval: Duration, shutdown: F) -> u64
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut completed = 0u64;

    loop {
        tokio::select! {
            report = orchestrator.run_cycle() => {
                completed += 1;
                tracing::debug!(
                    cycle = completed,
                    detected = report.detected.len(),
                    delivered = report.delivered,
                    failed = report.failed,
                    "cycle finished"
                );
            }
            _ = &mut shutdown => break,
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => break,
        }
    }

    tracing::info!(cycles = completed, "shutting down");
    completed
}
