// ── Periodic pollers ──
//
// Interval tasks that run until their `CancellationToken` fires: the
// display clock tick and progress polling for long-running backup jobs.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Backup, EntityId};
use crate::source::ListingSource;

/// Progress polling period for in-flight jobs.
pub const PROGRESS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Display clock period.
pub const CLOCK_TICK: Duration = Duration::from_secs(1);

/// Consecutive transient failures tolerated before a poll gives up.
const MAX_POLL_FAILURES: u32 = 5;

/// Call `tick` every `period` until it breaks or `cancel` fires.
///
/// The first call happens one full period after spawning.
pub fn spawn_interval<F, Fut>(period: Duration, cancel: CancellationToken, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ControlFlow<()>> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if tick().await.is_break() {
                        break;
                    }
                }
            }
        }
    })
}

/// Poll a backup until it reaches a terminal status.
///
/// Every observation is passed to `on_progress`. Returns `Ok(None)` if
/// `cancel` fires first. Transient errors are retried a few times before
/// being returned.
pub async fn wait_for_backup<S, F>(
    source: &S,
    id: &EntityId,
    period: Duration,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<Option<Backup>, CoreError>
where
    S: ListingSource<Backup>,
    F: FnMut(&Backup),
{
    let mut failures = 0;
    loop {
        match source.get(id).await {
            Ok(backup) => {
                failures = 0;
                on_progress(&backup);
                if backup.status.is_terminal() {
                    debug!(%id, status = %backup.status, "backup job finished");
                    return Ok(Some(backup));
                }
            }
            Err(e) if e.is_transient() && failures < MAX_POLL_FAILURES => {
                failures += 1;
                warn!(%id, error = %e, failures, "backup poll failed, retrying");
            }
            Err(e) => return Err(e),
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(None),
            () = tokio::time::sleep(period) => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::model::{BackupKind, BackupStatus};
    use crate::source::MemorySource;

    fn backup(status: BackupStatus, progress: u8) -> Backup {
        Backup {
            id: EntityId::Int(1),
            filename: "nightly.tar.gz".into(),
            kind: BackupKind::Full,
            status,
            progress,
            size_bytes: None,
            created_at: Utc::now(),
            message: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn interval_stops_on_cancel() {
        let count = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let seen = Arc::clone(&count);
        let handle = spawn_interval(CLOCK_TICK, cancel.clone(), move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_stops_when_tick_breaks() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let handle = spawn_interval(CLOCK_TICK, CancellationToken::new(), move || {
            let seen = Arc::clone(&seen);
            async move {
                if seen.fetch_add(1, Ordering::SeqCst) == 1 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
        });
        handle.await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn backup_poll_reports_until_completed() {
        let source = Arc::new(MemorySource::new(vec![backup(BackupStatus::InProgress, 10)]));
        let cancel = CancellationToken::new();

        let driver = Arc::clone(&source);
        let bump = spawn_interval(PROGRESS_POLL_INTERVAL, cancel.clone(), move || {
            let driver = Arc::clone(&driver);
            async move {
                let current = driver.snapshot()[0].progress;
                let next = (current + 45).min(100);
                let status = if next == 100 { "completed" } else { "in_progress" };
                driver
                    .update(&EntityId::Int(1), &json!({ "progress": next, "status": status }))
                    .await
                    .unwrap();
                ControlFlow::Continue(())
            }
        });

        let mut seen = Vec::new();
        let done = wait_for_backup(
            source.as_ref(),
            &EntityId::Int(1),
            Duration::from_millis(500),
            &cancel,
            |b| seen.push(b.progress),
        )
        .await
        .unwrap()
        .unwrap();
        cancel.cancel();
        bump.await.unwrap();

        assert_eq!(done.status, BackupStatus::Completed);
        assert_eq!(seen.first(), Some(&10));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn backup_poll_returns_none_when_cancelled() {
        let source = MemorySource::new(vec![backup(BackupStatus::Pending, 0)]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = wait_for_backup(&source, &EntityId::Int(1), PROGRESS_POLL_INTERVAL, &cancel, |_| {})
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn missing_backup_is_an_error() {
        let source = MemorySource::<Backup>::new(vec![]);
        let err = wait_for_backup(
            &source,
            &EntityId::Int(9),
            PROGRESS_POLL_INTERVAL,
            &CancellationToken::new(),
            |_| {},
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }
}
