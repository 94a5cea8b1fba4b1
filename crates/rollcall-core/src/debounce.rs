// ── Debounced input ──
//
// A background task that forwards the latest pushed value only after the
// input has been quiet for `delay`. Every push restarts the timer. Dropping
// the `Debouncer` cancels the task, so nothing settles after teardown.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Default quiet period before a search string is propagated.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct Debouncer<V> {
    input: mpsc::UnboundedSender<V>,
    output: watch::Receiver<V>,
    cancel: CancellationToken,
}

impl<V> Debouncer<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Spawn the debounce task on the current runtime.
    pub fn spawn(initial: V, delay: Duration) -> Self {
        let (input, rx) = mpsc::unbounded_channel();
        let (tx, output) = watch::channel(initial);
        let cancel = CancellationToken::new();
        tokio::spawn(debounce_task(rx, tx, delay, cancel.clone()));
        Self {
            input,
            output,
            cancel,
        }
    }

    /// Record a new raw value; restarts the quiet period.
    pub fn push(&self, value: V) {
        // Only fails once the task is gone, at which point nothing listens.
        let _ = self.input.send(value);
    }

    /// The last settled value.
    pub fn settled(&self) -> V {
        self.output.borrow().clone()
    }

    /// Settled value if one arrived since the last call, without waiting.
    pub fn poll_settled(&mut self) -> Option<V> {
        if self.output.has_changed().unwrap_or(false) {
            Some(self.output.borrow_and_update().clone())
        } else {
            None
        }
    }

    /// Wait for the next settled value. `None` once the task has stopped.
    pub async fn changed(&mut self) -> Option<V> {
        self.output.changed().await.ok()?;
        Some(self.output.borrow_and_update().clone())
    }

    /// Drop any pending value and stop the task.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl<V> Drop for Debouncer<V> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn debounce_task<V: PartialEq>(
    mut rx: mpsc::UnboundedReceiver<V>,
    tx: watch::Sender<V>,
    delay: Duration,
    cancel: CancellationToken,
) {
    let mut pending: Option<(V, Instant)> = None;

    loop {
        let deadline = pending.as_ref().map(|(_, at)| *at);
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = rx.recv() => {
                let Some(value) = msg else { break };
                pending = Some((value, Instant::now() + delay));
            }
            () = sleep_until(deadline) => {
                if let Some((value, _)) = pending.take() {
                    let emitted = tx.send_if_modified(|current| {
                        if *current == value {
                            false
                        } else {
                            *current = value;
                            true
                        }
                    });
                    trace!(emitted, "debounce settled");
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn only_final_value_settles_after_quiet_period() {
        let mut d = Debouncer::spawn(String::new(), DEFAULT_DEBOUNCE);
        let start = Instant::now();

        d.push("a".to_owned());
        sleep(Duration::from_millis(100)).await;
        d.push("an".to_owned());
        sleep(Duration::from_millis(100)).await;
        d.push("ann".to_owned());
        sleep(Duration::from_millis(250)).await;
        assert_eq!(d.settled(), "");
        assert!(d.poll_settled().is_none());

        assert_eq!(d.changed().await.as_deref(), Some("ann"));
        assert_eq!(start.elapsed(), Duration::from_millis(500));

        // Exactly once: nothing else arrives.
        sleep(Duration::from_secs(5)).await;
        assert!(d.poll_settled().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_debouncer_never_settles() {
        let mut d = Debouncer::spawn(0_u32, Duration::from_millis(300));
        d.push(7);
        sleep(Duration::from_millis(10)).await;
        d.cancel();
        assert_eq!(d.changed().await, None);
        assert_eq!(d.settled(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn returning_to_settled_value_emits_nothing() {
        let mut d = Debouncer::spawn("x".to_owned(), Duration::from_millis(300));
        d.push("xy".to_owned());
        d.push("x".to_owned());
        sleep(Duration::from_secs(1)).await;
        assert!(d.poll_settled().is_none());
    }
}
