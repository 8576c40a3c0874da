//! Fire-every-N background timer.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Runs `tick` once per period until cancelled or dropped.
///
/// The first tick happens one full period after start. Once [`cancel`](Self::cancel)
/// returns no further tick will start; a tick already running is allowed to finish.
pub struct Scheduler {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Start on the current tokio runtime. `parent` cancelling stops the scheduler too.
    pub fn start<F, Fut>(period: Duration, parent: &CancellationToken, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = parent.child_token();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if task_token.is_cancelled() {
                    break;
                }
                tick().await;
            }
            tracing::debug!("Scheduler stopped");
        });

        tracing::debug!("Scheduler started with period {:?}", period);
        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel and wait for the task to exit
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
