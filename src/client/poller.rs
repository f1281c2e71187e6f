use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Fixed-interval poll loop with change detection. Each tick fetches a full
/// snapshot and notifies only when it differs from the previous one. A slow
/// fetch skips ticks instead of queueing them, so requests never pile up.
///
/// The live-thread refresh and the slower background checks are separate
/// `Poller`s with their own cadences.
pub struct Poller {
    alive: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn<F, Fut, T, E, N>(period: Duration, mut fetch: F, mut notify: N) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: PartialEq + Send + 'static,
        E: std::fmt::Display + Send + 'static,
        N: FnMut(&T) + Send + 'static,
    {
        let alive = Arc::new(AtomicBool::new(true));
        let flag = alive.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last: Option<T> = None;

            loop {
                ticker.tick().await;
                if !flag.load(Ordering::Acquire) {
                    break;
                }
                match fetch().await {
                    Ok(snapshot) => {
                        // A fetch that completes after stop() is dropped.
                        if !flag.load(Ordering::Acquire) {
                            break;
                        }
                        if last.as_ref() != Some(&snapshot) {
                            notify(&snapshot);
                            last = Some(snapshot);
                        }
                    }
                    // Polling is best-effort: failures are logged and the
                    // next tick retries.
                    Err(e) => debug!("poll fetch failed, retrying next tick: {}", e),
                }
            }
        });

        Self { alive, handle }
    }

    /// Stops scheduling further ticks. An in-flight fetch is not aborted;
    /// its result is ignored via the liveness flag.
    pub fn stop(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Stops and waits for the loop to wind down.
    pub async fn shutdown(self) {
        self.stop();
        let _ = self.handle.await;
    }
}
