//! Idle auto-stop timer.
//!
//! A single countdown per runtime. Every request pushes the deadline to
//! `now + window`; when the deadline passes the armed callback runs once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Window used when auto-stop is disabled: 100 years.
pub const UNBOUNDED_HOURS: u64 = 100 * 365 * 24;

const UNBOUNDED: Duration = Duration::from_secs(UNBOUNDED_HOURS * 60 * 60);

pub struct IdleTimer {
    window_ms: AtomicU64,
    deadline: watch::Sender<Instant>,
    task: ArcSwapOption<AbortHandle>,
}

impl std::fmt::Debug for IdleTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleTimer")
            .field("window", &self.window())
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl Default for IdleTimer {
    fn default() -> Self {
        Self::new(UNBOUNDED)
    }
}

impl IdleTimer {
    pub fn new(window: Duration) -> Self {
        let (deadline, _) = watch::channel(Instant::now());
        Self {
            window_ms: AtomicU64::new(window.as_millis() as u64),
            deadline,
            task: ArcSwapOption::empty(),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms.load(Ordering::Relaxed))
    }

    /// Change the window; a running countdown restarts with it.
    pub fn set_window(&self, window: Duration) {
        self.window_ms.store(window.as_millis() as u64, Ordering::Relaxed);
        if self.is_armed() {
            self.reset();
        }
    }

    /// `0` disables auto-stop (the window becomes [`UNBOUNDED_HOURS`]).
    pub fn set_auto_stop_hours(&self, hours: u32) {
        let hours = if hours == 0 { UNBOUNDED_HOURS } else { u64::from(hours) };
        self.set_window(Duration::from_secs(hours * 60 * 60));
        tracing::debug!(hours, "Idle window updated");
    }

    /// Push the deadline to `now + window`. Never blocks.
    pub fn reset(&self) {
        let now = Instant::now();
        let deadline = now
            .checked_add(self.window())
            .unwrap_or_else(|| now + UNBOUNDED);
        self.deadline.send_replace(deadline);
    }

    pub fn is_armed(&self) -> bool {
        self.task.load().is_some()
    }

    /// Start the countdown; `on_fire` runs once if the deadline passes.
    ///
    /// Re-arming cancels the previous countdown.
    pub fn arm<F>(&self, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.disarm();
        self.reset();

        let mut deadline = self.deadline.subscribe();
        let task = tokio::spawn(async move {
            loop {
                let at = *deadline.borrow_and_update();
                tokio::select! {
                    _ = tokio::time::sleep_until(at) => {
                        if !deadline.has_changed().unwrap_or(false) && Instant::now() >= at {
                            break;
                        }
                    }
                    changed = deadline.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
            tracing::info!("Idle window elapsed");
            on_fire();
        });

        self.task.store(Some(Arc::new(task.abort_handle())));
    }

    /// Cancel the countdown, if any.
    pub fn disarm(&self) {
        if let Some(task) = self.task.swap(None) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&fired);
        (fired, move || {
            sink.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn zero_hours_means_unbounded() {
        let timer = IdleTimer::new(Duration::from_secs(1));
        timer.set_auto_stop_hours(0);
        assert_eq!(timer.window(), Duration::from_secs(876_000 * 60 * 60));

        timer.set_auto_stop_hours(2);
        assert_eq!(timer.window(), Duration::from_secs(2 * 60 * 60));
    }

    #[test]
    fn default_window_is_unbounded() {
        assert_eq!(IdleTimer::default().window(), Duration::from_secs(UNBOUNDED_HOURS * 60 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_window() {
        let timer = IdleTimer::new(Duration::from_millis(100));
        let (fired, on_fire) = counter();
        timer.arm(on_fire);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_postpones_firing() {
        let timer = IdleTimer::new(Duration::from_millis(100));
        let (fired, on_fire) = counter();
        timer.arm(on_fire);

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(60)).await;
            timer.reset();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_cancels() {
        let timer = IdleTimer::new(Duration::from_millis(100));
        let (fired, on_fire) = counter();
        timer.arm(on_fire);
        timer.disarm();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn new_window_applies_to_running_countdown() {
        let timer = IdleTimer::new(Duration::from_secs(3600));
        let (fired, on_fire) = counter();
        timer.arm(on_fire);

        timer.set_window(Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
