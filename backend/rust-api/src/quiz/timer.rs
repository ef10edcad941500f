use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use super::lock;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Expired,
}

pub type ExpiryHandler = Arc<dyn Fn() + Send + Sync>;

/// Single-shot countdown driven by one tokio task per running period.
///
/// The expiry handler is looked up when the countdown reaches zero, so a
/// handler registered after `start` is the one that fires.
pub struct CountdownTimer {
    inner: Arc<Mutex<TimerInner>>,
    tick: Duration,
}

struct TimerInner {
    remaining: u32,
    status: TimerStatus,
    handler: Option<ExpiryHandler>,
    driver: Option<JoinHandle<()>>,
    // Bumped on every start/pause/reset; a driver only acts for its own generation.
    generation: u64,
}

impl CountdownTimer {
    pub fn new(initial_seconds: u32) -> Self {
        Self::with_tick(initial_seconds, DEFAULT_TICK)
    }

    pub fn with_tick(initial_seconds: u32, tick: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TimerInner {
                remaining: initial_seconds,
                status: TimerStatus::Idle,
                handler: None,
                driver: None,
                generation: 0,
            })),
            tick,
        }
    }

    pub fn set_expiry_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        lock(&self.inner).handler = Some(Arc::new(handler));
    }

    pub fn clear_expiry_handler(&self) {
        lock(&self.inner).handler = None;
    }

    /// Starts or resumes the countdown. Returns `false` when nothing changed.
    pub fn start(&self) -> bool {
        let mut inner = lock(&self.inner);
        if matches!(inner.status, TimerStatus::Running | TimerStatus::Expired) {
            return false;
        }
        if inner.remaining == 0 {
            return false;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("Countdown start requested outside of a tokio runtime");
                return false;
            }
        };

        inner.generation += 1;
        inner.status = TimerStatus::Running;

        let shared = Arc::clone(&self.inner);
        let generation = inner.generation;
        let tick = self.tick;
        inner.driver = Some(runtime.spawn(async move {
            loop {
                tokio::time::sleep(tick).await;
                if !on_tick(&shared, generation) {
                    break;
                }
            }
        }));
        true
    }

    /// Halts a running countdown, keeping the remaining time.
    pub fn pause(&self) -> bool {
        let mut inner = lock(&self.inner);
        if inner.status != TimerStatus::Running {
            return false;
        }
        inner.generation += 1;
        inner.status = TimerStatus::Paused;
        if let Some(driver) = inner.driver.take() {
            driver.abort();
        }
        true
    }

    pub fn reset(&self, initial_seconds: u32) {
        let mut inner = lock(&self.inner);
        inner.generation += 1;
        if let Some(driver) = inner.driver.take() {
            driver.abort();
        }
        inner.remaining = initial_seconds;
        inner.status = TimerStatus::Idle;
    }

    pub fn remaining(&self) -> u32 {
        lock(&self.inner).remaining
    }

    pub fn status(&self) -> TimerStatus {
        lock(&self.inner).status
    }

    pub fn is_running(&self) -> bool {
        self.status() == TimerStatus::Running
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        if let Some(driver) = lock(&self.inner).driver.take() {
            driver.abort();
        }
    }
}

/// Applies one tick. Returns whether the driver should keep going.
fn on_tick(shared: &Mutex<TimerInner>, generation: u64) -> bool {
    let handler = {
        let mut inner = lock(shared);
        if inner.generation != generation || inner.status != TimerStatus::Running {
            return false;
        }
        inner.remaining = inner.remaining.saturating_sub(1);
        if inner.remaining > 0 {
            return true;
        }
        inner.status = TimerStatus::Expired;
        inner.driver = None;
        inner.handler.clone()
    };

    tracing::debug!("Countdown expired");
    // Called without the lock held so the handler may use the timer.
    if let Some(handler) = handler {
        handler();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_handler(timer: &CountdownTimer) -> Arc<AtomicUsize> {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        timer.set_expiry_handler(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        fired
    }

    #[tokio::test(start_paused = true)]
    async fn pause_before_first_tick_keeps_initial_time() {
        let timer = CountdownTimer::new(30);
        assert!(timer.start());
        assert!(timer.pause());

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(timer.remaining(), 30);
        assert_eq!(timer.status(), TimerStatus::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_zero_and_fires_once() {
        let timer = CountdownTimer::new(3);
        let fired = counter_handler(&timer);
        timer.start();

        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(timer.remaining(), 0);
        assert_eq!(timer.status(), TimerStatus::Expired);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Expired is terminal until reset.
        assert!(!timer.start());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn decrements_once_per_tick() {
        let timer = CountdownTimer::new(10);
        timer.start();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(timer.remaining(), 8);
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_does_not_double_decrement() {
        let timer = CountdownTimer::new(10);
        assert!(timer.start());
        assert!(!timer.start());

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(timer.remaining(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_preserve_remaining_time() {
        let timer = CountdownTimer::new(10);
        timer.start();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        timer.pause();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(timer.remaining(), 8);

        assert!(timer.start());
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(timer.remaining(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_pending_tick() {
        let timer = CountdownTimer::new(2);
        let fired = counter_handler(&timer);
        timer.start();
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        timer.reset(5);
        assert_eq!(timer.status(), TimerStatus::Idle);
        assert_eq!(timer.remaining(), 5);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(timer.remaining(), 5);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn handler_replaced_after_start_is_the_one_invoked() {
        let timer = CountdownTimer::new(2);
        let first = counter_handler(&timer);
        timer.start();

        let second = counter_handler(&timer);
        tokio::time::sleep(Duration::from_millis(2_100)).await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_handler_still_expires() {
        let timer = CountdownTimer::new(1);
        let fired = counter_handler(&timer);
        timer.clear_expiry_handler();
        timer.start();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(timer.status(), TimerStatus::Expired);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn start_outside_runtime_is_refused() {
        let timer = CountdownTimer::new(5);
        assert!(!timer.start());
        assert_eq!(timer.status(), TimerStatus::Idle);
    }
}
