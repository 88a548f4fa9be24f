use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Debounced one-shot timer: every `arm` cancels the previous countdown.
#[derive(Debug)]
pub struct AutosaveTimer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl AutosaveTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `fire` once `delay` has passed without another `arm` or `cancel`.
    pub fn arm<F>(&mut self, fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Forget the countdown without aborting it. Called from the firing task
    /// itself so that re-arming from inside `fire` cannot cancel the save in
    /// progress.
    pub fn release(&mut self) {
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AutosaveTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_fire(count: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let count = Arc::clone(count);
        async move {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut timer = AutosaveTimer::new(Duration::from_secs(30));
        timer.arm(counter_fire(&count));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_debounces() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut timer = AutosaveTimer::new(Duration::from_secs(30));
        for _ in 0..5 {
            timer.arm(counter_fire(&count));
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut timer = AutosaveTimer::new(Duration::from_secs(1));
        timer.arm(counter_fire(&count));
        assert!(timer.is_armed());
        timer.cancel();
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
