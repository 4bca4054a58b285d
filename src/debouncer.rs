use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A value that only settles after a period of inactivity.
///
/// Every `set` replaces the pending timer; the debounced value becomes the
/// latest input once `delay` passes without another change. Dropping the
/// `Debounced` cancels any pending timer, so nothing is emitted afterwards.
///
/// Timers run on the current tokio runtime.
#[derive(Debug)]
pub struct Debounced<T> {
    /// The duration to wait after the last change before emitting
    delay: Duration,
    /// Most recent input, emitted or not
    input: T,
    sender: Arc<watch::Sender<T>>,
    receiver: watch::Receiver<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T> Debounced<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (sender, receiver) = watch::channel(initial.clone());
        Self {
            delay,
            input: initial,
            sender: Arc::new(sender),
            receiver,
            pending: None,
        }
    }

    /// Register a new input, restarting the timer.
    ///
    /// Repeating the input that is already pending leaves its timer alone.
    pub fn set(&mut self, value: T) {
        if value == self.input && self.is_pending() {
            return;
        }
        self.input = value;
        self.restart();
    }

    /// Change the delay. A pending input waits the new delay from now.
    pub fn set_delay(&mut self, delay: Duration) {
        if delay == self.delay {
            return;
        }
        self.delay = delay;
        if self.is_pending() {
            self.restart();
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The current debounced value
    pub fn get(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// The latest input, which may not have settled yet
    pub fn input(&self) -> &T {
        &self.input
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the debounced value to change and return it
    pub async fn changed(&mut self) -> T {
        // The sender lives as long as `self`, so this only fails if the
        // channel was torn down underneath us
        let _ = self.receiver.changed().await;
        self.receiver.borrow_and_update().clone()
    }

    /// A receiver that observes emissions independently of this handle
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    /// Drop the pending input without emitting it
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn restart(&mut self) {
        self.cancel();

        let sender = self.sender.clone();
        let value = self.input.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sender.send_if_modified(|current| {
                if *current == value {
                    false
                } else {
                    *current = value;
                    true
                }
            });
        }));
    }
}

impl<T> Drop for Debounced<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_emits_latest_value_after_delay() {
        let mut search = Debounced::new(String::new(), Duration::from_millis(300));
        let start = Instant::now();

        search.set("a".to_string());
        sleep(Duration::from_millis(100)).await;
        search.set("ab".to_string());

        assert_eq!(search.changed().await, "ab");
        assert_eq!(start.elapsed(), Duration::from_millis(400));
        assert!(!search.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_emitted_before_delay() {
        let mut search = Debounced::new(String::new(), Duration::from_millis(300));
        search.set("clover".to_string());

        let early = timeout(Duration::from_millis(299), search.changed()).await;
        assert!(early.is_err());
        assert_eq!(search.get(), "");
        assert_eq!(search.input(), "clover");
        assert!(search.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_intermediate_values_are_never_emitted() {
        let mut search = Debounced::new(0u32, Duration::from_millis(50));
        let mut observer = search.subscribe();

        for n in 1..=5 {
            search.set(n);
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(search.changed().await, 5);

        // only one emission reached the independent observer
        assert!(observer.has_changed().unwrap());
        assert_eq!(*observer.borrow_and_update(), 5);
        assert!(!observer.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_timer() {
        let mut search = Debounced::new("initial".to_string(), Duration::from_millis(100));
        let observer = search.subscribe();

        search.set("typed".to_string());
        drop(search);
        sleep(Duration::from_secs(1)).await;

        assert_eq!(*observer.borrow(), "initial");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending_input() {
        let mut search = Debounced::new(1u32, Duration::from_millis(100));
        search.set(2);
        search.cancel();
        sleep(Duration::from_millis(500)).await;
        assert_eq!(search.get(), 1);
        assert!(!search.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_input_keeps_original_deadline() {
        let mut search = Debounced::new(String::new(), Duration::from_millis(500));
        let start = Instant::now();

        search.set("a".to_string());
        sleep(Duration::from_millis(400)).await;
        search.set("a".to_string());
        search.set_delay(Duration::from_millis(500));

        assert_eq!(search.changed().await, "a");
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_changing_delay_restarts_timer() {
        let mut search = Debounced::new(0u32, Duration::from_millis(100));
        let start = Instant::now();

        search.set(7);
        sleep(Duration::from_millis(50)).await;
        search.set_delay(Duration::from_millis(200));

        assert_eq!(search.changed().await, 7);
        assert_eq!(start.elapsed(), Duration::from_millis(250));
        assert_eq!(search.delay(), Duration::from_millis(200));
    }
}
