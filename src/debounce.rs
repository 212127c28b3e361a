//! Trailing-edge debouncing.
//!
//! A [`Debouncer`] forwards only the last value of a burst, once no new
//! value has arrived for the configured quiet period. Every new value
//! restarts the timer. There is no leading-edge emission and no maximum
//! wait.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::trace;

/// Trailing-edge debouncer driving a callback from a background task.
///
/// Dropping the debouncer (or calling [`Debouncer::cancel`]) discards any
/// pending value; the callback never runs after teardown.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<Signal<T>>,
    handle: JoinHandle<()>,
    delay: Duration,
}

enum Signal<T> {
    Value(T),
    Discard,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Creates a debouncer that invokes `callback` with each settled value.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn(T) + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(delay, rx, callback));
        Self { tx, handle, delay }
    }

    /// Creates a debouncer whose settled values are delivered on a channel.
    pub fn channel(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let debouncer = Self::new(delay, move |value| {
            let _ = out_tx.send(value);
        });
        (debouncer, out_rx)
    }

    /// Feeds a new value, restarting the quiet period.
    pub fn call(&self, value: T) {
        if self.tx.send(Signal::Value(value)).is_err() {
            trace!("debouncer already torn down, dropping value");
        }
    }

    /// Drops the pending value, if any, without stopping the debouncer.
    /// Later calls are debounced as usual.
    pub fn discard(&self) {
        let _ = self.tx.send(Signal::Discard);
    }

    /// Returns the quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Stops the debouncer, discarding any pending value.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Returns true once the debouncer has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run<T, F>(delay: Duration, mut rx: mpsc::UnboundedReceiver<Signal<T>>, callback: F)
where
    F: Fn(T),
{
    while let Some(signal) = rx.recv().await {
        let Signal::Value(first) = signal else {
            continue;
        };
        let mut pending = first;
        let timer = sleep(delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                biased;
                next = rx.recv() => match next {
                    Some(Signal::Value(value)) => {
                        pending = value;
                        timer.as_mut().reset(Instant::now() + delay);
                    }
                    Some(Signal::Discard) => {
                        trace!("pending value discarded");
                        break;
                    }
                    // Sender gone: teardown, the pending value is dropped.
                    None => return,
                },
                _ = &mut timer => {
                    callback(pending);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log<T> = Arc<Mutex<Vec<(T, Instant)>>>;

    fn recording<T: Send + 'static>(delay: Duration) -> (Debouncer<T>, Log<T>) {
        let log: Log<T> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let debouncer = Debouncer::new(delay, move |value| {
            sink.lock().unwrap().push((value, Instant::now()));
        });
        (debouncer, log)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_value_fires_after_delay() {
        let (debouncer, log) = recording(Duration::from_millis(300));
        let start = Instant::now();
        debouncer.call("a");

        sleep(Duration::from_millis(299)).await;
        assert!(log.lock().unwrap().is_empty());

        sleep(Duration::from_millis(10)).await;
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, "a");
        assert!(log[0].1 >= start + Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_only_emits_last_value() {
        let (debouncer, log) = recording(Duration::from_millis(300));

        debouncer.call(1);
        sleep(Duration::from_millis(100)).await;
        debouncer.call(2);
        sleep(Duration::from_millis(200)).await;
        let last_input = Instant::now();
        debouncer.call(3);

        sleep(Duration::from_millis(1000)).await;
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, 3);
        assert!(log[0].1 >= last_input + Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_each_emit() {
        let (debouncer, log) = recording(Duration::from_millis(50));

        debouncer.call("first");
        sleep(Duration::from_millis(100)).await;
        debouncer.call("second");
        sleep(Duration::from_millis(100)).await;

        let values: Vec<_> = log.lock().unwrap().iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_value() {
        let (debouncer, log) = recording(Duration::from_millis(300));
        debouncer.call("pending");
        sleep(Duration::from_millis(100)).await;
        drop(debouncer);

        sleep(Duration::from_secs(5)).await;
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_further_values() {
        let (debouncer, log) = recording(Duration::from_millis(10));
        debouncer.call(1);
        debouncer.cancel();
        debouncer.call(2);

        sleep(Duration::from_secs(1)).await;
        assert!(log.lock().unwrap().is_empty());
        assert!(debouncer.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_drops_pending_value_only() {
        let (debouncer, log) = recording(Duration::from_millis(300));
        debouncer.call("typed");
        sleep(Duration::from_millis(100)).await;
        debouncer.discard();

        sleep(Duration::from_secs(1)).await;
        assert!(log.lock().unwrap().is_empty());
        assert!(!debouncer.is_cancelled());

        debouncer.call("again");
        sleep(Duration::from_millis(400)).await;
        let values: Vec<_> = log.lock().unwrap().iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec!["again"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_delivers_settled_values() {
        let (debouncer, mut rx) = Debouncer::channel(Duration::from_millis(300));
        assert_eq!(debouncer.delay(), Duration::from_millis(300));

        debouncer.call("r".to_string());
        debouncer.call("ru".to_string());
        debouncer.call("rust".to_string());

        let settled = rx.recv().await.unwrap();
        assert_eq!(settled, "rust");
        assert!(rx.try_recv().is_err());
    }
}
