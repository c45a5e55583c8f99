//! Best-effort "data may have changed" signal for Stockroom consumers.
//!
//! The notifier polls on a fixed interval and fires with a small
//! probability on each tick. Signals carry no payload; subscribers should
//! re-read the catalog when one arrives.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace};

/// Default time between ticks.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Default chance of a signal on any single tick.
pub const DEFAULT_PROBABILITY: f64 = 0.05;

/// Source of ticks driving a subscription.
#[async_trait]
pub trait Ticker: Send + 'static {
    /// Wait for the next tick. Returns `false` when no more ticks will come.
    async fn tick(&mut self) -> bool;
}

/// Decides whether a tick becomes a signal.
pub trait Chance: Send + 'static {
    fn roll(&mut self) -> bool;
}

/// Ticks on a fixed period, first tick one period after creation.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Must be called from within a tokio runtime.
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Independent random draw per tick.
#[derive(Debug, Clone, Copy)]
pub struct RandomChance {
    probability: f64,
}

impl RandomChance {
    /// `probability` is clamped to `[0, 1]`.
    pub fn new(probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self { probability }
    }
}

impl Chance for RandomChance {
    fn roll(&mut self) -> bool {
        rand::thread_rng().gen_bool(self.probability)
    }
}

/// Handle to a running subscription.
///
/// Cancelling stops further ticks and releases the timer. Dropping the
/// handle cancels too.
#[must_use = "dropping a subscription cancels it"]
#[derive(Debug)]
pub struct Subscription {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    /// Stop the subscription. Calling this again has no effect.
    pub fn cancel(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            debug!("change subscription cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run `callback` on every tick of `ticker` for which `chance` rolls true.
///
/// Must be called from within a tokio runtime.
pub fn subscribe_with<T, C, F>(mut ticker: T, mut chance: C, mut callback: F) -> Subscription
where
    T: Ticker,
    C: Chance,
    F: FnMut() + Send + 'static,
{
    let task = tokio::spawn(async move {
        while ticker.tick().await {
            if chance.roll() {
                trace!("possible change signalled");
                callback();
            }
        }
        debug!("change ticker finished");
    });
    Subscription {
        task: Mutex::new(Some(task)),
    }
}

/// Periodic random change signal.
#[derive(Debug, Clone, Copy)]
pub struct ChangeNotifier {
    period: Duration,
    probability: f64,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_PROBABILITY)
    }
}

impl ChangeNotifier {
    pub fn new(period: Duration, probability: f64) -> Self {
        Self {
            period,
            probability,
        }
    }

    /// Start signalling `callback`. Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut() + Send + 'static,
    {
        subscribe_with(
            IntervalTicker::new(self.period),
            RandomChance::new(self.probability),
            callback,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use tokio::sync::mpsc;

    use super::*;

    /// Ticks once per message; stops when the sender is dropped.
    struct ChannelTicker(mpsc::UnboundedReceiver<()>);

    #[async_trait]
    impl Ticker for ChannelTicker {
        async fn tick(&mut self) -> bool {
            self.0.recv().await.is_some()
        }
    }

    /// Replays fixed outcomes, then always false.
    struct Scripted(VecDeque<bool>);

    impl Chance for Scripted {
        fn roll(&mut self) -> bool {
            self.0.pop_front().unwrap_or(false)
        }
    }

    struct Always;

    impl Chance for Always {
        fn roll(&mut self) -> bool {
            true
        }
    }

    fn signal_channel() -> (impl FnMut() + Send + 'static, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            move || {
                let _ = tx.send(());
            },
            rx,
        )
    }

    #[tokio::test]
    async fn signals_only_on_winning_ticks() {
        let (ticks, ticker) = mpsc::unbounded_channel();
        let (callback, mut signals) = signal_channel();
        let chance = Scripted(VecDeque::from([false, true, true, false]));
        let _subscription = subscribe_with(ChannelTicker(ticker), chance, callback);

        for _ in 0..4 {
            ticks.send(()).unwrap();
        }
        drop(ticks);

        let mut count = 0;
        while signals.recv().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_stops_signals() {
        let (ticks, ticker) = mpsc::unbounded_channel();
        let (callback, mut signals) = signal_channel();
        let subscription = subscribe_with(ChannelTicker(ticker), Always, callback);

        ticks.send(()).unwrap();
        assert_eq!(signals.recv().await, Some(()));

        subscription.cancel();
        subscription.cancel();
        assert!(subscription.is_cancelled());

        let _ = ticks.send(());
        assert_eq!(signals.recv().await, None);
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels() {
        let (ticks, ticker) = mpsc::unbounded_channel();
        let (callback, mut signals) = signal_channel();
        let subscription = subscribe_with(ChannelTicker(ticker), Always, callback);
        drop(subscription);

        let _ = ticks.send(());
        assert_eq!(signals.recv().await, None);
    }

    #[tokio::test]
    async fn interval_notifier_fires_with_certain_chance() {
        let (callback, mut signals) = signal_channel();
        let notifier = ChangeNotifier::new(Duration::from_millis(10), 1.0);
        let subscription = notifier.subscribe(callback);

        let received = time::timeout(Duration::from_secs(5), signals.recv()).await;
        assert_eq!(received, Ok(Some(())));
        subscription.cancel();
    }

    #[test]
    fn probability_is_clamped() {
        assert!(RandomChance::new(7.0).roll());
        assert!(!RandomChance::new(-1.0).roll());
        assert!(!RandomChance::new(f64::NAN).roll());
    }
}
