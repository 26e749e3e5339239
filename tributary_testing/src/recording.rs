//! A subscriber that records every signal for later inspection.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::{sync::Notify, time::Instant};
use tributary::{StreamError, Subscriber, Subscription};

/// One recorded signal.
#[derive(Debug, Clone)]
pub enum Event<T> {
    Next(T),
    Complete,
    Error(StreamError),
}

impl<T: fmt::Debug> Event<T> {
    /// Returns `true` for `Complete` and `Error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool { !matches!(self, Self::Next(_)) }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Next(item) => format!("next({item:?})"),
            Self::Complete => "complete".to_owned(),
            Self::Error(error) => format!("error({error})"),
        }
    }
}

struct Shared<T> {
    events: Mutex<Vec<Event<T>>>,
    subscription: Mutex<Option<Subscription>>,
    changed: Notify,
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> { mutex.lock().unwrap_or_else(PoisonError::into_inner) }

/// Subscriber storing every signal it receives.
///
/// Obtain a [`Recording`] before subscribing to inspect the signals and to
/// drive demand from the test.
///
/// ```
/// use tributary::Flux;
/// use tributary_testing::RecordingSubscriber;
///
/// let subscriber = RecordingSubscriber::new().request_on_subscribe(2);
/// let recording = subscriber.recording();
/// Flux::from_sequence([1, 2, 3]).subscribe(subscriber);
/// assert_eq!(recording.items(), [1, 2]);
/// recording.request(1);
/// assert!(recording.is_completed());
/// ```
pub struct RecordingSubscriber<T> {
    shared: Arc<Shared<T>>,
    initial_request: u64,
    cancel_after: Option<usize>,
    received: usize,
}

impl<T> Default for RecordingSubscriber<T> {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                events: Mutex::new(Vec::new()),
                subscription: Mutex::new(None),
                changed: Notify::new(),
            }),
            initial_request: 0,
            cancel_after: None,
            received: 0,
        }
    }
}

impl<T> RecordingSubscriber<T> {
    /// A subscriber that requests nothing on its own.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Request `n` elements from inside `on_subscribe`. Zero requests nothing.
    #[must_use]
    pub fn request_on_subscribe(mut self, n: u64) -> Self {
        self.initial_request = n;
        self
    }

    /// Cancel from inside `on_next` once `count` elements have arrived.
    #[must_use]
    pub fn cancel_after(mut self, count: usize) -> Self {
        self.cancel_after = Some(count);
        self
    }

    /// Handle onto the signals this subscriber records.
    #[must_use]
    pub fn recording(&self) -> Recording<T> {
        Recording {
            shared: Arc::clone(&self.shared),
        }
    }

    fn record(&self, event: Event<T>) {
        lock(&self.shared.events).push(event);
        self.shared.changed.notify_waiters();
    }
}

impl<T: Send + 'static> Subscriber<T> for RecordingSubscriber<T> {
    fn on_subscribe(&mut self, subscription: Subscription) {
        *lock(&self.shared.subscription) = Some(subscription.clone());
        if self.initial_request > 0 {
            subscription.request(self.initial_request);
        }
    }

    fn on_next(&mut self, item: T) {
        self.record(Event::Next(item));
        self.received += 1;
        if self.cancel_after == Some(self.received) {
            let subscription = lock(&self.shared.subscription).clone();
            if let Some(subscription) = subscription {
                subscription.cancel();
            }
        }
    }

    fn on_error(&mut self, error: StreamError) { self.record(Event::Error(error)); }

    fn on_complete(&mut self) { self.record(Event::Complete); }
}

/// Read side of a [`RecordingSubscriber`].
pub struct Recording<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Recording<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Recording<T> {
    /// The subscription, once `on_subscribe` has been delivered.
    #[must_use]
    pub fn subscription(&self) -> Option<Subscription> { lock(&self.shared.subscription).clone() }

    /// Grant demand through the recorded subscription.
    ///
    /// # Panics
    ///
    /// Panics if `on_subscribe` has not been delivered yet.
    pub fn request(&self, n: u64) {
        self.subscription()
            .expect("on_subscribe not yet delivered")
            .request(n);
    }

    /// Cancel through the recorded subscription, if any.
    pub fn cancel(&self) {
        if let Some(subscription) = self.subscription() {
            subscription.cancel();
        }
    }

    /// Number of signals recorded so far.
    #[must_use]
    pub fn len(&self) -> usize { lock(&self.shared.events).len() }

    /// Returns `true` before any signal arrives.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Number of `Complete` and `Error` signals recorded.
    #[must_use]
    pub fn terminal_count(&self) -> usize {
        lock(&self.shared.events)
            .iter()
            .filter(|event| !matches!(event, Event::Next(_)))
            .count()
    }

    /// Returns `true` once completion has been recorded.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        lock(&self.shared.events)
            .iter()
            .any(|event| matches!(event, Event::Complete))
    }

    /// The recorded error, if any.
    #[must_use]
    pub fn error(&self) -> Option<StreamError> {
        lock(&self.shared.events).iter().find_map(|event| match event {
            Event::Error(error) => Some(error.clone()),
            _ => None,
        })
    }
}

impl<T: Clone> Recording<T> {
    /// Copy of every recorded signal.
    #[must_use]
    pub fn events(&self) -> Vec<Event<T>> { lock(&self.shared.events).clone() }

    /// Elements recorded so far, in delivery order.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        lock(&self.shared.events)
            .iter()
            .filter_map(|event| match event {
                Event::Next(item) => Some(item.clone()),
                _ => None,
            })
            .collect()
    }

    /// Wait until the signal at `index` has been recorded.
    ///
    /// Returns `None` if `deadline` passes first.
    pub async fn event_at(&self, index: usize, deadline: Instant) -> Option<Event<T>> {
        loop {
            let changed = self.shared.changed.notified();
            if let Some(event) = lock(&self.shared.events).get(index).cloned() {
                return Some(event);
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return None;
            }
        }
    }
}
