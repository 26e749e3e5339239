//! Consumer side of the stream contract.
//!
//! A [`Subscriber`] receives signals; a [`Subscription`] is the handle it uses
//! to grant demand or cancel. Signals for one subscription are always
//! delivered one at a time, though not necessarily on the thread that
//! subscribed.

use std::{fmt, sync::Arc};

use crate::{demand::UNBOUNDED, error::StreamError, state::StreamState};

/// Receives the signals of one subscription.
///
/// The sequence is `on_subscribe`, then zero or more `on_next`, then at most
/// one of `on_complete` or `on_error`. Nothing is delivered after a terminal
/// signal or after [`Subscription::cancel`].
pub trait Subscriber<T>: Send + 'static {
    /// Called once, before any other signal.
    ///
    /// Requesting demand from inside this callback is allowed.
    fn on_subscribe(&mut self, subscription: Subscription) { let _ = subscription; }

    /// Called for each element, never more often than demand allows.
    fn on_next(&mut self, item: T);

    /// Terminal failure.
    fn on_error(&mut self, error: StreamError);

    /// Terminal success.
    fn on_complete(&mut self);
}

/// Operations a [`Subscription`] forwards to its per-subscription state.
pub(crate) trait Control: Send + Sync {
    fn request(&self, n: u64);
    fn cancel(&self);
    fn state(&self) -> StreamState;
}

/// Cloneable handle controlling a single subscription.
#[derive(Clone)]
pub struct Subscription {
    control: Arc<dyn Control>,
}

impl Subscription {
    pub(crate) fn new(control: Arc<dyn Control>) -> Self { Self { control } }

    /// Grant `n` more elements of demand.
    ///
    /// Requests accumulate. A request for zero elements is a protocol
    /// violation and fails the subscription. [`UNBOUNDED`] grants unbounded
    /// demand. Requests after a terminal state are ignored.
    pub fn request(&self, n: u64) { self.control.request(n); }

    /// Grant unbounded demand.
    pub fn request_unbounded(&self) { self.control.request(UNBOUNDED); }

    /// Stop the subscription. Idempotent.
    pub fn cancel(&self) { self.control.cancel(); }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StreamState { self.control.state() }

    /// Returns `true` once the subscription has completed, failed or been
    /// cancelled.
    #[must_use]
    pub fn is_terminated(&self) -> bool { self.state().is_terminal() }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("state", &self.state())
            .finish()
    }
}

impl<T, S> Subscriber<T> for Box<S>
where
    S: Subscriber<T> + ?Sized,
{
    fn on_subscribe(&mut self, subscription: Subscription) {
        (**self).on_subscribe(subscription);
    }

    fn on_next(&mut self, item: T) { (**self).on_next(item); }

    fn on_error(&mut self, error: StreamError) { (**self).on_error(error); }

    fn on_complete(&mut self) { (**self).on_complete(); }
}
