//! Hand-written pull producers.

use crate::{error::StreamError, flux::Emitter};

/// Request handler of a hand-written subscription.
///
/// A fresh instance is created for every subscription, so implementations
/// keep their cursor as plain fields. `request` receives each batch of new
/// demand (requests accumulate; [`UNBOUNDED`](crate::UNBOUNDED) means
/// unbounded) and should emit at most `n` elements, checking
/// [`Emitter::is_active`] before each one. Returning an error fails the
/// subscription with it. `cancel` runs at most once, and no request follows
/// it.
///
/// # Examples
///
/// ```
/// use tributary::{Emitter, StreamError, SubscriptionLogic};
///
/// struct Countdown {
///     remaining: u32,
/// }
///
/// impl SubscriptionLogic<u32> for Countdown {
///     fn request(&mut self, n: u64, emitter: &Emitter<'_, u32>) -> Result<(), StreamError> {
///         for _ in 0..n {
///             if !emitter.is_active() {
///                 break;
///             }
///             if self.remaining == 0 {
///                 emitter.complete();
///                 break;
///             }
///             emitter.next(self.remaining);
///             self.remaining -= 1;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait SubscriptionLogic<T>: Send {
    /// Serve `n` additional units of demand.
    ///
    /// # Errors
    ///
    /// Any error returned is delivered to the subscriber as its terminal
    /// signal.
    fn request(&mut self, n: u64, emitter: &Emitter<'_, T>) -> Result<(), StreamError>;

    /// The subscriber cancelled.
    fn cancel(&mut self) {}
}

impl<T, F> SubscriptionLogic<T> for F
where
    F: FnMut(u64, &Emitter<'_, T>) -> Result<(), StreamError> + Send,
{
    fn request(&mut self, n: u64, emitter: &Emitter<'_, T>) -> Result<(), StreamError> {
        self(n, emitter)
    }
}
