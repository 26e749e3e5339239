//! Per-subscription state and the serialised signal loop.
//!
//! Every subscription owns one [`Core`]. All demand and lifecycle mutations go
//! through its mutex, and a single work loop delivers signals and invokes the
//! producer. The lock is never held while user code runs: subscriber
//! callbacks, producer steps and sink hooks may re-enter `request`, `cancel` or
//! emission without deadlocking. Whichever thread finds the loop idle becomes
//! its driver; other threads enqueue and leave.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};

use tracing::{debug, trace, warn};

use crate::{
    demand::Demand,
    error::{ProtocolViolation, StreamError},
    metrics,
    producer::Producer,
    sink::OverflowStrategy,
    state::StreamState,
    subscriber::{Control, Subscriber, Subscription},
};

/// Signals queued for delivery to the subscriber.
enum Signal<T> {
    Subscribe(Subscription),
    Next(T),
    Complete,
    Error(StreamError),
}

impl<T: 'static> Signal<T> {
    fn is_terminal(&self) -> bool { matches!(self, Self::Complete | Self::Error(_)) }

    fn deliver(self, subscriber: &mut dyn Subscriber<T>) {
        match self {
            Self::Subscribe(subscription) => subscriber.on_subscribe(subscription),
            Self::Next(item) => {
                metrics::inc_delivered();
                subscriber.on_next(item);
            }
            Self::Complete => subscriber.on_complete(),
            Self::Error(error) => subscriber.on_error(error),
        }
    }
}

/// Terminal outcome held back until buffered overflow elements drain.
enum Terminal {
    Complete,
    Error(StreamError),
}

/// Thread currently running the work loop.
#[derive(Clone, Copy)]
struct Driver {
    thread: ThreadId,
    /// The driver is inside a producer call and may deliver inline.
    producing: bool,
}

struct Inner<T> {
    state: StreamState,
    /// Outstanding permission to emit.
    demand: Demand,
    /// Demand granted but not yet announced to the producer.
    pending: Demand,
    /// The producer asked to be polled without new demand.
    wake: bool,
    started: bool,
    driver: Option<Driver>,
    queue: VecDeque<Signal<T>>,
    overflow: VecDeque<T>,
    strategy: Option<OverflowStrategy>,
    deferred: Option<Terminal>,
    producer: Option<Producer<T>>,
    subscriber: Option<Box<dyn Subscriber<T>>>,
}

impl<T> Inner<T> {
    fn transition(&mut self, next: StreamState) {
        debug!(
            from = self.state.as_str(),
            to = next.as_str(),
            "subscription state changed"
        );
        self.state = next;
        if next.is_terminal() {
            metrics::dec_subscriptions();
        }
    }

    /// Terminate, or defer termination while overflow elements remain.
    fn finish(&mut self, terminal: Terminal) {
        if self.state.is_terminal() || self.deferred.is_some() {
            if matches!(self.state, StreamState::Completed | StreamState::Failed)
                || self.deferred.is_some()
            {
                warn!(
                    state = self.state.as_str(),
                    "terminal signal after termination; discarding"
                );
            }
            return;
        }
        if !self.overflow.is_empty() {
            self.deferred = Some(terminal);
            return;
        }
        match terminal {
            Terminal::Complete => {
                self.transition(StreamState::Completed);
                self.queue.push_back(Signal::Complete);
            }
            Terminal::Error(error) => self.fail(error),
        }
    }

    /// Fail immediately, discarding anything still buffered.
    fn fail(&mut self, error: StreamError) {
        if self.state.is_terminal() {
            return;
        }
        self.overflow.clear();
        self.deferred = None;
        metrics::inc_errors(error.kind());
        self.transition(StreamState::Failed);
        self.queue.push_back(Signal::Error(error));
    }

    /// Move buffered overflow elements into the delivery queue as demand
    /// allows, then apply any deferred terminal signal.
    fn release_overflow(&mut self) {
        while self.demand.has_demand() {
            let Some(item) = self.overflow.pop_front() else {
                break;
            };
            let _ = self.demand.consume_one();
            self.queue.push_back(Signal::Next(item));
        }
        if self.overflow.is_empty()
            && let Some(terminal) = self.deferred.take()
        {
            self.finish(terminal);
        }
    }
}

/// Shared state of one subscription.
pub(crate) struct Core<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Send + 'static> Core<T> {
    pub(crate) fn new(
        subscriber: Box<dyn Subscriber<T>>,
        strategy: Option<OverflowStrategy>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: StreamState::Idle,
                demand: Demand::NONE,
                pending: Demand::NONE,
                wake: false,
                started: false,
                driver: None,
                queue: VecDeque::new(),
                overflow: VecDeque::new(),
                strategy,
                deferred: None,
                producer: None,
                subscriber: Some(subscriber),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn install(&self, producer: Producer<T>) { self.lock().producer = Some(producer); }

    /// Deliver `on_subscribe` and start the producer.
    pub(crate) fn open(&self, subscription: Subscription, kind: &'static str) {
        debug!(kind, "subscribed");
        metrics::inc_subscriptions();
        self.lock().queue.push_back(Signal::Subscribe(subscription));
        self.drive();
    }

    pub(crate) fn emit_next(&self, item: T) {
        let mut inner = self.lock();
        if inner.state.is_terminal() || inner.deferred.is_some() {
            let state = inner.state;
            drop(inner);
            if state == StreamState::Cancelled {
                trace!("element discarded after cancellation");
            } else {
                warn!(
                    state = state.as_str(),
                    "element emitted after a terminal signal; discarding"
                );
            }
            return;
        }
        if !inner.overflow.is_empty() {
            inner.overflow.push_back(item);
        } else if inner.demand.consume_one() {
            inner.queue.push_back(Signal::Next(item));
        } else {
            match inner.strategy {
                None => {
                    warn!("pull producer emitted without outstanding demand");
                    inner.fail(StreamError::ProtocolViolation(
                        ProtocolViolation::DemandExceeded,
                    ));
                }
                Some(OverflowStrategy::Error) => inner.fail(StreamError::Overflow),
                Some(OverflowStrategy::Buffer) => inner.overflow.push_back(item),
                Some(OverflowStrategy::Drop) => {
                    debug!("no outstanding demand; dropping element");
                    metrics::inc_dropped();
                }
            }
        }
        drop(inner);
        self.drive();
    }

    pub(crate) fn emit_complete(&self) {
        self.lock().finish(Terminal::Complete);
        self.drive();
    }

    pub(crate) fn emit_error(&self, error: StreamError) {
        self.lock().finish(Terminal::Error(error));
        self.drive();
    }

    /// Ask the work loop to poll the producer even without new demand.
    pub(crate) fn resume(&self) {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return;
        }
        inner.wake = true;
        drop(inner);
        self.drive();
    }

    pub(crate) fn outstanding(&self) -> Demand { self.lock().demand }

    /// Returns `true` while emissions would still be accepted.
    pub(crate) fn accepts_signals(&self) -> bool {
        let inner = self.lock();
        inner.state.is_live() && inner.deferred.is_none()
    }

    /// Pop one queued signal and hand it to the subscriber.
    ///
    /// Returns the re-acquired guard and whether a signal was taken.
    fn deliver_one<'a>(
        &'a self,
        mut inner: MutexGuard<'a, Inner<T>>,
    ) -> (MutexGuard<'a, Inner<T>>, bool) {
        let Some(signal) = inner.queue.pop_front() else {
            return (inner, false);
        };
        let Some(mut subscriber) = inner.subscriber.take() else {
            return (inner, true);
        };
        drop(inner);
        let terminal = signal.is_terminal();
        signal.deliver(subscriber.as_mut());
        let mut inner = self.lock();
        if terminal || inner.state == StreamState::Cancelled {
            drop(inner);
            drop(subscriber);
            inner = self.lock();
        } else {
            inner.subscriber = Some(subscriber);
        }
        (inner, true)
    }

    /// Run the work loop, or hand work to the thread already running it.
    fn drive(&self) {
        let current = thread::current().id();
        let mut inner = self.lock();
        match inner.driver {
            None => {}
            Some(Driver {
                thread,
                producing: true,
            }) if thread == current => {
                // Re-entered from a producer on the driving thread: deliver
                // inline so subscribers observe elements as they are emitted.
                inner.driver = Some(Driver {
                    thread,
                    producing: false,
                });
                loop {
                    let (guard, delivered) = self.deliver_one(inner);
                    inner = guard;
                    if !delivered {
                        break;
                    }
                }
                inner.driver = Some(Driver {
                    thread,
                    producing: true,
                });
                return;
            }
            Some(_) => return,
        }
        inner.driver = Some(Driver {
            thread: current,
            producing: false,
        });
        loop {
            if inner.state.is_terminal()
                && let Some(producer) = inner.producer.take()
            {
                let state = inner.state;
                drop(inner);
                producer.finish(state);
                inner = self.lock();
                continue;
            }
            let (guard, delivered) = self.deliver_one(inner);
            inner = guard;
            if delivered {
                continue;
            }
            if inner.state.is_terminal() {
                if let Some(subscriber) = inner.subscriber.take() {
                    drop(inner);
                    drop(subscriber);
                    inner = self.lock();
                    continue;
                }
                break;
            }
            let demand = if !inner.started {
                inner.started = true;
                None
            } else if inner.pending.has_demand() || inner.wake {
                inner.wake = false;
                Some(inner.pending.take())
            } else {
                break;
            };
            let Some(mut producer) = inner.producer.take() else {
                break;
            };
            inner.driver = Some(Driver {
                thread: current,
                producing: true,
            });
            drop(inner);
            let emitter = Emitter { core: self };
            match demand {
                None => producer.start(&emitter),
                Some(demand) => producer.request(demand, &emitter),
            }
            inner = self.lock();
            inner.driver = Some(Driver {
                thread: current,
                producing: false,
            });
            inner.producer = Some(producer);
        }
        inner.driver = None;
    }
}

impl<T: Send + 'static> Control for Core<T> {
    fn request(&self, n: u64) {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return;
        }
        if n == 0 {
            warn!("subscriber requested zero elements");
            inner.fail(StreamError::ProtocolViolation(ProtocolViolation::ZeroRequest));
        } else {
            if inner.state == StreamState::Idle {
                inner.transition(StreamState::Active);
            }
            inner.demand = inner.demand.add(n);
            inner.pending = inner.pending.add(n);
            inner.release_overflow();
            trace!(n, outstanding = ?inner.demand, "demand granted");
        }
        drop(inner);
        self.drive();
    }

    fn cancel(&self) {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return;
        }
        inner.transition(StreamState::Cancelled);
        inner.deferred = None;
        let discarded = (
            std::mem::take(&mut inner.queue),
            std::mem::take(&mut inner.overflow),
        );
        drop(inner);
        drop(discarded);
        self.drive();
    }

    fn state(&self) -> StreamState { self.lock().state }
}

/// Emission handle given to pull producers.
///
/// Every call is checked against the subscription: elements beyond
/// outstanding demand fail the stream, and anything after a terminal signal
/// or cancellation is discarded. Producers should check
/// [`Emitter::is_active`] before each emission.
pub struct Emitter<'a, T> {
    core: &'a Core<T>,
}

impl<T: Send + 'static> Emitter<'_, T> {
    /// Emit one element.
    pub fn next(&self, item: T) { self.core.emit_next(item); }

    /// Signal successful completion.
    pub fn complete(&self) { self.core.emit_complete(); }

    /// Signal failure.
    pub fn error(&self, error: StreamError) { self.core.emit_error(error); }

    /// Outstanding demand at the time of the call.
    #[must_use]
    pub fn requested(&self) -> Demand { self.core.outstanding() }

    /// Returns `true` once the subscriber has cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool { self.core.state() == StreamState::Cancelled }

    /// Returns `true` while the subscription can still receive signals.
    #[must_use]
    pub fn is_active(&self) -> bool { self.core.accepts_signals() }
}
