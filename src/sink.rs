//! Push-driven production through a cloneable [`Sink`].
//!
//! The emitter closure given to [`Flux::from_sink`](crate::Flux::from_sink)
//! receives a [`Sink`] once per subscription. It may push from any thread,
//! at any time. Pushes beyond outstanding demand are handled according to the
//! subscription's [`OverflowStrategy`].

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::debug;

use crate::{
    demand::Demand,
    error::StreamError,
    flux::Core,
    state::StreamState,
    subscriber::Control,
};

/// Behaviour when a sink pushes an element without outstanding demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OverflowStrategy {
    /// Fail the subscription with [`StreamError::Overflow`].
    #[default]
    Error,
    /// Buffer without bound until demand arrives. Terminal signals wait for
    /// the buffer to drain.
    Buffer,
    /// Discard the newest element.
    Drop,
}

type RequestHook = Box<dyn FnMut(u64) + Send>;
type OnceHook = Box<dyn FnOnce() + Send>;

/// Callbacks registered through a [`Sink`].
#[derive(Default)]
struct SinkHooks {
    on_request: Option<RequestHook>,
    on_cancel: Option<OnceHook>,
    on_dispose: Option<OnceHook>,
    /// Terminal state once the producer has been released.
    finished: Option<StreamState>,
}

fn lock_hooks(hooks: &Mutex<SinkHooks>) -> MutexGuard<'_, SinkHooks> {
    hooks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Push handle for one subscription.
///
/// Cloning yields another handle to the same subscription. After
/// [`Sink::complete`] or [`Sink::error`] every further call is a no-op.
pub struct Sink<T> {
    core: Arc<Core<T>>,
    hooks: Arc<Mutex<SinkHooks>>,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_struct("Sink").finish_non_exhaustive() }
}

impl<T: Send + 'static> Sink<T> {
    /// Push one element.
    pub fn next(&self, item: T) { self.core.emit_next(item); }

    /// Signal successful completion.
    pub fn complete(&self) { self.core.emit_complete(); }

    /// Signal failure.
    pub fn error(&self, error: StreamError) { self.core.emit_error(error); }

    /// Outstanding downstream demand.
    #[must_use]
    pub fn requested(&self) -> Demand { self.core.outstanding() }

    /// Returns `true` once the subscriber has cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool { self.core.state() == StreamState::Cancelled }

    /// Register the callback receiving each new batch of demand.
    ///
    /// Demand granted before registration is replayed to the callback. The
    /// callback runs on whichever thread drives the subscription and may push
    /// elements synchronously. Replaces any previous callback.
    pub fn on_request<F>(&self, callback: F) -> &Self
    where
        F: FnMut(u64) + Send + 'static,
    {
        {
            let mut hooks = lock_hooks(&self.hooks);
            if hooks.finished.is_some() {
                return self;
            }
            hooks.on_request = Some(Box::new(callback));
        }
        self.core.resume();
        self
    }

    /// Register a callback run once if the subscriber cancels.
    ///
    /// Runs immediately when the subscription is already cancelled.
    pub fn on_cancel<F>(&self, callback: F) -> &Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut hooks = lock_hooks(&self.hooks);
        match hooks.finished {
            None => hooks.on_cancel = Some(Box::new(callback)),
            Some(StreamState::Cancelled) => {
                drop(hooks);
                callback();
            }
            Some(_) => {}
        }
        self
    }

    /// Register a callback run once on any terminal path: completion, error
    /// or cancellation.
    ///
    /// Runs immediately when the subscription has already terminated.
    pub fn on_dispose<F>(&self, callback: F) -> &Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut hooks = lock_hooks(&self.hooks);
        if hooks.finished.is_some() {
            drop(hooks);
            callback();
        } else {
            hooks.on_dispose = Some(Box::new(callback));
        }
        self
    }
}

/// Emitter closure shared by every subscription of a sink-backed definition.
pub(crate) type EmitterFn<T> = Arc<dyn Fn(Sink<T>) + Send + Sync>;

/// Producer side of a sink-backed subscription.
pub(crate) struct SinkProducer<T> {
    emitter: EmitterFn<T>,
    sink: Option<Sink<T>>,
    hooks: Arc<Mutex<SinkHooks>>,
    /// Demand not yet passed to an `on_request` callback.
    unannounced: Demand,
}

impl<T: Send + 'static> SinkProducer<T> {
    pub(crate) fn new(emitter: EmitterFn<T>, core: Arc<Core<T>>) -> Self {
        let hooks = Arc::new(Mutex::new(SinkHooks::default()));
        Self {
            emitter,
            sink: Some(Sink {
                core,
                hooks: Arc::clone(&hooks),
            }),
            hooks,
            unannounced: Demand::NONE,
        }
    }

    /// Hand the sink to the emitter closure.
    pub(crate) fn start(&mut self) {
        if let Some(sink) = self.sink.take() {
            (self.emitter)(sink);
        }
    }

    pub(crate) fn request(&mut self, demand: Demand) {
        self.unannounced = self.unannounced.add(demand.as_request());
        if !self.unannounced.has_demand() {
            return;
        }
        let Some(mut callback) = lock_hooks(&self.hooks).on_request.take() else {
            return;
        };
        let n = self.unannounced.take().as_request();
        callback(n);
        let mut hooks = lock_hooks(&self.hooks);
        if hooks.on_request.is_none() && hooks.finished.is_none() {
            hooks.on_request = Some(callback);
        }
    }

    pub(crate) fn finish(self, state: StreamState) {
        let (on_cancel, on_dispose, on_request) = {
            let mut hooks = lock_hooks(&self.hooks);
            hooks.finished = Some(state);
            (
                hooks.on_cancel.take(),
                hooks.on_dispose.take(),
                hooks.on_request.take(),
            )
        };
        drop(on_request);
        debug!(state = state.as_str(), "releasing sink hooks");
        if state == StreamState::Cancelled
            && let Some(on_cancel) = on_cancel
        {
            on_cancel();
        }
        if let Some(on_dispose) = on_dispose {
            on_dispose();
        }
    }
}
