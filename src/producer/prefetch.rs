//! Prefetching demand adapter.
//!
//! Decouples downstream demand from upstream requests: `window` elements are
//! requested when the adapter subscribes, and `replenish_at` more each time
//! that many have been handed downstream. Upstream elements land in a buffer
//! that never holds more than `window` elements.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tracing::{debug, trace};

use crate::{
    config::PrefetchConfig,
    error::StreamError,
    flux::{Core, Emitter, Flux},
    subscriber::{Subscriber, Subscription},
};

/// Elements received from upstream but not yet delivered downstream.
struct Prefetched<T> {
    buffer: VecDeque<T>,
    terminal: Option<Result<(), StreamError>>,
}

fn lock<T>(shared: &Mutex<Prefetched<T>>) -> MutexGuard<'_, Prefetched<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct PrefetchProducer<T> {
    upstream: Flux<T>,
    config: PrefetchConfig,
    shared: Arc<Mutex<Prefetched<T>>>,
    downstream: Weak<Core<T>>,
    subscription: Option<Subscription>,
    delivered: u64,
}

impl<T: Send + 'static> PrefetchProducer<T> {
    pub(crate) fn new(upstream: Flux<T>, config: PrefetchConfig, downstream: Weak<Core<T>>) -> Self {
        Self {
            upstream,
            config,
            shared: Arc::new(Mutex::new(Prefetched {
                buffer: VecDeque::new(),
                terminal: None,
            })),
            downstream,
            subscription: None,
            delivered: 0,
        }
    }

    /// Subscribe upstream and request the first window.
    pub(crate) fn start(&mut self) {
        let bridge = Bridge {
            shared: Arc::clone(&self.shared),
            downstream: self.downstream.clone(),
        };
        let subscription = self.upstream.subscribe(bridge);
        self.subscription = Some(subscription.clone());
        debug!(
            window = self.config.window(),
            replenish_at = self.config.replenish_at(),
            "prefetching upstream"
        );
        subscription.request(self.config.window());
    }

    /// Hand buffered elements downstream as demand allows, replenishing
    /// upstream at the low-water mark.
    pub(crate) fn drain(&mut self, emitter: &Emitter<'_, T>) {
        while emitter.is_active() && emitter.requested().has_demand() {
            let Some(item) = lock(&self.shared).buffer.pop_front() else {
                break;
            };
            emitter.next(item);
            self.delivered += 1;
            // Downstream may have cancelled from inside `on_next`.
            if !emitter.is_active() {
                self.cancel_upstream();
                return;
            }
            if self.delivered >= self.config.replenish_at() {
                self.delivered = 0;
                self.replenish();
            }
        }
        let terminal = {
            let mut shared = lock(&self.shared);
            if shared.buffer.is_empty() {
                shared.terminal.take()
            } else {
                None
            }
        };
        match terminal {
            None => {}
            Some(Ok(())) => emitter.complete(),
            Some(Err(error)) => emitter.error(error),
        }
    }

    fn replenish(&self) {
        if lock(&self.shared).terminal.is_some() {
            return;
        }
        if let Some(subscription) = &self.subscription {
            trace!(n = self.config.replenish_at(), "replenishing upstream");
            subscription.request(self.config.replenish_at());
        }
    }
}

impl<T> PrefetchProducer<T> {
    /// No-op when upstream has already terminated.
    fn cancel_upstream(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}

impl<T> Drop for PrefetchProducer<T> {
    fn drop(&mut self) { self.cancel_upstream(); }
}

/// Upstream subscriber feeding the prefetch buffer.
struct Bridge<T> {
    shared: Arc<Mutex<Prefetched<T>>>,
    downstream: Weak<Core<T>>,
}

impl<T: Send + 'static> Bridge<T> {
    fn wake(&self) {
        if let Some(core) = self.downstream.upgrade() {
            core.resume();
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for Bridge<T> {
    fn on_next(&mut self, item: T) {
        lock(&self.shared).buffer.push_back(item);
        self.wake();
    }

    fn on_error(&mut self, error: StreamError) {
        lock(&self.shared).terminal = Some(Err(error));
        self.wake();
    }

    fn on_complete(&mut self) {
        lock(&self.shared).terminal = Some(Ok(()));
        self.wake();
    }
}
