//! Replays a fixed sequence of elements.

use std::iter::Peekable;

use crate::{
    demand::{Demand, Units},
    flux::Emitter,
};

/// Boxed element iterator created fresh for every subscription.
pub(crate) type SequenceIter<T> = Box<dyn Iterator<Item = T> + Send>;

pub(crate) struct SequenceProducer<T> {
    items: Peekable<SequenceIter<T>>,
}

impl<T: Send + 'static> SequenceProducer<T> {
    pub(crate) fn new(items: SequenceIter<T>) -> Self {
        Self {
            items: items.peekable(),
        }
    }

    /// An empty sequence completes without waiting for demand.
    pub(crate) fn start(&mut self, emitter: &Emitter<'_, T>) {
        if self.items.peek().is_none() {
            emitter.complete();
        }
    }

    /// Emit up to `demand` elements, completing as soon as the sequence runs
    /// dry.
    pub(crate) fn request(&mut self, demand: Demand, emitter: &Emitter<'_, T>) {
        for _ in Units::new(demand) {
            if !emitter.is_active() {
                return;
            }
            let Some(item) = self.items.next() else {
                emitter.complete();
                return;
            };
            emitter.next(item);
            if self.items.peek().is_none() {
                emitter.complete();
                return;
            }
        }
    }
}
