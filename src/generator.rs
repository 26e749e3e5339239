//! Synchronous, one-element-per-step generation.
//!
//! A generator step runs once per unit of demand on the driving thread. It
//! receives the cursor state by value and a [`GeneratorSink`] that accepts at
//! most one element plus an optional terminal signal, and returns the state
//! for the next step.

use std::{marker::PhantomData, sync::Arc};

use tracing::warn;

use crate::{
    demand::{Demand, Units},
    error::{GeneratorMisuse, StreamError},
    flux::Emitter,
};

/// Step-scoped sink handed to generator functions.
///
/// Within one step, call `next` at most once, optionally followed by
/// `complete` or `error`. Anything else fails the subscription with
/// [`StreamError::InvalidGeneratorUsage`], as does a step that signals
/// nothing.
#[derive(Debug)]
pub struct GeneratorSink<T> {
    item: Option<T>,
    terminal: Option<Result<(), StreamError>>,
    misuse: Option<GeneratorMisuse>,
}

/// What a well-behaved step produced.
struct StepOutcome<T> {
    item: Option<T>,
    terminal: Option<Result<(), StreamError>>,
}

impl<T> GeneratorSink<T> {
    fn new() -> Self {
        Self {
            item: None,
            terminal: None,
            misuse: None,
        }
    }

    /// Emit this step's element.
    pub fn next(&mut self, item: T) {
        if self.misuse.is_some() {
            return;
        }
        if self.terminal.is_some() {
            self.misuse = Some(GeneratorMisuse::SignalAfterTerminal);
        } else if self.item.is_some() {
            self.misuse = Some(GeneratorMisuse::MultipleEmissions);
        } else {
            self.item = Some(item);
        }
    }

    /// Signal that the sequence is exhausted.
    pub fn complete(&mut self) { self.terminate(Ok(())); }

    /// Signal failure.
    pub fn error(&mut self, error: StreamError) { self.terminate(Err(error)); }

    fn terminate(&mut self, outcome: Result<(), StreamError>) {
        if self.misuse.is_some() {
            return;
        }
        if self.terminal.is_some() {
            self.misuse = Some(GeneratorMisuse::SignalAfterTerminal);
        } else {
            self.terminal = Some(outcome);
        }
    }

    fn into_outcome(self) -> Result<StepOutcome<T>, GeneratorMisuse> {
        if let Some(misuse) = self.misuse {
            return Err(misuse);
        }
        if self.item.is_none() && self.terminal.is_none() {
            return Err(GeneratorMisuse::NoSignal);
        }
        Ok(StepOutcome {
            item: self.item,
            terminal: self.terminal,
        })
    }
}

/// Step function threading the cursor state.
pub(crate) type StepFn<S, T> = dyn Fn(S, &mut GeneratorSink<T>) -> S + Send + Sync;
/// Cleanup run once with the final cursor state.
pub(crate) type CleanupFn<S> = dyn Fn(S) + Send + Sync;

/// Type-erased per-subscription generator.
pub(crate) trait GeneratorDriver<T>: Send {
    fn step(&mut self, sink: &mut GeneratorSink<T>);

    /// Hand the final state to the cleanup callback, if any.
    fn finish(self: Box<Self>);
}

pub(crate) struct StatefulGenerator<S, T> {
    state: Option<S>,
    step: Arc<StepFn<S, T>>,
    cleanup: Option<Arc<CleanupFn<S>>>,
    _item: PhantomData<fn() -> T>,
}

impl<S, T> StatefulGenerator<S, T> {
    pub(crate) fn new(
        state: S,
        step: Arc<StepFn<S, T>>,
        cleanup: Option<Arc<CleanupFn<S>>>,
    ) -> Self {
        Self {
            state: Some(state),
            step,
            cleanup,
            _item: PhantomData,
        }
    }
}

impl<S: Send + 'static, T: 'static> GeneratorDriver<T> for StatefulGenerator<S, T> {
    fn step(&mut self, sink: &mut GeneratorSink<T>) {
        if let Some(state) = self.state.take() {
            self.state = Some((self.step)(state, sink));
        }
    }

    fn finish(self: Box<Self>) {
        let Self { state, cleanup, .. } = *self;
        if let (Some(state), Some(cleanup)) = (state, cleanup) {
            cleanup(state);
        }
    }
}

/// Run one step per unit of `demand` until demand or the sequence runs out.
pub(crate) fn drive<T: Send + 'static>(
    driver: &mut dyn GeneratorDriver<T>,
    demand: Demand,
    emitter: &Emitter<'_, T>,
) {
    for _ in Units::new(demand) {
        if !emitter.is_active() {
            return;
        }
        let mut sink = GeneratorSink::new();
        driver.step(&mut sink);
        match sink.into_outcome() {
            Err(misuse) => {
                warn!(%misuse, "generator step misused its sink");
                emitter.error(StreamError::InvalidGeneratorUsage(misuse));
                return;
            }
            Ok(StepOutcome { item, terminal }) => {
                if let Some(item) = item {
                    emitter.next(item);
                }
                match terminal {
                    None => {}
                    Some(Ok(())) => {
                        emitter.complete();
                        return;
                    }
                    Some(Err(error)) => {
                        emitter.error(error);
                        return;
                    }
                }
            }
        }
    }
}
