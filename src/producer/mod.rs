//! Production strategies behind a single dispatch point.
//!
//! Each subscription instantiates exactly one [`Producer`] from its stream
//! definition. The work loop in [`crate::flux`] only ever talks to this enum,
//! so demand accounting and the prefetch adapter stay agnostic of how
//! elements are produced.

mod logic;
mod prefetch;
mod sequence;

pub use logic::SubscriptionLogic;
pub(crate) use prefetch::PrefetchProducer;
pub(crate) use sequence::{SequenceIter, SequenceProducer};

use crate::{
    demand::Demand,
    flux::Emitter,
    generator::{self, GeneratorDriver},
    sink::SinkProducer,
    state::StreamState,
};

/// Per-subscription producer, tagged by production style.
pub(crate) enum Producer<T> {
    Sequence(SequenceProducer<T>),
    Logic(Box<dyn SubscriptionLogic<T>>),
    Sink(SinkProducer<T>),
    Generator(Box<dyn GeneratorDriver<T>>),
    Prefetch(PrefetchProducer<T>),
}

impl<T: Send + 'static> Producer<T> {
    /// Called once, right after `on_subscribe` has been delivered.
    pub(crate) fn start(&mut self, emitter: &Emitter<'_, T>) {
        match self {
            Self::Sequence(producer) => producer.start(emitter),
            Self::Sink(producer) => producer.start(),
            Self::Prefetch(producer) => producer.start(),
            Self::Logic(_) | Self::Generator(_) => {}
        }
    }

    /// Announce newly granted demand; `demand` is empty for a plain wake-up.
    pub(crate) fn request(&mut self, demand: Demand, emitter: &Emitter<'_, T>) {
        match self {
            Self::Sequence(producer) => producer.request(demand, emitter),
            Self::Logic(logic) => {
                if demand.has_demand()
                    && let Err(error) = logic.request(demand.as_request(), emitter)
                {
                    emitter.error(error);
                }
            }
            Self::Sink(producer) => producer.request(demand),
            Self::Generator(driver) => generator::drive(driver.as_mut(), demand, emitter),
            Self::Prefetch(producer) => producer.drain(emitter),
        }
    }

    /// Release the producer once the subscription reached `state`.
    ///
    /// Runs exactly once per subscription.
    pub(crate) fn finish(self, state: StreamState) {
        match self {
            Self::Logic(mut logic) => {
                if state == StreamState::Cancelled {
                    logic.cancel();
                }
            }
            Self::Sink(producer) => producer.finish(state),
            Self::Generator(driver) => driver.finish(),
            Self::Sequence(_) | Self::Prefetch(_) => {}
        }
    }
}
