//! Cold, reusable stream definitions.
//!
//! A [`Flux`] describes how elements are produced; nothing runs until
//! [`Flux::subscribe`] is called. Each subscription gets fresh producer state
//! built from the definition, so one `Flux` can be subscribed many times,
//! concurrently or in sequence.

mod engine;

use std::{fmt, sync::Arc};

pub(crate) use engine::Core;
pub use engine::Emitter;

use crate::{
    config::PrefetchConfig,
    error::ConfigError,
    generator::{CleanupFn, GeneratorDriver, GeneratorSink, StatefulGenerator, StepFn},
    producer::{PrefetchProducer, Producer, SequenceIter, SequenceProducer, SubscriptionLogic},
    sink::{EmitterFn, OverflowStrategy, Sink, SinkProducer},
    subscriber::{Control, Subscriber, Subscription},
};

type SequenceFactory<T> = dyn Fn() -> SequenceIter<T> + Send + Sync;
type LogicFactory<T> = dyn Fn() -> Box<dyn SubscriptionLogic<T>> + Send + Sync;
type GeneratorFactory<T> = dyn Fn() -> Box<dyn GeneratorDriver<T>> + Send + Sync;

/// How a stream produces its elements.
enum Definition<T> {
    Sequence(Box<SequenceFactory<T>>),
    Logic(Box<LogicFactory<T>>),
    Sink {
        emitter: EmitterFn<T>,
        overflow: OverflowStrategy,
    },
    Generator(Box<GeneratorFactory<T>>),
    Prefetch {
        upstream: Flux<T>,
        config: PrefetchConfig,
    },
}

impl<T: Send + 'static> Definition<T> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Sequence(_) => "sequence",
            Self::Logic(_) => "subscription_logic",
            Self::Sink { .. } => "sink",
            Self::Generator(_) => "generator",
            Self::Prefetch { .. } => "prefetch",
        }
    }

    /// Only sink-backed streams may push without demand.
    fn overflow_strategy(&self) -> Option<OverflowStrategy> {
        match self {
            Self::Sink { overflow, .. } => Some(*overflow),
            _ => None,
        }
    }

    fn instantiate(&self, core: &Arc<Core<T>>) -> Producer<T> {
        match self {
            Self::Sequence(items) => Producer::Sequence(SequenceProducer::new(items())),
            Self::Logic(factory) => Producer::Logic(factory()),
            Self::Sink { emitter, .. } => {
                Producer::Sink(SinkProducer::new(Arc::clone(emitter), Arc::clone(core)))
            }
            Self::Generator(factory) => Producer::Generator(factory()),
            Self::Prefetch { upstream, config } => Producer::Prefetch(PrefetchProducer::new(
                upstream.clone(),
                *config,
                Arc::downgrade(core),
            )),
        }
    }
}

/// A cold, backpressure-aware stream of `T`.
///
/// Cloning is cheap and yields the same definition.
///
/// # Examples
///
/// ```
/// use tributary::{Flux, StreamError, Subscriber, Subscription};
///
/// struct Print;
///
/// impl Subscriber<&'static str> for Print {
///     fn on_subscribe(&mut self, subscription: Subscription) { subscription.request(2); }
///
///     fn on_next(&mut self, item: &'static str) { println!("{item}"); }
///
///     fn on_error(&mut self, error: StreamError) { eprintln!("{error}"); }
///
///     fn on_complete(&mut self) {}
/// }
///
/// let subscription = Flux::from_sequence(["thing1", "thing2"]).subscribe(Print);
/// assert!(subscription.is_terminated());
/// ```
pub struct Flux<T> {
    definition: Arc<Definition<T>>,
}

impl<T> Clone for Flux<T> {
    fn clone(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Flux<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flux")
            .field("kind", &self.definition.kind())
            .finish()
    }
}

impl<T: Send + 'static> Flux<T> {
    fn from_definition(definition: Definition<T>) -> Self {
        Self {
            definition: Arc::new(definition),
        }
    }

    /// Replay `items` to every subscriber, in order.
    ///
    /// Completes as soon as the last element has been emitted, and
    /// immediately for an empty sequence.
    pub fn from_sequence<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Clone + Sync,
    {
        let items: Arc<[T]> = items.into_iter().collect();
        Self::from_definition(Definition::Sequence(Box::new(
            move || -> SequenceIter<T> {
                let items = Arc::clone(&items);
                Box::new((0..items.len()).map(move |index| items[index].clone()))
            },
        )))
    }

    /// Pull-mode stream driven by hand-written subscription logic.
    ///
    /// `factory` runs once per subscription and its logic receives every
    /// batch of demand. See [`SubscriptionLogic`].
    pub fn from_subscription_logic<F, L>(factory: F) -> Self
    where
        F: Fn() -> L + Send + Sync + 'static,
        L: SubscriptionLogic<T> + 'static,
    {
        Self::from_definition(Definition::Logic(Box::new(
            move || -> Box<dyn SubscriptionLogic<T>> { Box::new(factory()) },
        )))
    }

    /// Push-mode stream fed through a [`Sink`].
    ///
    /// `emitter` runs once per subscription, after `on_subscribe`, and may
    /// hand the sink to other threads. Pushes without outstanding demand are
    /// handled by `overflow`.
    pub fn from_sink<F>(emitter: F, overflow: OverflowStrategy) -> Self
    where
        F: Fn(Sink<T>) + Send + Sync + 'static,
    {
        Self::from_definition(Definition::Sink {
            emitter: Arc::new(emitter),
            overflow,
        })
    }

    /// Stateless synchronous generator; `step` runs once per unit of demand.
    pub fn generate<F>(step: F) -> Self
    where
        F: Fn(&mut GeneratorSink<T>) + Send + Sync + 'static,
    {
        Self::generate_with_state(
            || (),
            move |(), sink: &mut GeneratorSink<T>| step(sink),
        )
    }

    /// Generator threading per-subscription state created by `init`.
    pub fn generate_with_state<S, I, F>(init: I, step: F) -> Self
    where
        S: Send + 'static,
        I: Fn() -> S + Send + Sync + 'static,
        F: Fn(S, &mut GeneratorSink<T>) -> S + Send + Sync + 'static,
    {
        let step: Arc<StepFn<S, T>> = Arc::new(step);
        Self::stateful(init, step, None)
    }

    /// Stateful generator whose final state is handed to `cleanup` exactly
    /// once, whether the subscription completes, fails or is cancelled.
    pub fn generate_with_cleanup<S, I, F, C>(init: I, step: F, cleanup: C) -> Self
    where
        S: Send + 'static,
        I: Fn() -> S + Send + Sync + 'static,
        F: Fn(S, &mut GeneratorSink<T>) -> S + Send + Sync + 'static,
        C: Fn(S) + Send + Sync + 'static,
    {
        let step: Arc<StepFn<S, T>> = Arc::new(step);
        let cleanup: Arc<CleanupFn<S>> = Arc::new(cleanup);
        Self::stateful(init, step, Some(cleanup))
    }

    fn stateful<S, I>(
        init: I,
        step: Arc<StepFn<S, T>>,
        cleanup: Option<Arc<CleanupFn<S>>>,
    ) -> Self
    where
        S: Send + 'static,
        I: Fn() -> S + Send + Sync + 'static,
    {
        Self::from_definition(Definition::Generator(Box::new(
            move || -> Box<dyn GeneratorDriver<T>> {
                Box::new(StatefulGenerator::new(
                    init(),
                    Arc::clone(&step),
                    cleanup.clone(),
                ))
            },
        )))
    }

    /// Decouple downstream demand from upstream requests with a fixed
    /// window, replenished in full.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWindow`] if `window` is zero.
    pub fn with_prefetch(self, window: u64) -> Result<Self, ConfigError> {
        Ok(self.with_prefetch_config(PrefetchConfig::new(window)?))
    }

    /// Prefetch with an explicit replenishment threshold.
    #[must_use]
    pub fn with_prefetch_config(self, config: PrefetchConfig) -> Self {
        Self::from_definition(Definition::Prefetch {
            upstream: self,
            config,
        })
    }

    /// Start a new, independent subscription.
    ///
    /// `on_subscribe` is delivered before this returns. Depending on the
    /// producer, some or all signals may also have been delivered by then.
    pub fn subscribe<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T>,
    {
        let definition = &self.definition;
        let core = Arc::new(Core::new(
            Box::new(subscriber),
            definition.overflow_strategy(),
        ));
        core.install(definition.instantiate(&core));
        let control: Arc<dyn Control> = Arc::<Core<T>>::clone(&core);
        let subscription = Subscription::new(control);
        core.open(subscription.clone(), definition.kind());
        subscription
    }
}
