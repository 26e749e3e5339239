#![doc(html_root_url = "https://docs.rs/tributary/latest")]
//! Public API for the `tributary` library.
//!
//! `tributary` provides a cold, backpressure-aware stream primitive. A
//! [`Flux`] is produced by one of several styles (a fixed sequence,
//! hand-written subscription logic, a push [`Sink`], or a synchronous
//! generator) and consumed through a single [`Subscriber`] contract in which
//! the consumer grants demand and the producer never emits beyond it.
//! [`Flux::with_prefetch`] decouples downstream demand from upstream
//! requests, and [`Flux::into_stream`] bridges into async code.

pub mod config;
pub mod demand;
pub mod error;
pub mod flux;
pub mod generator;
pub mod metrics;
pub mod prelude;
mod producer;
pub mod sink;
pub mod state;
pub mod stream;
pub mod subscriber;

pub use config::{DEFAULT_PREFETCH_WINDOW, PrefetchConfig, PrefetchConfigBuilder};
pub use demand::{Demand, UNBOUNDED};
pub use error::{ConfigError, ErrorKind, GeneratorMisuse, ProtocolViolation, StreamError, UpstreamError};
pub use flux::{Emitter, Flux};
pub use generator::GeneratorSink;
pub use metrics::{ELEMENTS_DELIVERED, ERRORS_TOTAL, OVERFLOW_DROPPED, SUBSCRIPTIONS_ACTIVE};
pub use producer::SubscriptionLogic;
pub use sink::{OverflowStrategy, Sink};
pub use state::StreamState;
pub use stream::FluxStream;
pub use subscriber::{Subscriber, Subscription};
