//! Optional convenience imports for common `tributary` workflows.
//!
//! Only the types needed to define, subscribe to and drive a stream are
//! re-exported. Import configuration and error details from their modules.
//!
//! # Examples
//!
//! ```rust
//! use tributary::prelude::*;
//!
//! fn numbers() -> Flux<u32> { Flux::from_sequence([1, 2, 3]) }
//! # let _ = numbers();
//! ```

pub use crate::{
    error::StreamError,
    flux::{Emitter, Flux},
    generator::GeneratorSink,
    producer::SubscriptionLogic,
    sink::{OverflowStrategy, Sink},
    subscriber::{Subscriber, Subscription},
};
