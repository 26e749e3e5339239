//! Canonical error types for the crate.
//!
//! [`StreamError`] is the only error a subscriber ever observes through
//! [`Subscriber::on_error`](crate::Subscriber::on_error). Every variant is
//! terminal: once delivered, the subscription emits nothing further.
//! [`ConfigError`] is reported synchronously while building stream
//! definitions.

use std::{fmt, sync::Arc};

use thiserror::Error;

/// Errors delivered to subscribers as the terminal `on_error` signal.
#[non_exhaustive]
#[derive(Debug, Error, Clone)]
pub enum StreamError {
    /// A generator step broke the one-element-per-step contract.
    #[error("invalid generator usage: {0}")]
    InvalidGeneratorUsage(GeneratorMisuse),
    /// A sink pushed an element with no outstanding demand under
    /// [`OverflowStrategy::Error`](crate::OverflowStrategy::Error).
    #[error("element pushed with no outstanding demand")]
    Overflow,
    /// The producer signalled a failure of its own.
    #[error("upstream failure: {0}")]
    Upstream(UpstreamError),
    /// A party broke the request/emission protocol.
    #[error("protocol violation: {0}")]
    ProtocolViolation(ProtocolViolation),
}

impl StreamError {
    /// Wrap an arbitrary producer error as [`StreamError::Upstream`].
    #[must_use]
    pub fn upstream<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Upstream(UpstreamError::new(error))
    }

    /// Build an [`StreamError::Upstream`] carrying only a message.
    #[must_use]
    pub fn upstream_message(message: impl Into<String>) -> Self {
        Self::Upstream(UpstreamError::message(message))
    }

    /// Field-less classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidGeneratorUsage(_) => ErrorKind::InvalidGeneratorUsage,
            Self::Overflow => ErrorKind::Overflow,
            Self::Upstream(_) => ErrorKind::Upstream,
            Self::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
        }
    }
}

/// Classification of [`StreamError`] used for matching in assertions.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`StreamError::InvalidGeneratorUsage`].
    InvalidGeneratorUsage,
    /// See [`StreamError::Overflow`].
    Overflow,
    /// See [`StreamError::Upstream`].
    Upstream,
    /// See [`StreamError::ProtocolViolation`].
    ProtocolViolation,
}

/// Ways a generator step can misuse its [`GeneratorSink`](crate::GeneratorSink).
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorMisuse {
    /// `next` was called more than once during a single step.
    #[error("more than one element emitted in a single step")]
    MultipleEmissions,
    /// A signal followed `complete` or `error` within the same step.
    #[error("signal issued after the step already terminated")]
    SignalAfterTerminal,
    /// The step returned without emitting or terminating.
    #[error("step returned without emitting an element or terminating")]
    NoSignal,
}

/// Request/emission protocol breaches.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// A subscriber requested zero elements.
    #[error("request for zero elements; demand must be at least 1")]
    ZeroRequest,
    /// A pull producer emitted more elements than were requested.
    #[error("element emitted without outstanding demand")]
    DemandExceeded,
}

/// Opaque, cheaply cloneable producer failure.
#[derive(Clone)]
pub struct UpstreamError(Arc<dyn std::error::Error + Send + Sync>);

impl UpstreamError {
    /// Wrap a concrete error.
    #[must_use]
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// Build an error that only carries a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self(Arc::from(Box::<dyn std::error::Error + Send + Sync>::from(
            message.into(),
        )))
    }

    /// Borrow the wrapped error.
    #[must_use]
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) { &*self.0 }
}

impl fmt::Debug for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UpstreamError").field(&self.0.to_string()).finish()
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(&self.0, f) }
}

/// Errors returned when building stream definitions.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The prefetch window was zero.
    #[error("invalid prefetch window {0}; must be at least 1")]
    InvalidWindow(u64),
    /// The replenish threshold fell outside `1..=window`.
    #[error("invalid replenish threshold {replenish_at}; must be between 1 and {window}")]
    InvalidReplenish {
        /// Configured prefetch window.
        window: u64,
        /// Configured replenish threshold.
        replenish_at: u64,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::generator(
        StreamError::InvalidGeneratorUsage(GeneratorMisuse::MultipleEmissions),
        ErrorKind::InvalidGeneratorUsage
    )]
    #[case::overflow(StreamError::Overflow, ErrorKind::Overflow)]
    #[case::upstream(StreamError::upstream_message("boom"), ErrorKind::Upstream)]
    #[case::protocol(
        StreamError::ProtocolViolation(ProtocolViolation::ZeroRequest),
        ErrorKind::ProtocolViolation
    )]
    fn kind_matches_variant(#[case] error: StreamError, #[case] kind: ErrorKind) {
        assert_eq!(error.kind(), kind);
    }

    #[test]
    fn upstream_error_displays_source_message() {
        let error = StreamError::upstream(std::io::Error::other("disk on fire"));
        assert_eq!(error.to_string(), "upstream failure: disk on fire");
    }

    #[test]
    fn upstream_error_clones_share_payload() {
        let error = UpstreamError::message("shared");
        let copy = error.clone();
        assert_eq!(copy.inner().to_string(), error.inner().to_string());
    }
}
