//! Metric helpers for `tributary`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::error::ErrorKind;

/// Name of the gauge tracking live subscriptions.
pub const SUBSCRIPTIONS_ACTIVE: &str = "tributary_subscriptions_active";
/// Name of the counter tracking elements delivered to subscribers.
pub const ELEMENTS_DELIVERED: &str = "tributary_elements_delivered_total";
/// Name of the counter tracking terminal errors.
pub const ERRORS_TOTAL: &str = "tributary_errors_total";
/// Name of the counter tracking elements discarded by the drop strategy.
pub const OVERFLOW_DROPPED: &str = "tributary_overflow_dropped_total";

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidGeneratorUsage => "invalid_generator_usage",
        ErrorKind::Overflow => "overflow",
        ErrorKind::Upstream => "upstream",
        ErrorKind::ProtocolViolation => "protocol_violation",
    }
}

/// Increment the live subscriptions gauge.
#[cfg(feature = "metrics")]
pub fn inc_subscriptions() { gauge!(SUBSCRIPTIONS_ACTIVE).increment(1.0); }

/// Decrement the live subscriptions gauge.
#[cfg(feature = "metrics")]
pub fn dec_subscriptions() { gauge!(SUBSCRIPTIONS_ACTIVE).decrement(1.0); }

/// Record an element handed to a subscriber.
#[cfg(feature = "metrics")]
pub fn inc_delivered() { counter!(ELEMENTS_DELIVERED).increment(1); }

/// Record a terminal error of the given kind.
#[cfg(feature = "metrics")]
pub fn inc_errors(kind: ErrorKind) {
    counter!(ERRORS_TOTAL, "kind" => kind_label(kind)).increment(1);
}

/// Record an element discarded by [`OverflowStrategy::Drop`](crate::OverflowStrategy::Drop).
#[cfg(feature = "metrics")]
pub fn inc_dropped() { counter!(OVERFLOW_DROPPED).increment(1); }

#[cfg(not(feature = "metrics"))]
pub fn inc_subscriptions() {}

#[cfg(not(feature = "metrics"))]
pub fn dec_subscriptions() {}

#[cfg(not(feature = "metrics"))]
pub fn inc_delivered() {}

#[cfg(not(feature = "metrics"))]
pub fn inc_errors(kind: ErrorKind) { let _ = kind_label(kind); }

#[cfg(not(feature = "metrics"))]
pub fn inc_dropped() {}
