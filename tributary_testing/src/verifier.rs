//! Scripted expectations over a stream's signals.
//!
//! A [`StepVerifier`] subscribes to a [`Flux`], then walks a list of steps:
//! expected elements, extra demand, cancellation and the expected terminal
//! signal. Each expectation waits up to the configured timeout, so sinks fed
//! from other threads can be verified as easily as synchronous sources.

use std::{fmt, time::Duration};

use thiserror::Error;
use tokio::time::Instant;
use tributary::{ErrorKind, Flux, UNBOUNDED};

use crate::recording::{Event, RecordingSubscriber};

/// Default time each expectation may wait for its signal.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Reasons a verification fails.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// No signal arrived in time for a step.
    #[error("step {step}: timed out waiting for {expected}")]
    Timeout { step: usize, expected: String },
    /// A signal other than the expected one arrived.
    #[error("step {step}: expected {expected}, got {actual}")]
    Unexpected {
        step: usize,
        expected: String,
        actual: String,
    },
    /// A signal arrived after the expected terminal signal.
    #[error("unexpected signal after termination: {actual}")]
    TrailingSignal { actual: String },
}

enum Step<T> {
    Next(T),
    NextCount(usize),
    Request(u64),
    Cancel,
    Complete,
    Error(ErrorKind),
}

/// Builder of scripted expectations, consumed by [`StepVerifier::verify`].
///
/// ```
/// use tributary::Flux;
/// use tributary_testing::StepVerifier;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let flux = Flux::from_sequence(["thing1", "thing2"]).with_prefetch(4).expect("valid window");
/// StepVerifier::create(flux)
///     .expect_next("thing1")
///     .expect_next("thing2")
///     .expect_complete()
///     .verify()
///     .await
///     .expect("stream should match the script");
/// # }
/// ```
pub struct StepVerifier<T> {
    flux: Flux<T>,
    initial_request: u64,
    steps: Vec<Step<T>>,
    timeout: Duration,
}

impl<T> StepVerifier<T>
where
    T: Clone + PartialEq + fmt::Debug + Send + 'static,
{
    /// Verify `flux` with unbounded initial demand.
    #[must_use]
    pub fn create(flux: Flux<T>) -> Self { Self::with_initial_request(flux, UNBOUNDED) }

    /// Verify `flux`, requesting `n` elements on subscription. Zero requests
    /// nothing until [`StepVerifier::then_request`].
    #[must_use]
    pub fn with_initial_request(flux: Flux<T>, n: u64) -> Self {
        Self {
            flux,
            initial_request: n,
            steps: Vec::new(),
            timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Expect the next signal to be `item`.
    #[must_use]
    pub fn expect_next(mut self, item: T) -> Self {
        self.steps.push(Step::Next(item));
        self
    }

    /// Expect the next signals to be `items`, in order.
    #[must_use]
    pub fn expect_next_seq<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        self.steps.extend(items.into_iter().map(Step::Next));
        self
    }

    /// Expect `count` elements of any value.
    #[must_use]
    pub fn expect_next_count(mut self, count: usize) -> Self {
        self.steps.push(Step::NextCount(count));
        self
    }

    /// Grant `n` more elements of demand.
    #[must_use]
    pub fn then_request(mut self, n: u64) -> Self {
        self.steps.push(Step::Request(n));
        self
    }

    /// Cancel the subscription and end the script.
    #[must_use]
    pub fn then_cancel(mut self) -> Self {
        self.steps.push(Step::Cancel);
        self
    }

    /// Expect successful completion.
    #[must_use]
    pub fn expect_complete(mut self) -> Self {
        self.steps.push(Step::Complete);
        self
    }

    /// Expect an error of the given kind.
    #[must_use]
    pub fn expect_error(mut self, kind: ErrorKind) -> Self {
        self.steps.push(Step::Error(kind));
        self
    }

    /// Time each step may wait for its signal.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Subscribe and walk the script.
    ///
    /// # Errors
    ///
    /// Returns the first step that did not observe what it expected, or a
    /// [`VerificationError::TrailingSignal`] if anything followed the
    /// terminal signal.
    pub async fn verify(self) -> Result<(), VerificationError> {
        let subscriber = RecordingSubscriber::new().request_on_subscribe(self.initial_request);
        let recording = subscriber.recording();
        let subscription = self.flux.subscribe(subscriber);
        let mut cursor = 0;
        let mut terminated = false;

        for (step_index, step) in self.steps.into_iter().enumerate() {
            let (expected, count) = match step {
                Step::Request(n) => {
                    subscription.request(n);
                    continue;
                }
                Step::Cancel => {
                    subscription.cancel();
                    return Ok(());
                }
                Step::Next(ref item) => (format!("next({item:?})"), 1),
                Step::NextCount(count) => ("next(_)".to_owned(), count),
                Step::Complete => ("complete".to_owned(), 1),
                Step::Error(kind) => (format!("error({kind:?})"), 1),
            };
            for _ in 0..count {
                let deadline = Instant::now() + self.timeout;
                let Some(event) = recording.event_at(cursor, deadline).await
                else {
                    return Err(VerificationError::Timeout {
                        step: step_index,
                        expected,
                    });
                };
                cursor += 1;
                let matched = match (&step, &event) {
                    (Step::Next(item), Event::Next(actual)) => item == actual,
                    (Step::NextCount(_), Event::Next(_)) | (Step::Complete, Event::Complete) => {
                        true
                    }
                    (Step::Error(kind), Event::Error(error)) => error.kind() == *kind,
                    _ => false,
                };
                if !matched {
                    return Err(VerificationError::Unexpected {
                        step: step_index,
                        expected,
                        actual: event.describe(),
                    });
                }
                terminated = event.is_terminal();
            }
        }

        if terminated && let Some(extra) = recording.events().get(cursor) {
            return Err(VerificationError::TrailingSignal {
                actual: extra.describe(),
            });
        }
        Ok(())
    }
}
