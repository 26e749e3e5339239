//! Test utilities for code built on [`tributary`].
//!
//! * [`StepVerifier`] walks a scripted list of expectations against a
//!   [`Flux`](tributary::Flux), waiting asynchronously for each signal.
//! * [`RecordingSubscriber`] records every signal and lets a test drive demand
//!   by hand.
//! * [`logger`] is an `rstest` fixture serialising access to captured logs.
//!
//! ```rust
//! use tributary::Flux;
//! use tributary_testing::StepVerifier;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! StepVerifier::with_initial_request(Flux::from_sequence([1, 2, 3]), 1)
//!     .expect_next(1)
//!     .then_request(2)
//!     .expect_next_seq([2, 3])
//!     .expect_complete()
//!     .verify()
//!     .await
//!     .expect("sequence should replay in order");
//! # }
//! ```

pub mod logging;
pub mod recording;
pub mod verifier;

pub use logging::{LoggerHandle, logger};
pub use recording::{Event, Recording, RecordingSubscriber};
pub use verifier::{DEFAULT_STEP_TIMEOUT, StepVerifier, VerificationError};
