//! Every production style drained through a prefetch window of four.
//!
//! Each source yields `thing1`..`thing9` and must complete exactly once.

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use rstest::{fixture, rstest};
use tributary::{Emitter, Flux, GeneratorSink, OverflowStrategy, Sink, StreamError, SubscriptionLogic};
use tributary_testing::StepVerifier;

const WINDOW: u64 = 4;

#[fixture]
fn things() -> Arc<[String]> { (1..=9).map(|index| format!("thing{index}")).collect() }

async fn expect_things_and_completion(source: Flux<String>, things: &[String]) {
    let limited = source.with_prefetch(WINDOW).expect("window of four is valid");
    StepVerifier::create(limited)
        .expect_next_seq(things.iter().cloned())
        .expect_complete()
        .verify()
        .await
        .expect("all nine things followed by completion");
}

/// Generator step shared by the stateful scenarios.
fn next_step(things: &[String], current: usize, sink: &mut GeneratorSink<String>) -> usize {
    if current == things.len() {
        sink.complete();
        current
    } else {
        sink.next(things[current].clone());
        current + 1
    }
}

#[rstest]
#[tokio::test]
async fn from_sequence(things: Arc<[String]>) {
    let source = Flux::from_sequence(things.iter().cloned());
    expect_things_and_completion(source, &things).await;
}

/// Hand-written subscription that completes when asked past the end.
struct ThingsLogic {
    things: Arc<[String]>,
    current: usize,
}

impl SubscriptionLogic<String> for ThingsLogic {
    fn request(&mut self, n: u64, emitter: &Emitter<'_, String>) -> Result<(), StreamError> {
        for _ in 0..n {
            if !emitter.is_active() {
                break;
            }
            if self.current == self.things.len() {
                emitter.complete();
                break;
            }
            emitter.next(self.things[self.current].clone());
            self.current += 1;
        }
        Ok(())
    }
}

#[rstest]
#[tokio::test]
async fn from_subscription_logic(things: Arc<[String]>) {
    let shared = Arc::clone(&things);
    let source = Flux::from_subscription_logic(move || ThingsLogic {
        things: Arc::clone(&shared),
        current: 0,
    });
    expect_things_and_completion(source, &things).await;
}

#[rstest]
#[tokio::test]
async fn from_sink_with_error_overflow(things: Arc<[String]>) {
    let shared = Arc::clone(&things);
    let source = Flux::from_sink(
        move |sink: Sink<String>| {
            let things = Arc::clone(&shared);
            let pusher = sink.clone();
            let mut current = 0;
            sink.on_request(move |n| {
                for _ in 0..n {
                    if current == things.len() {
                        pusher.complete();
                        break;
                    }
                    pusher.next(things[current].clone());
                    current += 1;
                }
            });
            sink.on_cancel(|| {});
        },
        OverflowStrategy::Error,
    );
    expect_things_and_completion(source, &things).await;
}

#[rstest]
#[tokio::test]
async fn stateless_generator(things: Arc<[String]>) {
    let shared = Arc::clone(&things);
    let current = AtomicUsize::new(0);
    let source = Flux::generate(move |sink: &mut GeneratorSink<String>| {
        next_step(&shared, current.fetch_add(1, Ordering::SeqCst), sink);
    });
    expect_things_and_completion(source, &things).await;
}

#[rstest]
#[tokio::test]
async fn generator_with_state(things: Arc<[String]>) {
    let shared = Arc::clone(&things);
    let source = Flux::generate_with_state(
        || 0,
        move |current, sink: &mut GeneratorSink<String>| next_step(&shared, current, sink),
    );
    expect_things_and_completion(source, &things).await;
}

#[rstest]
#[tokio::test]
async fn generator_with_state_and_cleanup(things: Arc<[String]>) {
    let shared = Arc::clone(&things);
    let cleaned = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&cleaned);
    let source = Flux::generate_with_cleanup(
        || 0,
        move |current, sink: &mut GeneratorSink<String>| next_step(&shared, current, sink),
        move |last: usize| recorder.lock().expect("cleanup log poisoned").push(last),
    );
    expect_things_and_completion(source, &things).await;
    assert_eq!(*cleaned.lock().expect("cleanup log poisoned"), [9]);
}
