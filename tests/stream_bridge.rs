//! Consuming a `Flux` as a `futures::Stream`.

use std::{thread, time::Duration};

use futures::StreamExt;
use rstest::rstest;
use tributary::{ErrorKind, Flux, GeneratorSink, OverflowStrategy, Sink, StreamError, StreamState};

#[rstest]
#[case(1)]
#[case(3)]
#[case(100)]
#[tokio::test]
async fn yields_elements_in_order(#[case] batch: u64) {
    let items: Vec<u32> = Flux::from_sequence(1..=9)
        .with_prefetch(4)
        .expect("window of four is valid")
        .into_stream(batch)
        .map(|item| item.expect("sequence never fails"))
        .collect()
        .await;
    assert_eq!(items, (1..=9).collect::<Vec<_>>());
}

#[tokio::test]
async fn error_ends_the_stream() {
    let flux = Flux::generate_with_state(
        || 0_u32,
        |state, sink: &mut GeneratorSink<u32>| {
            if state == 2 {
                sink.error(StreamError::upstream_message("boom"));
            } else {
                sink.next(state);
            }
            state + 1
        },
    );
    let results: Vec<Result<u32, StreamError>> = flux.into_stream(8).collect().await;
    assert_eq!(results.len(), 3);
    assert!(matches!(results[0], Ok(0)));
    assert!(matches!(results[1], Ok(1)));
    assert!(matches!(&results[2], Err(error) if error.kind() == ErrorKind::Upstream));
}

#[tokio::test]
async fn requests_lazily_in_batches() {
    let mut stream = Flux::generate(|sink: &mut GeneratorSink<u8>| sink.next(1)).into_stream(2);
    assert_eq!(stream.subscription().state(), StreamState::Idle);
    let first = stream.next().await;
    assert!(matches!(first, Some(Ok(1))));
    assert_eq!(stream.subscription().state(), StreamState::Active);
}

#[tokio::test]
async fn dropping_the_stream_cancels() {
    let stream = Flux::generate(|sink: &mut GeneratorSink<u8>| sink.next(1)).into_stream(4);
    let subscription = stream.subscription().clone();
    let taken: Vec<_> = stream.take(5).collect().await;
    assert_eq!(taken.len(), 5);
    assert_eq!(subscription.state(), StreamState::Cancelled);
}

#[tokio::test]
async fn receives_pushes_from_another_thread() {
    let flux = Flux::from_sink(
        |sink: Sink<u32>| {
            thread::spawn(move || {
                for item in 0..20 {
                    thread::sleep(Duration::from_millis(1));
                    sink.next(item);
                }
                sink.complete();
            });
        },
        OverflowStrategy::Buffer,
    );
    let items: Vec<u32> = flux
        .into_stream(5)
        .map(|item| item.expect("sink never fails"))
        .collect()
        .await;
    assert_eq!(items, (0..20).collect::<Vec<_>>());
}
