//! Push-mode sources built on `Flux::from_sink`.

use std::{
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use rstest::rstest;
use tributary::{Demand, ErrorKind, Flux, OverflowStrategy, Sink, StreamState};
use tributary_testing::{RecordingSubscriber, StepVerifier};

/// Sink whose handle is parked for the test to drive by hand.
fn parked(strategy: OverflowStrategy) -> (Flux<u32>, Arc<Mutex<Option<Sink<u32>>>>) {
    let slot = Arc::new(Mutex::new(None));
    let parked = Arc::clone(&slot);
    let flux = Flux::from_sink(
        move |sink: Sink<u32>| *parked.lock().expect("slot poisoned") = Some(sink),
        strategy,
    );
    (flux, slot)
}

fn take(slot: &Mutex<Option<Sink<u32>>>) -> Sink<u32> {
    slot.lock()
        .expect("slot poisoned")
        .take()
        .expect("emitter ran on subscribe")
}

#[test]
fn demand_granted_before_registration_is_replayed() {
    let (flux, slot) = parked(OverflowStrategy::Error);
    let subscriber = RecordingSubscriber::new().request_on_subscribe(3);
    let recording = subscriber.recording();
    flux.subscribe(subscriber);
    let sink = take(&slot);
    assert_eq!(sink.requested(), Demand::Finite(3));

    let announced = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&announced);
    sink.on_request(move |n| log.lock().expect("log poisoned").push(n));
    assert_eq!(*announced.lock().expect("log poisoned"), [3]);

    recording.request(2);
    assert_eq!(*announced.lock().expect("log poisoned"), [3, 2]);
}

#[test]
fn requested_tracks_emissions() {
    let (flux, slot) = parked(OverflowStrategy::Error);
    let subscriber = RecordingSubscriber::new().request_on_subscribe(2);
    let recording = subscriber.recording();
    flux.subscribe(subscriber);
    let sink = take(&slot);
    sink.next(1);
    assert_eq!(sink.requested(), Demand::Finite(1));
    sink.next(2);
    assert_eq!(sink.requested(), Demand::NONE);
    assert_eq!(recording.items(), [1, 2]);
}

#[rstest]
#[case::error(OverflowStrategy::Error, vec![1], Some(ErrorKind::Overflow))]
#[case::drop(OverflowStrategy::Drop, vec![1, 4], None)]
#[case::buffer(OverflowStrategy::Buffer, vec![1, 2, 3, 4], None)]
fn overflow_strategy_governs_excess_pushes(
    #[case] strategy: OverflowStrategy,
    #[case] expected: Vec<u32>,
    #[case] error: Option<ErrorKind>,
) {
    let (flux, slot) = parked(strategy);
    let subscriber = RecordingSubscriber::new().request_on_subscribe(1);
    let recording = subscriber.recording();
    flux.subscribe(subscriber);
    let sink = take(&slot);
    sink.next(1);
    sink.next(2);
    sink.next(3);
    recording.request(3);
    sink.next(4);
    assert_eq!(recording.items(), expected);
    assert_eq!(recording.error().map(|e| e.kind()), error);
}

#[test]
fn calls_after_completion_are_ignored() {
    let (flux, slot) = parked(OverflowStrategy::Error);
    let subscriber = RecordingSubscriber::new().request_on_subscribe(5);
    let recording = subscriber.recording();
    let subscription = flux.subscribe(subscriber);
    let sink = take(&slot);
    sink.next(1);
    sink.complete();
    sink.next(2);
    sink.complete();
    sink.error(tributary::StreamError::Overflow);
    assert_eq!(recording.items(), [1]);
    assert_eq!(recording.terminal_count(), 1);
    assert!(recording.is_completed());
    assert_eq!(subscription.state(), StreamState::Completed);
}

#[test]
fn cancel_runs_cancel_and_dispose_hooks_once() {
    let (flux, slot) = parked(OverflowStrategy::Error);
    let subscription = flux.subscribe(RecordingSubscriber::new());
    let sink = take(&slot);
    let cancels = Arc::new(AtomicUsize::new(0));
    let disposals = Arc::new(AtomicUsize::new(0));
    let cancel_count = Arc::clone(&cancels);
    let dispose_count = Arc::clone(&disposals);
    sink.on_cancel(move || {
        cancel_count.fetch_add(1, Ordering::SeqCst);
    })
    .on_dispose(move || {
        dispose_count.fetch_add(1, Ordering::SeqCst);
    });

    subscription.cancel();
    subscription.cancel();

    assert!(sink.is_cancelled());
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
    assert_eq!(disposals.load(Ordering::SeqCst), 1);
}

#[test]
fn completion_disposes_without_cancelling() {
    let (flux, slot) = parked(OverflowStrategy::Error);
    flux.subscribe(RecordingSubscriber::new());
    let sink = take(&slot);
    let cancels = Arc::new(AtomicUsize::new(0));
    let disposals = Arc::new(AtomicUsize::new(0));
    let cancel_count = Arc::clone(&cancels);
    let dispose_count = Arc::clone(&disposals);
    sink.on_cancel(move || {
        cancel_count.fetch_add(1, Ordering::SeqCst);
    })
    .on_dispose(move || {
        dispose_count.fetch_add(1, Ordering::SeqCst);
    });

    sink.complete();

    assert!(!sink.is_cancelled());
    assert_eq!(cancels.load(Ordering::SeqCst), 0);
    assert_eq!(disposals.load(Ordering::SeqCst), 1);
}

#[test]
fn hooks_registered_after_cancel_run_immediately() {
    let (flux, slot) = parked(OverflowStrategy::Error);
    let subscription = flux.subscribe(RecordingSubscriber::new());
    let sink = take(&slot);
    subscription.cancel();
    let ran = Arc::new(AtomicUsize::new(0));
    let on_cancel = Arc::clone(&ran);
    let on_dispose = Arc::clone(&ran);
    sink.on_cancel(move || {
        on_cancel.fetch_add(1, Ordering::SeqCst);
    })
    .on_dispose(move || {
        on_dispose.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(ran.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn pushes_from_other_threads_are_serialised() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 250;

    let flux = Flux::from_sink(
        |sink: Sink<u32>| {
            let finished = Arc::new(AtomicUsize::new(0));
            for producer in 0..PRODUCERS {
                let sink = sink.clone();
                let finished = Arc::clone(&finished);
                thread::spawn(move || {
                    for offset in 0..PER_PRODUCER {
                        sink.next(producer * PER_PRODUCER + offset);
                    }
                    if finished.fetch_add(1, Ordering::SeqCst) + 1 == PRODUCERS as usize {
                        sink.complete();
                    }
                });
            }
        },
        OverflowStrategy::Buffer,
    );

    StepVerifier::create(flux)
        .timeout(Duration::from_secs(10))
        .expect_next_count((PRODUCERS * PER_PRODUCER) as usize)
        .expect_complete()
        .verify()
        .await
        .expect("every pushed element delivered once, then completion");
}

#[test]
fn pushes_from_other_threads_respect_order_per_producer() {
    let flux = Flux::from_sink(
        |sink: Sink<u32>| {
            let worker = sink.clone();
            thread::spawn(move || {
                for item in 0..100 {
                    worker.next(item);
                }
                worker.complete();
            })
            .join()
            .expect("producer thread panicked");
        },
        OverflowStrategy::Buffer,
    );
    let subscriber = RecordingSubscriber::new().request_on_subscribe(10);
    let recording = subscriber.recording();
    flux.subscribe(subscriber);
    assert_eq!(recording.items(), (0..10).collect::<Vec<_>>());
    recording.request(200);
    assert_eq!(recording.items(), (0..100).collect::<Vec<_>>());
    assert!(recording.is_completed());
}
