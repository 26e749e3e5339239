#![cfg(feature = "metrics")]
//! Tests for `tributary` metrics.
//!
//! These tests verify that counters and gauges update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;
use tributary::{Flux, OverflowStrategy, Sink, UNBOUNDED};
use tributary_testing::RecordingSubscriber;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn assert_counter_eq(snapshotter: &Snapshotter, name: &str, expected: u64) {
    let metrics = snapshotter.snapshot().into_vec();
    assert!(
        metrics.iter().any(|(key, _, _, value)| {
            key.key().name() == name && matches!(value, DebugValue::Counter(c) if *c == expected)
        }),
        "expected {name} == {expected}, got {metrics:#?}"
    );
}

#[rstest]
#[case(1)]
#[case(7)]
fn delivered_elements_are_counted(#[case] count: u32) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        Flux::from_sequence(0..count)
            .subscribe(RecordingSubscriber::new().request_on_subscribe(UNBOUNDED));
    });
    assert_counter_eq(
        &snapshotter,
        tributary::ELEMENTS_DELIVERED,
        u64::from(count),
    );
}

#[test]
fn overflow_error_is_counted_by_kind() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        Flux::from_sink(|sink: Sink<u32>| sink.next(1), OverflowStrategy::Error)
            .subscribe(RecordingSubscriber::new());
    });

    let metrics = snapshotter.snapshot().into_vec();
    let found = metrics.iter().any(|(k, _, _, v)| {
        k.key().name() == tributary::ERRORS_TOTAL
            && k.key()
                .labels()
                .any(|l| l.key() == "kind" && l.value() == "overflow")
            && matches!(v, DebugValue::Counter(c) if *c > 0)
    });
    assert!(found, "overflow error metric not recorded");
}

#[test]
fn dropped_elements_are_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        Flux::from_sink(
            |sink: Sink<u32>| {
                sink.next(1);
                sink.next(2);
            },
            OverflowStrategy::Drop,
        )
        .subscribe(RecordingSubscriber::new());
    });
    assert_counter_eq(&snapshotter, tributary::OVERFLOW_DROPPED, 2);
}

#[test]
fn subscriptions_gauge_returns_to_zero() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let subscription = Flux::from_sequence([1_u32]).subscribe(RecordingSubscriber::new());
        subscription.cancel();
    });
    let metrics = snapshotter.snapshot().into_vec();
    let gauge = metrics.iter().find_map(|(k, _, _, v)| {
        (k.key().name() == tributary::SUBSCRIPTIONS_ACTIVE).then_some(v)
    });
    assert!(
        matches!(gauge, Some(DebugValue::Gauge(value)) if value.into_inner().abs() < f64::EPSILON),
        "expected gauge at zero, got {gauge:?}"
    );
}
