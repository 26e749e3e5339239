//! Demo binary draining `thing1..thingN` through a backpressured stream.
//!
//! Each element is requested one at a time by a printing subscriber, behind a
//! prefetch window of the configured size.

mod cli;

use std::{
    process::ExitCode,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

use clap::Parser;
use cli::{Cli, Mode};
use tributary::{
    Emitter,
    Flux,
    GeneratorSink,
    OverflowStrategy,
    Sink,
    StreamError,
    Subscriber,
    Subscription,
};

fn thing(index: u32) -> String { format!("thing{index}") }

fn source(mode: Mode, count: u32) -> Flux<String> {
    match mode {
        Mode::Sequence => Flux::from_sequence((1..=count).map(thing)),
        Mode::Logic => Flux::from_subscription_logic(move || {
            let mut next = 1;
            move |n: u64, emitter: &Emitter<'_, String>| -> Result<(), StreamError> {
                for _ in 0..n {
                    if next > count || !emitter.is_active() {
                        break;
                    }
                    emitter.next(thing(next));
                    next += 1;
                }
                if next > count {
                    emitter.complete();
                }
                Ok(())
            }
        }),
        Mode::Sink => Flux::from_sink(
            move |sink: Sink<String>| {
                let mut next = 1;
                let pusher = sink.clone();
                sink.on_request(move |n| {
                    for _ in 0..n {
                        if next > count {
                            break;
                        }
                        pusher.next(thing(next));
                        next += 1;
                    }
                    if next > count {
                        pusher.complete();
                    }
                });
            },
            OverflowStrategy::Error,
        ),
        Mode::Generate => {
            let counter = Arc::new(AtomicU32::new(0));
            Flux::generate(move |sink: &mut GeneratorSink<String>| {
                let index = counter.fetch_add(1, Ordering::Relaxed) + 1;
                if index > count {
                    sink.complete();
                } else {
                    sink.next(thing(index));
                }
            })
        }
        Mode::State => Flux::generate_with_state(
            || 1,
            move |index, sink: &mut GeneratorSink<String>| {
                if index > count {
                    sink.complete();
                } else {
                    sink.next(thing(index));
                }
                index + 1
            },
        ),
        Mode::Cleanup => Flux::generate_with_cleanup(
            || 1,
            move |index, sink: &mut GeneratorSink<String>| {
                if index > count {
                    sink.complete();
                } else {
                    sink.next(thing(index));
                }
                index + 1
            },
            |index: u32| tracing::info!(final_state = index, "generator cleaned up"),
        ),
    }
}

/// Prints each element and asks for the next one.
struct Printer {
    subscription: Option<Subscription>,
    outcome: Arc<Mutex<Option<Result<(), StreamError>>>>,
}

impl Printer {
    fn finish(&self, outcome: Result<(), StreamError>) {
        *self
            .outcome
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(outcome);
    }
}

impl Subscriber<String> for Printer {
    fn on_subscribe(&mut self, subscription: Subscription) {
        subscription.request(1);
        self.subscription = Some(subscription);
    }

    fn on_next(&mut self, item: String) {
        println!("{item}");
        if let Some(subscription) = &self.subscription {
            subscription.request(1);
        }
    }

    fn on_error(&mut self, error: StreamError) { self.finish(Err(error)); }

    fn on_complete(&mut self) { self.finish(Ok(())); }
}

fn main() -> ExitCode {
    // Enable structured logging for the demo. Applications embedding the
    // library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let flux = match source(cli.mode, cli.count).with_prefetch(cli.window) {
        Ok(flux) => flux,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = Arc::new(Mutex::new(None));
    let subscription = flux.subscribe(Printer {
        subscription: None,
        outcome: Arc::clone(&outcome),
    });
    let result = outcome
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .take();
    match result {
        Some(Ok(())) => ExitCode::SUCCESS,
        Some(Err(error)) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
        None => {
            eprintln!("stream did not terminate (state {:?})", subscription.state());
            ExitCode::FAILURE
        }
    }
}
