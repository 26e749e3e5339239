//! Command line interface for the `tributary` demo binary.
//!
//! Kept free of library types so the build script can render a man page from
//! it.

use clap::{Parser, ValueEnum};

/// Production style used to generate the demo elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Replay a fixed sequence.
    Sequence,
    /// Hand-written subscription logic.
    Logic,
    /// Push elements through a sink as demand arrives.
    Sink,
    /// Stateless generator counting through shared state.
    Generate,
    /// Generator threading a counter.
    State,
    /// Generator threading a counter, with cleanup.
    Cleanup,
}

/// Command line arguments for the `tributary` binary.
#[derive(Debug, Parser)]
#[command(
    name = "tributary",
    version,
    about = "Drain thing1..thingN through a backpressured stream"
)]
pub struct Cli {
    /// How the elements are produced.
    #[arg(short, long, value_enum, default_value_t = Mode::Sequence)]
    pub mode: Mode,
    /// Prefetch window between the producer and the printer.
    #[arg(short, long, default_value_t = 4)]
    pub window: u64,
    /// Number of elements to produce.
    #[arg(short, long, default_value_t = 9)]
    pub count: u32,
}
