//! Statistics and counters

pub mod metrics;

pub use metrics::{CounterSnapshot, EncoderCounters, StatsSnapshot};
