//! Streaming event decoding and folding.

pub mod accumulator;
pub mod frame;

pub use accumulator::{StreamAccumulator, StreamOutcome, UNEXPECTED_END, drain_outcome};
pub use frame::{StreamEvent, StreamFrameParser, parse_data_line};
