//! Streaming decode and accumulation.

pub mod accumulator;
pub mod decoder;
pub mod transcript;

pub use accumulator::{fold, CompletedResponse, ResponseAccumulator};
pub use decoder::{decode_stream, DeltaStream};
pub use transcript::Transcript;
