//! Order-level pipeline: resolve, trace, calculate, persist.

pub mod generator;

pub use generator::{CommissionGenerator, GenerationError, GenerationOutcome};
