//! fpt-output
//!
//! Production output calculator.
//!
//! Maps a machine's formula and one shift's counter readings to a produced
//! quantity (kg), rounded to 2 decimal places, and classifies the result
//! (negative delta, implausible magnitude) for the caller's validation layer.
//!
//! Deterministic, pure logic. No IO, no clock, no hidden state.

mod engine;
mod types;

pub use engine::{assess, compute_output, round2};
pub use types::*;
