use crate::{Formula, OutputAssessment, Reading, SPINDLE_CONVERSION};

/// Round to 2 decimal places (half away from zero).
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Yarn count with the division guard applied: missing, zero or non-finite => 1.
fn effective_ne(ne: Option<f64>) -> f64 {
    match ne {
        Some(v) if v.is_finite() && v != 0.0 => v,
        _ => 1.0,
    }
}

/// Compute a shift's output for `formula`.
///
/// - stopped => 0, regardless of the readings
/// - delta = end after a reset, end - start otherwise
/// - negative results are returned unclamped; see [`assess`]
pub fn compute_output(formula: Formula, r: &Reading) -> f64 {
    if r.is_stopped {
        return 0.0;
    }

    let delta = r.delta();

    let result = match formula {
        Formula::DirectReading => r.end,
        Formula::CounterDelta => delta,
        Formula::SpindleYield { spindles } => {
            let denominator = effective_ne(r.ne) * 1000.0 * SPINDLE_CONVERSION;
            (delta * f64::from(spindles)) / denominator
        }
        Formula::CounterPerNe => delta / effective_ne(r.ne),
    };

    round2(result)
}

/// Classify a computed output against the sanity threshold.
pub fn assess(output: f64, r: &Reading, implausible_threshold: f64) -> OutputAssessment {
    OutputAssessment {
        negative: output < 0.0 && !r.is_reset && !r.is_stopped,
        implausible: output > implausible_threshold,
    }
}
