//! Scenario: output formulas behave exactly as the shift-entry form expects.
//!
//! # Invariants under test
//! - stopped overrides every other input (output = 0)
//! - reset voids the start baseline (delta = end)
//! - each formula's worked example
//! - the calculator never clamps a negative delta
//! - identical inputs always give identical output
//!
//! Pure in-process; no store required.

use fpt_output::{assess, compute_output, Formula, Reading, DEFAULT_IMPLAUSIBLE_THRESHOLD};

const ALL_FORMULAS: [Formula; 4] = [
    Formula::DirectReading,
    Formula::CounterDelta,
    Formula::SpindleYield { spindles: 480 },
    Formula::CounterPerNe,
];

// ---------------------------------------------------------------------------
// 1. Stopped overrides everything
// ---------------------------------------------------------------------------

#[test]
fn stopped_machine_produces_zero_for_every_formula() {
    let readings = [
        Reading::new(100.0, 150.0),
        Reading::new(500.0, 30.0).reset(),
        Reading::new(200.0, 100.0).with_ne(30.0),
        Reading::new(0.0, 9_999_999.0).with_ne(0.0),
    ];

    for formula in ALL_FORMULAS {
        for r in readings {
            let out = compute_output(formula, &r.stopped());
            assert_eq!(out, 0.0, "stopped must yield 0 for {formula:?} / {r:?}");
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Reset baseline
// ---------------------------------------------------------------------------

#[test]
fn reset_uses_end_as_delta() {
    let r = Reading::new(500.0, 30.0).reset();
    assert_eq!(compute_output(Formula::CounterDelta, &r), 30.0);
}

#[test]
fn reset_applies_to_ne_formulas_too() {
    let r = Reading::new(9_000.0, 400.0).reset().with_ne(20.0);
    assert_eq!(compute_output(Formula::CounterPerNe, &r), 20.0);
}

// ---------------------------------------------------------------------------
// 3. Worked examples
// ---------------------------------------------------------------------------

#[test]
fn direct_reading_passes_end_through() {
    for start in [0.0, 42.5, 1_000.0, -7.0] {
        let r = Reading::new(start, 42.5);
        assert_eq!(compute_output(Formula::DirectReading, &r), 42.5);
    }
}

#[test]
fn counter_delta_subtracts() {
    let r = Reading::new(100.0, 150.0);
    assert_eq!(compute_output(Formula::CounterDelta, &r), 50.0);
}

#[test]
fn counter_per_ne_divides_delta() {
    let r = Reading::new(100.0, 300.0).with_ne(20.0);
    assert_eq!(compute_output(Formula::CounterPerNe, &r), 10.0);
}

#[test]
fn spindle_yield_worked_example() {
    // (1_693_000 * 30) / (30 * 1000 * 1.693) = 1000
    let r = Reading::new(0.0, 1_693_000.0).with_ne(30.0);
    let out = compute_output(Formula::SpindleYield { spindles: 30 }, &r);
    assert_eq!(out, 1000.0);
}

#[test]
fn spindle_yield_rounds_to_two_decimals() {
    // (10_000 * 480) / (40 * 1000 * 1.693) = 70.8801...
    let r = Reading::new(50_000.0, 60_000.0).with_ne(40.0);
    let out = compute_output(Formula::SpindleYield { spindles: 480 }, &r);
    assert_eq!(out, 70.88);
}

// ---------------------------------------------------------------------------
// 4. Negative delta is detected, not clamped
// ---------------------------------------------------------------------------

#[test]
fn negative_delta_is_returned_unclamped_and_flagged() {
    let r = Reading::new(200.0, 100.0);
    let out = compute_output(Formula::CounterDelta, &r);
    assert_eq!(out, -100.0);

    let a = assess(out, &r, DEFAULT_IMPLAUSIBLE_THRESHOLD);
    assert!(a.negative);
    assert!(!a.implausible);
    assert!(!a.is_clean());
}

#[test]
fn implausible_magnitude_is_flagged_not_rejected() {
    let r = Reading::new(0.0, 5_000.0);
    let out = compute_output(Formula::CounterDelta, &r);
    assert_eq!(out, 5_000.0);
    assert!(assess(out, &r, DEFAULT_IMPLAUSIBLE_THRESHOLD).implausible);
}

// ---------------------------------------------------------------------------
// 5. Determinism
// ---------------------------------------------------------------------------

#[test]
fn identical_inputs_give_identical_outputs() {
    let r = Reading::new(12_345.6, 98_765.4).with_ne(32.0);
    for formula in ALL_FORMULAS {
        let first = compute_output(formula, &r);
        for _ in 0..100 {
            assert_eq!(compute_output(formula, &r).to_bits(), first.to_bits());
        }
    }
}

// ---------------------------------------------------------------------------
// 6. Registry codes
// ---------------------------------------------------------------------------

#[test]
fn registry_codes_map_to_variants() {
    assert_eq!(Formula::from_code(1, None), Ok(Formula::DirectReading));
    assert_eq!(Formula::from_code(2, Some(10)), Ok(Formula::CounterDelta));
    assert_eq!(
        Formula::from_code(3, Some(480)),
        Ok(Formula::SpindleYield { spindles: 480 })
    );
    assert_eq!(Formula::from_code(4, None), Ok(Formula::CounterPerNe));

    for f in ALL_FORMULAS {
        let spindles = match f {
            Formula::SpindleYield { spindles } => Some(spindles as i32),
            _ => None,
        };
        assert_eq!(Formula::from_code(f.code(), spindles), Ok(f));
    }
}

#[test]
fn spindle_formula_requires_spindle_count() {
    assert_eq!(
        Formula::from_code(3, None),
        Err(fpt_output::FormulaError::MissingSpindleCount)
    );
    assert_eq!(
        Formula::from_code(3, Some(0)),
        Err(fpt_output::FormulaError::InvalidSpindleCount(0))
    );
    assert_eq!(
        Formula::from_code(7, None),
        Err(fpt_output::FormulaError::UnknownCode(7))
    );
}

#[test]
fn formula_serializes_as_tagged_variant() {
    let json = serde_json::to_value(Formula::SpindleYield { spindles: 30 }).unwrap();
    assert_eq!(json["kind"], "spindle_yield");
    assert_eq!(json["spindles"], 30);
}
