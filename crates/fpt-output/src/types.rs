use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed conversion factor used by spindle-based production (formula 3).
///
/// Treated as an opaque industry constant.
pub const SPINDLE_CONVERSION: f64 = 1.693;

/// Default sanity threshold (kg) above which an output needs confirmation.
pub const DEFAULT_IMPLAUSIBLE_THRESHOLD: f64 = 1000.0;

/// How a machine's shift output is derived from its readings.
///
/// The numeric registry codes (1..=4) only exist at the storage boundary;
/// everything past [`Formula::from_code`] matches on the variant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Formula {
    /// 1: the end reading IS the output (e.g. a scale reading in kg).
    DirectReading,
    /// 2: output is the counter delta.
    CounterDelta,
    /// 3: ring-spinning style, `(delta * spindles) / (ne * 1000 * 1.693)`.
    SpindleYield { spindles: u32 },
    /// 4: counter delta divided by yarn count.
    CounterPerNe,
}

impl Formula {
    /// Build a formula from the machine registry's `formula_type` code.
    pub fn from_code(code: i32, spindle_count: Option<i32>) -> Result<Self, FormulaError> {
        match code {
            1 => Ok(Formula::DirectReading),
            2 => Ok(Formula::CounterDelta),
            3 => match spindle_count {
                Some(n) if n > 0 => Ok(Formula::SpindleYield { spindles: n as u32 }),
                Some(n) => Err(FormulaError::InvalidSpindleCount(n)),
                None => Err(FormulaError::MissingSpindleCount),
            },
            4 => Ok(Formula::CounterPerNe),
            other => Err(FormulaError::UnknownCode(other)),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Formula::DirectReading => 1,
            Formula::CounterDelta => 2,
            Formula::SpindleYield { .. } => 3,
            Formula::CounterPerNe => 4,
        }
    }

    /// Formulas whose result depends on the yarn count.
    pub fn uses_ne(&self) -> bool {
        matches!(self, Formula::SpindleYield { .. } | Formula::CounterPerNe)
    }

    /// Formulas whose result depends on the start index.
    ///
    /// Direct readings ignore the start, so a missing baseline cannot produce
    /// a phantom delta for them.
    pub fn uses_start(&self) -> bool {
        !matches!(self, Formula::DirectReading)
    }
}

/// Machine configuration that cannot be turned into a [`Formula`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormulaError {
    UnknownCode(i32),
    MissingSpindleCount,
    InvalidSpindleCount(i32),
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::UnknownCode(c) => write!(f, "unknown formula type {c} (expected 1..=4)"),
            FormulaError::MissingSpindleCount => {
                write!(f, "formula type 3 requires a spindle count")
            }
            FormulaError::InvalidSpindleCount(n) => {
                write!(f, "formula type 3 requires a positive spindle count, got {n}")
            }
        }
    }
}

impl std::error::Error for FormulaError {}

/// One shift's readings as seen by the calculator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Counter value at shift start.
    pub start: f64,
    /// Counter value at shift end (for formula 1: the output itself).
    pub end: f64,
    /// Counter was reset or replaced during the shift; the start baseline is void.
    pub is_reset: bool,
    /// Machine produced nothing this shift.
    pub is_stopped: bool,
    /// Yarn count used for this reading. `None`, zero and non-finite are treated as 1.
    pub ne: Option<f64>,
}

impl Reading {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            is_reset: false,
            is_stopped: false,
            ne: None,
        }
    }

    pub fn with_ne(mut self, ne: f64) -> Self {
        self.ne = Some(ne);
        self
    }

    pub fn reset(mut self) -> Self {
        self.is_reset = true;
        self
    }

    pub fn stopped(mut self) -> Self {
        self.is_stopped = true;
        self
    }

    /// Counter delta for this shift (end alone after a reset).
    pub fn delta(&self) -> f64 {
        if self.is_reset {
            self.end
        } else {
            self.end - self.start
        }
    }
}

/// Classification of a computed output for the caller's validation layer.
///
/// The calculator never clamps; these flags tell the caller what to block or
/// confirm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputAssessment {
    /// Result below zero without a reset: the operator must re-check or mark a reset.
    pub negative: bool,
    /// Result above the sanity threshold: needs explicit confirmation.
    pub implausible: bool,
}

impl OutputAssessment {
    pub fn is_clean(&self) -> bool {
        !self.negative && !self.implausible
    }
}
