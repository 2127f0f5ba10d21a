use chrono::NaiveDate;
use fpt_output::Formula;
use fpt_schemas::{MachineId, ProductionLog, Shift};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{EntryError, ProductionStore};

/// Where an entry's start index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartSource {
    /// End index of the chronological predecessor.
    Continuity,
    /// Operator-supplied (reset, or a machine with no history).
    Supplied,
    /// Zero, for inputs where the start cannot affect the output.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartIndex {
    pub value: f64,
    pub source: StartSource,
}

/// Chronological predecessor of (`date`, `shift`) within one machine's history.
pub fn select_prior(logs: &[ProductionLog], date: NaiveDate, shift: Shift) -> Option<&ProductionLog> {
    logs.iter()
        .filter(|l| l.record_date < date || (l.record_date == date && l.shift < shift))
        .max_by_key(|l| (l.record_date, l.shift))
}

/// Effective end index of the predecessor of (`date`, `shift`).
///
/// `None` means the machine has no earlier log. Never substitutes 0.
pub async fn resolve_prior_end<S>(
    store: &S,
    machine_id: MachineId,
    date: NaiveDate,
    shift: Shift,
) -> Result<Option<f64>, EntryError>
where
    S: ProductionStore + ?Sized,
{
    let prior = store.prior_log(machine_id, date, shift).await?;
    match &prior {
        Some(log) => debug!(
            machine_id = %machine_id,
            date = %date,
            shift = %shift,
            prior_date = %log.record_date,
            prior_shift = %log.shift,
            prior_end = log.continuity_end(),
            "continuity predecessor found"
        ),
        None => debug!(machine_id = %machine_id, date = %date, shift = %shift, "no prior log"),
    }
    Ok(prior.map(|l| l.continuity_end()))
}

/// Decide the start index for an entry.
///
/// Precedence:
/// 1. reset: the operator's value, else the predecessor's end, else 0
///    (the delta uses the end reading alone)
/// 2. history exists: the predecessor's end; a differing supplied value is ignored
/// 3. no history: the supplied value; without one, 0 only for direct readings,
///    otherwise `MissingField`
///
/// A stopped log without an end reading hands its start to the next shift, so a
/// stopped delta entry on a new machine never gets a defaulted start.
pub fn resolve_start(
    prior: Option<f64>,
    supplied: Option<f64>,
    is_reset: bool,
    formula: Formula,
    is_stopped: bool,
) -> Result<StartIndex, EntryError> {
    if is_reset {
        return match (supplied, prior) {
            (Some(v), _) => Ok(StartIndex { value: v, source: StartSource::Supplied }),
            (None, Some(v)) => Ok(StartIndex { value: v, source: StartSource::Continuity }),
            (None, None) if is_stopped && formula.uses_start() => {
                Err(EntryError::MissingField("startIndex"))
            }
            (None, None) => Ok(StartIndex { value: 0.0, source: StartSource::Default }),
        };
    }

    if let Some(prior_end) = prior {
        if let Some(s) = supplied {
            if s != prior_end {
                warn!(
                    supplied = s,
                    prior_end,
                    "supplied start index ignored; continuing from predecessor"
                );
            }
        }
        return Ok(StartIndex {
            value: prior_end,
            source: StartSource::Continuity,
        });
    }

    match supplied {
        Some(v) => Ok(StartIndex {
            value: v,
            source: StartSource::Supplied,
        }),
        None if !formula.uses_start() => Ok(StartIndex {
            value: 0.0,
            source: StartSource::Default,
        }),
        None => Err(EntryError::MissingField("startIndex")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fpt_schemas::{ItemId, LogId};

    fn log(id: i64, y: i32, m: u32, d: u32, shift: Shift, start: f64, end: Option<f64>) -> ProductionLog {
        let now = Utc::now();
        ProductionLog {
            id: LogId(id),
            machine_id: MachineId(1),
            record_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            shift,
            item_id: ItemId(1),
            start_index: start,
            end_index: end,
            input_ne: None,
            final_output: 0.0,
            note: String::new(),
            created_by_id: None,
            created_at_utc: now,
            updated_at_utc: now,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn predecessor_is_previous_shift_same_day_then_last_shift_of_earlier_days() {
        let history = vec![
            log(1, 2024, 1, 1, Shift::First, 0.0, Some(100.0)),
            log(2, 2024, 1, 1, Shift::Second, 100.0, Some(150.0)),
        ];

        let p = select_prior(&history, date(2024, 1, 1), Shift::Second).unwrap();
        assert_eq!(p.id, LogId(1));
        assert_eq!(p.continuity_end(), 100.0);

        let p = select_prior(&history, date(2024, 1, 2), Shift::First).unwrap();
        assert_eq!(p.id, LogId(2));
        assert_eq!(p.continuity_end(), 150.0);

        assert!(select_prior(&history, date(2024, 1, 1), Shift::First).is_none());
    }

    #[test]
    fn later_logs_are_never_predecessors() {
        let history = vec![log(1, 2024, 1, 5, Shift::First, 0.0, Some(10.0))];
        assert!(select_prior(&history, date(2024, 1, 4), Shift::Third).is_none());
    }

    #[test]
    fn history_overrides_supplied_start() {
        let s = resolve_start(Some(150.0), Some(120.0), false, Formula::CounterDelta, false).unwrap();
        assert_eq!(s, StartIndex { value: 150.0, source: StartSource::Continuity });
    }

    #[test]
    fn reset_prefers_supplied_then_prior_then_zero() {
        let f = Formula::CounterDelta;
        assert_eq!(resolve_start(Some(500.0), Some(3.0), true, f, false).unwrap().value, 3.0);
        assert_eq!(resolve_start(Some(500.0), None, true, f, false).unwrap().value, 500.0);
        let s = resolve_start(None, None, true, f, false).unwrap();
        assert_eq!(s, StartIndex { value: 0.0, source: StartSource::Default });
    }

    #[test]
    fn new_machine_without_start_is_rejected_for_delta_formulas() {
        for f in [
            Formula::CounterDelta,
            Formula::SpindleYield { spindles: 48 },
            Formula::CounterPerNe,
        ] {
            let err = resolve_start(None, None, false, f, false).unwrap_err();
            assert!(matches!(err, EntryError::MissingField("startIndex")), "{f:?}");
        }
    }

    #[test]
    fn new_machine_defaults_to_zero_only_for_direct_readings() {
        let s = resolve_start(None, None, false, Formula::DirectReading, false).unwrap();
        assert_eq!(s.source, StartSource::Default);
        let s = resolve_start(None, None, false, Formula::DirectReading, true).unwrap();
        assert_eq!(s.value, 0.0);
    }

    #[test]
    fn stopped_new_delta_machine_needs_a_start() {
        let err = resolve_start(None, None, false, Formula::CounterDelta, true).unwrap_err();
        assert!(matches!(err, EntryError::MissingField("startIndex")));
        let err = resolve_start(None, None, true, Formula::CounterPerNe, true).unwrap_err();
        assert!(matches!(err, EntryError::MissingField("startIndex")));

        let s = resolve_start(None, Some(50_000.0), false, Formula::CounterDelta, true).unwrap();
        assert_eq!(s, StartIndex { value: 50_000.0, source: StartSource::Supplied });
    }

    #[test]
    fn new_machine_uses_supplied_start() {
        let s = resolve_start(None, Some(77.0), false, Formula::CounterDelta, false).unwrap();
        assert_eq!(s, StartIndex { value: 77.0, source: StartSource::Supplied });
    }
}
