use fpt_config::{EngineConfig, LargeOutputPolicy};
use fpt_output::{
    assess, compute_output, Formula, OutputAssessment, Reading, DEFAULT_IMPLAUSIBLE_THRESHOLD,
};
use fpt_schemas::{
    parse_record_date, Actor, ItemId, LogKey, Machine, MachineId, NewProductionLog, ProductionLog,
    Shift, ShiftEntryPayload,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::continuity::{resolve_prior_end, resolve_start, StartIndex};
use crate::{authorize, upsert_log, EntryError, ProductionStore, RegistryStore};

pub const NOTE_STOPPED: &str = "stopped";
pub const NOTE_RESET: &str = "reset";

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Validation policy for computed outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryPolicy {
    pub implausible_threshold: f64,
    pub large_output: LargeOutputPolicy,
}

impl Default for EntryPolicy {
    fn default() -> Self {
        Self {
            implausible_threshold: DEFAULT_IMPLAUSIBLE_THRESHOLD,
            large_output: LargeOutputPolicy::Advisory,
        }
    }
}

impl From<&EngineConfig> for EntryPolicy {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            implausible_threshold: cfg.implausible_threshold,
            large_output: cfg.large_output_policy,
        }
    }
}

impl EntryPolicy {
    /// Same threshold, but implausible outputs always need confirmation.
    /// Used by interactive clients.
    pub fn interactive(self) -> Self {
        Self {
            large_output: LargeOutputPolicy::Confirm,
            ..self
        }
    }
}

/// Explicit operator confirmations attached to a submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confirmation {
    pub large_output: bool,
}

impl Confirmation {
    pub fn large_output_confirmed() -> Self {
        Self { large_output: true }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A payload that passed field validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftEntry {
    pub key: LogKey,
    pub item_id: Option<ItemId>,
    pub start_index: Option<f64>,
    /// Absent only for stopped entries.
    pub end_index: Option<f64>,
    pub input_ne: Option<f64>,
    pub is_reset: bool,
    pub is_stopped: bool,
    pub note: Option<String>,
}

pub fn validate(p: &ShiftEntryPayload) -> Result<ShiftEntry, EntryError> {
    let machine_id = p.machine_id.ok_or(EntryError::MissingField("machineId"))?;

    let raw_date = p
        .record_date
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(EntryError::MissingField("recordDate"))?;
    let record_date = parse_record_date(raw_date).ok_or_else(|| {
        EntryError::InvalidInput(format!(
            "recordDate '{raw_date}' is not a date (expected YYYY-MM-DD)"
        ))
    })?;

    let shift_n = p.shift.ok_or(EntryError::MissingField("shift"))?;
    let shift = Shift::try_from(shift_n).map_err(|e| EntryError::InvalidInput(e.to_string()))?;

    let start_index = finite("startIndex", p.start_index)?;
    let end_index = finite("endIndex", p.end_index)?;
    let input_ne = finite("inputNE", p.input_ne)?;

    if end_index.is_none() && !p.is_stopped {
        return Err(EntryError::MissingField("endIndex"));
    }
    if let Some(ne) = input_ne {
        if ne <= 0.0 {
            return Err(EntryError::InvalidInput(format!(
                "inputNE must be greater than 0, got {ne}"
            )));
        }
    }

    let note = p
        .note
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(ShiftEntry {
        key: LogKey {
            machine_id,
            record_date,
            shift,
        },
        item_id: p.item_id,
        start_index,
        end_index,
        input_ne,
        is_reset: p.is_reset,
        is_stopped: p.is_stopped,
        note,
    })
}

fn finite(field: &'static str, v: Option<f64>) -> Result<Option<f64>, EntryError> {
    match v {
        Some(x) if !x.is_finite() => Err(EntryError::InvalidInput(format!(
            "{field} must be a finite number"
        ))),
        other => Ok(other),
    }
}

/// Automatic marker (stopped wins over reset) followed by operator text.
pub fn build_note(is_stopped: bool, is_reset: bool, operator: Option<&str>) -> String {
    let marker = if is_stopped {
        Some(NOTE_STOPPED)
    } else if is_reset {
        Some(NOTE_RESET)
    } else {
        None
    };
    match (marker, operator) {
        (Some(m), Some(text)) => format!("{m}; {text}"),
        (Some(m), None) => m.to_string(),
        (None, Some(text)) => text.to_string(),
        (None, None) => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// What a submission would write, computed without writing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPreview {
    pub key: LogKey,
    pub item_id: ItemId,
    pub formula: Formula,
    pub start: StartIndex,
    pub end_index: Option<f64>,
    pub effective_ne: Option<f64>,
    pub output: f64,
    pub assessment: OutputAssessment,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub log: ProductionLog,
    pub created: bool,
    pub output: f64,
    pub assessment: OutputAssessment,
    pub start: StartIndex,
    pub ne_propagated: bool,
    pub ne_error: Option<String>,
}

/// Run the entry pipeline up to (not including) the write.
///
/// Anomalies are reported in the preview's assessment, never raised, so a
/// client can show them before the operator submits.
pub async fn preview_entry<S>(
    store: &S,
    policy: &EntryPolicy,
    payload: &ShiftEntryPayload,
) -> Result<EntryPreview, EntryError>
where
    S: ProductionStore + RegistryStore + ?Sized,
{
    let entry = validate(payload)?;
    let machine = load_machine(store, entry.key.machine_id).await?;
    compute(store, &entry, &machine, policy.implausible_threshold).await
}

/// Validate, authorize, compute and persist one shift entry.
pub async fn submit_entry<S>(
    store: &S,
    policy: &EntryPolicy,
    actor: &Actor,
    payload: &ShiftEntryPayload,
    confirmation: Confirmation,
) -> Result<SubmitOutcome, EntryError>
where
    S: ProductionStore + RegistryStore + ?Sized,
{
    let entry = validate(payload)?;
    let machine = load_machine(store, entry.key.machine_id).await?;
    authorize(actor, &machine)?;

    let preview = compute(store, &entry, &machine, policy.implausible_threshold).await?;

    if preview.assessment.negative {
        warn!(
            machine_id = %machine.id,
            output = preview.output,
            start = preview.start.value,
            end = ?preview.end_index,
            "negative output rejected"
        );
        return Err(EntryError::NegativeOutput {
            output: preview.output,
            start: preview.start.value,
            end: preview.end_index.unwrap_or(preview.start.value),
        });
    }

    if preview.assessment.implausible {
        let gated = policy.large_output == LargeOutputPolicy::Confirm;
        if gated && !confirmation.large_output {
            return Err(EntryError::ImplausibleMagnitude {
                output: preview.output,
                threshold: policy.implausible_threshold,
            });
        }
        warn!(
            machine_id = %machine.id,
            output = preview.output,
            threshold = policy.implausible_threshold,
            confirmed = confirmation.large_output,
            "implausible output accepted"
        );
    }

    let new = NewProductionLog {
        key: preview.key,
        item_id: preview.item_id,
        start_index: preview.start.value,
        end_index: preview.end_index,
        input_ne: preview.effective_ne,
        final_output: preview.output,
        note: preview.note.clone(),
        actor_id: Some(actor.user_id),
    };
    let written = upsert_log(store, &new).await?;

    info!(
        user_id = %actor.user_id,
        log_id = %written.log.id,
        output = preview.output,
        "shift entry submitted"
    );

    Ok(SubmitOutcome {
        log: written.log,
        created: written.created,
        output: preview.output,
        assessment: preview.assessment,
        start: preview.start,
        ne_propagated: written.ne_propagated,
        ne_error: written.ne_error,
    })
}

async fn load_machine<S>(store: &S, id: MachineId) -> Result<Machine, EntryError>
where
    S: ProductionStore + ?Sized,
{
    store
        .machine(id)
        .await?
        .ok_or(EntryError::UnknownMachine(id))
}

async fn compute<S>(
    store: &S,
    entry: &ShiftEntry,
    machine: &Machine,
    threshold: f64,
) -> Result<EntryPreview, EntryError>
where
    S: ProductionStore + RegistryStore + ?Sized,
{
    let current_item = machine
        .current_item_id
        .ok_or(EntryError::MissingAssignment(machine.id))?;

    let item_id = match entry.item_id {
        Some(id) if id != current_item => {
            RegistryStore::item(store, id)
                .await?
                .ok_or(EntryError::UnknownItem(id))?;
            id
        }
        _ => current_item,
    };

    let formula = machine
        .formula()
        .map_err(|source| EntryError::InvalidMachineConfig {
            machine: machine.id,
            source,
        })?;

    let effective_ne = entry
        .input_ne
        .or(machine.current_ne.filter(|ne| ne.is_finite() && *ne > 0.0));
    if formula.uses_ne() && effective_ne.is_none() && !entry.is_stopped {
        return Err(EntryError::MissingField("inputNE"));
    }

    let prior = resolve_prior_end(store, machine.id, entry.key.record_date, entry.key.shift).await?;
    let start = resolve_start(
        prior,
        entry.start_index,
        entry.is_reset,
        formula,
        entry.is_stopped,
    )?;

    let reading = Reading {
        start: start.value,
        end: entry.end_index.unwrap_or(start.value),
        is_reset: entry.is_reset,
        is_stopped: entry.is_stopped,
        ne: effective_ne,
    };
    let output = compute_output(formula, &reading);
    let assessment = assess(output, &reading, threshold);

    Ok(EntryPreview {
        key: entry.key,
        item_id,
        formula,
        start,
        end_index: entry.end_index,
        effective_ne,
        output,
        assessment,
        note: build_note(entry.is_stopped, entry.is_reset, entry.note.as_deref()),
    })
}
