use fpt_output::FormulaError;
use fpt_schemas::{ItemId, MachineId, UserId};

/// Every way a shift entry or registry operation can be refused.
///
/// Store failures arrive as `anyhow::Error` and are wrapped in `StorageFailure`;
/// the cause stays reachable through `source()`.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("machine {0} has no item assigned; dispatch an item before recording output")]
    MissingAssignment(MachineId),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("negative output {output} (start {start}, end {end}); check the readings or mark the entry as a counter reset")]
    NegativeOutput { output: f64, start: f64, end: f64 },

    #[error("output {output} exceeds the plausibility threshold {threshold}; confirmation required")]
    ImplausibleMagnitude { output: f64, threshold: f64 },

    #[error("user {user} is not allowed to {action}")]
    AuthorizationDenied { user: UserId, action: String },

    #[error("unknown machine {0}")]
    UnknownMachine(MachineId),

    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    #[error("item {0} is referenced by production logs and cannot be deleted")]
    ItemInUse(ItemId),

    #[error("item {item} is the current item of {machines} machine(s); dispatch another item first")]
    ItemAssigned { item: ItemId, machines: u64 },

    #[error("machine {machine} is misconfigured: {source}")]
    InvalidMachineConfig {
        machine: MachineId,
        #[source]
        source: FormulaError,
    },

    #[error("storage failure")]
    StorageFailure(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<anyhow::Error> for EntryError {
    fn from(err: anyhow::Error) -> Self {
        EntryError::StorageFailure(err.into())
    }
}

impl EntryError {
    /// Stable machine-readable code, printed by the CLI next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            EntryError::MissingAssignment(_) => "MISSING_ASSIGNMENT",
            EntryError::MissingField(_) => "MISSING_FIELD",
            EntryError::InvalidInput(_) => "INVALID_INPUT",
            EntryError::NegativeOutput { .. } => "NEGATIVE_OUTPUT",
            EntryError::ImplausibleMagnitude { .. } => "IMPLAUSIBLE_MAGNITUDE",
            EntryError::AuthorizationDenied { .. } => "AUTHORIZATION_DENIED",
            EntryError::UnknownMachine(_) => "UNKNOWN_MACHINE",
            EntryError::UnknownItem(_) => "UNKNOWN_ITEM",
            EntryError::ItemInUse(_) => "ITEM_IN_USE",
            EntryError::ItemAssigned { .. } => "ITEM_ASSIGNED",
            EntryError::InvalidMachineConfig { .. } => "INVALID_MACHINE_CONFIG",
            EntryError::StorageFailure(_) => "STORAGE_FAILURE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn storage_failure_keeps_cause_chain() {
        let err: EntryError = anyhow::anyhow!("connection refused").into();
        assert_eq!(err.code(), "STORAGE_FAILURE");
        assert_eq!(err.to_string(), "storage failure");
        let cause = err.source().expect("source present");
        assert!(cause.to_string().contains("connection refused"));
    }

    #[test]
    fn machine_config_error_names_machine_and_cause() {
        let err = EntryError::InvalidMachineConfig {
            machine: MachineId(4),
            source: FormulaError::MissingSpindleCount,
        };
        let msg = err.to_string();
        assert!(msg.contains("machine 4"), "got: {msg}");
        assert!(err.source().is_some());
    }
}
