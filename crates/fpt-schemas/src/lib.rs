use chrono::{DateTime, NaiveDate, Utc};
use fpt_output::{Formula, FormulaError};
use serde::{Deserialize, Serialize};
use std::fmt;

mod entry;
mod shift;

pub use entry::{parse_record_date, ShiftEntryPayload};
pub use shift::{InvalidShift, Shift};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(FactoryId);
id_type!(ProcessId);
id_type!(MachineId);
id_type!(ItemId);
id_type!(UserId);
id_type!(LogId);

// ---------------------------------------------------------------------------
// Registry (read-only inputs to the engine)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factory {
    pub id: FactoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: ProcessId,
    pub factory_id: FactoryId,
    pub name: String,
}

/// Catalog item. `ne` is the nominal yarn count copied onto machines at dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub ne: Option<f64>,
}

/// Machine configuration as held by the registry.
///
/// `formula_type` / `spindle_count` are the raw registry fields; use
/// [`Machine::formula`] to get the typed calculator input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: MachineId,
    pub name: String,
    pub process_id: ProcessId,
    pub formula_type: i32,
    pub spindle_count: Option<i32>,
    pub current_item_id: Option<ItemId>,
    #[serde(rename = "currentNE")]
    pub current_ne: Option<f64>,
    pub is_active: bool,
}

impl Machine {
    pub fn formula(&self) -> Result<Formula, FormulaError> {
        Formula::from_code(self.formula_type, self.spindle_count)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    Manager,
    Staff,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Manager => "MANAGER",
            AccessLevel::Staff => "STAFF",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MANAGER" => Some(AccessLevel::Manager),
            "STAFF" => Some(AccessLevel::Staff),
            _ => None,
        }
    }
}

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub access_level: AccessLevel,
    /// Process the user is assigned to, if any.
    pub process_id: Option<ProcessId>,
    pub is_active: bool,
}

impl Actor {
    /// ADMIN role or MANAGER access level.
    pub fn is_elevated(&self) -> bool {
        self.role == Role::Admin || self.access_level == AccessLevel::Manager
    }
}

// ---------------------------------------------------------------------------
// Production log
// ---------------------------------------------------------------------------

/// Natural key of a production log: one row per machine x date x shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogKey {
    pub machine_id: MachineId,
    pub record_date: NaiveDate,
    pub shift: Shift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionLog {
    pub id: LogId,
    pub machine_id: MachineId,
    pub record_date: NaiveDate,
    pub shift: Shift,
    pub item_id: ItemId,
    pub start_index: f64,
    /// `None` only for a stopped shift recorded without an end reading.
    pub end_index: Option<f64>,
    #[serde(rename = "inputNE")]
    pub input_ne: Option<f64>,
    pub final_output: f64,
    pub note: String,
    pub created_by_id: Option<UserId>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl ProductionLog {
    pub fn key(&self) -> LogKey {
        LogKey {
            machine_id: self.machine_id,
            record_date: self.record_date,
            shift: self.shift,
        }
    }

    /// Counter value the next shift starts from.
    ///
    /// A stopped shift without an end reading did not move the counter.
    pub fn continuity_end(&self) -> f64 {
        self.end_index.unwrap_or(self.start_index)
    }
}

/// Values written by the reconciliation writer (identity and timestamps are the store's).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductionLog {
    pub key: LogKey,
    pub item_id: ItemId,
    pub start_index: f64,
    pub end_index: Option<f64>,
    #[serde(rename = "inputNE")]
    pub input_ne: Option<f64>,
    pub final_output: f64,
    pub note: String,
    pub actor_id: Option<UserId>,
}

// ---------------------------------------------------------------------------
// Shift board
// ---------------------------------------------------------------------------

/// One machine on the per-process entry board for a (date, shift).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRow {
    pub machine: Machine,
    pub current_item: Option<Item>,
    /// Log already recorded for the board's (date, shift), if any.
    pub shift_log: Option<ProductionLog>,
}

impl BoardRow {
    pub fn is_entered(&self) -> bool {
        self.shift_log.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, level: AccessLevel) -> Actor {
        Actor {
            user_id: UserId(1),
            role,
            access_level: level,
            process_id: None,
            is_active: true,
        }
    }

    #[test]
    fn elevated_is_admin_or_manager() {
        assert!(actor(Role::Admin, AccessLevel::Staff).is_elevated());
        assert!(actor(Role::User, AccessLevel::Manager).is_elevated());
        assert!(!actor(Role::User, AccessLevel::Staff).is_elevated());
    }

    #[test]
    fn role_and_level_round_trip_through_strings() {
        for r in [Role::Admin, Role::User] {
            assert_eq!(Role::parse(r.as_str()), Some(r));
        }
        for l in [AccessLevel::Manager, AccessLevel::Staff] {
            assert_eq!(AccessLevel::parse(l.as_str()), Some(l));
        }
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn machine_json_uses_registry_field_names() {
        let m = Machine {
            id: MachineId(7),
            name: "RING-07".to_string(),
            process_id: ProcessId(2),
            formula_type: 3,
            spindle_count: Some(480),
            current_item_id: Some(ItemId(11)),
            current_ne: Some(30.0),
            is_active: true,
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["formulaType"], 3);
        assert_eq!(v["spindleCount"], 480);
        assert_eq!(v["currentNE"], 30.0);
        assert_eq!(v["currentItemId"], 11);
        assert_eq!(
            m.formula(),
            Ok(fpt_output::Formula::SpindleYield { spindles: 480 })
        );
    }

    #[test]
    fn stopped_log_without_end_continues_from_start() {
        let now = Utc::now();
        let log = ProductionLog {
            id: LogId(1),
            machine_id: MachineId(1),
            record_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            shift: Shift::Second,
            item_id: ItemId(1),
            start_index: 150.0,
            end_index: None,
            input_ne: None,
            final_output: 0.0,
            note: "stopped".to_string(),
            created_by_id: None,
            created_at_utc: now,
            updated_at_utc: now,
        };
        assert_eq!(log.continuity_end(), 150.0);
    }
}
