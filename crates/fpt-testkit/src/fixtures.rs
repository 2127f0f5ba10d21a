use chrono::NaiveDate;
use fpt_output::Formula;
use fpt_schemas::{
    AccessLevel, Actor, Item, ItemId, LogKey, Machine, MachineId, NewProductionLog, ProcessId,
    Role, Shift, ShiftEntryPayload, UserId,
};

pub const SPINNING: ProcessId = ProcessId(1);
pub const WINDING: ProcessId = ProcessId(2);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
}

pub fn item(id: i64, name: &str, ne: Option<f64>) -> Item {
    Item {
        id: ItemId(id),
        name: name.to_string(),
        ne,
    }
}

/// Active machine in `process` running `current_item` (if any).
pub fn machine(
    id: i64,
    name: &str,
    process: ProcessId,
    formula: Formula,
    current_item: Option<i64>,
    current_ne: Option<f64>,
) -> Machine {
    let spindle_count = match formula {
        Formula::SpindleYield { spindles } => Some(spindles as i32),
        _ => None,
    };
    Machine {
        id: MachineId(id),
        name: name.to_string(),
        process_id: process,
        formula_type: formula.code(),
        spindle_count,
        current_item_id: current_item.map(ItemId),
        current_ne,
        is_active: true,
    }
}

fn actor(id: i64, role: Role, access_level: AccessLevel, process: Option<ProcessId>) -> Actor {
    Actor {
        user_id: UserId(id),
        role,
        access_level,
        process_id: process,
        is_active: true,
    }
}

pub fn admin(id: i64) -> Actor {
    actor(id, Role::Admin, AccessLevel::Manager, None)
}

pub fn manager(id: i64, process: ProcessId) -> Actor {
    actor(id, Role::User, AccessLevel::Manager, Some(process))
}

pub fn staff(id: i64, process: ProcessId) -> Actor {
    actor(id, Role::User, AccessLevel::Staff, Some(process))
}

/// Payload for a normal (not reset, not stopped) reading.
pub fn payload(machine: i64, record_date: &str, shift: i64, end: f64) -> ShiftEntryPayload {
    ShiftEntryPayload {
        machine_id: Some(MachineId(machine)),
        record_date: Some(record_date.to_string()),
        shift: Some(shift),
        end_index: Some(end),
        ..Default::default()
    }
}

/// Historical log row for seeding a store.
pub fn history(
    machine: i64,
    record_date: NaiveDate,
    shift: Shift,
    item: i64,
    start: f64,
    end: Option<f64>,
) -> NewProductionLog {
    NewProductionLog {
        key: LogKey {
            machine_id: MachineId(machine),
            record_date,
            shift,
        },
        item_id: ItemId(item),
        start_index: start,
        end_index: end,
        input_ne: None,
        final_output: end.map(|e| e - start).unwrap_or(0.0),
        note: String::new(),
        actor_id: None,
    }
}
