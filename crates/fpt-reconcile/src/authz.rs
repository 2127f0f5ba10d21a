use fpt_schemas::{Actor, Machine};

use crate::EntryError;

/// May `actor` record output for `machine`?
///
/// Active users only; elevated users everywhere, others on machines of their
/// assigned process.
pub fn authorize(actor: &Actor, machine: &Machine) -> Result<(), EntryError> {
    let allowed = actor.is_active
        && (actor.is_elevated() || actor.process_id == Some(machine.process_id));
    if allowed {
        Ok(())
    } else {
        Err(EntryError::AuthorizationDenied {
            user: actor.user_id,
            action: format!("record output for machine {}", machine.id),
        })
    }
}

/// Registry mutations (dispatch, item delete) need an active elevated user.
pub fn require_elevated(actor: &Actor, action: &str) -> Result<(), EntryError> {
    if actor.is_active && actor.is_elevated() {
        Ok(())
    } else {
        Err(EntryError::AuthorizationDenied {
            user: actor.user_id,
            action: action.to_string(),
        })
    }
}
