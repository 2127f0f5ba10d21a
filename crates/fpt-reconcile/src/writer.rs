use fpt_schemas::{MachineId, NewProductionLog, ProductionLog};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{EntryError, ProductionStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub log: ProductionLog,
    /// False when an existing log for the key was updated in place.
    pub created: bool,
    /// The machine's cached NE now equals the log's `input_ne`.
    pub ne_propagated: bool,
    /// Why NE propagation failed, when it did. The log write stands regardless.
    pub ne_error: Option<String>,
}

/// Create or update the single log for `new.key`, then propagate its NE.
pub async fn upsert_log<S>(store: &S, new: &NewProductionLog) -> Result<WriteOutcome, EntryError>
where
    S: ProductionStore + ?Sized,
{
    let existing = store.log_for_key(&new.key).await?;

    let (log, created) = match existing {
        Some(prev) => {
            let log = store.update_log(prev.id, new).await?;
            (log, false)
        }
        None => {
            let log = store.insert_log(new).await?;
            (log, true)
        }
    };

    info!(
        log_id = %log.id,
        machine_id = %new.key.machine_id,
        date = %new.key.record_date,
        shift = %new.key.shift,
        final_output = log.final_output,
        created,
        "production log written"
    );

    let (ne_propagated, ne_error) = match new.input_ne {
        Some(ne) => match propagate_ne(store, new.key.machine_id, ne).await {
            Ok(()) => (true, None),
            Err(err) => {
                let cause = std::error::Error::source(&err)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| err.to_string());
                error!(
                    machine_id = %new.key.machine_id,
                    log_id = %log.id,
                    ne,
                    error = %cause,
                    "NE propagation failed; log kept, machine NE is stale"
                );
                (false, Some(cause))
            }
        },
        None => (false, None),
    };

    Ok(WriteOutcome {
        log,
        created,
        ne_propagated,
        ne_error,
    })
}

/// Write `ne` into the machine's cached `current_ne`.
pub async fn propagate_ne<S>(store: &S, machine_id: MachineId, ne: f64) -> Result<(), EntryError>
where
    S: ProductionStore + ?Sized,
{
    store.set_machine_ne(machine_id, ne).await?;
    Ok(())
}
