use std::collections::BTreeMap;

use chrono::NaiveDate;
use fpt_schemas::{Actor, BoardRow, Item, ItemId, MachineId, ProcessId, Shift};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{require_elevated, EntryError, RegistryStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub item: Item,
    pub requested: usize,
    /// Machines actually updated; ids that match no machine are skipped.
    pub updated: u64,
}

/// Put `item_id` on every machine in `machine_ids` and reset their cached NE
/// to the item's nominal NE.
pub async fn dispatch_item<S>(
    store: &S,
    actor: &Actor,
    machine_ids: &[MachineId],
    item_id: ItemId,
) -> Result<DispatchOutcome, EntryError>
where
    S: RegistryStore + ?Sized,
{
    require_elevated(actor, "dispatch items to machines")?;
    if machine_ids.is_empty() {
        return Err(EntryError::MissingField("machineIds"));
    }

    let item = store
        .item(item_id)
        .await?
        .ok_or(EntryError::UnknownItem(item_id))?;

    let mut ids = machine_ids.to_vec();
    ids.sort();
    ids.dedup();

    let updated = store.assign_item(&ids, item.id, item.ne).await?;
    if updated < ids.len() as u64 {
        warn!(
            item_id = %item.id,
            requested = ids.len(),
            updated,
            "dispatch skipped unknown machines"
        );
    }
    info!(
        user_id = %actor.user_id,
        item_id = %item.id,
        ne = ?item.ne,
        updated,
        "item dispatched"
    );

    Ok(DispatchOutcome {
        item,
        requested: ids.len(),
        updated,
    })
}

/// Delete a catalog item that no production log references.
pub async fn delete_item<S>(store: &S, actor: &Actor, item_id: ItemId) -> Result<(), EntryError>
where
    S: RegistryStore + ?Sized,
{
    require_elevated(actor, "delete items")?;

    if store.item(item_id).await?.is_none() {
        return Err(EntryError::UnknownItem(item_id));
    }
    if store.item_in_use(item_id).await? {
        return Err(EntryError::ItemInUse(item_id));
    }
    let machines = store.machines_running_item(item_id).await?;
    if machines > 0 {
        return Err(EntryError::ItemAssigned { item: item_id, machines });
    }
    if !store.delete_item(item_id).await? {
        // Deleted concurrently between the lookup and the delete.
        return Err(EntryError::UnknownItem(item_id));
    }

    info!(user_id = %actor.user_id, item_id = %item_id, "item deleted");
    Ok(())
}

/// Active machines of a process with their entry status for (`date`, `shift`).
pub async fn shift_board<S>(
    store: &S,
    process_id: ProcessId,
    date: NaiveDate,
    shift: Shift,
) -> Result<Vec<BoardRow>, EntryError>
where
    S: RegistryStore + ?Sized,
{
    let machines = store.active_machines(process_id).await?;

    let mut logs: BTreeMap<MachineId, _> = store
        .logs_for_shift(process_id, date, shift)
        .await?
        .into_iter()
        .map(|l| (l.machine_id, l))
        .collect();

    let mut items: BTreeMap<ItemId, Option<Item>> = BTreeMap::new();
    let mut rows = Vec::with_capacity(machines.len());
    for machine in machines {
        let current_item = match machine.current_item_id {
            Some(id) => {
                if !items.contains_key(&id) {
                    items.insert(id, store.item(id).await?);
                }
                items.get(&id).cloned().flatten()
            }
            None => None,
        };
        let shift_log = logs.remove(&machine.id);
        rows.push(BoardRow {
            machine,
            current_item,
            shift_log,
        });
    }
    Ok(rows)
}
