use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use fpt_reconcile::{select_prior, ProductionStore, RegistryStore};
use fpt_schemas::{
    Actor, Item, ItemId, LogId, LogKey, Machine, MachineId, NewProductionLog, ProcessId,
    ProductionLog, Shift, UserId,
};

#[derive(Debug, Default)]
struct State {
    machines: BTreeMap<MachineId, Machine>,
    items: BTreeMap<ItemId, Item>,
    actors: BTreeMap<UserId, Actor>,
    logs: Vec<ProductionLog>,
    next_log_id: i64,
}

/// Both store traits over a mutex-guarded map.
///
/// Writes for the same key serialize on the mutex, so concurrent submissions
/// resolve last-write-wins like the Postgres store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_ne_updates: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory store mutex poisoned"))
    }

    pub fn with_machine(self, m: Machine) -> Self {
        if let Ok(mut st) = self.state.lock() {
            st.machines.insert(m.id, m);
        }
        self
    }

    pub fn with_item(self, item: Item) -> Self {
        if let Ok(mut st) = self.state.lock() {
            st.items.insert(item.id, item);
        }
        self
    }

    pub fn with_actor(self, actor: Actor) -> Self {
        if let Ok(mut st) = self.state.lock() {
            st.actors.insert(actor.user_id, actor);
        }
        self
    }

    /// Seed a historical log directly, bypassing the writer.
    pub fn with_log(self, new: NewProductionLog) -> Self {
        if let Ok(mut st) = self.state.lock() {
            insert_or_replace(&mut st, &new);
        }
        self
    }

    /// Make every `set_machine_ne` call fail until switched off again.
    pub fn fail_ne_updates(&self, fail: bool) {
        self.fail_ne_updates.store(fail, Ordering::SeqCst);
    }

    pub fn logs(&self) -> Vec<ProductionLog> {
        self.state.lock().map(|st| st.logs.clone()).unwrap_or_default()
    }

    pub fn machine_snapshot(&self, id: MachineId) -> Option<Machine> {
        self.state
            .lock()
            .ok()
            .and_then(|st| st.machines.get(&id).cloned())
    }
}

fn insert_or_replace(st: &mut State, new: &NewProductionLog) -> ProductionLog {
    let now = Utc::now();
    if let Some(existing) = st.logs.iter_mut().find(|l| l.key() == new.key) {
        apply(existing, new);
        existing.updated_at_utc = now;
        return existing.clone();
    }

    st.next_log_id += 1;
    let log = ProductionLog {
        id: LogId(st.next_log_id),
        machine_id: new.key.machine_id,
        record_date: new.key.record_date,
        shift: new.key.shift,
        item_id: new.item_id,
        start_index: new.start_index,
        end_index: new.end_index,
        input_ne: new.input_ne,
        final_output: new.final_output,
        note: new.note.clone(),
        created_by_id: new.actor_id,
        created_at_utc: now,
        updated_at_utc: now,
    };
    st.logs.push(log.clone());
    log
}

fn apply(log: &mut ProductionLog, new: &NewProductionLog) {
    log.item_id = new.item_id;
    log.start_index = new.start_index;
    log.end_index = new.end_index;
    log.input_ne = new.input_ne;
    log.final_output = new.final_output;
    log.note = new.note.clone();
}

#[async_trait::async_trait]
impl ProductionStore for MemoryStore {
    async fn machine(&self, id: MachineId) -> Result<Option<Machine>> {
        Ok(self.lock()?.machines.get(&id).cloned())
    }

    async fn prior_log(
        &self,
        machine_id: MachineId,
        date: NaiveDate,
        shift: Shift,
    ) -> Result<Option<ProductionLog>> {
        let st = self.lock()?;
        let history: Vec<ProductionLog> = st
            .logs
            .iter()
            .filter(|l| l.machine_id == machine_id)
            .cloned()
            .collect();
        Ok(select_prior(&history, date, shift).cloned())
    }

    async fn log_for_key(&self, key: &LogKey) -> Result<Option<ProductionLog>> {
        Ok(self.lock()?.logs.iter().find(|l| l.key() == *key).cloned())
    }

    async fn insert_log(&self, new: &NewProductionLog) -> Result<ProductionLog> {
        let mut st = self.lock()?;
        Ok(insert_or_replace(&mut st, new))
    }

    async fn update_log(&self, id: LogId, new: &NewProductionLog) -> Result<ProductionLog> {
        let mut st = self.lock()?;
        let log = st
            .logs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| anyhow!("update_log: production log {id} not found"))?;
        apply(log, new);
        log.updated_at_utc = Utc::now();
        Ok(log.clone())
    }

    async fn set_machine_ne(&self, machine_id: MachineId, ne: f64) -> Result<()> {
        if self.fail_ne_updates.load(Ordering::SeqCst) {
            return Err(anyhow!("injected failure: machine NE update"));
        }
        let mut st = self.lock()?;
        let m = st
            .machines
            .get_mut(&machine_id)
            .ok_or_else(|| anyhow!("set_machine_ne: machine {machine_id} not found"))?;
        m.current_ne = Some(ne);
        Ok(())
    }
}

#[async_trait::async_trait]
impl RegistryStore for MemoryStore {
    async fn actor(&self, user_id: UserId) -> Result<Option<Actor>> {
        Ok(self.lock()?.actors.get(&user_id).cloned())
    }

    async fn item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.lock()?.items.get(&id).cloned())
    }

    async fn item_in_use(&self, id: ItemId) -> Result<bool> {
        Ok(self.lock()?.logs.iter().any(|l| l.item_id == id))
    }

    async fn machines_running_item(&self, id: ItemId) -> Result<u64> {
        let st = self.lock()?;
        Ok(st
            .machines
            .values()
            .filter(|m| m.current_item_id == Some(id))
            .count() as u64)
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        let mut st = self.lock()?;
        // Same references the Postgres foreign keys protect.
        if st.logs.iter().any(|l| l.item_id == id) {
            return Err(anyhow!("item {id} is referenced by production logs"));
        }
        if st.machines.values().any(|m| m.current_item_id == Some(id)) {
            return Err(anyhow!("item {id} is the current item of a machine"));
        }
        Ok(st.items.remove(&id).is_some())
    }

    async fn assign_item(
        &self,
        machine_ids: &[MachineId],
        item_id: ItemId,
        ne: Option<f64>,
    ) -> Result<u64> {
        let mut st = self.lock()?;
        let mut updated = 0;
        for id in machine_ids {
            if let Some(m) = st.machines.get_mut(id) {
                m.current_item_id = Some(item_id);
                m.current_ne = ne;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn active_machines(&self, process_id: ProcessId) -> Result<Vec<Machine>> {
        let st = self.lock()?;
        let mut out: Vec<Machine> = st
            .machines
            .values()
            .filter(|m| m.process_id == process_id && m.is_active)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn logs_for_shift(
        &self,
        process_id: ProcessId,
        date: NaiveDate,
        shift: Shift,
    ) -> Result<Vec<ProductionLog>> {
        let st = self.lock()?;
        Ok(st
            .logs
            .iter()
            .filter(|l| l.record_date == date && l.shift == shift)
            .filter(|l| {
                st.machines
                    .get(&l.machine_id)
                    .map(|m| m.process_id == process_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}
