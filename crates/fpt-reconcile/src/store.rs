use anyhow::Result;
use chrono::NaiveDate;
use fpt_schemas::{
    Actor, Item, ItemId, LogId, LogKey, Machine, MachineId, NewProductionLog, ProcessId,
    ProductionLog, Shift, UserId,
};

/// Log storage plus the machine reads/writes the entry pipeline needs.
#[async_trait::async_trait]
pub trait ProductionStore: Send + Sync {
    async fn machine(&self, id: MachineId) -> Result<Option<Machine>>;

    /// Latest log of `machine_id` strictly before (`date`, `shift`):
    /// `record_date < date`, or `record_date = date AND shift < shift`,
    /// ordered by (record_date desc, shift desc).
    async fn prior_log(
        &self,
        machine_id: MachineId,
        date: NaiveDate,
        shift: Shift,
    ) -> Result<Option<ProductionLog>>;

    async fn log_for_key(&self, key: &LogKey) -> Result<Option<ProductionLog>>;

    /// Insert a new log. If a racing writer already created the key, the store
    /// overwrites that row instead of failing (last write wins).
    async fn insert_log(&self, new: &NewProductionLog) -> Result<ProductionLog>;

    /// Overwrite values of an existing log. Identity, `created_by_id` and
    /// `created_at_utc` are kept.
    async fn update_log(&self, id: LogId, new: &NewProductionLog) -> Result<ProductionLog>;

    async fn set_machine_ne(&self, machine_id: MachineId, ne: f64) -> Result<()>;
}

/// Registry reads and the registry mutations exposed to elevated users.
#[async_trait::async_trait]
pub trait RegistryStore: Send + Sync {
    async fn actor(&self, user_id: UserId) -> Result<Option<Actor>>;

    async fn item(&self, id: ItemId) -> Result<Option<Item>>;

    /// True when any production log references the item.
    async fn item_in_use(&self, id: ItemId) -> Result<bool>;

    /// Number of machines (active or not) whose current item is `id`.
    async fn machines_running_item(&self, id: ItemId) -> Result<u64>;

    /// Returns false when the item did not exist.
    async fn delete_item(&self, id: ItemId) -> Result<bool>;

    /// Set `current_item_id = item_id` and `current_ne = ne` on every listed
    /// machine. Returns how many machines were updated.
    async fn assign_item(
        &self,
        machine_ids: &[MachineId],
        item_id: ItemId,
        ne: Option<f64>,
    ) -> Result<u64>;

    /// Active machines of a process, ordered by name.
    async fn active_machines(&self, process_id: ProcessId) -> Result<Vec<Machine>>;

    /// Logs recorded for (`date`, `shift`) on machines of `process_id`.
    async fn logs_for_shift(
        &self,
        process_id: ProcessId,
        date: NaiveDate,
        shift: Shift,
    ) -> Result<Vec<ProductionLog>>;
}
