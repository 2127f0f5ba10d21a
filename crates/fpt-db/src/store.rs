use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use fpt_reconcile::{ProductionStore, RegistryStore};
use fpt_schemas::{
    AccessLevel, Actor, Item, ItemId, LogId, LogKey, Machine, MachineId, NewProductionLog,
    ProcessId, ProductionLog, Role, Shift, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const LOG_COLUMNS: &str = "id, machine_id, record_date, shift, item_id, start_index, end_index, \
     input_ne, final_output, note, created_by_id, created_at_utc, updated_at_utc";

const MACHINE_COLUMNS: &str =
    "id, name, process_id, formula_type, spindle_count, current_item_id, current_ne, is_active";

/// Postgres-backed implementation of both store traits.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn machine_from_row(row: &PgRow) -> Result<Machine> {
    Ok(Machine {
        id: MachineId(row.try_get("id")?),
        name: row.try_get("name")?,
        process_id: ProcessId(row.try_get("process_id")?),
        formula_type: row.try_get("formula_type")?,
        spindle_count: row.try_get("spindle_count")?,
        current_item_id: row.try_get::<Option<i64>, _>("current_item_id")?.map(ItemId),
        current_ne: row.try_get("current_ne")?,
        is_active: row.try_get("is_active")?,
    })
}

fn log_from_row(row: &PgRow) -> Result<ProductionLog> {
    let shift_n: i16 = row.try_get("shift")?;
    let shift = Shift::try_from(i64::from(shift_n)).map_err(|e| anyhow!("bad shift in db: {e}"))?;

    Ok(ProductionLog {
        id: LogId(row.try_get("id")?),
        machine_id: MachineId(row.try_get("machine_id")?),
        record_date: row.try_get("record_date")?,
        shift,
        item_id: ItemId(row.try_get("item_id")?),
        start_index: row.try_get("start_index")?,
        end_index: row.try_get("end_index")?,
        input_ne: row.try_get("input_ne")?,
        final_output: row.try_get("final_output")?,
        note: row.try_get("note")?,
        created_by_id: row.try_get::<Option<i64>, _>("created_by_id")?.map(UserId),
        created_at_utc: row.try_get("created_at_utc")?,
        updated_at_utc: row.try_get("updated_at_utc")?,
    })
}

#[async_trait::async_trait]
impl ProductionStore for PgStore {
    async fn machine(&self, id: MachineId) -> Result<Option<Machine>> {
        let row = sqlx::query(&format!("select {MACHINE_COLUMNS} from machines where id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .context("load machine failed")?;
        row.as_ref().map(machine_from_row).transpose()
    }

    async fn prior_log(
        &self,
        machine_id: MachineId,
        date: NaiveDate,
        shift: Shift,
    ) -> Result<Option<ProductionLog>> {
        let row = sqlx::query(&format!(
            r#"
            select {LOG_COLUMNS}
            from production_logs
            where machine_id = $1
              and (record_date < $2 or (record_date = $2 and shift < $3))
            order by record_date desc, shift desc
            limit 1
            "#
        ))
        .bind(machine_id.0)
        .bind(date)
        .bind(shift.number())
        .fetch_optional(&self.pool)
        .await
        .context("prior_log query failed")?;
        row.as_ref().map(log_from_row).transpose()
    }

    async fn log_for_key(&self, key: &LogKey) -> Result<Option<ProductionLog>> {
        let row = sqlx::query(&format!(
            r#"
            select {LOG_COLUMNS}
            from production_logs
            where machine_id = $1 and record_date = $2 and shift = $3
            "#
        ))
        .bind(key.machine_id.0)
        .bind(key.record_date)
        .bind(key.shift.number())
        .fetch_optional(&self.pool)
        .await
        .context("log_for_key query failed")?;
        row.as_ref().map(log_from_row).transpose()
    }

    async fn insert_log(&self, new: &NewProductionLog) -> Result<ProductionLog> {
        // A concurrent writer may have created the key since our lookup; the
        // unique index turns that into an update of the same row.
        let row = sqlx::query(&format!(
            r#"
            insert into production_logs (
              machine_id, record_date, shift, item_id, start_index, end_index,
              input_ne, final_output, note, created_by_id
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            )
            on conflict (machine_id, record_date, shift) do update set
              item_id        = excluded.item_id,
              start_index    = excluded.start_index,
              end_index      = excluded.end_index,
              input_ne       = excluded.input_ne,
              final_output   = excluded.final_output,
              note           = excluded.note,
              updated_at_utc = now()
            returning {LOG_COLUMNS}
            "#
        ))
        .bind(new.key.machine_id.0)
        .bind(new.key.record_date)
        .bind(new.key.shift.number())
        .bind(new.item_id.0)
        .bind(new.start_index)
        .bind(new.end_index)
        .bind(new.input_ne)
        .bind(new.final_output)
        .bind(&new.note)
        .bind(new.actor_id.map(|u| u.0))
        .fetch_one(&self.pool)
        .await
        .context("insert_log failed")?;
        log_from_row(&row)
    }

    async fn update_log(&self, id: LogId, new: &NewProductionLog) -> Result<ProductionLog> {
        let row = sqlx::query(&format!(
            r#"
            update production_logs set
              item_id        = $2,
              start_index    = $3,
              end_index      = $4,
              input_ne       = $5,
              final_output   = $6,
              note           = $7,
              updated_at_utc = now()
            where id = $1
            returning {LOG_COLUMNS}
            "#
        ))
        .bind(id.0)
        .bind(new.item_id.0)
        .bind(new.start_index)
        .bind(new.end_index)
        .bind(new.input_ne)
        .bind(new.final_output)
        .bind(&new.note)
        .fetch_optional(&self.pool)
        .await
        .context("update_log failed")?;

        match row {
            Some(r) => log_from_row(&r),
            None => Err(anyhow!("update_log: production log {id} not found")),
        }
    }

    async fn set_machine_ne(&self, machine_id: MachineId, ne: f64) -> Result<()> {
        let res = sqlx::query("update machines set current_ne = $2 where id = $1")
            .bind(machine_id.0)
            .bind(ne)
            .execute(&self.pool)
            .await
            .context("set_machine_ne failed")?;
        if res.rows_affected() == 0 {
            return Err(anyhow!("set_machine_ne: machine {machine_id} not found"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RegistryStore for PgStore {
    async fn actor(&self, user_id: UserId) -> Result<Option<Actor>> {
        let row = sqlx::query(
            "select id, role, access_level, process_id, is_active from users where id = $1",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await
        .context("load user failed")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role: String = row.try_get("role")?;
        let level: String = row.try_get("access_level")?;
        Ok(Some(Actor {
            user_id: UserId(row.try_get("id")?),
            role: Role::parse(&role).ok_or_else(|| anyhow!("bad role in db: {role}"))?,
            access_level: AccessLevel::parse(&level)
                .ok_or_else(|| anyhow!("bad access_level in db: {level}"))?,
            process_id: row.try_get::<Option<i64>, _>("process_id")?.map(ProcessId),
            is_active: row.try_get("is_active")?,
        }))
    }

    async fn item(&self, id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query("select id, name, ne from items where id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .context("load item failed")?;

        row.map(|r| -> Result<Item> {
            Ok(Item {
                id: ItemId(r.try_get("id")?),
                name: r.try_get("name")?,
                ne: r.try_get("ne")?,
            })
        })
        .transpose()
    }

    async fn item_in_use(&self, id: ItemId) -> Result<bool> {
        let (used,): (bool,) = sqlx::query_as(
            "select exists (select 1 from production_logs where item_id = $1)",
        )
        .bind(id.0)
        .fetch_one(&self.pool)
        .await
        .context("item_in_use query failed")?;
        Ok(used)
    }

    async fn machines_running_item(&self, id: ItemId) -> Result<u64> {
        let (n,): (i64,) =
            sqlx::query_as("select count(*) from machines where current_item_id = $1")
                .bind(id.0)
                .fetch_one(&self.pool)
                .await
                .context("machines_running_item query failed")?;
        Ok(n as u64)
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        let res = sqlx::query("delete from items where id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .context("delete_item failed")?;
        Ok(res.rows_affected() > 0)
    }

    async fn assign_item(
        &self,
        machine_ids: &[MachineId],
        item_id: ItemId,
        ne: Option<f64>,
    ) -> Result<u64> {
        let ids: Vec<i64> = machine_ids.iter().map(|m| m.0).collect();
        let res = sqlx::query(
            "update machines set current_item_id = $1, current_ne = $2 where id = any($3)",
        )
        .bind(item_id.0)
        .bind(ne)
        .bind(&ids)
        .execute(&self.pool)
        .await
        .context("assign_item failed")?;
        Ok(res.rows_affected())
    }

    async fn active_machines(&self, process_id: ProcessId) -> Result<Vec<Machine>> {
        let rows = sqlx::query(&format!(
            r#"
            select {MACHINE_COLUMNS}
            from machines
            where process_id = $1 and is_active
            order by name asc, id asc
            "#
        ))
        .bind(process_id.0)
        .fetch_all(&self.pool)
        .await
        .context("active_machines query failed")?;
        rows.iter().map(machine_from_row).collect()
    }

    async fn logs_for_shift(
        &self,
        process_id: ProcessId,
        date: NaiveDate,
        shift: Shift,
    ) -> Result<Vec<ProductionLog>> {
        let cols = LOG_COLUMNS
            .split(", ")
            .map(|c| format!("l.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = sqlx::query(&format!(
            r#"
            select {cols}
            from production_logs l
            join machines m on m.id = l.machine_id
            where m.process_id = $1 and l.record_date = $2 and l.shift = $3
            "#
        ))
        .bind(process_id.0)
        .bind(date)
        .bind(shift.number())
        .fetch_all(&self.pool)
        .await
        .context("logs_for_shift query failed")?;
        rows.iter().map(log_from_row).collect()
    }
}
