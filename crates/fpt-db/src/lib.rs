use anyhow::{Context, Result};
use fpt_schemas::{AccessLevel, FactoryId, ItemId, MachineId, ProcessId, Role, UserId};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

mod store;

pub use store::PgStore;

pub const ENV_DB_URL: &str = "FPT_DATABASE_URL";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Connect to Postgres using FPT_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    connect_from_env_var(ENV_DB_URL, DEFAULT_MAX_CONNECTIONS).await
}

/// Connect using the URL held by env var `var` (config stores the name, never the URL).
pub async fn connect_from_env_var(var: &str, max_connections: u32) -> Result<PgPool> {
    let url = std::env::var(var).with_context(|| format!("missing env var {var}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    info!("db migrations applied");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_production_logs_table: bool,
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'production_logs'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_production_logs_table: exists,
    })
}

/// SQLSTATE 23505.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Registry seeding
//
// Registry CRUD is not part of the engine; these inserts exist so tests and
// local setups can build a factory -> process -> machine tree.
// ---------------------------------------------------------------------------

pub async fn insert_factory(pool: &PgPool, name: &str) -> Result<FactoryId> {
    let (id,): (i64,) = sqlx::query_as("insert into factories (name) values ($1) returning id")
        .bind(name)
        .fetch_one(pool)
        .await
        .context("insert_factory failed")?;
    Ok(FactoryId(id))
}

pub async fn insert_process(pool: &PgPool, factory_id: FactoryId, name: &str) -> Result<ProcessId> {
    let (id,): (i64,) =
        sqlx::query_as("insert into processes (factory_id, name) values ($1, $2) returning id")
            .bind(factory_id.0)
            .bind(name)
            .fetch_one(pool)
            .await
            .context("insert_process failed")?;
    Ok(ProcessId(id))
}

pub async fn insert_item(pool: &PgPool, name: &str, ne: Option<f64>) -> Result<ItemId> {
    let (id,): (i64,) = sqlx::query_as("insert into items (name, ne) values ($1, $2) returning id")
        .bind(name)
        .bind(ne)
        .fetch_one(pool)
        .await
        .context("insert_item failed")?;
    Ok(ItemId(id))
}

#[derive(Debug, Clone)]
pub struct NewMachine {
    pub name: String,
    pub process_id: ProcessId,
    pub formula_type: i32,
    pub spindle_count: Option<i32>,
    pub current_item_id: Option<ItemId>,
    pub current_ne: Option<f64>,
}

pub async fn insert_machine(pool: &PgPool, m: &NewMachine) -> Result<MachineId> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        insert into machines (
          name, process_id, formula_type, spindle_count, current_item_id, current_ne
        ) values (
          $1, $2, $3, $4, $5, $6
        )
        returning id
        "#,
    )
    .bind(&m.name)
    .bind(m.process_id.0)
    .bind(m.formula_type)
    .bind(m.spindle_count)
    .bind(m.current_item_id.map(|i| i.0))
    .bind(m.current_ne)
    .fetch_one(pool)
    .await
    .context("insert_machine failed")?;
    Ok(MachineId(id))
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub role: Role,
    pub access_level: AccessLevel,
    pub process_id: Option<ProcessId>,
    pub is_active: bool,
}

pub async fn insert_user(pool: &PgPool, u: &NewUser) -> Result<UserId> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        insert into users (username, role, access_level, process_id, is_active)
        values ($1, $2, $3, $4, $5)
        returning id
        "#,
    )
    .bind(&u.username)
    .bind(u.role.as_str())
    .bind(u.access_level.as_str())
    .bind(u.process_id.map(|p| p.0))
    .bind(u.is_active)
    .fetch_one(pool)
    .await
    .context("insert_user failed")?;
    Ok(UserId(id))
}
