//! Command handler modules for fpt-cli.
//!
//! Shared utilities used by multiple command paths live here.

pub mod calc;
pub mod entry;
pub mod registry;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use fpt_config::{report_unused_keys, EngineConfig, UnusedKeyPolicy};
use fpt_db::PgStore;
use fpt_reconcile::{EntryError, RegistryStore};
use fpt_schemas::{parse_record_date, Actor, Shift, UserId};
use tracing::warn;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Engine settings from `--config` layers, or built-in defaults.
pub fn load_engine_config(paths: &[String]) -> Result<EngineConfig> {
    if paths.is_empty() {
        return Ok(EngineConfig::default());
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = fpt_config::load_layered_yaml(&path_refs)?;

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "unused config key");
    }

    loaded.engine()
}

pub async fn connect_store(engine: &EngineConfig) -> Result<PgStore> {
    let pool = fpt_db::connect_from_env_var(&engine.db_url_env, engine.db_max_connections).await?;
    Ok(PgStore::new(pool))
}

pub async fn load_actor(store: &PgStore, user_id: i64) -> Result<Actor> {
    store
        .actor(UserId(user_id))
        .await?
        .ok_or_else(|| anyhow!("unknown user {user_id}"))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    parse_record_date(raw).ok_or_else(|| anyhow!("invalid date '{raw}' (expected YYYY-MM-DD)"))
}

pub fn parse_shift(n: i64) -> Result<Shift> {
    Shift::try_from(n).context("invalid --shift")
}

/// Attach the engine's stable error code so scripts can match on it.
pub fn rejected(err: EntryError) -> anyhow::Error {
    let code = err.code();
    anyhow::Error::new(err).context(format!("REJECTED code={code}"))
}

pub fn opt_num(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string())
}
