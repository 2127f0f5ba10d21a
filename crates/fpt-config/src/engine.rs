use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_DB_URL_ENV: &str = "FPT_DATABASE_URL";

const DEFAULT_IMPLAUSIBLE_THRESHOLD: f64 = 1000.0;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// How an output above the implausible threshold is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LargeOutputPolicy {
    /// Saved; the assessment carries the warning.
    #[default]
    Advisory,
    /// Rejected unless the caller explicitly confirms.
    Confirm,
}

impl LargeOutputPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LargeOutputPolicy::Advisory => "advisory",
            LargeOutputPolicy::Confirm => "confirm",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Some(LargeOutputPolicy::Advisory),
            "confirm" => Some(LargeOutputPolicy::Confirm),
            _ => None,
        }
    }
}

/// Typed view of the keys listed in `CONSUMED_POINTERS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub implausible_threshold: f64,
    pub large_output_policy: LargeOutputPolicy,
    pub db_url_env: String,
    pub db_max_connections: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            implausible_threshold: DEFAULT_IMPLAUSIBLE_THRESHOLD,
            large_output_policy: LargeOutputPolicy::Advisory,
            db_url_env: DEFAULT_DB_URL_ENV.to_string(),
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl EngineConfig {
    /// Read from the merged config JSON. Absent keys take defaults; present
    /// keys with the wrong type or an out-of-range value are errors.
    pub fn from_config_json(v: &Value) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(raw) = v.pointer("/output/implausible_threshold") {
            let t = raw
                .as_f64()
                .ok_or_else(|| anyhow!("CONFIG_INVALID /output/implausible_threshold must be a number"))?;
            if !t.is_finite() || t <= 0.0 {
                return Err(anyhow!(
                    "CONFIG_INVALID /output/implausible_threshold must be > 0, got {t}"
                ));
            }
            cfg.implausible_threshold = t;
        }

        if let Some(raw) = v.pointer("/output/large_output_policy") {
            let s = raw
                .as_str()
                .ok_or_else(|| anyhow!("CONFIG_INVALID /output/large_output_policy must be a string"))?;
            cfg.large_output_policy = LargeOutputPolicy::parse(s).ok_or_else(|| {
                anyhow!("CONFIG_INVALID /output/large_output_policy unknown value: {s}")
            })?;
        }

        if let Some(raw) = v.pointer("/db/url_env") {
            let s = raw
                .as_str()
                .ok_or_else(|| anyhow!("CONFIG_INVALID /db/url_env must be a string"))?;
            if s.trim().is_empty() {
                return Err(anyhow!("CONFIG_INVALID /db/url_env must not be empty"));
            }
            cfg.db_url_env = s.trim().to_string();
        }

        if let Some(raw) = v.pointer("/db/max_connections") {
            let n = raw
                .as_u64()
                .filter(|n| *n >= 1 && *n <= u64::from(u32::MAX))
                .ok_or_else(|| anyhow!("CONFIG_INVALID /db/max_connections must be a positive integer"))?;
            cfg.db_max_connections = n as u32;
        }

        Ok(cfg)
    }
}
