use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{ItemId, MachineId};

/// Shift-entry payload as submitted by an operator client.
///
/// Every field is optional on the wire so that validation can name exactly
/// which required field is missing instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftEntryPayload {
    pub machine_id: Option<MachineId>,
    /// ISO date (`YYYY-MM-DD`); see [`parse_record_date`].
    pub record_date: Option<String>,
    pub shift: Option<i64>,
    /// Item running at entry time; defaults to the machine's current item.
    pub item_id: Option<ItemId>,
    pub start_index: Option<f64>,
    pub end_index: Option<f64>,
    #[serde(rename = "inputNE")]
    pub input_ne: Option<f64>,
    #[serde(default)]
    pub is_reset: bool,
    #[serde(default)]
    pub is_stopped: bool,
    /// Operator free text, appended after the automatic markers.
    pub note: Option<String>,
}

/// Parse a record date without any timezone conversion.
///
/// Accepts `YYYY-MM-DD`. For full timestamps (`2024-01-01T23:30:00+07:00`,
/// `2024-01-01 08:00:00`) the literal date part is taken as-is: converting to
/// UTC first would move late-evening entries onto the previous or next day.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    let date_part = s.get(..10)?;
    match s.as_bytes().get(10) {
        Some(b'T') | Some(b't') | Some(b' ') => NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok(),
        _ => None,
    }
}
