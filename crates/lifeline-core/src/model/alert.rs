// ── Stored alert domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use lifeline_api::TriggerType;

use super::coordinate::Coordinate;

/// Server-side status of a raised alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AlertStatus {
    Active,
    Triggered,
    Deactivated,
    Unknown,
}

/// An alert as recorded by the backend (lookup / history).
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: String,
    pub status: AlertStatus,
    pub trigger_type: Option<TriggerType>,
    pub raised_at: Option<DateTime<Utc>>,
    pub location: Option<Coordinate>,
    pub location_url: Option<String>,
}
