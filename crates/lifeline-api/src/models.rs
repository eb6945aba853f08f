// Wire types for the alert backend.
//
// The trigger payload is camelCase. The backend that grew up alongside the
// mobile app answers in snake_case (`sos_id`, `location_url`), so response
// types accept both spellings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What raised the alert: a user hold, or on-device danger detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    #[default]
    Manual,
    Auto,
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Body of `POST /sos/trigger`.
///
/// `session_id` is stable across retries of the same session, so a backend
/// can collapse duplicate submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub session_id: String,
    pub location: Option<AlertLocation>,
    pub trigger_type: TriggerType,
    pub timestamp: DateTime<Utc>,
}

/// Successful response to a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertReceipt {
    #[serde(alias = "sos_id")]
    pub alert_id: String,
    #[serde(default, alias = "notified_contacts")]
    pub notified_contacts: u32,
    #[serde(default, alias = "location_url", skip_serializing_if = "Option::is_none")]
    pub location_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A stored alert as returned by the lookup and history endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    #[serde(alias = "sos_id")]
    pub alert_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, alias = "trigger_type")]
    pub trigger_type: Option<TriggerType>,
    /// Backend-formatted; not always RFC 3339 (older servers omit the offset).
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub location: Option<AlertLocation>,
    #[serde(default, alias = "location_url")]
    pub location_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<AlertRecord>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeactivateRequest<'a> {
    pub sos_id: &'a str,
}

/// `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}
