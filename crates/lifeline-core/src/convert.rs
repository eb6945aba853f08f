// ── API-to-domain type conversions ──
//
// Bridges `lifeline_api` wire types and `lifeline_core::model` domain types.
// Backend strings are parsed leniently: unknown statuses and unparseable
// timestamps degrade to `Unknown` / `None` instead of failing the listing.

use chrono::{DateTime, NaiveDateTime, Utc};

use lifeline_api::{AlertLocation, AlertRecord};

use crate::model::{Alert, AlertStatus, Coordinate};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a backend timestamp. Older servers emit naive ISO-8601 in UTC.
fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_status(raw: &str) -> AlertStatus {
    raw.parse().unwrap_or(AlertStatus::Unknown)
}

// ── Location ───────────────────────────────────────────────────────

impl From<Coordinate> for AlertLocation {
    fn from(c: Coordinate) -> Self {
        Self {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

impl From<AlertLocation> for Coordinate {
    fn from(l: AlertLocation) -> Self {
        Self {
            latitude: l.latitude,
            longitude: l.longitude,
        }
    }
}

// ── Alert ──────────────────────────────────────────────────────────

impl From<AlertRecord> for Alert {
    fn from(r: AlertRecord) -> Self {
        let location: Option<Coordinate> = r.location.map(Into::into);
        let location_url = r
            .location_url
            .or_else(|| location.as_ref().map(Coordinate::maps_url));

        Self {
            id: r.alert_id,
            status: parse_status(&r.status),
            trigger_type: r.trigger_type,
            raised_at: parse_timestamp(r.timestamp.as_deref()),
            location,
            location_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use lifeline_api::TriggerType;

    use super::*;

    fn record(status: &str, timestamp: Option<&str>) -> AlertRecord {
        AlertRecord {
            alert_id: "SOS_1".into(),
            status: status.into(),
            trigger_type: Some(TriggerType::Auto),
            timestamp: timestamp.map(str::to_owned),
            location: Some(AlertLocation {
                latitude: 1.5,
                longitude: 2.5,
            }),
            location_url: None,
        }
    }

    #[test]
    fn naive_backend_timestamp_is_utc() {
        let alert = Alert::from(record("active", Some("2024-05-01T12:00:00.250")));
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().map(|t| {
            t + chrono::Duration::milliseconds(250)
        });
        assert_eq!(alert.raised_at, expected);
        assert_eq!(alert.status, AlertStatus::Active);
    }

    #[test]
    fn rfc3339_timestamp_with_offset() {
        let alert = Alert::from(record("triggered", Some("2024-05-01T17:30:00+05:30")));
        assert_eq!(
            alert.raised_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single()
        );
    }

    #[test]
    fn unknown_status_and_bad_timestamp_degrade() {
        let alert = Alert::from(record("escalated", Some("yesterday")));
        assert_eq!(alert.status, AlertStatus::Unknown);
        assert_eq!(alert.raised_at, None);
    }

    #[test]
    fn location_url_derived_when_missing() {
        let alert = Alert::from(record("DEACTIVATED", None));
        assert_eq!(alert.status, AlertStatus::Deactivated);
        assert_eq!(
            alert.location_url.as_deref(),
            Some("https://www.google.com/maps?q=1.5,2.5")
        );
    }
}
