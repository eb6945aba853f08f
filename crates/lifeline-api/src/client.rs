// Async HTTP client for the alert backend.
//
// Base path: the configured server URL (e.g. `http://10.0.0.2:5000/api/`)
// Auth: `Authorization: Bearer <token>` default header (see transport.rs)

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    AlertPayload, AlertReceipt, AlertRecord, DeactivateRequest, HealthStatus, HistoryResponse,
};
use crate::transport::TransportConfig;

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the alert backend's `/sos` and `/health` endpoints.
///
/// Cheap to clone: `reqwest::Client` is reference-counted internally.
#[derive(Clone)]
pub struct AlertClient {
    http: reqwest::Client,
    base_url: Url,
    /// Client-wide timeout, when this side configured it.
    timeout: Option<Duration>,
}

impl AlertClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a server URL and transport config.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::from_reqwest(base_url, http)?;
        client.timeout = Some(transport.timeout);
        Ok(client)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            timeout: None,
        })
    }

    /// Ensure the base URL ends with `/` so relative joins append
    /// instead of replacing the last path segment.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Submit an emergency alert.
    pub async fn trigger(&self, payload: &AlertPayload) -> Result<AlertReceipt, Error> {
        self.post("sos/trigger", payload).await
    }

    /// Look up a single alert.
    ///
    /// Older servers wrap the record as `{ sos_id, data: {...} }`; the id is
    /// folded back into the record before decoding.
    pub async fn get_alert(&self, alert_id: &str) -> Result<AlertRecord, Error> {
        let path = format!("sos/{alert_id}");
        let mut body: serde_json::Value = self.get(&path).await?;

        let nested = body.get_mut("data").map(serde_json::Value::take);
        if let Some(serde_json::Value::Object(mut data)) = nested {
            if !data.contains_key("sos_id") && !data.contains_key("alertId") {
                data.insert("alertId".into(), alert_id.into());
            }
            body = serde_json::Value::Object(data);
        }

        serde_json::from_value(body.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_string(),
        })
    }

    /// Mark an alert as resolved.
    pub async fn deactivate(&self, alert_id: &str) -> Result<(), Error> {
        let _: serde_json::Value = self
            .post("sos/deactivate", &DeactivateRequest { sos_id: alert_id })
            .await?;
        Ok(())
    }

    /// Alerts raised by the authenticated user, newest first.
    pub async fn history(&self) -> Result<Vec<AlertRecord>, Error> {
        let resp: HistoryResponse = self.get("sos/history").await?;
        Ok(resp.history)
    }

    /// Backend liveness check.
    pub async fn health(&self) -> Result<HealthStatus, Error> {
        self.get("health").await
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.handle_response(resp).await
    }

    /// Report a client timeout with the budget that expired.
    fn transport_error(&self, err: reqwest::Error) -> Error {
        match self.timeout {
            Some(timeout) if err.is_timeout() => Error::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            _ => Error::Transport(err),
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.map_err(|e| self.transport_error(e))?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: StatusCode, resp: reqwest::Response) -> Error {
        let retry_after_secs = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|err| err.error.or(err.message))
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        debug!(status = status.as_u16(), %message, "request failed");

        match status {
            StatusCode::UNAUTHORIZED => Error::Authentication { message },
            StatusCode::TOO_MANY_REQUESTS => Error::RateLimited {
                retry_after_secs: retry_after_secs.unwrap_or(1),
            },
            s if s.is_server_error() => Error::Server {
                status: s.as_u16(),
                message,
            },
            s => Error::Rejected {
                status: s.as_u16(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client =
            AlertClient::from_reqwest("http://10.0.0.2:5000/api", reqwest::Client::new())
                .expect("valid url");
        assert_eq!(client.base_url().as_str(), "http://10.0.0.2:5000/api/");
        assert_eq!(
            client.url("sos/trigger").expect("joinable").as_str(),
            "http://10.0.0.2:5000/api/sos/trigger"
        );
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let result = AlertClient::from_reqwest("not a url", reqwest::Client::new());
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
