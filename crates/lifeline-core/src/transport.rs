// ── Alert submission ──
//
// `AlertTransport` is the seam the controller dispatches through.
// `AlertService` is the HTTP implementation; it also carries the read and
// housekeeping endpoints the CLI needs.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use lifeline_api::{AlertClient, AlertPayload, AlertReceipt, HealthStatus};

use crate::config::ServiceConfig;
use crate::error::CoreError;
use crate::model::Alert;

/// Delivers an alert payload to the backend.
///
/// Implementations classify failures through [`CoreError`]; the controller
/// retries only when [`CoreError::is_retryable`] holds.
pub trait AlertTransport: Send + Sync + 'static {
    fn submit(
        &self,
        payload: &AlertPayload,
    ) -> impl Future<Output = Result<AlertReceipt, CoreError>> + Send;
}

impl<T: AlertTransport> AlertTransport for Arc<T> {
    fn submit(
        &self,
        payload: &AlertPayload,
    ) -> impl Future<Output = Result<AlertReceipt, CoreError>> + Send {
        (**self).submit(payload)
    }
}

/// HTTP-backed alert service.
#[derive(Clone)]
pub struct AlertService {
    client: AlertClient,
}

impl AlertService {
    pub fn new(config: &ServiceConfig) -> Result<Self, CoreError> {
        let client = AlertClient::new(config.url.as_str(), &config.transport())?;
        Ok(Self { client })
    }

    pub fn from_client(client: AlertClient) -> Self {
        Self { client }
    }

    pub fn base_url(&self) -> &Url {
        self.client.base_url()
    }

    /// Alerts raised by the authenticated user, newest first.
    pub async fn history(&self) -> Result<Vec<Alert>, CoreError> {
        let records = self.client.history().await?;
        debug!(count = records.len(), "fetched alert history");
        Ok(records.into_iter().map(Alert::from).collect())
    }

    pub async fn alert(&self, id: &str) -> Result<Alert, CoreError> {
        self.client
            .get_alert(id)
            .await
            .map(Alert::from)
            .map_err(|e| not_found_or(e, id))
    }

    pub async fn deactivate(&self, id: &str) -> Result<(), CoreError> {
        self.client
            .deactivate(id)
            .await
            .map_err(|e| not_found_or(e, id))
    }

    pub async fn health(&self) -> Result<HealthStatus, CoreError> {
        Ok(self.client.health().await?)
    }
}

impl AlertTransport for AlertService {
    async fn submit(&self, payload: &AlertPayload) -> Result<AlertReceipt, CoreError> {
        debug!(session = %payload.session_id, "submitting alert");
        Ok(self.client.trigger(payload).await?)
    }
}

fn not_found_or(err: lifeline_api::Error, id: &str) -> CoreError {
    if err.is_not_found() {
        CoreError::AlertNotFound {
            identifier: id.to_owned(),
        }
    } else {
        err.into()
    }
}
