// lifeline-api: Async Rust client for the emergency-alert backend.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::AlertClient;
pub use error::Error;
pub use models::{
    AlertLocation, AlertPayload, AlertReceipt, AlertRecord, HealthStatus, TriggerType,
};
pub use transport::{TlsMode, TransportConfig};
