// ── Client abstraction ──
//
// The vehicle service is consumed through two object-safe traits:
// `VehicleClient` (account level: login, vehicle lookup, lifecycle events)
// and `Vehicle` (per-car remote operations). Concrete backends live behind
// `Arc<dyn ...>` so every action node sharing an account shares one handle.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::auth::Credentials;
use crate::error::Error;
use crate::models::{FullStatusOptions, Location, Odometer, StatusOptions};

/// Lifecycle notification published by a client.
///
/// Clients announce login outcomes through events rather than through the
/// return value of [`VehicleClient::login`]; a client may also log itself in
/// (or re-login after a session expiry) without being asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Logged in and ready to accept vehicle calls.
    Ready,
    /// Login or session refresh failed.
    Error(String),
    /// Any other status the backend reports. Carried verbatim.
    Other(String),
}

impl ClientEvent {
    /// Short name of the event as the backend would emit it.
    pub fn name(&self) -> &str {
        match self {
            Self::Ready => "ready",
            Self::Error(_) => "error",
            Self::Other(name) => name,
        }
    }
}

/// Account-level handle on the vehicle service.
#[async_trait]
pub trait VehicleClient: Send + Sync {
    /// Subscribe to lifecycle events (`ready` / `error`).
    fn events(&self) -> broadcast::Receiver<ClientEvent>;

    /// Start a login. The outcome is published as a [`ClientEvent`]; the
    /// returned `Result` only reports failures to *start* the attempt.
    async fn login(&self) -> Result<(), Error>;

    /// Look up a vehicle registered to the account by VIN or vehicle id.
    async fn get_vehicle(&self, vehicle_id: &str) -> Result<Arc<dyn Vehicle>, Error>;
}

/// Remote operations on one vehicle.
#[async_trait]
pub trait Vehicle: Send + Sync {
    /// Identifier the vehicle was resolved by.
    fn vin(&self) -> &str;

    async fn status(&self, options: StatusOptions) -> Result<Value, Error>;
    async fn full_status(&self, options: FullStatusOptions) -> Result<Value, Error>;
    async fn odometer(&self) -> Result<Odometer, Error>;
    async fn location(&self) -> Result<Location, Error>;

    async fn lock(&self) -> Result<String, Error>;
    async fn unlock(&self) -> Result<String, Error>;
    /// Remote start. `options` is passed through to the service untouched
    /// (climate, defrost, duration, ... -- the shape is region specific).
    async fn start(&self, options: Value) -> Result<String, Error>;
    async fn stop(&self) -> Result<String, Error>;
    async fn start_charge(&self) -> Result<String, Error>;
    async fn stop_charge(&self) -> Result<String, Error>;
}

/// Builds a client handle from a credential set.
///
/// One connector call per account configuration; the returned handle is
/// shared by every node referencing that account.
pub trait Connector: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn VehicleClient>, Error>;
}
