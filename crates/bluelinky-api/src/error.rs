use thiserror::Error;

/// Top-level error type for the `bluelinky-api` crate.
///
/// Covers every failure mode a vehicle-service client can report:
/// authentication, vehicle lookup, remote command rejection, and transport.
/// `bluelinky-core` maps these into the messages action nodes emit.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, account locked, bad PIN, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The session token has expired and a fresh login is required.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// A call was made before the client finished logging in.
    #[error("Client is not logged in")]
    NotLoggedIn,

    // ── Vehicles ────────────────────────────────────────────────────
    /// No vehicle with the given identifier is registered to the account.
    #[error("Vehicle not found: {vehicle_id}")]
    VehicleNotFound { vehicle_id: String },

    /// The remote service accepted the request but refused to carry it out
    /// (vehicle asleep, doors open, charger unplugged, ...).
    #[error("Command rejected by vehicle service: {message}")]
    Rejected { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Network or protocol failure talking to the vehicle service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request timed out inside the client.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Platform ────────────────────────────────────────────────────
    /// Operation not supported for this brand or region.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::SessionExpired | Self::NotLoggedIn
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}
