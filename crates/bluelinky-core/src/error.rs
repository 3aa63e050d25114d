// ── Core error types ──
//
// Errors surfaced by action nodes. None of these ever reach the host as a
// failure: the executor renders every one of them into an output message.
// The `From<bluelinky_api::Error>` impl translates client-layer errors
// into domain-appropriate variants.

use std::time::Duration;

use thiserror::Error;

/// Why a login future rejected.
///
/// Cloneable because one outcome is observed by every awaiter of the same
/// login future.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    /// A newer login attempt replaced this one before it settled.
    #[error("Aborted")]
    Aborted,

    /// The client reported an `error` event.
    #[error("Unable to connect/login: {0}")]
    ConnectionFailed(String),

    /// The client reported something that is neither `ready` nor `error`.
    #[error("Unknown client status: {0}")]
    UnknownClientEvent(String),

    /// The account was shut down while the login was pending.
    #[error("Account closed")]
    Closed,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    /// The action node has no account configuration attached.
    #[error("Bluelinky Config Is Not Set")]
    ConfigurationMissing,

    #[error("Invalid configuration for {field}: {reason}")]
    Config { field: String, reason: String },

    // ── Login errors ─────────────────────────────────────────────────
    #[error("Timed out after {timeout:?} waiting for login")]
    LoginTimeout { timeout: Duration },

    #[error("Login failed: {0}")]
    LoginRejected(#[from] LoginError),

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Timed out after {timeout:?} waiting for the vehicle service")]
    OperationTimeout { timeout: Duration },

    #[error("Vehicle not found: {vehicle_id}")]
    VehicleNotFound { vehicle_id: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` for either deadline variant.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::LoginTimeout { .. } | Self::OperationTimeout { .. }
        )
    }
}

// ── Conversion from client-layer errors ──────────────────────────────

impl From<bluelinky_api::Error> for CoreError {
    fn from(err: bluelinky_api::Error) -> Self {
        match err {
            bluelinky_api::Error::VehicleNotFound { vehicle_id } => {
                CoreError::VehicleNotFound { vehicle_id }
            }
            bluelinky_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            bluelinky_api::Error::SessionExpired | bluelinky_api::Error::NotLoggedIn => {
                CoreError::AuthenticationFailed {
                    message: err.to_string(),
                }
            }
            bluelinky_api::Error::Rejected { message } => CoreError::OperationFailed { message },
            other => CoreError::OperationFailed {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_configuration_renders_legacy_text() {
        assert_eq!(
            CoreError::ConfigurationMissing.to_string(),
            "Bluelinky Config Is Not Set"
        );
    }

    #[test]
    fn timeouts_report_the_deadline() {
        let err = CoreError::LoginTimeout {
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "Timed out after 5s waiting for login");
        assert!(err.is_timeout());
        assert!(!CoreError::ConfigurationMissing.is_timeout());
    }

    #[test]
    fn login_errors_wrap_into_rejection() {
        let err: CoreError = LoginError::Aborted.into();
        assert_eq!(err.to_string(), "Login failed: Aborted");
    }

    #[test]
    fn api_errors_map_to_domain_variants() {
        let not_found: CoreError = bluelinky_api::Error::VehicleNotFound {
            vehicle_id: "VIN1".into(),
        }
        .into();
        assert!(matches!(not_found, CoreError::VehicleNotFound { ref vehicle_id } if vehicle_id == "VIN1"));

        let expired: CoreError = bluelinky_api::Error::SessionExpired.into();
        assert!(matches!(expired, CoreError::AuthenticationFailed { .. }));

        let rejected: CoreError = bluelinky_api::Error::Rejected {
            message: "doors open".into(),
        }
        .into();
        assert_eq!(rejected.to_string(), "Operation failed: doors open");
    }
}
