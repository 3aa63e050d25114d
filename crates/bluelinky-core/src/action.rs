// ── Action node set ──
//
// One `ActionKind` per supported operation. A kind knows its host type
// name, its default display name, which query flags it honours, and the
// single client call it makes. Everything else (login wait, deadlines,
// output shaping, gating) is shared and lives in the executor and node.

use bluelinky_api::{FullStatusOptions, StatusOptions};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::debug;

use crate::error::CoreError;
use crate::login::LoginCoordinator;

/// Host type name of the account configuration node.
pub const ACCOUNT_NODE_TYPE: &str = "bluelinky";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum ActionKind {
    #[serde(rename = "login")]
    #[strum(serialize = "login")]
    Login,
    #[serde(rename = "car-status")]
    #[strum(serialize = "car-status")]
    Status,
    #[serde(rename = "car-fullstatus")]
    #[strum(serialize = "car-fullstatus")]
    FullStatus,
    #[serde(rename = "car-odometer")]
    #[strum(serialize = "car-odometer")]
    Odometer,
    #[serde(rename = "car-location")]
    #[strum(serialize = "car-location")]
    Location,
    #[serde(rename = "lock-car")]
    #[strum(serialize = "lock-car")]
    Lock,
    #[serde(rename = "unlock-car")]
    #[strum(serialize = "unlock-car")]
    Unlock,
    #[serde(rename = "start-car")]
    #[strum(serialize = "start-car")]
    Start,
    #[serde(rename = "stop-car")]
    #[strum(serialize = "stop-car")]
    Stop,
    #[serde(rename = "start-charge")]
    #[strum(serialize = "start-charge")]
    StartCharge,
    #[serde(rename = "stop-charge")]
    #[strum(serialize = "stop-charge")]
    StopCharge,
}

impl ActionKind {
    /// Host type name, e.g. `car-status`.
    pub fn type_name(self) -> &'static str {
        self.into()
    }

    pub fn default_name(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Status => "Get car status",
            Self::FullStatus => "Get full status",
            Self::Odometer => "Get car odometer",
            Self::Location => "Get car location",
            Self::Lock => "Lock car",
            Self::Unlock => "Unlock car",
            Self::Start => "Start car",
            Self::Stop => "Stop car",
            Self::StartCharge => "Start Charging",
            Self::StopCharge => "Stop Charging",
        }
    }

    /// Honours the `dorefresh` flag.
    pub fn has_refresh(self) -> bool {
        matches!(self, Self::Status | Self::FullStatus)
    }

    /// Honours the `parsed` flag.
    pub fn has_parsed(self) -> bool {
        self == Self::Status
    }

    /// Needs the account's vehicle handle.
    pub fn targets_vehicle(self) -> bool {
        self != Self::Login
    }

    /// Run this kind's call against an already logged-in account.
    ///
    /// Vehicle kinds resolve the account's vehicle first; a failed lookup
    /// is reported like any other operation failure. `payload` is the
    /// trigger message's payload and is only read by [`Start`](Self::Start).
    pub async fn run(
        self,
        account: LoginCoordinator,
        options: StatusOptions,
        payload: Value,
    ) -> Result<Value, CoreError> {
        if self == Self::Login {
            let at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            return Ok(Value::String(format!("Logged in at {at}")));
        }

        let vehicle = account.vehicle().await?;
        debug!(kind = self.type_name(), vin = vehicle.vin(), "calling vehicle service");

        let value = match self {
            Self::Status => vehicle.status(options).await?,
            Self::FullStatus => {
                vehicle
                    .full_status(FullStatusOptions {
                        refresh: options.refresh,
                    })
                    .await?
            }
            Self::Odometer => to_json(&vehicle.odometer().await?)?,
            Self::Location => to_json(&vehicle.location().await?)?,
            Self::Lock => Value::String(vehicle.lock().await?),
            Self::Unlock => Value::String(vehicle.unlock().await?),
            Self::Start => Value::String(vehicle.start(payload).await?),
            Self::Stop => Value::String(vehicle.stop().await?),
            Self::StartCharge => Value::String(vehicle.start_charge().await?),
            Self::StopCharge => Value::String(vehicle.stop_charge().await?),
            Self::Login => Value::Null,
        };
        Ok(value)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, CoreError> {
    serde_json::to_value(value).map_err(|e| CoreError::Internal(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn host_type_names_round_trip() {
        for kind in ActionKind::iter() {
            assert_eq!(ActionKind::from_str(kind.type_name()).unwrap(), kind);
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, Value::String(kind.type_name().to_string()));
        }
        assert_eq!(ActionKind::iter().count(), 11);
    }

    #[test]
    fn status_and_full_status_have_distinct_names() {
        assert_eq!(ActionKind::Status.default_name(), "Get car status");
        assert_eq!(ActionKind::FullStatus.default_name(), "Get full status");
    }

    #[test]
    fn only_login_skips_the_vehicle() {
        let skipping: Vec<_> = ActionKind::iter().filter(|k| !k.targets_vehicle()).collect();
        assert_eq!(skipping, vec![ActionKind::Login]);
        assert!(ActionKind::Status.has_parsed());
        assert!(!ActionKind::FullStatus.has_parsed());
        assert!(ActionKind::FullStatus.has_refresh());
        assert!(!ActionKind::Odometer.has_refresh());
    }
}
