// ── Runtime node configuration ──
//
// These types describe one account and one action node as the host hands
// them over. Core never reads files: the config crate (or a host adapter)
// builds an `AccountConfig` and a `HostActionConfig` and passes them in.

use std::fmt;
use std::str::FromStr;

use bluelinky_api::Credentials;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::ActionKind;
use crate::deadline::{Deadline, DeadlineUnit};
use crate::error::CoreError;
use crate::gate::PendingPolicy;
use crate::message::field_or_default;

/// Everything needed to bring up one account: credentials, the vehicle the
/// account's action nodes target, and whether to log in immediately.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub credentials: Credentials,
    /// VIN (or service vehicle id) that vehicle actions resolve.
    pub vehicle_id: String,
    /// Start a login as soon as the account is constructed.
    pub auto_login: bool,
}

impl AccountConfig {
    pub fn new(credentials: Credentials, vehicle_id: impl Into<String>) -> Self {
        Self {
            credentials,
            vehicle_id: vehicle_id.into(),
            auto_login: true,
        }
    }
}

// ── Host-persisted action configuration ──────────────────────────────

/// Action node settings exactly as the host persists them.
///
/// Every field is optional; missing or `null` values are filled from the
/// node type's defaults by [`resolve`](Self::resolve). `name` and the
/// account reference are never defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostActionConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "bluelinky")]
    pub account: Option<String>,
    #[serde(
        default,
        rename = "timeoutamount",
        deserialize_with = "lenient_amount"
    )]
    pub timeout_amount: Option<f64>,
    #[serde(default, rename = "timeoutunits", deserialize_with = "lenient_units")]
    pub timeout_units: Option<DeadlineUnit>,
    #[serde(default, rename = "msgproperty")]
    pub msg_property: Option<String>,
    #[serde(default, rename = "errorproperty")]
    pub error_property: Option<String>,
    #[serde(default, rename = "senderrortoaltoutput")]
    pub send_error_to_alt_output: Option<bool>,
    #[serde(default, rename = "ignoremessageifpending")]
    pub ignore_message_if_pending: Option<bool>,
    #[serde(default, rename = "dorefresh")]
    pub do_refresh: Option<bool>,
    #[serde(default)]
    pub parsed: Option<bool>,
}

impl HostActionConfig {
    /// Parse a host configuration object. Unknown keys are ignored.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        serde_json::from_value(value).map_err(|e| CoreError::Config {
            field: "node".into(),
            reason: e.to_string(),
        })
    }

    /// Fill unset values from `kind`'s defaults.
    pub fn resolve(&self, kind: ActionKind) -> ActionConfig {
        let defaults = ActionConfig::defaults(kind);
        let pending = match self.ignore_message_if_pending {
            Some(true) => PendingPolicy::Drop,
            Some(false) => PendingPolicy::Queue,
            None => defaults.pending,
        };
        ActionConfig {
            name: self
                .name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.name),
            account: self
                .account
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            deadline: Deadline::new(
                self.timeout_amount.unwrap_or(defaults.deadline.amount),
                self.timeout_units.unwrap_or(defaults.deadline.unit),
            ),
            result_field: field_or_default(self.msg_property.as_deref()),
            error_field: field_or_default(self.error_property.as_deref()),
            split_errors: self
                .send_error_to_alt_output
                .unwrap_or(defaults.split_errors),
            pending,
            refresh: kind.has_refresh() && self.do_refresh.unwrap_or(defaults.refresh),
            parsed: kind.has_parsed() && self.parsed.unwrap_or(defaults.parsed),
        }
    }
}

/// Accepts a number, a numeric string, an empty string or `null`.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
        type Value = Option<f64>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number or a numeric string")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v as f64))
        }

        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v as f64))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

/// `h` and `m` select hours and minutes; blank or null leaves the unit
/// unset, and anything else counts as seconds.
fn lenient_units<'de, D>(deserializer: D) -> Result<Option<DeadlineUnit>, D::Error>
where
    D: Deserializer<'de>,
{
    let unit = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) if raw.trim().is_empty() => None,
        Some(Value::String(raw)) => {
            Some(DeadlineUnit::from_str(raw.trim()).unwrap_or(DeadlineUnit::Seconds))
        }
        Some(_) => Some(DeadlineUnit::Seconds),
    };
    Ok(unit)
}

// ── Resolved action configuration ────────────────────────────────────

/// Fully resolved settings of one action node.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionConfig {
    /// Display name.
    pub name: String,
    /// Id of the account configuration node, if any.
    pub account: Option<String>,
    /// Applied separately to the login wait and to the operation.
    pub deadline: Deadline,
    /// Message field that receives a successful result.
    pub result_field: String,
    /// Message field that receives an error.
    pub error_field: String,
    /// Route errors to the secondary output.
    pub split_errors: bool,
    pub pending: PendingPolicy,
    pub refresh: bool,
    pub parsed: bool,
}

impl ActionConfig {
    /// The defaults table for `kind`.
    pub fn defaults(kind: ActionKind) -> Self {
        Self {
            name: kind.default_name().to_string(),
            account: None,
            deadline: Deadline::none(),
            result_field: field_or_default(None),
            error_field: field_or_default(None),
            split_errors: false,
            pending: PendingPolicy::Drop,
            refresh: kind.has_refresh(),
            parsed: false,
        }
    }
}
