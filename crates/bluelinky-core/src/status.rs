// ── Node status records ──
//
// The small coloured indicator a host draws under each node. Every state
// transition of an account or an action node produces one of these.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Indicator colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fill {
    /// Neutral / in progress.
    #[default]
    Grey,
    Green,
    Red,
}

/// Indicator shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Ring,
    Dot,
}

/// One status transition, as shown by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub fill: Fill,
    pub shape: Shape,
    pub text: String,
    /// When the transition happened. Not rendered by hosts; kept for logs.
    #[serde(skip_serializing)]
    #[serde(default = "Utc::now")]
    pub at: DateTime<Utc>,
}

impl NodeStatus {
    fn ring(fill: Fill, text: impl Into<String>) -> Self {
        Self {
            fill,
            shape: Shape::Ring,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn neutral(text: impl Into<String>) -> Self {
        Self::ring(Fill::Grey, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::ring(Fill::Green, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::ring(Fill::Red, text)
    }

    // ── Account transitions ──────────────────────────────────────────

    pub fn connecting() -> Self {
        Self::neutral("Connecting...")
    }

    pub fn logging_in() -> Self {
        Self::neutral("Logging in...")
    }

    pub fn ready() -> Self {
        let mut status = Self::success("");
        status.text = format!("Ready at {}", status.at.to_rfc3339());
        status
    }

    pub fn login_failed() -> Self {
        let mut status = Self::error("");
        status.text = format!("Error at {}", status.at.to_rfc3339());
        status
    }

    // ── Action node transitions ──────────────────────────────────────

    pub fn awaiting_login() -> Self {
        Self::neutral("Awaiting Login...")
    }

    pub fn request_sent() -> Self {
        Self::neutral("Request sent...")
    }

    pub fn finished() -> Self {
        let mut status = Self::success("");
        status.text = format!("Request finished at {}", local_time(status.at));
        status
    }

    pub fn failed() -> Self {
        let mut status = Self::error("");
        status.text = format!("Error at {}", local_time(status.at));
        status
    }

    pub fn is_error(&self) -> bool {
        self.fill == Fill::Red
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
