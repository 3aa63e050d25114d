// bluelinky-core: Login coordination, request gating and action nodes between bluelinky-api and a flow host.

pub mod action;
pub mod config;
pub mod deadline;
pub mod error;
pub mod executor;
pub mod gate;
pub mod host;
pub mod login;
pub mod message;
pub mod node;
pub mod registry;
pub mod status;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::{ACCOUNT_NODE_TYPE, ActionKind};
pub use config::{AccountConfig, ActionConfig, HostActionConfig};
pub use deadline::{Deadline, DeadlineUnit, Elapsed, with_deadline};
pub use error::{CoreError, LoginError};
pub use executor::{Outputs, execute};
pub use gate::{Delivery, PendingPolicy, RequestGate};
pub use host::NodeHost;
pub use login::{LatchState, LoginCoordinator, LoginLatch, LoginOutcome};
pub use message::{DEFAULT_FIELD, Message, field_or_default};
pub use node::ActionNode;
pub use registry::AccountRegistry;
pub use status::{Fill, NodeStatus, Shape};
