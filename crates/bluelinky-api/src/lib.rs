//! Client abstraction for Hyundai / Kia / Genesis connected-car services.
//!
//! The wire protocol itself is provided by a backend implementing
//! [`VehicleClient`] and [`Vehicle`]; this crate pins down the surface the
//! rest of the workspace relies on:
//!
//! - **[`Credentials`]**: username, password, PIN, [`Region`] and [`Brand`].
//! - **[`VehicleClient`]**: login, vehicle lookup, and a broadcast stream of
//!   [`ClientEvent`]s (`ready` / `error`) that announce login outcomes.
//! - **[`Vehicle`]**: status, odometer, location, lock/unlock, remote
//!   start/stop, and charge control.
//! - **[`sim`]**: an in-process simulated backend for tests and dry runs.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod sim;

pub use auth::{Brand, Credentials, Region};
pub use client::{ClientEvent, Connector, Vehicle, VehicleClient};
pub use error::Error;
pub use models::{FullStatusOptions, Location, Odometer, Speed, StatusOptions};
