//! Account login state.
//!
//! [`LoginLatch`] is the re-armable "logged in" signal; [`LoginCoordinator`]
//! owns one account's client handle and drives the latch from client
//! lifecycle events and explicit login requests.

mod coordinator;
mod latch;

pub use coordinator::LoginCoordinator;
pub use latch::{LatchState, LoginLatch, LoginOutcome};
