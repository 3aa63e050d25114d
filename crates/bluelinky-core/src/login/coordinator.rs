// ── Login coordinator ──
//
// One per account configuration. Owns the shared client handle, bridges
// the client's lifecycle events into the login latch, and publishes the
// account's status. Every action node referencing the account holds a
// clone; the coordinator is the only writer of the latch and the status.

use std::future::Future;
use std::sync::{Arc, Weak};

use bluelinky_api::{ClientEvent, Connector, Vehicle, VehicleClient};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::latch::{LatchState, LoginLatch, LoginOutcome};
use crate::config::AccountConfig;
use crate::error::{CoreError, LoginError};
use crate::status::NodeStatus;

/// Shared login state for one account.
///
/// Cheaply cloneable via `Arc<AccountInner>`. Must be created inside a
/// tokio runtime: construction spawns the client event bridge.
#[derive(Clone)]
pub struct LoginCoordinator {
    inner: Arc<AccountInner>,
}

struct AccountInner {
    vehicle_id: String,
    client: Arc<dyn VehicleClient>,
    latch: LoginLatch,
    status: watch::Sender<NodeStatus>,
    cancel: CancellationToken,
}

impl LoginCoordinator {
    /// Wrap an existing client handle.
    ///
    /// Subscribes to the client's events before anything else so that a
    /// `ready` published by an immediate login is never missed.
    pub fn new(config: AccountConfig, client: Arc<dyn VehicleClient>) -> Self {
        let events = client.events();
        let (status, _) = watch::channel(NodeStatus::connecting());
        let inner = Arc::new(AccountInner {
            vehicle_id: config.vehicle_id,
            client,
            latch: LoginLatch::new(),
            status,
            cancel: CancellationToken::new(),
        });

        tokio::spawn(event_bridge(
            Arc::downgrade(&inner),
            events,
            inner.cancel.clone(),
        ));

        if config.auto_login {
            debug!(vin = %inner.vehicle_id, "starting initial login");
            spawn_client_login(&inner);
        }

        Self { inner }
    }

    /// Build the client through `connector`, then wrap it.
    pub fn connect(config: AccountConfig, connector: &dyn Connector) -> Result<Self, CoreError> {
        let client = connector.connect(&config.credentials)?;
        Ok(Self::new(config, client))
    }

    // ── Login lifecycle ──────────────────────────────────────────────

    /// Start a fresh login attempt.
    ///
    /// A login still pending is rejected with `Aborted` first, so anyone
    /// awaiting it wakes up instead of hanging. The client call runs in
    /// the background; its outcome arrives as a client event. After
    /// [`shutdown`](Self::shutdown) the fresh attempt is rejected with
    /// `Closed` straight away, since no event will ever settle it.
    pub fn login(&self) {
        if self.inner.cancel.is_cancelled() {
            self.inner.latch.arm();
            self.inner.latch.settle(Err(LoginError::Closed));
            debug!(vin = %self.inner.vehicle_id, "login requested after shutdown");
            return;
        }
        if self.inner.latch.arm() {
            warn!(vin = %self.inner.vehicle_id, "login restarted, aborting the pending attempt");
        }
        self.inner.publish(NodeStatus::logging_in());
        spawn_client_login(&self.inner);
    }

    /// Feed one client lifecycle event into the latch.
    ///
    /// Normally called by the event bridge; hosts that receive events by
    /// other means may call it directly.
    pub fn handle_client_event(&self, event: &ClientEvent) {
        self.inner.handle_client_event(event);
    }

    /// Future that settles with the current login attempt.
    ///
    /// Bound to the attempt current at call time: a later [`login`](Self::login)
    /// rejects it with `Aborted`.
    pub fn wait_for_login(&self) -> impl Future<Output = LoginOutcome> + Send + 'static {
        self.inner.latch.wait()
    }

    pub fn login_state(&self) -> LatchState {
        self.inner.latch.state()
    }

    /// Subscribe to account status transitions.
    pub fn status(&self) -> watch::Receiver<NodeStatus> {
        self.inner.status.subscribe()
    }

    pub fn vehicle_id(&self) -> &str {
        &self.inner.vehicle_id
    }

    /// Resolve the account's vehicle handle.
    pub async fn vehicle(&self) -> Result<Arc<dyn Vehicle>, CoreError> {
        Ok(self.inner.client.get_vehicle(&self.inner.vehicle_id).await?)
    }

    /// Stop listening for client events and reject a still-pending login
    /// with [`LoginError::Closed`].
    pub fn shutdown(&self) {
        self.inner.close();
    }
}

impl AccountInner {
    fn handle_client_event(&self, event: &ClientEvent) {
        let outcome = match event {
            ClientEvent::Ready => Ok(()),
            ClientEvent::Error(reason) => Err(LoginError::ConnectionFailed(reason.clone())),
            ClientEvent::Other(name) => Err(LoginError::UnknownClientEvent(name.clone())),
        };

        if self.latch.settle_or_rearm(outcome.clone()) {
            debug!(event = event.name(), "unsolicited client event opened a new login attempt");
        }

        match outcome {
            Ok(()) => {
                info!(vin = %self.vehicle_id, "vehicle service ready");
                self.publish(NodeStatus::ready());
            }
            Err(err) => {
                warn!(vin = %self.vehicle_id, error = %err, "login failed");
                self.publish(NodeStatus::login_failed());
            }
        }
    }

    fn publish(&self, status: NodeStatus) {
        debug!(text = %status.text, "account status");
        self.status.send_replace(status);
    }

    fn close(&self) {
        self.cancel.cancel();
        if self.latch.settle(Err(LoginError::Closed)) {
            debug!(vin = %self.vehicle_id, "rejected pending login on shutdown");
        }
    }
}

impl Drop for AccountInner {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_client_login(inner: &Arc<AccountInner>) {
    let client = Arc::clone(&inner.client);
    let weak = Arc::downgrade(inner);
    tokio::spawn(async move {
        if let Err(err) = client.login().await {
            // A login that fails to start is reported like an `error` event.
            if let Some(inner) = weak.upgrade() {
                inner.handle_client_event(&ClientEvent::Error(err.to_string()));
            }
        }
    });
}

// ── Background bridge ────────────────────────────────────────────────

async fn event_bridge(
    account: Weak<AccountInner>,
    mut events: broadcast::Receiver<ClientEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = events.recv() => {
                match result {
                    Ok(event) => {
                        let Some(inner) = account.upgrade() else { break };
                        inner.handle_client_event(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "client event bridge lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
    debug!("client event bridge stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bluelinky_api::sim::{LoginBehavior, SIM_VIN, SimConfig, SimulatedClient};
    use bluelinky_api::{Credentials, Region};
    use secrecy::SecretString;

    use super::*;

    fn account(auto_login: bool) -> AccountConfig {
        let credentials = Credentials::new(
            "driver@example.com",
            SecretString::from("hunter2".to_string()),
            Region::Us,
            SecretString::from("1234".to_string()),
            bluelinky_api::Brand::Hyundai,
        );
        AccountConfig {
            auto_login,
            ..AccountConfig::new(credentials, SIM_VIN)
        }
    }

    #[tokio::test]
    async fn auto_login_settles_ready() {
        let client = Arc::new(SimulatedClient::new(SimConfig::default()));
        let coordinator = LoginCoordinator::new(account(true), client.clone());

        assert_eq!(coordinator.wait_for_login().await, Ok(()));
        assert_eq!(client.login_calls(), 1);
        assert_eq!(coordinator.login_state(), LatchState::Ready);
        assert!(coordinator.status().borrow().text.starts_with("Ready at "));
    }

    #[tokio::test]
    async fn error_event_rejects_with_reason() {
        let client = Arc::new(SimulatedClient::new(SimConfig {
            login: LoginBehavior::Fail("bad pin".into()),
            ..SimConfig::default()
        }));
        let coordinator = LoginCoordinator::new(account(true), client);

        assert_eq!(
            coordinator.wait_for_login().await,
            Err(LoginError::ConnectionFailed("bad pin".into()))
        );
        assert!(coordinator.status().borrow().is_error());
    }

    #[tokio::test]
    async fn without_auto_login_nothing_happens_until_asked() {
        let client = Arc::new(SimulatedClient::new(SimConfig::default()));
        let coordinator = LoginCoordinator::new(account(false), client.clone());
        tokio::task::yield_now().await;

        assert_eq!(client.login_calls(), 0);
        assert_eq!(coordinator.login_state(), LatchState::Pending);
        assert_eq!(coordinator.status().borrow().text, "Connecting...");

        coordinator.login();
        assert_eq!(coordinator.status().borrow().text, "Logging in...");
        assert_eq!(coordinator.wait_for_login().await, Ok(()));
    }

    #[tokio::test]
    async fn shutdown_closes_pending_waiters() {
        let client = Arc::new(SimulatedClient::new(SimConfig {
            login: LoginBehavior::Hang,
            ..SimConfig::default()
        }));
        let coordinator = LoginCoordinator::new(account(true), client);
        let waiter = coordinator.wait_for_login();

        coordinator.shutdown();

        assert_eq!(waiter.await, Err(LoginError::Closed));
    }

    #[tokio::test]
    async fn login_after_shutdown_rejects_closed() {
        let client = Arc::new(SimulatedClient::new(SimConfig {
            login: LoginBehavior::Hang,
            ..SimConfig::default()
        }));
        let coordinator = LoginCoordinator::new(account(false), client.clone());

        coordinator.shutdown();
        coordinator.login();
        tokio::task::yield_now().await;

        assert_eq!(coordinator.wait_for_login().await, Err(LoginError::Closed));
        assert_eq!(client.login_calls(), 0);
        assert_eq!(
            coordinator.login_state(),
            LatchState::Failed(LoginError::Closed)
        );
    }

    #[tokio::test]
    async fn unknown_events_reject() {
        let client = Arc::new(SimulatedClient::new(SimConfig::default()));
        let coordinator = LoginCoordinator::new(account(false), client);

        coordinator.handle_client_event(&ClientEvent::Other("maintenance".into()));

        assert_eq!(
            coordinator.login_state(),
            LatchState::Failed(LoginError::UnknownClientEvent("maintenance".into()))
        );
    }
}
