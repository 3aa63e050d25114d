// ── Action node ──
//
// A configured action bound to its host. Inbound triggers go through the
// request gate; a per-node worker task drains admitted tickets one at a
// time, runs them through the executor, and sends the merged outputs back
// to the host.

use std::sync::Arc;

use bluelinky_api::StatusOptions;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::action::ActionKind;
use crate::config::{ActionConfig, HostActionConfig};
use crate::error::CoreError;
use crate::executor::execute;
use crate::gate::{Delivery, RequestGate, Ticket};
use crate::host::NodeHost;
use crate::login::LoginCoordinator;
use crate::message::Message;
use crate::registry::AccountRegistry;

/// One action node instance.
///
/// Cheaply cloneable; clones share the gate and the worker. Must be created
/// inside a tokio runtime. The worker stops on [`close`](Self::close) or
/// once every clone is dropped.
#[derive(Clone)]
pub struct ActionNode {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    id: String,
    kind: ActionKind,
    config: ActionConfig,
    gate: RequestGate,
    cancel: CancellationToken,
}

/// What the worker needs to run a ticket.
struct Runner {
    kind: ActionKind,
    config: ActionConfig,
    account: Option<LoginCoordinator>,
    host: Arc<dyn NodeHost>,
}

impl ActionNode {
    pub fn new(
        id: impl Into<String>,
        kind: ActionKind,
        config: ActionConfig,
        account: Option<LoginCoordinator>,
        host: Arc<dyn NodeHost>,
    ) -> Self {
        let id = id.into();
        let (gate, tickets) = RequestGate::new(config.pending);
        let cancel = CancellationToken::new();

        let runner = Runner {
            kind,
            config: config.clone(),
            account,
            host,
        };
        tokio::spawn(worker(id.clone(), runner, tickets, cancel.clone()));

        Self {
            inner: Arc::new(NodeInner {
                id,
                kind,
                config,
                gate,
                cancel,
            }),
        }
    }

    /// Build a node from a host-persisted configuration object, looking up
    /// its account in `registry`.
    ///
    /// An unknown or missing account reference is not an error here: the
    /// node is created and every trigger fails with `ConfigurationMissing`.
    pub fn from_host_config(
        id: impl Into<String>,
        kind: ActionKind,
        raw: Value,
        registry: &AccountRegistry,
        host: Arc<dyn NodeHost>,
    ) -> Result<Self, CoreError> {
        let id = id.into();
        let config = HostActionConfig::from_value(raw)?.resolve(kind);
        let account = config.account.as_deref().and_then(|account_id| {
            let found = registry.get(account_id);
            if found.is_none() {
                warn!(node = %id, account = account_id, "referenced account is not registered");
            }
            found
        });
        Ok(Self::new(id, kind, config, account, host))
    }

    /// Handle one inbound trigger message.
    pub fn on_input(&self, message: Message) -> Delivery {
        if self.inner.cancel.is_cancelled() {
            return Delivery::Dropped;
        }
        self.inner.gate.admit(message)
    }

    /// Whether a request is in flight or queued.
    pub fn is_busy(&self) -> bool {
        self.inner.gate.is_busy()
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> ActionKind {
        self.inner.kind
    }

    pub fn config(&self) -> &ActionConfig {
        &self.inner.config
    }

    /// Stop accepting triggers. Queued tickets are discarded; a request
    /// already running finishes and is still delivered.
    pub fn close(&self) {
        self.inner.cancel.cancel();
    }
}

async fn worker(
    id: String,
    runner: Runner,
    mut tickets: mpsc::UnboundedReceiver<Ticket>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            ticket = tickets.recv() => {
                let Some(ticket) = ticket else { break };
                runner.process(ticket).await;
            }
        }
    }
    debug!(node = %id, "action node worker stopped");
}

impl Runner {
    async fn process(&self, ticket: Ticket) {
        let kind = self.kind;
        let options = StatusOptions {
            refresh: self.config.refresh,
            parsed: self.config.parsed,
        };
        let payload = ticket.message.payload();

        if kind == ActionKind::Login {
            if let Some(account) = &self.account {
                account.login();
            }
        }

        let outputs = execute(
            self.host.as_ref(),
            self.account.as_ref(),
            &self.config,
            move |account| kind.run(account, options, payload),
        )
        .await;

        let trigger = ticket.into_message();
        self.host.send(outputs.merged_into(&trigger));
    }
}
