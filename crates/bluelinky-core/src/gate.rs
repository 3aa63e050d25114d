// ── Single-flight request gate ──
//
// Admits trigger messages into a node's request queue. The node's worker
// drains the queue one ticket at a time, so at most one request per node
// is ever in flight. With `PendingPolicy::Drop`, a trigger that arrives
// while a ticket is outstanding is discarded instead of queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::message::Message;

/// What to do with a trigger that arrives while a request is outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// Discard it silently.
    #[default]
    Drop,
    /// Run it after every earlier trigger, in arrival order.
    Queue,
}

/// Result of offering a trigger to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted; its outputs will be sent once its request settles.
    Accepted,
    /// Discarded because a request was in flight.
    Dropped,
}

/// An admitted trigger. The gate slot it holds is released when the
/// ticket is dropped, whether or not the request succeeded.
#[derive(Debug)]
pub struct Ticket {
    pub message: Message,
    _slot: Slot,
}

impl Ticket {
    /// Release the gate slot and keep the trigger message.
    pub fn into_message(self) -> Message {
        self.message
    }
}

#[derive(Debug)]
struct Slot(Arc<AtomicUsize>);

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Per-node admission control.
#[derive(Debug)]
pub struct RequestGate {
    policy: PendingPolicy,
    outstanding: Arc<AtomicUsize>,
    tickets: mpsc::UnboundedSender<Ticket>,
}

impl RequestGate {
    /// Create a gate and the receiving end its worker drains.
    pub fn new(policy: PendingPolicy) -> (Self, mpsc::UnboundedReceiver<Ticket>) {
        let (tickets, rx) = mpsc::unbounded_channel();
        let gate = Self {
            policy,
            outstanding: Arc::new(AtomicUsize::new(0)),
            tickets,
        };
        (gate, rx)
    }

    pub fn policy(&self) -> PendingPolicy {
        self.policy
    }

    /// Offer a trigger message.
    pub fn admit(&self, message: Message) -> Delivery {
        match self.policy {
            PendingPolicy::Drop => {
                if self
                    .outstanding
                    .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    debug!("request in flight, dropping trigger");
                    return Delivery::Dropped;
                }
            }
            PendingPolicy::Queue => {
                let ahead = self.outstanding.fetch_add(1, Ordering::AcqRel);
                if ahead > 0 {
                    debug!(ahead, "request in flight, queueing trigger");
                }
            }
        }

        let ticket = Ticket {
            message,
            _slot: Slot(Arc::clone(&self.outstanding)),
        };
        // A closed queue hands the ticket back; dropping it frees the slot.
        if self.tickets.send(ticket).is_err() {
            debug!("node worker gone, dropping trigger");
            return Delivery::Dropped;
        }
        Delivery::Accepted
    }

    /// Whether a request is in flight or queued.
    pub fn is_busy(&self) -> bool {
        self.outstanding.load(Ordering::Acquire) > 0
    }

    /// Admitted triggers whose request has not settled yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}
