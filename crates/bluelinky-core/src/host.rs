// ── Host seam ──
//
// What an action node needs from the flow runtime it is embedded in: a
// place to show status and a way to emit messages. Output index 0 is the
// primary channel, index 1 the secondary (error) channel.

use crate::message::Message;
use crate::status::NodeStatus;

/// Callbacks into the flow host for one node.
pub trait NodeHost: Send + Sync {
    /// Show a status transition under the node.
    fn status(&self, status: &NodeStatus);

    /// Emit messages; `None` leaves that output silent.
    fn send(&self, outputs: [Option<Message>; 2]);
}
