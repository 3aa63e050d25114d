//! Terminal host for action nodes.
//!
//! Prints every status transition to stderr and forwards each output
//! pair to the command that owns the node.

use std::sync::Mutex;

use tokio::sync::mpsc;

use bluelinky_core::{Message, NodeHost, NodeStatus};

use crate::output::status_line;

/// One `send` from a node: primary and secondary output.
pub type OutputPair = [Option<Message>; 2];

pub struct ConsoleHost {
    label: String,
    color: bool,
    quiet: bool,
    last_status: Mutex<Option<NodeStatus>>,
    outputs: mpsc::UnboundedSender<OutputPair>,
}

impl ConsoleHost {
    pub fn new(
        label: impl Into<String>,
        color: bool,
        quiet: bool,
    ) -> (Self, mpsc::UnboundedReceiver<OutputPair>) {
        let (outputs, rx) = mpsc::unbounded_channel();
        let host = Self {
            label: label.into(),
            color,
            quiet,
            last_status: Mutex::new(None),
            outputs,
        };
        (host, rx)
    }

    /// The most recent status the node reported.
    pub fn last_status(&self) -> Option<NodeStatus> {
        self.last_status.lock().ok().and_then(|s| s.clone())
    }
}

impl NodeHost for ConsoleHost {
    fn status(&self, status: &NodeStatus) {
        if let Ok(mut last) = self.last_status.lock() {
            *last = Some(status.clone());
        }
        if !self.quiet {
            eprintln!("[{}] {}", self.label, status_line(status, self.color));
        }
    }

    fn send(&self, outputs: OutputPair) {
        if self.outputs.send(outputs).is_err() {
            tracing::debug!(node = %self.label, "output dropped, receiver gone");
        }
    }
}
