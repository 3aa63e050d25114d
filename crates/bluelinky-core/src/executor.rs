// ── Action executor ──
//
// Runs one request for one action node: wait for the account's login,
// run the operation, and turn the outcome into output messages. Each phase
// gets its own deadline. Errors never escape: every failure is rendered
// into a message on the configured error field and output.

use std::future::Future;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ActionConfig;
use crate::deadline::with_deadline;
use crate::error::CoreError;
use crate::host::NodeHost;
use crate::login::LoginCoordinator;
use crate::message::Message;
use crate::status::NodeStatus;

/// The two output channels of an action node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs {
    pub primary: Option<Message>,
    pub secondary: Option<Message>,
}

impl Outputs {
    /// Shallow-merge each present output into a copy of `trigger`.
    pub fn merged_into(self, trigger: &Message) -> [Option<Message>; 2] {
        [
            self.primary.map(|out| trigger.clone().merge(out)),
            self.secondary.map(|out| trigger.clone().merge(out)),
        ]
    }
}

/// Run `operation` on behalf of a node and shape its outcome.
///
/// `operation` receives the account once login has succeeded and must
/// return a future that owns everything it touches: on a deadline it is
/// left running in the background and its result is discarded.
pub async fn execute<Op, Fut>(
    host: &dyn NodeHost,
    account: Option<&LoginCoordinator>,
    config: &ActionConfig,
    operation: Op,
) -> Outputs
where
    Op: FnOnce(LoginCoordinator) -> Fut,
    Fut: Future<Output = Result<Value, CoreError>> + Send + 'static,
{
    match run(host, account, config, operation).await {
        Ok(result) => {
            host.status(&NodeStatus::finished());
            Outputs {
                primary: Some(Message::with_field(&config.result_field, result)),
                secondary: None,
            }
        }
        Err(err) => {
            warn!(node = %config.name, error = %err, "request failed");
            host.status(&NodeStatus::failed());
            let message = Message::with_field(&config.error_field, Value::String(err.to_string()));
            if config.split_errors {
                Outputs {
                    primary: None,
                    secondary: Some(message),
                }
            } else {
                Outputs {
                    primary: Some(message),
                    secondary: None,
                }
            }
        }
    }
}

async fn run<Op, Fut>(
    host: &dyn NodeHost,
    account: Option<&LoginCoordinator>,
    config: &ActionConfig,
    operation: Op,
) -> Result<Value, CoreError>
where
    Op: FnOnce(LoginCoordinator) -> Fut,
    Fut: Future<Output = Result<Value, CoreError>> + Send + 'static,
{
    let account = account.ok_or(CoreError::ConfigurationMissing)?;

    host.status(&NodeStatus::awaiting_login());
    with_deadline(config.deadline, account.wait_for_login())
        .await
        .map_err(|elapsed| CoreError::LoginTimeout {
            timeout: elapsed.after,
        })??;

    host.status(&NodeStatus::request_sent());
    debug!(node = %config.name, "request sent");
    with_deadline(config.deadline, operation(account.clone()))
        .await
        .map_err(|elapsed| CoreError::OperationTimeout {
            timeout: elapsed.after,
        })?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::action::ActionKind;

    #[derive(Default)]
    struct Recorder {
        statuses: Mutex<Vec<String>>,
    }

    impl NodeHost for Recorder {
        fn status(&self, status: &NodeStatus) {
            self.statuses.lock().unwrap().push(status.text.clone());
        }

        fn send(&self, _outputs: [Option<Message>; 2]) {}
    }

    async fn never(_: LoginCoordinator) -> Result<Value, CoreError> {
        Ok(Value::Null)
    }

    #[tokio::test]
    async fn missing_account_fails_without_waiting() {
        let host = Recorder::default();
        let config = ActionConfig::defaults(ActionKind::Lock);

        let outputs = execute(&host, None, &config, never).await;

        assert_eq!(
            outputs,
            Outputs {
                primary: Some(Message::from(json!({ "payload": "Bluelinky Config Is Not Set" }))),
                secondary: None,
            }
        );
        let statuses = host.statuses.lock().unwrap().clone();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].starts_with("Error at "));
    }

    #[tokio::test]
    async fn split_errors_use_the_secondary_output() {
        let host = Recorder::default();
        let config = ActionConfig {
            split_errors: true,
            error_field: "err".into(),
            ..ActionConfig::defaults(ActionKind::Unlock)
        };

        let outputs = execute(&host, None, &config, never).await;

        assert_eq!(outputs.primary, None);
        assert_eq!(
            outputs.secondary.unwrap().get("err"),
            Some(&json!("Bluelinky Config Is Not Set"))
        );
    }

    #[test]
    fn outputs_merge_into_copies_of_the_trigger() {
        let trigger = Message::from(json!({ "topic": "t", "payload": 1 }));
        let outputs = Outputs {
            primary: None,
            secondary: Some(Message::with_payload(json!("boom"))),
        };

        let [primary, secondary] = outputs.merged_into(&trigger);

        assert_eq!(primary, None);
        assert_eq!(
            secondary.unwrap().into_value(),
            json!({ "topic": "t", "payload": "boom" })
        );
    }
}
