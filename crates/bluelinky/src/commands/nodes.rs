//! Node type catalogue handlers.

use std::str::FromStr;

use serde::Serialize;
use strum::IntoEnumIterator;
use tabled::Tabled;

use bluelinky_core::{ActionConfig, ActionKind, PendingPolicy};

use crate::cli::{GlobalOpts, NodesArgs, NodesCommand};
use crate::error::CliError;
use crate::output;

// ── Catalogue entry ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct NodeTypeInfo {
    #[serde(rename = "type")]
    type_name: &'static str,
    name: String,
    /// `None` when the type has no refresh flag.
    dorefresh: Option<bool>,
    /// `None` when the type has no parsed flag.
    parsed: Option<bool>,
    vehicle: bool,
    msgproperty: String,
    errorproperty: String,
    senderrortoaltoutput: bool,
    ignoremessageifpending: bool,
}

impl From<ActionKind> for NodeTypeInfo {
    fn from(kind: ActionKind) -> Self {
        let defaults = ActionConfig::defaults(kind);
        Self {
            type_name: kind.type_name(),
            name: defaults.name,
            dorefresh: kind.has_refresh().then_some(defaults.refresh),
            parsed: kind.has_parsed().then_some(defaults.parsed),
            vehicle: kind.targets_vehicle(),
            msgproperty: defaults.result_field,
            errorproperty: defaults.error_field,
            senderrortoaltoutput: defaults.split_errors,
            ignoremessageifpending: defaults.pending == PendingPolicy::Drop,
        }
    }
}

fn flag(value: Option<bool>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct NodeTypeRow {
    #[tabled(rename = "Type")]
    type_name: &'static str,
    #[tabled(rename = "Default name")]
    name: String,
    #[tabled(rename = "Refresh")]
    refresh: String,
    #[tabled(rename = "Parsed")]
    parsed: String,
    #[tabled(rename = "Vehicle")]
    vehicle: String,
}

impl From<&NodeTypeInfo> for NodeTypeRow {
    fn from(info: &NodeTypeInfo) -> Self {
        Self {
            type_name: info.type_name,
            name: info.name.clone(),
            refresh: flag(info.dorefresh),
            parsed: flag(info.parsed),
            vehicle: if info.vehicle { "yes" } else { "no" }.into(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: NodesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        NodesCommand::List => {
            let types: Vec<NodeTypeInfo> = ActionKind::iter().map(NodeTypeInfo::from).collect();
            let out = output::render_list(
                global.output,
                &types,
                |t| NodeTypeRow::from(t),
                |t| t.type_name.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NodesCommand::Show { node_type } => {
            let kind = parse_kind(&node_type)?;
            let info = NodeTypeInfo::from(kind);
            let out = output::render_single(global.output, &info, detail, |t| {
                t.type_name.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

pub(crate) fn parse_kind(node_type: &str) -> Result<ActionKind, CliError> {
    ActionKind::from_str(node_type.trim()).map_err(|_| CliError::UnknownNode {
        target: node_type.into(),
    })
}

fn detail(info: &NodeTypeInfo) -> String {
    output::detail_table(&[
        ("type", info.type_name.into()),
        ("name", info.name.clone()),
        ("dorefresh", flag(info.dorefresh)),
        ("parsed", flag(info.parsed)),
        ("vehicle", info.vehicle.to_string()),
        ("msgproperty", info.msgproperty.clone()),
        ("errorproperty", info.errorproperty.clone()),
        ("ignoremessageifpending", info.ignoremessageifpending.to_string()),
        ("senderrortoaltoutput", info.senderrortoaltoutput.to_string()),
    ])
}
