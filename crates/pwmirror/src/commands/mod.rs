//! Console command table and dispatch.
//!
//! Lookup is an exact match on a command's name or alias. Each handler
//! checks its own arity and returns the text it wants printed; anything
//! the service answers later arrives as session notices instead.

pub mod module;
pub mod objects;
pub mod permissions;
pub mod remote;
pub mod util;

use tabled::settings::Style;
use tabled::{Table, Tabled};

use pwmirror_core::Session;

use crate::error::CliError;
use crate::output::View;
use crate::tokenize::Line;

/// What a handler gets to work with.
pub struct Ctx<'a> {
    pub session: &'a mut Session,
    pub view: View,
}

type Handler = fn(&mut Ctx<'_>, &str, &str) -> Result<String, CliError>;

pub struct CommandSpec {
    pub name: &'static str,
    pub alias: &'static str,
    pub description: &'static str,
    handler: Handler,
}

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        alias: "h",
        description: "Show this help",
        handler: help,
    },
    CommandSpec {
        name: "load-module",
        alias: "lm",
        description: "Load a module. <module-name> [<module-arguments>]",
        handler: module::load,
    },
    CommandSpec {
        name: "unload-module",
        alias: "um",
        description: "Unload a module. <module-var>",
        handler: module::unload,
    },
    CommandSpec {
        name: "connect",
        alias: "con",
        description: "Connect to a remote. [<remote-name>]",
        handler: remote::connect,
    },
    CommandSpec {
        name: "disconnect",
        alias: "dis",
        description: "Disconnect from a remote. [<remote-var>]",
        handler: remote::disconnect,
    },
    CommandSpec {
        name: "list-remotes",
        alias: "lr",
        description: "List connected remotes.",
        handler: remote::list,
    },
    CommandSpec {
        name: "switch-remote",
        alias: "sr",
        description: "Switch between current remotes. [<remote-var>]",
        handler: remote::switch,
    },
    CommandSpec {
        name: "list-objects",
        alias: "ls",
        description: "List objects or current remote. [<interface>]",
        handler: objects::list,
    },
    CommandSpec {
        name: "info",
        alias: "i",
        description: "Get info about an object. <object-id>|all",
        handler: objects::info,
    },
    CommandSpec {
        name: "create-device",
        alias: "cd",
        description: "Create a device from a factory. <factory-name> [<properties>]",
        handler: objects::create_device,
    },
    CommandSpec {
        name: "create-node",
        alias: "cn",
        description: "Create a node from a factory. <factory-name> [<properties>]",
        handler: objects::create_node,
    },
    CommandSpec {
        name: "destroy",
        alias: "d",
        description: "Destroy a global object. <object-id>",
        handler: objects::destroy,
    },
    CommandSpec {
        name: "create-link",
        alias: "cl",
        description: "Create a link between nodes. <node-id> <port-id> <node-id> <port-id> [<properties>]",
        handler: objects::create_link,
    },
    CommandSpec {
        name: "export-node",
        alias: "en",
        description: "Export a local node to the current remote. <node-id> [remote-var]",
        handler: objects::export_node,
    },
    CommandSpec {
        name: "enum-params",
        alias: "e",
        description: "Enumerate params of an object <object-id> <param-id-name>",
        handler: objects::enum_params,
    },
    CommandSpec {
        name: "permissions",
        alias: "sp",
        description: "Set permissions for a client <client-id> <object> <permission>",
        handler: permissions::set,
    },
    CommandSpec {
        name: "get-permissions",
        alias: "gp",
        description: "Get permissions of a client <client-id>",
        handler: permissions::get,
    },
];

pub fn find(cmd: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name == cmd || c.alias == cmd)
}

/// Run one tokenized line.
pub fn dispatch(ctx: &mut Ctx<'_>, line: Line<'_>) -> Result<String, CliError> {
    let spec = find(line.cmd).ok_or_else(|| CliError::UnknownCommand {
        cmd: line.cmd.to_owned(),
    })?;
    tracing::debug!(command = spec.name, args = line.args, "dispatching command");
    (spec.handler)(ctx, line.cmd, line.args).map_err(|err| err.in_command(line.cmd))
}

// ── help ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct HelpRow {
    #[tabled(rename = "command")]
    name: &'static str,
    alias: &'static str,
    description: &'static str,
}

#[allow(clippy::unnecessary_wraps)]
fn help(_ctx: &mut Ctx<'_>, _cmd: &str, _args: &str) -> Result<String, CliError> {
    let rows = COMMANDS.iter().map(|c| HelpRow {
        name: c.name,
        alias: c.alias,
        description: c.description,
    });
    let table = Table::new(rows).with(Style::blank()).to_string();
    Ok(format!("Available commands:\n{table}"))
}
