//! Object commands: listing, info, creation, destruction, export and
//! parameter enumeration.

use pwmirror_api::ParamType;
use pwmirror_core::{Created, InfoTarget};

use crate::commands::Ctx;
use crate::commands::util::{fields, parse_u32};
use crate::error::CliError;

fn created(c: Created) -> String {
    format!("{} = @proxy:{}", c.handle, c.proxy)
}

/// Globals of the current remote, optionally filtered by interface.
pub fn list(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 1, 0, "[<interface>]")?;
    let globals = ctx.session.list_objects(f.first().copied())?;
    ctx.view.globals(&globals)
}

/// Render an object now, or as soon as its first info arrives.
pub fn info(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 1, 1, "<object-id>|all")?;
    let target = match f[0] {
        "all" => InfoTarget::All,
        raw => InfoTarget::Id(parse_u32(cmd, "object id", raw)?),
    };
    ctx.session.info(target)?;
    Ok(String::new())
}

pub fn create_device(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 2, 1, "<factory-name> [<properties>]")?;
    let c = ctx.session.create_device(f[0], f.get(1).copied())?;
    Ok(created(c))
}

pub fn create_node(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 2, 1, "<factory-name> [<properties>]")?;
    let c = ctx.session.create_node(f[0], f.get(1).copied())?;
    Ok(created(c))
}

pub fn destroy(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 1, 1, "<object-id>")?;
    let id = parse_u32(cmd, "object id", f[0])?;
    ctx.session.destroy(id)?;
    Ok(String::new())
}

pub fn create_link(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(
        cmd,
        args,
        5,
        4,
        "<node-id> <port> <node-id> <port> [<properties>]",
    )?;
    let c = ctx
        .session
        .create_link(f[0], f[1], f[2], f[3], f.get(4).copied())?;
    Ok(created(c))
}

/// Export a node from the local context to the current or given remote.
pub fn export_node(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 2, 1, "<node-id> [<remote-var>]")?;
    let node = parse_u32(cmd, "node id", f[0])?;
    let remote = f
        .get(1)
        .map(|raw| parse_u32(cmd, "remote var", raw))
        .transpose()?;
    let c = ctx.session.export_node(node, remote)?;
    Ok(created(c))
}

/// Param ids may be given by number or by name (`EnumFormat`, `Props`, ...).
pub fn enum_params(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 2, 2, "<object-id> <param-id>")?;
    let id = parse_u32(cmd, "object id", f[0])?;
    let param_id = ParamType::parse_id(f[1]).ok_or_else(|| CliError::InvalidArgument {
        cmd: cmd.to_owned(),
        what: "param id",
        value: f[1].to_owned(),
    })?;
    ctx.session.enum_params(id, param_id)?;
    Ok(String::new())
}
