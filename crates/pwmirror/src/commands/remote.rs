//! Connection management: connect, disconnect, list and switch remotes.

use crate::commands::Ctx;
use crate::commands::util::{fields, parse_u32};
use crate::error::CliError;

pub fn connect(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 1, 0, "[<remote-name>]")?;
    let entry = ctx.session.connect(f.first().copied())?;
    Ok(format!("{} = @remote:{}", entry.handle, entry.name))
}

pub fn disconnect(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 1, 0, "[<remote-var>]")?;
    let handle = f
        .first()
        .map(|raw| parse_u32(cmd, "remote var", raw))
        .transpose()?;
    ctx.session.disconnect(handle)?;
    Ok(String::new())
}

#[allow(clippy::unnecessary_wraps)]
pub fn list(ctx: &mut Ctx<'_>, _cmd: &str, _args: &str) -> Result<String, CliError> {
    Ok(ctx
        .session
        .list_remotes()
        .iter()
        .map(|entry| format!("\t{} = @remote:{}", entry.handle, entry.name))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Make a remote current. Without an argument, remote 0.
pub fn switch(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 1, 0, "[<remote-var>]")?;
    let handle = match f.first() {
        Some(raw) => parse_u32(cmd, "remote var", raw)?,
        None => 0,
    };
    ctx.session.switch_remote(handle)?;
    Ok(String::new())
}
