//! Client permission commands.

use crate::commands::Ctx;
use crate::commands::util::{fields, parse_bits, parse_object, parse_u32};
use crate::error::CliError;

/// Grant `<permission>` bits on `<object>` to a client. Object `-1` sets
/// the client's default entry.
pub fn set(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 3, 3, "<client-id> <object> <permission>")?;
    let client = parse_u32(cmd, "client id", f[0])?;
    let object = parse_object(cmd, f[1])?;
    let bits = parse_bits(cmd, f[2])?;
    ctx.session.set_permissions(client, object, bits)?;
    Ok(String::new())
}

pub fn get(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 1, 1, "<client-id>")?;
    let client = parse_u32(cmd, "client id", f[0])?;
    ctx.session.get_permissions(client)?;
    Ok(String::new())
}
