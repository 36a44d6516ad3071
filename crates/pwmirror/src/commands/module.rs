//! Local context modules.

use crate::commands::Ctx;
use crate::commands::util::fields;
use crate::error::CliError;

pub fn load(ctx: &mut Ctx<'_>, cmd: &str, args: &str) -> Result<String, CliError> {
    let f = fields(cmd, args, 2, 1, "<module-name> [<module-arguments>]")?;
    let loaded = ctx.session.load_module(f[0], f.get(1).copied())?;
    Ok(format!("{} = @module:{}", loaded.handle, loaded.id))
}

pub fn unload(_ctx: &mut Ctx<'_>, cmd: &str, _args: &str) -> Result<String, CliError> {
    Err(CliError::NotImplemented {
        cmd: cmd.to_owned(),
    })
}
