//! Shared argument helpers for console command handlers.

use pwmirror_api::{ID_ANY, PermissionBits};

use crate::error::CliError;
use crate::tokenize::split_args;

/// Split `args` into at most `max` fields, failing with the command's
/// usage string when fewer than `min` are present.
pub fn fields<'a>(
    cmd: &str,
    args: &'a str,
    max: usize,
    min: usize,
    synopsis: &str,
) -> Result<Vec<&'a str>, CliError> {
    let fields = split_args(args, max);
    if fields.len() < min {
        return Err(CliError::Usage {
            usage: format!("{cmd} {synopsis}"),
        });
    }
    Ok(fields)
}

/// Parse a numeric id or handle.
pub fn parse_u32(cmd: &str, what: &'static str, raw: &str) -> Result<u32, CliError> {
    raw.parse().map_err(|_| CliError::InvalidArgument {
        cmd: cmd.to_owned(),
        what,
        value: raw.to_owned(),
    })
}

/// Object id in a permission entry. `-1` addresses every object.
pub fn parse_object(cmd: &str, raw: &str) -> Result<u32, CliError> {
    if raw == "-1" {
        return Ok(ID_ANY);
    }
    parse_u32(cmd, "object id", raw)
}

/// Permission bits, decimal or `0x` hexadecimal.
pub fn parse_bits(cmd: &str, raw: &str) -> Result<PermissionBits, CliError> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    };
    parsed
        .map(PermissionBits::from_bits_retain)
        .ok_or_else(|| CliError::InvalidArgument {
            cmd: cmd.to_owned(),
            what: "permission",
            value: raw.to_owned(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn too_few_fields_yield_the_usage_string() {
        let err = fields("cl", "1 2 3", 5, 4, "<node-id> <port> <node-id> <port> [<properties>]")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cl <node-id> <port> <node-id> <port> [<properties>]"
        );
        assert_eq!(fields("i", "all", 1, 1, "<object-id>|all").unwrap(), ["all"]);
    }

    #[test]
    fn permission_arguments() {
        assert_eq!(parse_object("sp", "-1").unwrap(), ID_ANY);
        assert_eq!(parse_object("sp", "40").unwrap(), 40);
        assert_eq!(parse_bits("sp", "0x100").unwrap(), PermissionBits::R);
        assert_eq!(parse_bits("sp", "448").unwrap(), PermissionBits::R | PermissionBits::W | PermissionBits::X);
        assert_eq!(
            parse_bits("sp", "rwx").unwrap_err().to_string(),
            "sp: invalid permission 'rwx'"
        );
    }
}
