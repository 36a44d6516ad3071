//! CLI error types with miette diagnostics.
//!
//! Console commands echo these as `Error: "<message>"` and carry on; only
//! process-level failures reach `main` and its exit-code table.

use miette::Diagnostic;
use thiserror::Error;

use pwmirror_config::ConfigError;
use pwmirror_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Command line ─────────────────────────────────────────────────
    /// Arity failure; the message is the command's usage string.
    #[error("{usage}")]
    #[diagnostic(code(pwmirror::usage))]
    Usage { usage: String },

    #[error("Command \"{cmd}\" does not exist. Type 'help' for usage.")]
    #[diagnostic(code(pwmirror::unknown_command))]
    UnknownCommand { cmd: String },

    #[error("Command \"{cmd}\" not yet implemented")]
    #[diagnostic(code(pwmirror::not_implemented))]
    NotImplemented { cmd: String },

    #[error("{cmd}: invalid {what} '{value}'")]
    #[diagnostic(code(pwmirror::invalid_argument))]
    InvalidArgument {
        cmd: String,
        what: &'static str,
        value: String,
    },

    // ── Object graph ─────────────────────────────────────────────────
    /// Registry or variable miss, prefixed with the command name.
    #[error("{cmd}: {source}")]
    #[diagnostic(
        code(pwmirror::not_found),
        help("Run: list-objects to see the current remote's objects")
    )]
    Lookup {
        cmd: String,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    #[diagnostic(code(pwmirror::core))]
    Core(#[from] CoreError),

    #[error("remote {remote} was lost: {message}")]
    #[diagnostic(
        code(pwmirror::connection_lost),
        help("Check that the media service is still running.")
    )]
    ConnectionLost { remote: u32, message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(pwmirror::config),
        help("Check the config file, or point --config at another one.")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Attach the command name to registry and variable misses.
    pub fn in_command(self, cmd: &str) -> Self {
        match self {
            Self::Core(source) if source.is_lookup() => Self::Lookup {
                cmd: cmd.to_owned(),
                source,
            },
            other => other,
        }
    }

    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. } | Self::UnknownCommand { .. } | Self::InvalidArgument { .. } => {
                exit_code::USAGE
            }
            Self::Lookup { .. }
            | Self::Core(CoreError::NotFound(_) | CoreError::StaleHandle { .. }) => {
                exit_code::NOT_FOUND
            }
            Self::NotImplemented { .. }
            | Self::Core(CoreError::WrongType(_) | CoreError::UnsupportedType { .. }) => {
                exit_code::UNSUPPORTED
            }
            Self::ConnectionLost { .. }
            | Self::Core(CoreError::NoRemote | CoreError::Transport { .. }) => {
                exit_code::CONNECTION
            }
            _ => exit_code::GENERAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_prefixed_with_the_command() {
        let err = CliError::from(CoreError::UnknownGlobal { id: 999 }).in_command("info");
        assert_eq!(err.to_string(), "info: unknown global 999");
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn other_core_errors_pass_through() {
        let err = CliError::from(CoreError::WrongType("object 3 is not a client".into()))
            .in_command("permissions");
        assert_eq!(err.to_string(), "object 3 is not a client");
        assert_eq!(err.exit_code(), exit_code::UNSUPPORTED);
    }

    #[test]
    fn console_messages() {
        let err = CliError::UnknownCommand { cmd: "frob".into() };
        assert_eq!(
            err.to_string(),
            "Command \"frob\" does not exist. Type 'help' for usage."
        );
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert_eq!(
            CliError::NotImplemented { cmd: "um".into() }.to_string(),
            "Command \"um\" not yet implemented"
        );
    }
}
