// ── Core error types ──
//
// Failures surfaced to command handlers. Transport errors are folded into
// `Transport` so callers never match on `pwmirror_api::Error` directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lookup errors ────────────────────────────────────────────────
    #[error("unknown global {id}")]
    UnknownGlobal { id: u32 },

    #[error("unknown variable {id}")]
    UnknownVariable { id: u32 },

    #[error("{0}")]
    NotFound(String),

    #[error("no remote connected")]
    NoRemote,

    // ── Type errors ──────────────────────────────────────────────────
    #[error("unsupported type {type_name}")]
    UnsupportedType { type_name: String },

    #[error("{0}")]
    WrongType(String),

    // ── Object lifecycle ─────────────────────────────────────────────
    #[error("object {handle} has been destroyed")]
    StaleHandle { handle: u32 },

    #[error("Could not load module")]
    ModuleLoad { name: String },

    // ── Transport ────────────────────────────────────────────────────
    #[error("{message}")]
    Transport { code: i32, message: String },
}

impl CoreError {
    /// Registry or variable-table miss. Handlers prefix these with the
    /// command name when echoing them.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::UnknownGlobal { .. } | Self::UnknownVariable { .. })
    }
}

impl From<pwmirror_api::Error> for CoreError {
    fn from(err: pwmirror_api::Error) -> Self {
        CoreError::Transport {
            code: err.code(),
            message: err.to_string(),
        }
    }
}
