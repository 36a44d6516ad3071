// ── Transport-layer errors ──
//
// Failures the transport reports synchronously, at request time. Failures
// the service detects later arrive as `Event::Error` instead, carrying the
// same negative errno-style codes.

use thiserror::Error;

/// errno-style result codes shared by synchronous errors and error events.
pub mod errno {
    pub const EPERM: i32 = 1;
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const EINVAL: i32 = 22;
    pub const EPIPE: i32 = 32;
    pub const EPROTO: i32 = 71;
    pub const ENOTSUP: i32 = 95;
    pub const ECONNRESET: i32 = 104;
    pub const ECONNREFUSED: i32 = 111;

    /// Human-readable description of a (positive or negative) errno code.
    pub fn describe(code: i32) -> &'static str {
        match code.abs() {
            EPERM => "Operation not permitted",
            ENOENT => "No such file or directory",
            EIO => "Input/output error",
            EINVAL => "Invalid argument",
            EPIPE => "Broken pipe",
            EPROTO => "Protocol error",
            ENOTSUP => "Operation not supported",
            ECONNRESET => "Connection reset by peer",
            ECONNREFUSED => "Connection refused",
            _ => "Unknown error",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to connect: {reason}")]
    ConnectionRefused { reason: String },

    #[error("remote is disconnected")]
    Disconnected,

    #[error("unknown proxy {0}")]
    UnknownProxy(u32),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Negative errno-style code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::ConnectionRefused { .. } => -errno::ECONNREFUSED,
            Self::Disconnected => -errno::EPIPE,
            Self::UnknownProxy(_) => -errno::ENOENT,
            Self::InvalidArgument(_) => -errno::EINVAL,
            Self::NotSupported(_) => -errno::ENOTSUP,
        }
    }
}
