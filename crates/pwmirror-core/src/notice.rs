// ── Notices ──
//
// Everything the session wants shown to the user, in the order it
// happened. The view layer decides how each one is printed.

use pwmirror_api::Permission;
use serde::Serialize;

use crate::model::{Global, ObjectKind, Snapshot};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "notice", rename_all = "kebab-case")]
pub enum Notice {
    /// The server reported its name for connection `remote`.
    RemoteNamed { remote: u32, name: String },

    /// The current connection's barrier completed; input may resume.
    Prompt { name: String },

    GlobalAdded { remote: u32, global: Global },

    GlobalRemoved { remote: u32, global: Global },

    UnknownGlobalRemoved { remote: u32, id: u32 },

    /// An update arrived for an object that already had a snapshot.
    Changed {
        remote: u32,
        kind: ObjectKind,
        id: u32,
    },

    /// Render one object. `global` is the registry header when the object
    /// is known there.
    ShowInfo {
        remote: u32,
        global: Option<Global>,
        snapshot: Snapshot,
    },

    Param {
        remote: u32,
        object: u32,
        param_id: u32,
        index: u32,
        payload: serde_json::Value,
    },

    Permissions {
        remote: u32,
        object: u32,
        index: u32,
        permissions: Vec<Permission>,
    },

    /// A recoverable failure outside any command.
    Error { message: String },

    /// One object of `info all` could not be shown.
    InfoFailed { message: String },

    /// Connection `remote` died and was torn down.
    ConnectionLost { remote: u32, message: String },
}
