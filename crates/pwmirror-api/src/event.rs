// ── Transport events ──
//
// Everything the service tells a connection arrives as one of these,
// wrapped in an `Envelope` naming the connection slot it belongs to.

use serde::{Deserialize, Serialize};

use crate::info::{CoreInfo, InfoUpdate};
use crate::props::Properties;
use crate::transport::ProxyId;
use crate::types::{Permission, PermissionBits};

/// An event tagged with the client-assigned slot of its connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub remote: u32,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    /// Server-level info for the connection itself.
    RemoteInfo(CoreInfo),

    /// Completion of a `sync` barrier.
    Done { id: u32, seq: u32 },

    /// Error raised against object `id`. `id == 0` means the connection
    /// itself is unusable.
    Error {
        id: u32,
        seq: u32,
        res: i32,
        message: String,
    },

    GlobalAdded {
        id: u32,
        permissions: PermissionBits,
        type_name: String,
        version: u32,
        props: Option<Properties>,
    },

    GlobalRemoved { id: u32 },

    /// A proxy was attached to a service-side global.
    Bound { proxy: ProxyId, global_id: u32 },

    Info { proxy: ProxyId, update: InfoUpdate },

    Param {
        proxy: ProxyId,
        seq: u32,
        id: u32,
        index: u32,
        next: u32,
        param: serde_json::Value,
    },

    Permissions {
        proxy: ProxyId,
        index: u32,
        permissions: Vec<Permission>,
    },

    /// The service-side object behind a proxy is gone.
    ProxyRemoved { proxy: ProxyId },
}

impl Event {
    /// Proxy the event is addressed to, if it targets one.
    pub fn proxy(&self) -> Option<ProxyId> {
        match self {
            Self::Bound { proxy, .. }
            | Self::Info { proxy, .. }
            | Self::Param { proxy, .. }
            | Self::Permissions { proxy, .. }
            | Self::ProxyRemoved { proxy } => Some(*proxy),
            _ => None,
        }
    }
}
