// ── Per-kind info updates ──
//
// Each object kind announces its state through one info shape. An update
// carries a change mask naming which field groups it replaces; fields
// outside the mask are meaningless in the update and must be ignored by
// the receiver. Identity fields (id, names, directions) are only read when
// a snapshot is first seeded.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::props::Properties;
use crate::types::{Direction, LinkState, NodeState, ParamInfo};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct CoreChange: u64 {
        const PROPS = 1 << 0;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct ModuleChange: u64 {
        const PROPS = 1 << 0;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct DeviceChange: u64 {
        const PROPS = 1 << 0;
        const PARAMS = 1 << 1;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct NodeChange: u64 {
        const INPUT_PORTS = 1 << 0;
        const OUTPUT_PORTS = 1 << 1;
        const STATE = 1 << 2;
        const PROPS = 1 << 3;
        const PARAMS = 1 << 4;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct PortChange: u64 {
        const PROPS = 1 << 0;
        const PARAMS = 1 << 1;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct FactoryChange: u64 {
        const PROPS = 1 << 0;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct ClientChange: u64 {
        const PROPS = 1 << 0;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct LinkChange: u64 {
        const STATE = 1 << 0;
        const FORMAT = 1 << 1;
        const PROPS = 1 << 2;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct SessionChange: u64 {
        const PROPS = 1 << 0;
        const PARAMS = 1 << 1;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct EndpointChange: u64 {
        const STREAMS = 1 << 0;
        const SESSION = 1 << 1;
        const PROPS = 1 << 2;
        const PARAMS = 1 << 3;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct EndpointStreamChange: u64 {
        const LINK_PARAMS = 1 << 0;
        const PROPS = 1 << 1;
        const PARAMS = 1 << 2;
    }
}

// ── Info shapes ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreInfo {
    pub id: u32,
    pub cookie: u32,
    pub user_name: String,
    pub host_name: String,
    pub version: String,
    pub name: String,
    pub change_mask: CoreChange,
    pub props: Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub id: u32,
    pub name: String,
    pub filename: String,
    pub args: Option<String>,
    pub change_mask: ModuleChange,
    pub props: Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: u32,
    pub change_mask: DeviceChange,
    pub props: Properties,
    pub params: Vec<ParamInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: u32,
    pub max_input_ports: u32,
    pub max_output_ports: u32,
    pub change_mask: NodeChange,
    pub n_input_ports: u32,
    pub n_output_ports: u32,
    pub state: NodeState,
    pub error: Option<String>,
    pub props: Properties,
    pub params: Vec<ParamInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortInfo {
    pub id: u32,
    pub direction: Direction,
    pub change_mask: PortChange,
    pub props: Properties,
    pub params: Vec<ParamInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactoryInfo {
    pub id: u32,
    pub name: String,
    pub object_type: String,
    pub version: u32,
    pub change_mask: FactoryChange,
    pub props: Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: u32,
    pub change_mask: ClientChange,
    pub props: Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub id: u32,
    pub output_node_id: u32,
    pub output_port_id: u32,
    pub input_node_id: u32,
    pub input_port_id: u32,
    pub change_mask: LinkChange,
    pub state: LinkState,
    pub error: Option<String>,
    pub format: Option<serde_json::Value>,
    pub props: Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: u32,
    pub change_mask: SessionChange,
    pub props: Properties,
    pub params: Vec<ParamInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub id: u32,
    pub name: String,
    pub media_class: String,
    pub direction: Direction,
    pub flags: u32,
    pub change_mask: EndpointChange,
    pub n_streams: u32,
    pub session_id: u32,
    pub props: Properties,
    pub params: Vec<ParamInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointStreamInfo {
    pub id: u32,
    pub endpoint_id: u32,
    pub name: String,
    pub change_mask: EndpointStreamChange,
    pub link_params: Option<serde_json::Value>,
    pub props: Properties,
    pub params: Vec<ParamInfo>,
}

// ── Tagged update ───────────────────────────────────────────────────

/// An info update for any of the eleven object kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InfoUpdate {
    Core(CoreInfo),
    Module(ModuleInfo),
    Device(DeviceInfo),
    Node(NodeInfo),
    Port(PortInfo),
    Factory(FactoryInfo),
    Client(ClientInfo),
    Link(LinkInfo),
    Session(SessionInfo),
    Endpoint(EndpointInfo),
    EndpointStream(EndpointStreamInfo),
}

impl InfoUpdate {
    /// Object id the update describes.
    pub fn id(&self) -> u32 {
        match self {
            Self::Core(i) => i.id,
            Self::Module(i) => i.id,
            Self::Device(i) => i.id,
            Self::Node(i) => i.id,
            Self::Port(i) => i.id,
            Self::Factory(i) => i.id,
            Self::Client(i) => i.id,
            Self::Link(i) => i.id,
            Self::Session(i) => i.id,
            Self::Endpoint(i) => i.id,
            Self::EndpointStream(i) => i.id,
        }
    }

    /// Raw change mask bits, whatever the kind.
    pub fn change_bits(&self) -> u64 {
        match self {
            Self::Core(i) => i.change_mask.bits(),
            Self::Module(i) => i.change_mask.bits(),
            Self::Device(i) => i.change_mask.bits(),
            Self::Node(i) => i.change_mask.bits(),
            Self::Port(i) => i.change_mask.bits(),
            Self::Factory(i) => i.change_mask.bits(),
            Self::Client(i) => i.change_mask.bits(),
            Self::Link(i) => i.change_mask.bits(),
            Self::Session(i) => i.change_mask.bits(),
            Self::Endpoint(i) => i.change_mask.bits(),
            Self::EndpointStream(i) => i.change_mask.bits(),
        }
    }

    /// Short lowercase kind label used in change notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Core(_) => "core",
            Self::Module(_) => "module",
            Self::Device(_) => "device",
            Self::Node(_) => "node",
            Self::Port(_) => "port",
            Self::Factory(_) => "factory",
            Self::Client(_) => "client",
            Self::Link(_) => "link",
            Self::Session(_) => "session",
            Self::Endpoint(_) => "endpoint",
            Self::EndpointStream(_) => "endpoint-stream",
        }
    }
}
