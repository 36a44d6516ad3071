// ── Loopback object model ──
//
// Service-side objects of the in-process media service, plus the full and
// partial info updates they publish.

use serde_json::json;

use crate::info::{
    ClientChange, ClientInfo, CoreChange, CoreInfo, DeviceChange, DeviceInfo, EndpointChange,
    EndpointInfo, EndpointStreamChange, EndpointStreamInfo, FactoryChange, FactoryInfo,
    InfoUpdate, LinkChange, LinkInfo, ModuleChange, ModuleInfo, NodeChange, NodeInfo, PortChange,
    PortInfo, SessionChange, SessionInfo,
};
use crate::props::Properties;
use crate::types::{
    Direction, LinkState, NodeState, ParamFlags, ParamInfo, ParamType, Permission, PermissionBits,
    interface,
};

#[derive(Debug, Clone)]
pub(crate) struct CoreMeta {
    pub cookie: u32,
    pub user_name: String,
    pub host_name: String,
    pub version: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub(crate) enum Body {
    Core(CoreMeta),
    Module {
        name: String,
        filename: String,
        args: Option<String>,
    },
    Factory {
        name: String,
        object_type: String,
        version: u32,
    },
    Client {
        permissions: Vec<Permission>,
    },
    Device {
        params: Vec<ParamInfo>,
    },
    Node {
        state: NodeState,
        n_input_ports: u32,
        n_output_ports: u32,
        params: Vec<ParamInfo>,
    },
    Port {
        node_id: u32,
        direction: Direction,
        params: Vec<ParamInfo>,
    },
    Link {
        output_node_id: u32,
        output_port_id: u32,
        input_node_id: u32,
        input_port_id: u32,
        state: LinkState,
        format: Option<serde_json::Value>,
    },
    Session {
        params: Vec<ParamInfo>,
    },
    Endpoint {
        name: String,
        media_class: String,
        direction: Direction,
        n_streams: u32,
        session_id: u32,
        params: Vec<ParamInfo>,
    },
    EndpointStream {
        endpoint_id: u32,
        name: String,
        params: Vec<ParamInfo>,
    },
    Metadata,
}

#[derive(Debug, Clone)]
pub(crate) struct Object {
    pub id: u32,
    pub type_name: &'static str,
    pub version: u32,
    pub permissions: PermissionBits,
    pub props: Properties,
    /// Service-side connection that created the object, if any.
    pub owner: Option<u32>,
    pub body: Body,
}

impl Object {
    pub fn new(id: u32, type_name: &'static str, props: Properties, body: Body) -> Self {
        Self {
            id,
            type_name,
            version: 3,
            permissions: PermissionBits::ALL,
            props,
            owner: None,
            body,
        }
    }

    /// Full update with every field group flagged.
    pub fn full_info(&self) -> Option<InfoUpdate> {
        let id = self.id;
        let props = self.props.clone();
        let update = match &self.body {
            Body::Core(meta) => InfoUpdate::Core(CoreInfo {
                id,
                cookie: meta.cookie,
                user_name: meta.user_name.clone(),
                host_name: meta.host_name.clone(),
                version: meta.version.clone(),
                name: meta.name.clone(),
                change_mask: CoreChange::all(),
                props,
            }),
            Body::Module {
                name,
                filename,
                args,
            } => InfoUpdate::Module(ModuleInfo {
                id,
                name: name.clone(),
                filename: filename.clone(),
                args: args.clone(),
                change_mask: ModuleChange::all(),
                props,
            }),
            Body::Factory {
                name,
                object_type,
                version,
            } => InfoUpdate::Factory(FactoryInfo {
                id,
                name: name.clone(),
                object_type: object_type.clone(),
                version: *version,
                change_mask: FactoryChange::all(),
                props,
            }),
            Body::Client { .. } => InfoUpdate::Client(ClientInfo {
                id,
                change_mask: ClientChange::all(),
                props,
            }),
            Body::Device { params } => InfoUpdate::Device(DeviceInfo {
                id,
                change_mask: DeviceChange::all(),
                props,
                params: params.clone(),
            }),
            Body::Node {
                state,
                n_input_ports,
                n_output_ports,
                params,
            } => InfoUpdate::Node(NodeInfo {
                id,
                max_input_ports: *n_input_ports,
                max_output_ports: *n_output_ports,
                change_mask: NodeChange::all(),
                n_input_ports: *n_input_ports,
                n_output_ports: *n_output_ports,
                state: *state,
                error: None,
                props,
                params: params.clone(),
            }),
            Body::Port {
                direction, params, ..
            } => InfoUpdate::Port(PortInfo {
                id,
                direction: *direction,
                change_mask: PortChange::all(),
                props,
                params: params.clone(),
            }),
            Body::Link {
                output_node_id,
                output_port_id,
                input_node_id,
                input_port_id,
                state,
                format,
            } => InfoUpdate::Link(LinkInfo {
                id,
                output_node_id: *output_node_id,
                output_port_id: *output_port_id,
                input_node_id: *input_node_id,
                input_port_id: *input_port_id,
                change_mask: LinkChange::all(),
                state: *state,
                error: None,
                format: format.clone(),
                props,
            }),
            Body::Session { params } => InfoUpdate::Session(SessionInfo {
                id,
                change_mask: SessionChange::all(),
                props,
                params: params.clone(),
            }),
            Body::Endpoint {
                name,
                media_class,
                direction,
                n_streams,
                session_id,
                params,
            } => InfoUpdate::Endpoint(EndpointInfo {
                id,
                name: name.clone(),
                media_class: media_class.clone(),
                direction: *direction,
                flags: 0,
                change_mask: EndpointChange::all(),
                n_streams: *n_streams,
                session_id: *session_id,
                props,
                params: params.clone(),
            }),
            Body::EndpointStream {
                endpoint_id,
                name,
                params,
            } => InfoUpdate::EndpointStream(EndpointStreamInfo {
                id,
                endpoint_id: *endpoint_id,
                name: name.clone(),
                change_mask: EndpointStreamChange::PROPS | EndpointStreamChange::PARAMS,
                link_params: None,
                props,
                params: params.clone(),
            }),
            Body::Metadata => return None,
        };
        Some(update)
    }

    /// Partial update carrying only the property group.
    pub fn props_info(&self) -> Option<InfoUpdate> {
        let id = self.id;
        let props = self.props.clone();
        let update = match &self.body {
            Body::Core(_) => InfoUpdate::Core(CoreInfo {
                id,
                change_mask: CoreChange::PROPS,
                props,
                ..CoreInfo::default()
            }),
            Body::Module { .. } => InfoUpdate::Module(ModuleInfo {
                id,
                change_mask: ModuleChange::PROPS,
                props,
                ..ModuleInfo::default()
            }),
            Body::Factory { .. } => InfoUpdate::Factory(FactoryInfo {
                id,
                change_mask: FactoryChange::PROPS,
                props,
                ..FactoryInfo::default()
            }),
            Body::Client { .. } => InfoUpdate::Client(ClientInfo {
                id,
                change_mask: ClientChange::PROPS,
                props,
            }),
            Body::Device { .. } => InfoUpdate::Device(DeviceInfo {
                id,
                change_mask: DeviceChange::PROPS,
                props,
                params: Vec::new(),
            }),
            Body::Node { .. } => InfoUpdate::Node(NodeInfo {
                id,
                change_mask: NodeChange::PROPS,
                props,
                ..NodeInfo::default()
            }),
            Body::Port { .. } => InfoUpdate::Port(PortInfo {
                id,
                change_mask: PortChange::PROPS,
                props,
                ..PortInfo::default()
            }),
            Body::Link { .. } => InfoUpdate::Link(LinkInfo {
                id,
                change_mask: LinkChange::PROPS,
                props,
                ..LinkInfo::default()
            }),
            Body::Session { .. } => InfoUpdate::Session(SessionInfo {
                id,
                change_mask: SessionChange::PROPS,
                props,
                params: Vec::new(),
            }),
            Body::Endpoint { .. } => InfoUpdate::Endpoint(EndpointInfo {
                id,
                change_mask: EndpointChange::PROPS,
                props,
                ..EndpointInfo::default()
            }),
            Body::EndpointStream { .. } => InfoUpdate::EndpointStream(EndpointStreamInfo {
                id,
                change_mask: EndpointStreamChange::PROPS,
                props,
                ..EndpointStreamInfo::default()
            }),
            Body::Metadata => return None,
        };
        Some(update)
    }

    /// Parameter list, for kinds that have one.
    pub fn params(&self) -> Option<&[ParamInfo]> {
        match &self.body {
            Body::Device { params }
            | Body::Node { params, .. }
            | Body::Port { params, .. }
            | Body::Session { params }
            | Body::Endpoint { params, .. }
            | Body::EndpointStream { params, .. } => Some(params),
            _ => None,
        }
    }

    /// Whether `other` must go away when this object is destroyed.
    pub fn depends_on(&self, other: u32) -> bool {
        match &self.body {
            Body::Port { node_id, .. } => *node_id == other,
            Body::Link {
                output_node_id,
                output_port_id,
                input_node_id,
                input_port_id,
                ..
            } => [
                *output_node_id,
                *output_port_id,
                *input_node_id,
                *input_port_id,
            ]
            .contains(&other),
            Body::EndpointStream { endpoint_id, .. } => *endpoint_id == other,
            _ => false,
        }
    }
}

// ── Builders ────────────────────────────────────────────────────────

pub(crate) fn node_params() -> Vec<ParamInfo> {
    vec![
        ParamInfo::new(ParamType::PropInfo, ParamFlags::READ),
        ParamInfo::new(ParamType::Props, ParamFlags::READWRITE),
        ParamInfo::new(ParamType::EnumFormat, ParamFlags::READ),
        ParamInfo::new(ParamType::Format, ParamFlags::READWRITE),
    ]
}

pub(crate) fn port_params() -> Vec<ParamInfo> {
    vec![
        ParamInfo::new(ParamType::EnumFormat, ParamFlags::READ),
        ParamInfo::new(ParamType::Meta, ParamFlags::READ),
        ParamInfo::new(ParamType::Io, ParamFlags::READ),
        ParamInfo::new(ParamType::Format, ParamFlags::READWRITE),
        ParamInfo::new(ParamType::Buffers, ParamFlags::READ),
    ]
}

pub(crate) fn device_params() -> Vec<ParamInfo> {
    vec![
        ParamInfo::new(ParamType::EnumProfile, ParamFlags::READ),
        ParamInfo::new(ParamType::Profile, ParamFlags::READWRITE),
        ParamInfo::new(ParamType::EnumRoute, ParamFlags::READ),
        ParamInfo::new(ParamType::Route, ParamFlags::READWRITE),
    ]
}

/// Input and output port counts implied by a node's media class.
pub(crate) fn port_layout(props: &Properties) -> (u32, u32) {
    match props.get("media.class") {
        Some(class) if class.contains("Duplex") => (2, 2),
        Some(class) if class.contains("Sink") => (2, 0),
        Some(class) if class.contains("Source") => (0, 2),
        _ => (0, 0),
    }
}

pub(crate) fn port_props(node_id: u32, index: u32, direction: Direction) -> Properties {
    let channel = if index % 2 == 0 { "FL" } else { "FR" };
    let (prefix, dir) = match direction {
        Direction::Input => ("playback", "in"),
        Direction::Output => ("capture", "out"),
    };
    [
        ("port.name", format!("{prefix}_{channel}")),
        ("port.direction", dir.to_owned()),
        ("port.id", index.to_string()),
        ("node.id", node_id.to_string()),
        ("audio.channel", channel.to_owned()),
        ("format.dsp", "32 bit float mono audio".to_owned()),
    ]
    .into_iter()
    .collect()
}

pub(crate) fn module_object(id: u32, name: &str, args: Option<&str>) -> Object {
    let filename = format!("/usr/lib/pipewire-0.3/{name}.so");
    let props: Properties = [
        ("module.name", name.to_owned()),
        ("object.id", id.to_string()),
    ]
    .into_iter()
    .collect();
    let mut obj = Object::new(
        id,
        interface::MODULE,
        props,
        Body::Module {
            name: name.to_owned(),
            filename,
            args: args.map(str::to_owned),
        },
    );
    obj.permissions = PermissionBits::R | PermissionBits::X;
    obj
}

pub(crate) fn factory_object(id: u32, name: &str, object_type: &str, module_id: u32) -> Object {
    let props: Properties = [
        ("factory.name", name.to_owned()),
        ("factory.type.name", object_type.to_owned()),
        ("module.id", module_id.to_string()),
    ]
    .into_iter()
    .collect();
    let mut obj = Object::new(
        id,
        interface::FACTORY,
        props,
        Body::Factory {
            name: name.to_owned(),
            object_type: object_type.to_owned(),
            version: 3,
        },
    );
    obj.permissions = PermissionBits::R | PermissionBits::X;
    obj
}

pub(crate) fn client_object(id: u32, connect_props: &Properties) -> Object {
    let mut props: Properties = [
        ("pipewire.protocol", "protocol-native"),
        ("application.name", "pwmirror"),
    ]
    .into_iter()
    .collect();
    props.update(connect_props);
    props.set("object.id", id.to_string());
    Object::new(
        id,
        interface::CLIENT,
        props,
        Body::Client {
            permissions: vec![Permission::new(crate::types::ID_ANY, PermissionBits::ALL)],
        },
    )
}

// ── Param payloads ──────────────────────────────────────────────────

/// Representative payload for a parameter of the given object.
pub(crate) fn param_payload(object: &Object, param_id: u32) -> serde_json::Value {
    let Some(kind) = ParamType::from_repr(param_id) else {
        return json!({ "object": "Unknown", "id": param_id });
    };
    match kind {
        ParamType::EnumFormat => json!({
            "object": "EnumFormat",
            "mediaType": "audio",
            "mediaSubtype": "raw",
            "format": ["F32P", "F32", "S16"],
            "rate": { "default": 48000, "min": 1, "max": 384_000 },
            "channels": 2,
        }),
        ParamType::Format => json!({
            "object": "Format",
            "mediaType": "audio",
            "mediaSubtype": "raw",
            "format": "F32P",
            "rate": 48000,
            "channels": if matches!(object.body, Body::Port { .. }) { 1 } else { 2 },
        }),
        ParamType::Props => json!({ "object": "Props", "volume": 1.0, "mute": false }),
        ParamType::PropInfo => json!({
            "object": "PropInfo",
            "id": "volume",
            "description": "Volume",
            "range": { "default": 1.0, "min": 0.0, "max": 10.0 },
        }),
        ParamType::EnumProfile | ParamType::Profile => json!({
            "object": kind.to_string(),
            "index": 1,
            "name": "output:analog-stereo",
            "description": "Analog Stereo Output",
            "priority": 6500,
        }),
        ParamType::EnumRoute | ParamType::Route => json!({
            "object": kind.to_string(),
            "index": 0,
            "direction": "output",
            "name": "analog-output-speaker",
            "description": "Speakers",
        }),
        ParamType::Buffers => json!({
            "object": "Buffers",
            "buffers": { "default": 2, "min": 1, "max": 32 },
            "blocks": 1,
            "size": 8192,
            "stride": 4,
        }),
        ParamType::Meta => json!({ "object": "Meta", "type": "Header", "size": 32 }),
        ParamType::Io => json!({ "object": "IO", "id": "Buffers", "size": 8 }),
        other => json!({ "object": other.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_layout_follows_media_class() {
        let sink: Properties = [("media.class", "Audio/Sink")].into_iter().collect();
        let source: Properties = [("media.class", "Audio/Source")].into_iter().collect();
        let duplex: Properties = [("media.class", "Audio/Duplex")].into_iter().collect();
        assert_eq!(port_layout(&sink), (2, 0));
        assert_eq!(port_layout(&source), (0, 2));
        assert_eq!(port_layout(&duplex), (2, 2));
        assert_eq!(port_layout(&Properties::new()), (0, 0));
    }

    #[test]
    fn props_info_only_flags_props() {
        let obj = Object::new(
            9,
            interface::NODE,
            [("node.name", "x")].into_iter().collect(),
            Body::Node {
                state: NodeState::Running,
                n_input_ports: 2,
                n_output_ports: 0,
                params: node_params(),
            },
        );
        let Some(InfoUpdate::Node(info)) = obj.props_info() else {
            panic!("expected node update");
        };
        assert_eq!(info.change_mask, NodeChange::PROPS);
        assert!(info.params.is_empty());
        assert_eq!(info.props.get("node.name"), Some("x"));
    }

    #[test]
    fn links_depend_on_their_endpoints() {
        let link = Object::new(
            20,
            interface::LINK,
            Properties::new(),
            Body::Link {
                output_node_id: 1,
                output_port_id: 2,
                input_node_id: 3,
                input_port_id: 4,
                state: LinkState::Init,
                format: None,
            },
        );
        assert!(link.depends_on(3));
        assert!(!link.depends_on(5));
    }
}
