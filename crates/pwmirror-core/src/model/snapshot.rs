// ── Info merge engine ──
//
// Folds partial info updates into per-proxy snapshots. Each field group is
// replaced wholesale when the update's change mask flags it and left alone
// otherwise. Identity fields are copied once, when the snapshot is seeded.
// After a merge the snapshot's mask names exactly the groups that update
// touched; rendering clears it.

use pwmirror_api::info::{
    ClientChange, ClientInfo, CoreChange, CoreInfo, DeviceChange, DeviceInfo, EndpointChange,
    EndpointInfo, EndpointStreamChange, EndpointStreamInfo, FactoryChange, FactoryInfo, LinkChange,
    LinkInfo, ModuleChange, ModuleInfo, NodeChange, NodeInfo, PortChange, PortInfo, SessionChange,
    SessionInfo,
};
use pwmirror_api::InfoUpdate;
use serde::Serialize;

use super::ObjectKind;
use crate::error::CoreError;

/// Per-kind merge behaviour.
pub trait MergeInfo: Clone {
    /// Empty snapshot carrying only the update's identity fields.
    fn seed(update: &Self) -> Self;

    /// Replace every group the update flags.
    fn apply(&mut self, update: &Self);

    fn clear_changes(&mut self);

    /// Seed if needed, then apply.
    fn fold(existing: Option<Self>, update: &Self) -> Self {
        let mut snapshot = existing.unwrap_or_else(|| Self::seed(update));
        snapshot.apply(update);
        snapshot
    }
}

impl MergeInfo for CoreInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            cookie: update.cookie,
            user_name: update.user_name.clone(),
            host_name: update.host_name.clone(),
            version: update.version.clone(),
            name: update.name.clone(),
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        if update.change_mask.contains(CoreChange::PROPS) {
            self.props = update.props.clone();
        }
        self.change_mask = update.change_mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = CoreChange::empty();
    }
}

impl MergeInfo for ModuleInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            name: update.name.clone(),
            filename: update.filename.clone(),
            args: update.args.clone(),
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        if update.change_mask.contains(ModuleChange::PROPS) {
            self.props = update.props.clone();
        }
        self.change_mask = update.change_mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = ModuleChange::empty();
    }
}

impl MergeInfo for DeviceInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        if update.change_mask.contains(DeviceChange::PROPS) {
            self.props = update.props.clone();
        }
        if update.change_mask.contains(DeviceChange::PARAMS) {
            self.params = update.params.clone();
        }
        self.change_mask = update.change_mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = DeviceChange::empty();
    }
}

impl MergeInfo for NodeInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            max_input_ports: update.max_input_ports,
            max_output_ports: update.max_output_ports,
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        let mask = update.change_mask;
        if mask.contains(NodeChange::INPUT_PORTS) {
            self.max_input_ports = update.max_input_ports;
            self.n_input_ports = update.n_input_ports;
        }
        if mask.contains(NodeChange::OUTPUT_PORTS) {
            self.max_output_ports = update.max_output_ports;
            self.n_output_ports = update.n_output_ports;
        }
        if mask.contains(NodeChange::STATE) {
            self.state = update.state;
            self.error.clone_from(&update.error);
        }
        if mask.contains(NodeChange::PROPS) {
            self.props = update.props.clone();
        }
        if mask.contains(NodeChange::PARAMS) {
            self.params = update.params.clone();
        }
        self.change_mask = mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = NodeChange::empty();
    }
}

impl MergeInfo for PortInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            direction: update.direction,
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        if update.change_mask.contains(PortChange::PROPS) {
            self.props = update.props.clone();
        }
        if update.change_mask.contains(PortChange::PARAMS) {
            self.params = update.params.clone();
        }
        self.change_mask = update.change_mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = PortChange::empty();
    }
}

impl MergeInfo for FactoryInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            name: update.name.clone(),
            object_type: update.object_type.clone(),
            version: update.version,
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        if update.change_mask.contains(FactoryChange::PROPS) {
            self.props = update.props.clone();
        }
        self.change_mask = update.change_mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = FactoryChange::empty();
    }
}

impl MergeInfo for ClientInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        if update.change_mask.contains(ClientChange::PROPS) {
            self.props = update.props.clone();
        }
        self.change_mask = update.change_mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = ClientChange::empty();
    }
}

impl MergeInfo for LinkInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            output_node_id: update.output_node_id,
            output_port_id: update.output_port_id,
            input_node_id: update.input_node_id,
            input_port_id: update.input_port_id,
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        let mask = update.change_mask;
        if mask.contains(LinkChange::STATE) {
            self.state = update.state;
            self.error.clone_from(&update.error);
        }
        if mask.contains(LinkChange::FORMAT) {
            self.format.clone_from(&update.format);
        }
        if mask.contains(LinkChange::PROPS) {
            self.props = update.props.clone();
        }
        self.change_mask = mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = LinkChange::empty();
    }
}

impl MergeInfo for SessionInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        if update.change_mask.contains(SessionChange::PROPS) {
            self.props = update.props.clone();
        }
        if update.change_mask.contains(SessionChange::PARAMS) {
            self.params = update.params.clone();
        }
        self.change_mask = update.change_mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = SessionChange::empty();
    }
}

impl MergeInfo for EndpointInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            name: update.name.clone(),
            media_class: update.media_class.clone(),
            direction: update.direction,
            flags: update.flags,
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        let mask = update.change_mask;
        if mask.contains(EndpointChange::STREAMS) {
            self.n_streams = update.n_streams;
        }
        if mask.contains(EndpointChange::SESSION) {
            self.session_id = update.session_id;
        }
        if mask.contains(EndpointChange::PROPS) {
            self.props = update.props.clone();
        }
        if mask.contains(EndpointChange::PARAMS) {
            self.params = update.params.clone();
        }
        self.change_mask = mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = EndpointChange::empty();
    }
}

impl MergeInfo for EndpointStreamInfo {
    fn seed(update: &Self) -> Self {
        Self {
            id: update.id,
            endpoint_id: update.endpoint_id,
            name: update.name.clone(),
            ..Self::default()
        }
    }

    fn apply(&mut self, update: &Self) {
        let mask = update.change_mask;
        if mask.contains(EndpointStreamChange::LINK_PARAMS) {
            self.link_params.clone_from(&update.link_params);
        }
        if mask.contains(EndpointStreamChange::PROPS) {
            self.props = update.props.clone();
        }
        if mask.contains(EndpointStreamChange::PARAMS) {
            self.params = update.params.clone();
        }
        self.change_mask = mask;
    }

    fn clear_changes(&mut self) {
        self.change_mask = EndpointStreamChange::empty();
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Accumulated info of one proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Snapshot {
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

macro_rules! each_kind {
    ($value:expr, $info:ident => $body:expr) => {
        match $value {
            Snapshot::Core($info) => $body,
            Snapshot::Module($info) => $body,
            Snapshot::Device($info) => $body,
            Snapshot::Node($info) => $body,
            Snapshot::Port($info) => $body,
            Snapshot::Factory($info) => $body,
            Snapshot::Client($info) => $body,
            Snapshot::Link($info) => $body,
            Snapshot::Session($info) => $body,
            Snapshot::Endpoint($info) => $body,
            Snapshot::EndpointStream($info) => $body,
        }
    };
}

impl Snapshot {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Core(_) => ObjectKind::Core,
            Self::Module(_) => ObjectKind::Module,
            Self::Device(_) => ObjectKind::Device,
            Self::Node(_) => ObjectKind::Node,
            Self::Port(_) => ObjectKind::Port,
            Self::Factory(_) => ObjectKind::Factory,
            Self::Client(_) => ObjectKind::Client,
            Self::Link(_) => ObjectKind::Link,
            Self::Session(_) => ObjectKind::Session,
            Self::Endpoint(_) => ObjectKind::Endpoint,
            Self::EndpointStream(_) => ObjectKind::EndpointStream,
        }
    }

    pub fn id(&self) -> u32 {
        each_kind!(self, info => info.id)
    }

    pub fn change_bits(&self) -> u64 {
        each_kind!(self, info => info.change_mask.bits())
    }

    pub fn clear_changes(&mut self) {
        each_kind!(self, info => info.clear_changes());
    }
}

/// Fold `update` into `existing`, seeding a fresh snapshot when there is
/// none. An update of another kind than the snapshot is rejected.
pub fn merge(existing: Option<Snapshot>, update: &InfoUpdate) -> Result<Snapshot, CoreError> {
    let merged = match (existing, update) {
        (None, u) => seed(u),
        (Some(Snapshot::Core(s)), InfoUpdate::Core(u)) => Snapshot::Core(CoreInfo::fold(Some(s), u)),
        (Some(Snapshot::Module(s)), InfoUpdate::Module(u)) => {
            Snapshot::Module(ModuleInfo::fold(Some(s), u))
        }
        (Some(Snapshot::Device(s)), InfoUpdate::Device(u)) => {
            Snapshot::Device(DeviceInfo::fold(Some(s), u))
        }
        (Some(Snapshot::Node(s)), InfoUpdate::Node(u)) => Snapshot::Node(NodeInfo::fold(Some(s), u)),
        (Some(Snapshot::Port(s)), InfoUpdate::Port(u)) => Snapshot::Port(PortInfo::fold(Some(s), u)),
        (Some(Snapshot::Factory(s)), InfoUpdate::Factory(u)) => {
            Snapshot::Factory(FactoryInfo::fold(Some(s), u))
        }
        (Some(Snapshot::Client(s)), InfoUpdate::Client(u)) => {
            Snapshot::Client(ClientInfo::fold(Some(s), u))
        }
        (Some(Snapshot::Link(s)), InfoUpdate::Link(u)) => Snapshot::Link(LinkInfo::fold(Some(s), u)),
        (Some(Snapshot::Session(s)), InfoUpdate::Session(u)) => {
            Snapshot::Session(SessionInfo::fold(Some(s), u))
        }
        (Some(Snapshot::Endpoint(s)), InfoUpdate::Endpoint(u)) => {
            Snapshot::Endpoint(EndpointInfo::fold(Some(s), u))
        }
        (Some(Snapshot::EndpointStream(s)), InfoUpdate::EndpointStream(u)) => {
            Snapshot::EndpointStream(EndpointStreamInfo::fold(Some(s), u))
        }
        (Some(existing), u) => {
            return Err(CoreError::WrongType(format!(
                "{} update for {} object {}",
                u.label(),
                existing.kind(),
                existing.id()
            )));
        }
    };
    Ok(merged)
}

fn seed(update: &InfoUpdate) -> Snapshot {
    match update {
        InfoUpdate::Core(u) => Snapshot::Core(CoreInfo::fold(None, u)),
        InfoUpdate::Module(u) => Snapshot::Module(ModuleInfo::fold(None, u)),
        InfoUpdate::Device(u) => Snapshot::Device(DeviceInfo::fold(None, u)),
        InfoUpdate::Node(u) => Snapshot::Node(NodeInfo::fold(None, u)),
        InfoUpdate::Port(u) => Snapshot::Port(PortInfo::fold(None, u)),
        InfoUpdate::Factory(u) => Snapshot::Factory(FactoryInfo::fold(None, u)),
        InfoUpdate::Client(u) => Snapshot::Client(ClientInfo::fold(None, u)),
        InfoUpdate::Link(u) => Snapshot::Link(LinkInfo::fold(None, u)),
        InfoUpdate::Session(u) => Snapshot::Session(SessionInfo::fold(None, u)),
        InfoUpdate::Endpoint(u) => Snapshot::Endpoint(EndpointInfo::fold(None, u)),
        InfoUpdate::EndpointStream(u) => {
            Snapshot::EndpointStream(EndpointStreamInfo::fold(None, u))
        }
    }
}
