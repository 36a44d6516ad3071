// ── Loopback service state ──
//
// One object graph shared by every connection. Requests mutate it and
// queue the resulting events on the affected connections' sinks in the
// order they happen, so a `Done` always trails the effects of the requests
// issued before its `sync`.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::{debug, info};

use super::objects::{
    Body, CoreMeta, Object, client_object, device_params, factory_object, module_object,
    node_params, param_payload, port_layout, port_params, port_props,
};
use crate::error::{Error, errno};
use crate::event::Event;
use crate::info::{CoreInfo, InfoUpdate, LinkChange, LinkInfo, NodeChange, NodeInfo};
use crate::props::Properties;
use crate::transport::{EventSink, ExportedObject, ProxyId};
use crate::types::{Direction, LinkState, NodeState, Permission, PermissionBits, interface};

/// Proxy id the registry occupies on every connection. Failures of registry
/// requests are reported against it.
pub(crate) const REGISTRY_PROXY: ProxyId = 1;
const FIRST_PROXY: ProxyId = 2;

/// Modules loaded at startup and the factories each one provides.
const CATALOG: &[(&str, &[(&str, &str)])] = &[
    ("libpipewire-module-protocol-native", &[]),
    (
        "libpipewire-module-client-node",
        &[("client-node", interface::NODE)],
    ),
    ("libpipewire-module-adapter", &[("adapter", interface::NODE)]),
    (
        "libpipewire-module-link-factory",
        &[("link-factory", interface::LINK)],
    ),
    (
        "libpipewire-module-spa-node-factory",
        &[("spa-node-factory", interface::NODE)],
    ),
    (
        "libpipewire-module-spa-device-factory",
        &[("spa-device-factory", interface::DEVICE)],
    ),
    (
        "libpipewire-module-metadata",
        &[("metadata", interface::METADATA)],
    ),
];

/// A request failure reported back as an error event.
struct Fault {
    res: i32,
    message: String,
}

impl Fault {
    fn new(res: i32, message: impl Into<String>) -> Self {
        Self {
            res,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
struct Conn {
    sink: EventSink,
    client_id: u32,
    next_proxy: ProxyId,
    next_seq: u32,
    /// Live proxies and the global each one is attached to.
    proxies: BTreeMap<ProxyId, u32>,
}

impl Conn {
    fn alloc_proxy(&mut self) -> ProxyId {
        let proxy = self.next_proxy;
        self.next_proxy += 1;
        proxy
    }

    fn emit(&self, event: Event) {
        self.sink.emit(event);
    }

    fn fail(&self, id: u32, fault: Fault) {
        self.emit(Event::Error {
            id,
            seq: 0,
            res: -fault.res,
            message: fault.message,
        });
    }

    fn proxies_of(&self, global: u32) -> impl Iterator<Item = ProxyId> + '_ {
        self.proxies
            .iter()
            .filter(move |(_, g)| **g == global)
            .map(|(p, _)| *p)
    }
}

#[derive(Debug)]
pub(crate) struct Service {
    name: String,
    objects: BTreeMap<u32, Object>,
    conns: BTreeMap<u32, Conn>,
    next_id: u32,
    next_conn: u32,
}

impl Service {
    pub fn new(name: &str, extra_factories: &[(String, String)]) -> Self {
        let mut svc = Self {
            name: name.to_owned(),
            objects: BTreeMap::new(),
            conns: BTreeMap::new(),
            next_id: 0,
            next_conn: 0,
        };
        svc.seed(extra_factories);
        svc
    }

    fn seed(&mut self, extra_factories: &[(String, String)]) {
        let core_id = self.alloc_id();
        let meta = CoreMeta {
            cookie: 0x5157_a3b1,
            user_name: std::env::var("USER").unwrap_or_else(|_| "user".into()),
            host_name: "localhost".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            name: self.name.clone(),
        };
        let core_props: Properties = [
            ("core.name", self.name.clone()),
            ("core.daemon", "true".to_owned()),
            ("object.id", core_id.to_string()),
        ]
        .into_iter()
        .collect();
        let mut core = Object::new(core_id, interface::CORE, core_props, Body::Core(meta));
        core.permissions = PermissionBits::R | PermissionBits::X;
        self.add(core);

        let mut last_module = core_id;
        for (module, factories) in CATALOG {
            last_module = self.alloc_id();
            self.add(module_object(last_module, module, None));
            for (name, object_type) in *factories {
                let id = self.alloc_id();
                self.add(factory_object(id, name, object_type, last_module));
            }
        }
        for (name, object_type) in extra_factories {
            let id = self.alloc_id();
            self.add(factory_object(id, name, object_type, last_module));
        }

        for (name, group) in [
            ("Dummy-Driver", "pipewire.dummy"),
            ("Freewheel-Driver", "pipewire.freewheel"),
        ] {
            let props: Properties = [
                ("node.name", name),
                ("node.group", group),
                ("priority.driver", "20000"),
                ("factory.name", "support.node.driver"),
            ]
            .into_iter()
            .collect();
            self.spawn_node(props, None);
        }

        let device_props: Properties = [
            ("device.name", "alsa_card.pci-0000_00_1f.3"),
            ("device.api", "alsa"),
            ("device.nick", "HDA Intel PCH"),
            ("media.class", "Audio/Device"),
        ]
        .into_iter()
        .collect();
        let device = self.spawn_device(device_props, None).to_string();

        let sink_props: Properties = [
            ("node.name", "alsa_output.pci-0000_00_1f.3.analog-stereo"),
            ("node.description", "Built-in Audio Analog Stereo"),
            ("media.class", "Audio/Sink"),
            ("device.id", device.as_str()),
        ]
        .into_iter()
        .collect();
        let sink = self.spawn_node(sink_props, None);
        let source_props: Properties = [
            ("node.name", "alsa_input.pci-0000_00_1f.3.analog-stereo"),
            ("node.description", "Built-in Audio Analog Stereo"),
            ("media.class", "Audio/Source"),
            ("device.id", device.as_str()),
        ]
        .into_iter()
        .collect();
        self.spawn_node(source_props, None);

        let session_id = self.alloc_id();
        let mut session = Object::new(
            session_id,
            interface::SESSION,
            [("session.name", "media-session")].into_iter().collect(),
            Body::Session {
                params: Vec::new(),
            },
        );
        session.version = 0;
        self.add(session);

        let endpoint_id = self.alloc_id();
        let endpoint_name = "alsa_output.pci-0000_00_1f.3.analog-stereo.endpoint";
        let mut endpoint = Object::new(
            endpoint_id,
            interface::ENDPOINT,
            [
                ("endpoint.name", endpoint_name.to_owned()),
                ("media.class", "Audio/Sink".to_owned()),
                ("node.id", sink.to_string()),
                ("session.id", session_id.to_string()),
            ]
            .into_iter()
            .collect(),
            Body::Endpoint {
                name: endpoint_name.to_owned(),
                media_class: "Audio/Sink".to_owned(),
                direction: Direction::Input,
                n_streams: 1,
                session_id,
                params: Vec::new(),
            },
        );
        endpoint.version = 0;
        self.add(endpoint);

        let stream_id = self.alloc_id();
        let mut stream = Object::new(
            stream_id,
            interface::ENDPOINT_STREAM,
            [
                ("endpoint-stream.name", "default".to_owned()),
                ("endpoint.id", endpoint_id.to_string()),
            ]
            .into_iter()
            .collect(),
            Body::EndpointStream {
                endpoint_id,
                name: "default".to_owned(),
                params: Vec::new(),
            },
        );
        stream.version = 0;
        self.add(stream);

        let metadata_id = self.alloc_id();
        self.add(Object::new(
            metadata_id,
            interface::METADATA,
            [("metadata.name", "default")].into_iter().collect(),
            Body::Metadata,
        ));

        debug!(objects = self.objects.len(), name = %self.name, "loopback service seeded");
    }

    // ── Object graph ─────────────────────────────────────────────────

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Insert an object and announce it on every connection.
    fn add(&mut self, object: Object) -> u32 {
        let id = object.id;
        let announcement = global_added(&object);
        for conn in self.conns.values() {
            conn.emit(announcement.clone());
        }
        self.objects.insert(id, object);
        id
    }

    /// Publish an info update to every proxy attached to `global`.
    fn notify(&self, global: u32, update: &InfoUpdate) {
        for conn in self.conns.values() {
            for proxy in conn.proxies_of(global) {
                conn.emit(Event::Info {
                    proxy,
                    update: update.clone(),
                });
            }
        }
    }

    /// Remove a global and everything that depends on it.
    fn remove_global(&mut self, id: u32) {
        let mut doomed = vec![id];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let current = doomed[cursor];
            let dependents: Vec<u32> = self
                .objects
                .values()
                .filter(|o| o.depends_on(current) && !doomed.contains(&o.id))
                .map(|o| o.id)
                .collect();
            doomed.extend(dependents);
            cursor += 1;
        }
        for gid in doomed.into_iter().rev() {
            self.drop_object(gid);
        }
    }

    fn drop_object(&mut self, id: u32) {
        if self.objects.remove(&id).is_none() {
            return;
        }
        debug!(id, "global removed");
        for conn in self.conns.values_mut() {
            conn.emit(Event::GlobalRemoved { id });
            let bound: Vec<ProxyId> = conn.proxies_of(id).collect();
            for proxy in bound {
                conn.proxies.remove(&proxy);
                conn.emit(Event::ProxyRemoved { proxy });
            }
        }
    }

    fn spawn_node(&mut self, mut props: Properties, owner: Option<u32>) -> u32 {
        let id = self.alloc_id();
        let (n_in, n_out) = port_layout(&props);
        if !props.contains_key("node.name") {
            props.set("node.name", format!("node.{id}"));
        }
        props.set("object.id", id.to_string());
        let mut node = Object::new(
            id,
            interface::NODE,
            props,
            Body::Node {
                state: NodeState::Suspended,
                n_input_ports: n_in,
                n_output_ports: n_out,
                params: node_params(),
            },
        );
        node.owner = owner;
        self.add(node);

        // Ports have no owner of their own; they go away with the node.
        for (direction, count) in [(Direction::Input, n_in), (Direction::Output, n_out)] {
            for index in 0..count {
                let port_id = self.alloc_id();
                let mut props = port_props(id, index, direction);
                props.set("object.id", port_id.to_string());
                self.add(Object::new(
                    port_id,
                    interface::PORT,
                    props,
                    Body::Port {
                        node_id: id,
                        direction,
                        params: port_params(),
                    },
                ));
            }
        }
        id
    }

    fn spawn_device(&mut self, mut props: Properties, owner: Option<u32>) -> u32 {
        let id = self.alloc_id();
        props.set("object.id", id.to_string());
        let mut device = Object::new(
            id,
            interface::DEVICE,
            props,
            Body::Device {
                params: device_params(),
            },
        );
        device.owner = owner;
        self.add(device)
    }

    /// First port of `node` facing `direction`.
    fn first_port(&self, node: u32, direction: Direction) -> Option<u32> {
        self.objects.values().find_map(|o| match o.body {
            Body::Port {
                node_id,
                direction: d,
                ..
            } if node_id == node && d == direction => Some(o.id),
            _ => None,
        })
    }

    fn resolve_port(
        &self,
        props: &Properties,
        node_key: &str,
        port_key: &str,
        direction: Direction,
    ) -> Result<(u32, u32), Fault> {
        let node = props
            .get_u32(node_key)
            .ok_or_else(|| Fault::new(errno::EINVAL, format!("{node_key} not given")))?;
        if !self
            .objects
            .get(&node)
            .is_some_and(|o| matches!(o.body, Body::Node { .. }))
        {
            return Err(Fault::new(errno::EINVAL, format!("unknown node {node}")));
        }
        let port = match props.get_u32(port_key) {
            Some(port) => {
                let valid = self.objects.get(&port).is_some_and(|o| {
                    matches!(o.body, Body::Port { node_id, direction: d, .. }
                        if node_id == node && d == direction)
                });
                if !valid {
                    return Err(Fault::new(
                        errno::EINVAL,
                        format!("port {port} is not an {direction} port of node {node}"),
                    ));
                }
                port
            }
            None => self.first_port(node, direction).ok_or_else(|| {
                Fault::new(
                    errno::EINVAL,
                    format!("node {node} has no {direction} ports"),
                )
            })?,
        };
        Ok((node, port))
    }

    fn spawn_link(&mut self, mut props: Properties, owner: Option<u32>) -> Result<u32, Fault> {
        let (output_node_id, output_port_id) = self.resolve_port(
            &props,
            "link.output.node",
            "link.output.port",
            Direction::Output,
        )?;
        let (input_node_id, input_port_id) = self.resolve_port(
            &props,
            "link.input.node",
            "link.input.port",
            Direction::Input,
        )?;
        let id = self.alloc_id();
        props.set("link.output.node", output_node_id.to_string());
        props.set("link.output.port", output_port_id.to_string());
        props.set("link.input.node", input_node_id.to_string());
        props.set("link.input.port", input_port_id.to_string());
        props.set("object.id", id.to_string());
        let mut link = Object::new(
            id,
            interface::LINK,
            props,
            Body::Link {
                output_node_id,
                output_port_id,
                input_node_id,
                input_port_id,
                state: LinkState::Init,
                format: None,
            },
        );
        link.owner = owner;
        Ok(self.add(link))
    }

    /// Negotiate a fresh link and start both nodes it connects.
    fn activate_link(&mut self, id: u32) {
        let format = json!({
            "mediaType": "audio",
            "mediaSubtype": "dsp",
            "format": "F32P",
        });
        let Some(Object {
            body:
                Body::Link {
                    output_node_id,
                    input_node_id,
                    state,
                    format: current,
                    ..
                },
            ..
        }) = self.objects.get_mut(&id)
        else {
            return;
        };
        *state = LinkState::Active;
        *current = Some(format.clone());
        let nodes = [*output_node_id, *input_node_id];
        self.notify(
            id,
            &InfoUpdate::Link(LinkInfo {
                id,
                change_mask: LinkChange::STATE | LinkChange::FORMAT,
                state: LinkState::Active,
                format: Some(format),
                ..LinkInfo::default()
            }),
        );
        for node in nodes {
            self.set_node_state(node, NodeState::Running);
        }
    }

    fn set_node_state(&mut self, id: u32, next: NodeState) {
        let Some(Object {
            body: Body::Node { state, .. },
            ..
        }) = self.objects.get_mut(&id)
        else {
            return;
        };
        if *state == next {
            return;
        }
        *state = next;
        self.notify(
            id,
            &InfoUpdate::Node(NodeInfo {
                id,
                change_mask: NodeChange::STATE,
                state: next,
                ..NodeInfo::default()
            }),
        );
    }

    fn instantiate(
        &mut self,
        conn: u32,
        factory: &str,
        type_name: &str,
        props: &Properties,
    ) -> Result<u32, Fault> {
        let object_type = self
            .objects
            .values()
            .find_map(|o| match &o.body {
                Body::Factory {
                    name, object_type, ..
                } if name == factory => Some(object_type.clone()),
                _ => None,
            })
            .ok_or_else(|| Fault::new(errno::ENOENT, format!("unknown factory name '{factory}'")))?;
        if object_type != type_name {
            return Err(Fault::new(
                errno::EPROTO,
                format!("factory '{factory}' creates {object_type}, not {type_name}"),
            ));
        }
        let mut props = props.clone();
        props.set("factory.name", factory);
        match type_name {
            interface::NODE => Ok(self.spawn_node(props, Some(conn))),
            interface::DEVICE => Ok(self.spawn_device(props, Some(conn))),
            interface::LINK => self.spawn_link(props, Some(conn)),
            other => Err(Fault::new(
                errno::ENOTSUP,
                format!("can't create objects of type {other}"),
            )),
        }
    }

    fn core_info(&self) -> CoreInfo {
        match self.objects.get(&0).and_then(Object::full_info) {
            Some(InfoUpdate::Core(info)) => info,
            _ => CoreInfo::default(),
        }
    }

    // ── Connections ──────────────────────────────────────────────────

    fn conn(&self, conn: u32) -> Result<&Conn, Error> {
        self.conns.get(&conn).ok_or(Error::Disconnected)
    }

    fn conn_mut(&mut self, conn: u32) -> Result<&mut Conn, Error> {
        self.conns.get_mut(&conn).ok_or(Error::Disconnected)
    }

    fn bound_global(&self, conn: u32, proxy: ProxyId) -> Result<u32, Error> {
        self.conn(conn)?
            .proxies
            .get(&proxy)
            .copied()
            .ok_or(Error::UnknownProxy(proxy))
    }

    pub fn connect(&mut self, props: &Properties, sink: EventSink) -> Result<u32, Error> {
        let requested = props.get("remote.name").unwrap_or("internal");
        if requested != "internal" && requested != self.name {
            return Err(Error::ConnectionRefused {
                reason: format!("no service named '{requested}'"),
            });
        }

        let conn_id = self.next_conn;
        self.next_conn += 1;
        let client_id = self.alloc_id();

        sink.emit(Event::RemoteInfo(self.core_info()));
        for object in self.objects.values() {
            sink.emit(global_added(object));
        }
        self.conns.insert(
            conn_id,
            Conn {
                sink,
                client_id,
                next_proxy: FIRST_PROXY,
                next_seq: 1,
                proxies: BTreeMap::new(),
            },
        );

        let mut client = client_object(client_id, props);
        client.owner = Some(conn_id);
        self.add(client);
        info!(conn = conn_id, client = client_id, "client connected");
        Ok(conn_id)
    }

    /// Tear down a connection, keeping objects it created with
    /// `object.linger` set.
    pub fn disconnect(&mut self, conn: u32) {
        let Some(gone) = self.conns.remove(&conn) else {
            return;
        };
        let owned: Vec<u32> = self
            .objects
            .values()
            .filter(|o| {
                o.owner == Some(conn)
                    && (o.id == gone.client_id || !o.props.get_bool("object.linger"))
            })
            .map(|o| o.id)
            .collect();
        for id in owned {
            self.remove_global(id);
        }
        for object in self.objects.values_mut() {
            if object.owner == Some(conn) {
                object.owner = None;
            }
        }
        info!(conn, "client disconnected");
    }

    fn kick_conn(&mut self, conn: u32, res: i32, message: &str) {
        if let Some(c) = self.conns.get(&conn) {
            c.fail(0, Fault::new(res, message));
        }
        self.disconnect(conn);
    }

    /// Fail the connection whose events are tagged with `remote`.
    pub fn kick(&mut self, remote: u32) -> bool {
        let target = self
            .conns
            .iter()
            .find(|(_, c)| c.sink.remote() == remote)
            .map(|(id, _)| *id);
        match target {
            Some(conn) => {
                self.kick_conn(conn, errno::EPIPE, "connection lost");
                true
            }
            None => false,
        }
    }

    pub fn update_props(&mut self, global: u32, props: &Properties) -> bool {
        let Some(object) = self.objects.get_mut(&global) else {
            return false;
        };
        object.props.update(props);
        if let Some(update) = object.props_info() {
            self.notify(global, &update);
        }
        true
    }

    pub fn has_global(&self, global: u32) -> bool {
        self.objects.contains_key(&global)
    }

    // ── Requests ─────────────────────────────────────────────────────

    pub fn sync(&mut self, conn: u32, target: u32) -> Result<u32, Error> {
        let c = self.conn_mut(conn)?;
        let seq = c.next_seq;
        c.next_seq = c.next_seq.wrapping_add(1).max(1);
        c.emit(Event::Done { id: target, seq });
        Ok(seq)
    }

    pub fn bind(
        &mut self,
        conn: u32,
        global: u32,
        type_name: &str,
        version: u32,
    ) -> Result<ProxyId, Error> {
        let outcome = match self.objects.get(&global) {
            Some(o) if o.type_name == type_name => Ok(o.full_info()),
            Some(o) => Err(Fault::new(
                errno::EPROTO,
                format!("global {global} is a {}, not {type_name}", o.type_name),
            )),
            None => Err(Fault::new(errno::ENOENT, format!("unknown global {global}"))),
        };
        let c = self.conn_mut(conn)?;
        let proxy = c.alloc_proxy();
        debug!(conn, global, proxy, version, "bind");
        match outcome {
            Ok(info) => {
                c.proxies.insert(proxy, global);
                if let Some(update) = info {
                    c.emit(Event::Info { proxy, update });
                }
            }
            Err(fault) => {
                c.fail(proxy, fault);
                c.emit(Event::ProxyRemoved { proxy });
            }
        }
        Ok(proxy)
    }

    pub fn create_object(
        &mut self,
        conn: u32,
        factory: &str,
        type_name: &str,
        props: &Properties,
    ) -> Result<ProxyId, Error> {
        let proxy = self.conn_mut(conn)?.alloc_proxy();
        match self.instantiate(conn, factory, type_name, props) {
            Ok(id) => {
                let info = self.objects.get(&id).and_then(Object::full_info);
                let is_link = self
                    .objects
                    .get(&id)
                    .is_some_and(|o| matches!(o.body, Body::Link { .. }));
                let c = self.conn_mut(conn)?;
                c.proxies.insert(proxy, id);
                c.emit(Event::Bound {
                    proxy,
                    global_id: id,
                });
                if let Some(update) = info {
                    c.emit(Event::Info { proxy, update });
                }
                if is_link {
                    self.activate_link(id);
                }
                debug!(conn, factory, id, proxy, "object created");
            }
            Err(fault) => {
                let c = self.conn(conn)?;
                c.fail(proxy, fault);
                c.emit(Event::ProxyRemoved { proxy });
            }
        }
        Ok(proxy)
    }

    pub fn destroy_global(&mut self, conn: u32, id: u32) -> Result<(), Error> {
        let c = self.conn(conn)?;
        let Some(object) = self.objects.get(&id) else {
            c.fail(
                REGISTRY_PROXY,
                Fault::new(errno::ENOENT, format!("no global {id}")),
            );
            return Ok(());
        };
        if !object.permissions.contains(PermissionBits::W) {
            c.fail(
                REGISTRY_PROXY,
                Fault::new(errno::EPERM, format!("no permission to destroy {id}")),
            );
            return Ok(());
        }
        if matches!(object.body, Body::Client { .. }) {
            let victim = self
                .conns
                .iter()
                .find(|(_, c)| c.client_id == id)
                .map(|(conn_id, _)| *conn_id);
            if let Some(victim) = victim {
                self.kick_conn(victim, errno::ECONNRESET, "client destroyed");
                return Ok(());
            }
        }
        self.remove_global(id);
        Ok(())
    }

    pub fn enum_params(
        &mut self,
        conn: u32,
        proxy: ProxyId,
        seq: u32,
        param_id: u32,
        start: u32,
        num: u32,
    ) -> Result<(), Error> {
        let global = self.bound_global(conn, proxy)?;
        let c = self.conn(conn)?;
        let object = self
            .objects
            .get(&global)
            .ok_or(Error::UnknownProxy(proxy))?;
        let Some(params) = object.params() else {
            c.fail(
                proxy,
                Fault::new(
                    errno::ENOTSUP,
                    format!("{} has no params", object.type_name),
                ),
            );
            return Ok(());
        };
        let limit = if num == 0 { usize::MAX } else { num as usize };
        let matching = params
            .iter()
            .filter(|p| p.id == param_id && p.readable())
            .count() as u32;
        for index in (start..matching).take(limit) {
            c.emit(Event::Param {
                proxy,
                seq,
                id: param_id,
                index,
                next: index + 1,
                param: param_payload(object, param_id),
            });
        }
        Ok(())
    }

    pub fn update_permissions(
        &mut self,
        conn: u32,
        proxy: ProxyId,
        updates: &[Permission],
    ) -> Result<(), Error> {
        let global = self.bound_global(conn, proxy)?;
        let Some(Object {
            body: Body::Client { permissions },
            ..
        }) = self.objects.get_mut(&global)
        else {
            return Err(Error::InvalidArgument(format!(
                "proxy {proxy} is not a client"
            )));
        };
        for update in updates {
            match permissions.iter_mut().find(|p| p.id == update.id) {
                Some(existing) => existing.permissions = update.permissions,
                None => permissions.push(*update),
            }
        }
        debug!(conn, client = global, count = updates.len(), "permissions updated");
        Ok(())
    }

    pub fn get_permissions(
        &mut self,
        conn: u32,
        proxy: ProxyId,
        start: u32,
        num: u32,
    ) -> Result<(), Error> {
        let global = self.bound_global(conn, proxy)?;
        let Some(Object {
            body: Body::Client { permissions },
            ..
        }) = self.objects.get(&global)
        else {
            return Err(Error::InvalidArgument(format!(
                "proxy {proxy} is not a client"
            )));
        };
        let limit = if num == 0 { usize::MAX } else { num as usize };
        let slice: Vec<Permission> = permissions
            .iter()
            .skip(start as usize)
            .take(limit)
            .copied()
            .collect();
        self.conn(conn)?.emit(Event::Permissions {
            proxy,
            index: start,
            permissions: slice,
        });
        Ok(())
    }

    pub fn export(&mut self, conn: u32, object: &ExportedObject) -> Result<ProxyId, Error> {
        if object.type_name != interface::NODE {
            return Err(Error::NotSupported(format!(
                "exporting {} objects",
                object.type_name
            )));
        }
        let proxy = self.conn_mut(conn)?.alloc_proxy();
        let id = self.spawn_node(object.props.clone(), Some(conn));
        let info = self.objects.get(&id).and_then(Object::full_info);
        let c = self.conn_mut(conn)?;
        c.proxies.insert(proxy, id);
        c.emit(Event::Bound {
            proxy,
            global_id: id,
        });
        if let Some(update) = info {
            c.emit(Event::Info { proxy, update });
        }
        Ok(proxy)
    }

    pub fn destroy_proxy(&mut self, conn: u32, proxy: ProxyId) {
        if let Ok(c) = self.conn_mut(conn) {
            c.proxies.remove(&proxy);
        }
    }
}

fn global_added(object: &Object) -> Event {
    Event::GlobalAdded {
        id: object.id,
        permissions: object.permissions,
        type_name: object.type_name.to_owned(),
        version: object.version,
        props: Some(object.props.clone()),
    }
}
