// ── In-process loopback service ──
//
// Backs the `internal` remote. Every connection shares one service object
// graph; all state lives behind a single-threaded `Rc<RefCell<_>>`, so the
// transport is only usable from the thread that built it.

mod objects;
mod service;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Error;
use crate::props::Properties;
use crate::transport::{EventSink, ExportedObject, ProxyId, Remote, Transport};
use crate::types::Permission;

use self::service::Service;

/// Configures the object graph a [`LoopbackTransport`] starts with.
#[derive(Debug, Clone)]
pub struct LoopbackBuilder {
    name: String,
    factories: Vec<(String, String)>,
}

impl Default for LoopbackBuilder {
    fn default() -> Self {
        Self {
            name: "pipewire-0".into(),
            factories: Vec::new(),
        }
    }
}

impl LoopbackBuilder {
    /// Name the service reports in its core info.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register an extra factory producing objects of `type_name`.
    pub fn factory(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.factories.push((name.into(), type_name.into()));
        self
    }

    pub fn build(self) -> LoopbackTransport {
        LoopbackTransport {
            service: Rc::new(RefCell::new(Service::new(&self.name, &self.factories))),
        }
    }
}

/// Transport whose connections all land on one in-process service.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    service: Rc<RefCell<Service>>,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        LoopbackBuilder::default().build()
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> LoopbackBuilder {
        LoopbackBuilder::default()
    }

    /// Fail the connection whose events carry slot `remote`, as if its
    /// socket had died. Returns `false` if no such connection is live.
    pub fn kick(&self, remote: u32) -> bool {
        self.service.borrow_mut().kick(remote)
    }

    /// Merge `props` into a global and publish a props-only info update.
    pub fn update_props(&self, global: u32, props: &Properties) -> bool {
        self.service.borrow_mut().update_props(global, props)
    }

    pub fn has_global(&self, global: u32) -> bool {
        self.service.borrow().has_global(global)
    }
}

impl Transport for LoopbackTransport {
    fn connect(&self, props: &Properties, sink: EventSink) -> Result<Box<dyn Remote>, Error> {
        let conn = self.service.borrow_mut().connect(props, sink)?;
        Ok(Box::new(LoopbackRemote {
            service: Rc::clone(&self.service),
            conn,
        }))
    }
}

/// One connection to the loopback service.
#[derive(Debug)]
struct LoopbackRemote {
    service: Rc<RefCell<Service>>,
    conn: u32,
}

impl Remote for LoopbackRemote {
    /// The loopback numbers barriers itself; the caller's hint is ignored.
    fn sync(&mut self, target: u32, _seq: u32) -> Result<u32, Error> {
        self.service.borrow_mut().sync(self.conn, target)
    }

    fn bind(&mut self, global_id: u32, type_name: &str, version: u32) -> Result<ProxyId, Error> {
        self.service
            .borrow_mut()
            .bind(self.conn, global_id, type_name, version)
    }

    fn create_object(
        &mut self,
        factory: &str,
        type_name: &str,
        _version: u32,
        props: &Properties,
    ) -> Result<ProxyId, Error> {
        self.service
            .borrow_mut()
            .create_object(self.conn, factory, type_name, props)
    }

    fn destroy_global(&mut self, id: u32) -> Result<(), Error> {
        self.service.borrow_mut().destroy_global(self.conn, id)
    }

    fn enum_params(
        &mut self,
        proxy: ProxyId,
        seq: u32,
        param_id: u32,
        start: u32,
        num: u32,
    ) -> Result<(), Error> {
        self.service
            .borrow_mut()
            .enum_params(self.conn, proxy, seq, param_id, start, num)
    }

    fn update_permissions(&mut self, proxy: ProxyId, permissions: &[Permission]) -> Result<(), Error> {
        self.service
            .borrow_mut()
            .update_permissions(self.conn, proxy, permissions)
    }

    fn get_permissions(&mut self, proxy: ProxyId, start: u32, num: u32) -> Result<(), Error> {
        self.service
            .borrow_mut()
            .get_permissions(self.conn, proxy, start, num)
    }

    fn export(&mut self, object: &ExportedObject) -> Result<ProxyId, Error> {
        self.service.borrow_mut().export(self.conn, object)
    }

    fn destroy_proxy(&mut self, proxy: ProxyId) {
        self.service.borrow_mut().destroy_proxy(self.conn, proxy);
    }

    fn disconnect(&mut self) {
        self.service.borrow_mut().disconnect(self.conn);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    use super::service::REGISTRY_PROXY;
    use super::*;
    use crate::error::errno;
    use crate::event::{Envelope, Event};
    use crate::info::{InfoUpdate, LinkChange, NodeChange};
    use crate::types::{LinkState, NodeState, ParamType, PermissionBits, interface, ID_ANY};

    fn drain(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(env) = rx.try_recv() {
            out.push(env.event);
        }
        out
    }

    fn connect(
        transport: &LoopbackTransport,
        slot: u32,
    ) -> (Box<dyn Remote>, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let remote = transport
            .connect(&Properties::new(), EventSink::new(slot, tx))
            .unwrap();
        (remote, rx)
    }

    /// Id of the first announced global whose `key` property equals `value`.
    fn find_global(events: &[Event], key: &str, value: &str) -> u32 {
        events
            .iter()
            .find_map(|e| match e {
                Event::GlobalAdded {
                    id,
                    props: Some(props),
                    ..
                } if props.get(key) == Some(value) => Some(*id),
                _ => None,
            })
            .unwrap()
    }

    fn added_ids(events: &[Event]) -> Vec<u32> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::GlobalAdded { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn connect_announces_core_then_every_global() {
        let transport = LoopbackTransport::new();
        let (_remote, mut rx) = connect(&transport, 0);
        let events = drain(&mut rx);

        let Event::RemoteInfo(core) = &events[0] else {
            panic!("expected remote info first, got {:?}", events[0]);
        };
        assert_eq!(core.name, "pipewire-0");

        let ids = added_ids(&events);
        assert_eq!(ids[0], 0);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let client = find_global(&events, "pipewire.protocol", "protocol-native");
        assert_eq!(client, *ids.last().unwrap());
    }

    #[test]
    fn unknown_remote_name_is_refused() {
        let transport = LoopbackTransport::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let props: Properties = [("remote.name", "nowhere")].into_iter().collect();
        let err = transport.connect(&props, EventSink::new(0, tx)).err().unwrap();
        assert_eq!(err.code(), -errno::ECONNREFUSED);
    }

    #[test]
    fn done_trails_the_bind_it_follows() {
        let transport = LoopbackTransport::new();
        let (mut remote, mut rx) = connect(&transport, 0);
        let events = drain(&mut rx);
        let node = find_global(&events, "node.name", "Dummy-Driver");

        let proxy = remote.bind(node, interface::NODE, 3).unwrap();
        let seq = remote.sync(0, 0).unwrap();
        let events = drain(&mut rx);

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Event::Info { proxy: p, update: InfoUpdate::Node(_) } if *p == proxy));
        assert_eq!(events[1], Event::Done { id: 0, seq });
    }

    #[test]
    fn binding_a_missing_global_fails_the_proxy() {
        let transport = LoopbackTransport::new();
        let (mut remote, mut rx) = connect(&transport, 0);
        drain(&mut rx);

        let proxy = remote.bind(9999, interface::NODE, 3).unwrap();
        let events = drain(&mut rx);
        assert!(matches!(&events[0], Event::Error { id, res, .. } if *id == proxy && *res == -errno::ENOENT));
        assert_eq!(events[1], Event::ProxyRemoved { proxy });
    }

    #[test]
    fn sink_nodes_come_with_input_ports() {
        let transport = LoopbackTransport::builder()
            .factory("dummy-factory", interface::NODE)
            .build();
        let (mut remote, mut rx) = connect(&transport, 0);
        drain(&mut rx);

        let props: Properties = [("media.class", "Audio/Sink")].into_iter().collect();
        let proxy = remote
            .create_object("dummy-factory", interface::NODE, 3, &props)
            .unwrap();
        let events = drain(&mut rx);

        let ids = added_ids(&events);
        assert_eq!(ids.len(), 3, "node plus two ports");
        assert_eq!(
            events[3],
            Event::Bound {
                proxy,
                global_id: ids[0]
            }
        );
        let Event::Info {
            update: InfoUpdate::Node(info),
            ..
        } = &events[4]
        else {
            panic!("expected node info, got {:?}", events[4]);
        };
        assert_eq!(info.n_input_ports, 2);
        assert_eq!(info.props.get("factory.name"), Some("dummy-factory"));
    }

    #[test]
    fn unknown_factory_reports_enoent() {
        let transport = LoopbackTransport::new();
        let (mut remote, mut rx) = connect(&transport, 0);
        drain(&mut rx);

        let proxy = remote
            .create_object("nope", interface::NODE, 3, &Properties::new())
            .unwrap();
        let events = drain(&mut rx);
        assert!(matches!(&events[0], Event::Error { id, res, .. } if *id == proxy && *res == -errno::ENOENT));
    }

    #[test]
    fn links_activate_and_start_their_nodes() {
        let transport = LoopbackTransport::new();
        let (mut remote, mut rx) = connect(&transport, 0);
        let events = drain(&mut rx);
        let source = find_global(&events, "media.class", "Audio/Source");
        let sink = find_global(&events, "media.class", "Audio/Sink");

        let sink_proxy = remote.bind(sink, interface::NODE, 3).unwrap();
        drain(&mut rx);

        let props: Properties = [
            ("link.output.node", source.to_string()),
            ("link.input.node", sink.to_string()),
        ]
        .into_iter()
        .collect();
        let proxy = remote
            .create_object("link-factory", interface::LINK, 3, &props)
            .unwrap();
        let events = drain(&mut rx);

        let link_infos: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Info {
                    proxy: p,
                    update: InfoUpdate::Link(info),
                } if *p == proxy => Some(info),
                _ => None,
            })
            .collect();
        assert_eq!(link_infos.len(), 2);
        assert_eq!(link_infos[0].state, LinkState::Init);
        assert_eq!(link_infos[1].state, LinkState::Active);
        assert_eq!(
            link_infos[1].change_mask,
            LinkChange::STATE | LinkChange::FORMAT
        );

        let node_update = events.iter().find_map(|e| match e {
            Event::Info {
                proxy: p,
                update: InfoUpdate::Node(info),
            } if *p == sink_proxy => Some(info),
            _ => None,
        });
        let node_update = node_update.unwrap();
        assert_eq!(node_update.change_mask, NodeChange::STATE);
        assert_eq!(node_update.state, NodeState::Running);
    }

    #[test]
    fn destroying_a_node_takes_its_ports() {
        let transport = LoopbackTransport::new();
        let (mut remote, mut rx) = connect(&transport, 0);
        let events = drain(&mut rx);
        let sink = find_global(&events, "media.class", "Audio/Sink");

        remote.destroy_global(sink).unwrap();
        let removed: Vec<u32> = drain(&mut rx)
            .iter()
            .filter_map(|e| match e {
                Event::GlobalRemoved { id } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(removed.len(), 3);
        assert_eq!(*removed.last().unwrap(), sink);
        assert!(!transport.has_global(sink));
    }

    #[test]
    fn modules_cannot_be_destroyed() {
        let transport = LoopbackTransport::new();
        let (mut remote, mut rx) = connect(&transport, 0);
        drain(&mut rx);

        remote.destroy_global(1).unwrap();
        let events = drain(&mut rx);
        assert!(matches!(&events[0], Event::Error { id, res, .. } if *id == REGISTRY_PROXY && *res == -errno::EPERM));
    }

    #[test]
    fn kicked_connection_gets_a_fatal_error() {
        let transport = LoopbackTransport::new();
        let (mut remote, mut rx) = connect(&transport, 7);
        drain(&mut rx);

        assert!(transport.kick(7));
        let events = drain(&mut rx);
        assert!(matches!(&events[0], Event::Error { id: 0, .. }));
        assert!(matches!(remote.sync(0, 0), Err(Error::Disconnected)));
        assert!(!transport.kick(7));
    }

    #[test]
    fn disconnect_keeps_lingering_objects() {
        let transport = LoopbackTransport::new();
        let (mut first, mut rx1) = connect(&transport, 0);
        let (_second, mut rx2) = connect(&transport, 1);
        drain(&mut rx1);
        drain(&mut rx2);

        let plain: Properties = [("node.name", "plain")].into_iter().collect();
        let linger: Properties = [("node.name", "stays"), ("object.linger", "true")]
            .into_iter()
            .collect();
        first
            .create_object("spa-node-factory", interface::NODE, 3, &plain)
            .unwrap();
        first
            .create_object("spa-node-factory", interface::NODE, 3, &linger)
            .unwrap();
        let added = drain(&mut rx2);
        let plain_id = find_global(&added, "node.name", "plain");
        let linger_id = find_global(&added, "node.name", "stays");

        first.disconnect();
        let removed: Vec<u32> = drain(&mut rx2)
            .iter()
            .filter_map(|e| match e {
                Event::GlobalRemoved { id } => Some(*id),
                _ => None,
            })
            .collect();
        assert!(removed.contains(&plain_id));
        assert!(!removed.contains(&linger_id));
        assert!(transport.has_global(linger_id));
    }

    #[test]
    fn clients_start_with_full_default_permissions() {
        let transport = LoopbackTransport::new();
        let (mut remote, mut rx) = connect(&transport, 0);
        let events = drain(&mut rx);
        let client = find_global(&events, "pipewire.protocol", "protocol-native");

        let proxy = remote.bind(client, interface::CLIENT, 3).unwrap();
        remote
            .update_permissions(proxy, &[Permission::new(5, PermissionBits::R)])
            .unwrap();
        remote.get_permissions(proxy, 0, 0).unwrap();
        let events = drain(&mut rx);
        let Some(Event::Permissions { permissions, .. }) = events.last() else {
            panic!("expected permissions, got {events:?}");
        };
        assert_eq!(
            permissions,
            &vec![
                Permission::new(ID_ANY, PermissionBits::ALL),
                Permission::new(5, PermissionBits::R),
            ]
        );
    }

    #[test]
    fn enum_params_streams_matching_entries() {
        let transport = LoopbackTransport::new();
        let (mut remote, mut rx) = connect(&transport, 0);
        let events = drain(&mut rx);
        let node = find_global(&events, "node.name", "Dummy-Driver");
        let proxy = remote.bind(node, interface::NODE, 3).unwrap();
        drain(&mut rx);

        remote
            .enum_params(proxy, 4, ParamType::EnumFormat.id(), 0, 0)
            .unwrap();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        let Event::Param { seq, id, param, .. } = &events[0] else {
            panic!("expected param, got {:?}", events[0]);
        };
        assert_eq!(*seq, 4);
        assert_eq!(*id, 3);
        assert_eq!(param["object"], "EnumFormat");
    }

    #[test]
    fn props_updates_reach_bound_proxies() {
        let transport = LoopbackTransport::new();
        let (mut remote, mut rx) = connect(&transport, 0);
        let events = drain(&mut rx);
        let node = find_global(&events, "node.name", "Dummy-Driver");
        let proxy = remote.bind(node, interface::NODE, 3).unwrap();
        drain(&mut rx);

        let props: Properties = [("node.description", "renamed")].into_iter().collect();
        assert!(transport.update_props(node, &props));
        let events = drain(&mut rx);
        let Event::Info {
            proxy: p,
            update: InfoUpdate::Node(info),
        } = &events[0]
        else {
            panic!("expected node info, got {:?}", events[0]);
        };
        assert_eq!(*p, proxy);
        assert_eq!(info.change_mask, NodeChange::PROPS);
        assert_eq!(info.props.get("node.description"), Some("renamed"));
        assert_eq!(info.props.get("node.name"), Some("Dummy-Driver"));
    }
}
