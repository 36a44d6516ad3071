#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use pwmirror_api::{
    Envelope, Event, ID_ANY, LinkState, LoopbackTransport, NodeState, ParamType, PermissionBits,
    Properties, interface,
};
use pwmirror_core::{
    CoreError, InfoTarget, Notice, ObjectKind, SequencerState, Session, SessionConfig, Snapshot,
};
use tokio::sync::mpsc::UnboundedReceiver;

const SINK: &str = "alsa_output.pci-0000_00_1f.3.analog-stereo";
const SOURCE: &str = "alsa_input.pci-0000_00_1f.3.analog-stereo";

// ── Harness ─────────────────────────────────────────────────────────

fn loopback() -> LoopbackTransport {
    LoopbackTransport::builder()
        .factory("dummy-factory", interface::NODE)
        .build()
}

fn pump(session: &mut Session, rx: &mut UnboundedReceiver<Envelope>) -> Vec<Notice> {
    while let Ok(envelope) = rx.try_recv() {
        session.handle_event(envelope);
    }
    session.take_notices()
}

/// Connected session whose first barrier has already completed.
fn start_with(
    transport: &LoopbackTransport,
    config: SessionConfig,
) -> (Session, UnboundedReceiver<Envelope>) {
    let (mut session, mut rx) = Session::new(Box::new(transport.clone()), config);
    session.connect(None).unwrap();
    session.end_command();
    pump(&mut session, &mut rx);
    assert!(session.is_idle());
    (session, rx)
}

fn start(transport: &LoopbackTransport) -> (Session, UnboundedReceiver<Envelope>) {
    start_with(transport, SessionConfig::default())
}

fn find(session: &Session, key: &str, value: &str) -> u32 {
    session
        .list_objects(None)
        .unwrap()
        .into_iter()
        .find(|g| g.props.as_ref().and_then(|p| p.get(key)) == Some(value))
        .map(|g| g.id)
        .unwrap()
}

fn port_of(session: &Session, node: u32, direction: &str) -> u32 {
    session
        .list_objects(Some("Port"))
        .unwrap()
        .into_iter()
        .find(|g| {
            let props = g.props.as_ref().unwrap();
            props.get_u32("node.id") == Some(node) && props.get("port.direction") == Some(direction)
        })
        .map(|g| g.id)
        .unwrap()
}

fn shown(notices: &[Notice]) -> Vec<&Snapshot> {
    notices
        .iter()
        .filter_map(|n| match n {
            Notice::ShowInfo { snapshot, .. } => Some(snapshot),
            _ => None,
        })
        .collect()
}

// ── Creation and info ───────────────────────────────────────────────

#[test]
fn created_node_renders_without_further_input() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);

    let created = session
        .create_node("dummy-factory", Some("media.class=Audio/Sink"))
        .unwrap();
    assert_eq!(created.handle, 1);
    session.end_command();
    assert!(!session.is_idle());
    let notices = pump(&mut session, &mut rx);
    assert!(session.is_idle());
    assert!(notices.iter().any(|n| matches!(n, Notice::Prompt { .. })));

    session.info(InfoTarget::Id(created.handle)).unwrap();
    let notices = session.take_notices();
    let snapshots = shown(&notices);
    assert_eq!(snapshots.len(), 1);
    let Snapshot::Node(node) = snapshots[0] else {
        panic!("expected a node, got {:?}", snapshots[0]);
    };
    assert_eq!(node.n_input_ports, 2);
    assert_eq!(node.n_output_ports, 0);
    assert_eq!(node.props.get("media.class"), Some("Audio/Sink"));
}

#[test]
fn info_for_a_missing_global_changes_nothing() {
    let transport = loopback();
    let (mut session, _rx) = start(&transport);
    let before = session.list_objects(None).unwrap();

    let err = session.info(InfoTarget::Id(999)).unwrap_err();
    assert!(matches!(err, CoreError::UnknownGlobal { id: 999 }));
    assert_eq!(err.to_string(), "unknown global 999");
    assert_eq!(session.list_objects(None).unwrap(), before);
    assert!(session.take_notices().is_empty());
}

#[test]
fn info_on_a_bound_global_renders_immediately() {
    let transport = loopback();
    let (mut session, _rx) = start(&transport);
    let sink = find(&session, "node.name", SINK);

    session.info(InfoTarget::Id(sink)).unwrap();
    let notices = session.take_notices();
    let Notice::ShowInfo {
        global: Some(global),
        snapshot: Snapshot::Node(node),
        ..
    } = &notices[0]
    else {
        panic!("unexpected {notices:?}");
    };
    assert_eq!(global.id, sink);
    assert_eq!(node.state, NodeState::Suspended);
    assert_eq!(node.n_input_ports, 2);
}

#[test]
fn lazy_binding_renders_on_first_info() {
    let transport = loopback();
    let config = SessionConfig {
        bind_on_discovery: false,
        ..SessionConfig::default()
    };
    let (mut session, mut rx) = start_with(&transport, config);
    let sink = find(&session, "node.name", SINK);
    assert_eq!(
        session.connections().current().unwrap().registry.lookup(sink).unwrap().proxy,
        None
    );

    session.info(InfoTarget::Id(sink)).unwrap();
    assert!(session.take_notices().is_empty());

    let notices = pump(&mut session, &mut rx);
    assert_eq!(shown(&notices).len(), 1);
    let global = session
        .connections()
        .current()
        .unwrap()
        .registry
        .lookup(sink)
        .unwrap()
        .clone();
    assert!(global.proxy.is_some());
    assert!(!global.info_pending);
}

#[test]
fn info_all_reports_failures_and_keeps_going() {
    let transport = loopback();
    let (mut session, _rx) = start(&transport);
    let live = session.list_objects(None).unwrap().len();

    session.info(InfoTarget::All).unwrap();
    let notices = session.take_notices();
    let failures: Vec<&Notice> = notices
        .iter()
        .filter(|n| matches!(n, Notice::InfoFailed { .. }))
        .collect();
    assert_eq!(
        failures,
        vec![&Notice::InfoFailed {
            message: format!("unsupported type {}", interface::METADATA)
        }]
    );
    assert_eq!(shown(&notices).len(), live - 1);
}

#[test]
fn partial_updates_echo_a_change_and_keep_other_fields() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);
    let sink = find(&session, "node.name", SINK);

    let extra: Properties = [("node.nick", "speakers")].into_iter().collect();
    assert!(transport.update_props(sink, &extra));
    let notices = pump(&mut session, &mut rx);
    assert!(notices.contains(&Notice::Changed {
        remote: 0,
        kind: ObjectKind::Node,
        id: sink
    }));

    session.info(InfoTarget::Id(sink)).unwrap();
    let notices = session.take_notices();
    let Snapshot::Node(node) = shown(&notices)[0] else {
        panic!("expected a node");
    };
    assert_eq!(node.props.get("node.nick"), Some("speakers"));
    assert_eq!(node.n_input_ports, 2);
    assert_eq!(node.params.len(), 4);
}

// ── Destruction ─────────────────────────────────────────────────────

#[test]
fn destroying_a_created_node_leaves_a_stale_handle() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);
    let created = session.create_node("dummy-factory", None).unwrap();
    session.end_command();
    pump(&mut session, &mut rx);

    let id = session
        .connections()
        .current()
        .unwrap()
        .proxies
        .get(created.proxy)
        .unwrap()
        .global
        .unwrap();
    session.destroy(id).unwrap();
    session.end_command();
    let notices = pump(&mut session, &mut rx);

    assert!(notices.iter().any(|n| matches!(
        n,
        Notice::GlobalRemoved { global, .. } if global.id == id
    )));
    assert!(session.list_objects(None).unwrap().iter().all(|g| g.id != id));
    assert!(!transport.has_global(id));
    assert!(matches!(
        session.info(InfoTarget::Id(created.handle)),
        Err(CoreError::StaleHandle { handle }) if handle == created.handle
    ));
}

#[test]
fn destroying_an_unknown_global_fails_locally() {
    let transport = loopback();
    let (mut session, _rx) = start(&transport);
    assert!(matches!(
        session.destroy(4242),
        Err(CoreError::UnknownGlobal { id: 4242 })
    ));
}

#[test]
fn removal_of_an_unknown_id_is_reported() {
    let transport = loopback();
    let (mut session, _rx) = start(&transport);
    session.handle_event(Envelope {
        remote: 0,
        event: Event::GlobalRemoved { id: 4242 },
    });
    assert_eq!(
        session.take_notices(),
        vec![Notice::UnknownGlobalRemoved {
            remote: 0,
            id: 4242
        }]
    );
}

// ── Links, params, permissions ──────────────────────────────────────

#[test]
fn created_links_become_active() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);
    let source = find(&session, "node.name", SOURCE);
    let sink = find(&session, "node.name", SINK);
    let out_port = port_of(&session, source, "out");
    let in_port = port_of(&session, sink, "in");

    let created = session
        .create_link(
            &source.to_string(),
            &out_port.to_string(),
            &sink.to_string(),
            &in_port.to_string(),
            Some("object.linger=true"),
        )
        .unwrap();
    session.end_command();
    let notices = pump(&mut session, &mut rx);
    assert!(notices.iter().any(|n| matches!(
        n,
        Notice::Changed { kind: ObjectKind::Link, .. }
    )));

    session.info(InfoTarget::Id(created.handle)).unwrap();
    let notices = session.take_notices();
    let Snapshot::Link(link) = shown(&notices)[0] else {
        panic!("expected a link");
    };
    assert_eq!(link.state, LinkState::Active);
    assert_eq!(
        (link.output_port_id, link.input_port_id),
        (out_port, in_port)
    );
    assert!(link.format.is_some());
}

#[test]
fn enum_params_reports_each_param() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);
    let sink = find(&session, "node.name", SINK);

    session.enum_params(sink, ParamType::EnumFormat.id()).unwrap();
    session.end_command();
    let notices = pump(&mut session, &mut rx);
    let params: Vec<(u32, u32)> = notices
        .iter()
        .filter_map(|n| match n {
            Notice::Param {
                object, param_id, ..
            } => Some((*object, *param_id)),
            _ => None,
        })
        .collect();
    assert_eq!(params, vec![(sink, ParamType::EnumFormat.id())]);
}

#[test]
fn enum_params_rejects_kinds_without_params() {
    let transport = loopback();
    let (mut session, _rx) = start(&transport);
    let client = session.list_objects(Some("Client")).unwrap()[0].id;
    let err = session.enum_params(client, 3).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "enum-params not implemented on object {client} type:{}",
            interface::CLIENT
        )
    );
}

#[test]
fn permissions_round_trip_through_the_client() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);
    let client = session.list_objects(Some("Client")).unwrap()[0].id;

    session
        .set_permissions(client, 0, PermissionBits::R)
        .unwrap();
    session.get_permissions(client).unwrap();
    session.end_command();
    let notices = pump(&mut session, &mut rx);

    let Some(Notice::Permissions {
        object,
        index,
        permissions,
        ..
    }) = notices
        .iter()
        .find(|n| matches!(n, Notice::Permissions { .. }))
    else {
        panic!("no permissions in {notices:?}");
    };
    assert_eq!((*object, *index), (client, 0));
    let entries: Vec<(u32, PermissionBits)> =
        permissions.iter().map(|p| (p.id, p.permissions)).collect();
    assert_eq!(
        entries,
        vec![(ID_ANY, PermissionBits::ALL), (0, PermissionBits::R)]
    );
}

#[test]
fn permissions_only_apply_to_clients() {
    let transport = loopback();
    let (mut session, _rx) = start(&transport);
    let sink = find(&session, "node.name", SINK);
    let err = session.get_permissions(sink).unwrap_err();
    assert_eq!(err.to_string(), format!("object {sink} is not a client"));
}

// ── Modules and export ──────────────────────────────────────────────

#[test]
fn exported_local_nodes_appear_on_the_remote() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);

    let loaded = session
        .load_module(
            "libpipewire-module-spa-node",
            Some("audiotestsrc node.name=tone media.class=Audio/Source"),
        )
        .unwrap();
    let created = session.export_node(loaded.id + 1, None).unwrap();
    assert!(created.handle > loaded.handle);
    session.end_command();
    let notices = pump(&mut session, &mut rx);

    assert!(notices.iter().any(|n| matches!(
        n,
        Notice::GlobalAdded { global, .. }
            if global.props.as_ref().and_then(|p| p.get("node.name")) == Some("tone")
    )));
    let tone = find(&session, "node.name", "tone");
    assert!(transport.has_global(tone));
}

#[test]
fn exporting_requires_a_local_node() {
    let transport = loopback();
    let (mut session, _rx) = start(&transport);
    let loaded = session
        .load_module("libpipewire-module-metadata", None)
        .unwrap();
    assert_eq!(
        session.export_node(loaded.id, None).unwrap_err().to_string(),
        format!("object {} is not a node", loaded.id)
    );
    assert!(matches!(
        session.export_node(loaded.id, Some(77)),
        Err(CoreError::NotFound(msg)) if msg == "Remote 77 does not exist"
    ));
    assert!(matches!(
        session.load_module("libpipewire-module-missing", None),
        Err(CoreError::ModuleLoad { .. })
    ));
}

// ── Sequencing and connections ──────────────────────────────────────

#[test]
fn stale_completions_do_not_release_the_prompt() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);
    session.end_command();
    let SequencerState::AwaitingBarrier(seq) =
        session.connections().current().unwrap().sequencer.state()
    else {
        panic!("no barrier outstanding");
    };

    session.handle_event(Envelope {
        remote: 0,
        event: Event::Done {
            id: 0,
            seq: seq + 100,
        },
    });
    assert!(!session.is_idle());
    assert!(session.take_notices().is_empty());

    pump(&mut session, &mut rx);
    assert!(session.is_idle());
}

#[test]
fn a_fatal_error_on_the_current_connection_ends_the_session() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);
    assert!(transport.kick(0));
    let notices = pump(&mut session, &mut rx);

    assert!(notices.iter().any(|n| matches!(n, Notice::ConnectionLost { remote: 0, .. })));
    assert!(session.is_finished());
    assert!(session.connections().is_empty());
}

#[test]
fn losing_a_background_connection_keeps_the_session() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);
    let second = session.connect(None).unwrap();
    session.end_command();
    pump(&mut session, &mut rx);

    assert!(transport.kick(0));
    pump(&mut session, &mut rx);
    assert!(!session.is_finished());
    assert_eq!(session.connections().current_slot(), Some(second.handle));
    assert_eq!(session.list_remotes().len(), 1);
}

#[test]
fn disconnecting_walks_back_through_the_remotes() {
    let transport = loopback();
    let (mut session, mut rx) = start(&transport);
    let second = session.connect(None).unwrap();
    session.end_command();
    pump(&mut session, &mut rx);

    session.switch_remote(0).unwrap();
    let order: Vec<u32> = session.list_remotes().iter().map(|r| r.handle).collect();
    assert_eq!(order, vec![second.handle, 0]);

    session.disconnect(None).unwrap();
    assert_eq!(session.connections().current_slot(), Some(second.handle));
    session.disconnect(None).unwrap();
    assert_eq!(session.connections().current_slot(), None);

    session.end_command();
    assert!(session.is_finished());
}

#[test]
fn remote_names_follow_the_server() {
    let transport = LoopbackTransport::builder().name("studio-0").build();
    let (mut session, _rx) = start(&transport);
    assert_eq!(session.prompt_name(), Some("studio-0"));
    let remotes = session.list_remotes();
    assert_eq!(remotes[0].name, "studio-0");
    assert!(session.connect(Some("studio-0")).is_ok());
    assert!(session.connect(Some("nowhere")).is_err());
}
