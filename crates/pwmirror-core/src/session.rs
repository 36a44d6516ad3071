// ── Session ──
//
// Owns every connection, the variable table and the local context.
// Commands come in through the methods below and transport events through
// `handle_event`. Everything worth showing comes back out as `Notice`s, in
// the order it happened.

use pwmirror_api::{
    Envelope, Event, EventSink, InfoUpdate, Permission, PermissionBits, Properties, ProxyId,
    Transport, errno,
};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::connection::Connection;
use crate::connection_set::ConnectionSet;
use crate::context::LocalContext;
use crate::error::CoreError;
use crate::model::{Global, ObjectKind, merge};
use crate::notice::Notice;
use crate::props::parse_properties;
use crate::proxy::{Proxy, ProxyOrigin};
use crate::vars::{VarTable, Variable};

/// What `info` should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoTarget {
    All,
    Id(u32),
}

/// Variable handle and proxy id of a created or exported object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Created {
    pub handle: u32,
    pub proxy: ProxyId,
}

/// Variable handle and local id of a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loaded {
    pub handle: u32,
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub handle: u32,
    pub name: String,
}

pub struct Session {
    transport: Box<dyn Transport>,
    config: SessionConfig,
    events: mpsc::UnboundedSender<Envelope>,
    connections: ConnectionSet,
    vars: VarTable,
    context: LocalContext,
    notices: Vec<Notice>,
    finished: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connections", &self.connections)
            .field("vars", &self.vars)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session. Transport events for every connection it opens
    /// arrive on the returned receiver and must be fed to `handle_event`.
    pub fn new(
        transport: Box<dyn Transport>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            transport,
            config,
            events,
            connections: ConnectionSet::new(),
            vars: VarTable::new(),
            context: LocalContext::new(),
            notices: Vec::new(),
            finished: false,
        };
        (session, rx)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    pub fn vars(&self) -> &VarTable {
        &self.vars
    }

    pub fn context(&self) -> &LocalContext {
        &self.context
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// No connection is left, or the current one failed fatally.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the next input line may be processed.
    pub fn is_idle(&self) -> bool {
        self.connections
            .current()
            .ok()
            .is_none_or(|conn| conn.sequencer.is_idle())
    }

    /// Display name of the current connection.
    pub fn prompt_name(&self) -> Option<&str> {
        self.connections.current().ok().map(Connection::name)
    }

    /// Everything produced since the last call, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Close out one processed input line. Ends the session when no
    /// connection is left; otherwise waits on a barrier of the current one.
    pub fn end_command(&mut self) {
        loop {
            let Ok(conn) = self.connections.current_mut() else {
                debug!("no connection left");
                self.finished = true;
                return;
            };
            match conn.issue_barrier() {
                Ok(_) => return,
                Err(err) => {
                    let slot = conn.slot();
                    self.connection_lost(slot, err.to_string());
                    if self.finished {
                        return;
                    }
                }
            }
        }
    }

    // ── Connections ──────────────────────────────────────────────────

    /// Open a connection to `remote` (or the default remote) and make it
    /// current.
    pub fn connect(&mut self, remote: Option<&str>) -> Result<RemoteEntry, CoreError> {
        let props = self.config.connect_props(remote);
        let name = props
            .get("remote.name")
            .unwrap_or(&self.config.default_remote)
            .to_owned();

        let handle = self.vars.insert(Variable::Remote);
        let sink = EventSink::new(handle, self.events.clone());
        let remote = match self.transport.connect(&props, sink) {
            Ok(remote) => remote,
            Err(err) => {
                self.vars.remove(handle);
                return Err(err.into());
            }
        };
        self.connections
            .insert(Connection::new(handle, name.clone(), remote));
        info!(handle, remote = %name, "connected");
        Ok(RemoteEntry { handle, name })
    }

    /// Tear down `handle`, or the current connection.
    pub fn disconnect(&mut self, handle: Option<u32>) -> Result<(), CoreError> {
        let slot = self.remote_slot(handle)?;
        self.teardown(slot);
        Ok(())
    }

    pub fn list_remotes(&self) -> Vec<RemoteEntry> {
        self.connections
            .iter()
            .map(|conn| RemoteEntry {
                handle: conn.slot(),
                name: conn.name().to_owned(),
            })
            .collect()
    }

    pub fn switch_remote(&mut self, handle: u32) -> Result<(), CoreError> {
        self.connections.switch(handle)
    }

    fn remote_slot(&self, handle: Option<u32>) -> Result<u32, CoreError> {
        match handle {
            Some(h) if self.connections.contains(h) => Ok(h),
            Some(h) => Err(CoreError::NotFound(format!("Remote {h} does not exist"))),
            None => self.connections.current_slot().ok_or(CoreError::NoRemote),
        }
    }

    fn teardown(&mut self, slot: u32) {
        if let Some(conn) = self.connections.remove(slot) {
            conn.close();
        }
        self.vars.remove(slot);
        info!(slot, "disconnected");
    }

    fn connection_lost(&mut self, slot: u32, message: String) {
        let was_current = self.connections.current_slot() == Some(slot);
        warn!(remote = slot, %message, "connection lost");
        self.teardown(slot);
        self.notices.push(Notice::ConnectionLost {
            remote: slot,
            message,
        });
        if was_current {
            self.finished = true;
        }
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// Live globals of the current connection whose type contains `filter`.
    pub fn list_objects(&self, filter: Option<&str>) -> Result<Vec<Global>, CoreError> {
        let conn = self.connections.current()?;
        Ok(conn
            .registry
            .for_each(|g| g.matches_type(filter))
            .cloned()
            .collect())
    }

    /// Show one object, or every live global of the current connection.
    ///
    /// A proxy variable handle is resolved before the registry. An object
    /// that has no snapshot yet is shown as soon as its first info arrives.
    pub fn info(&mut self, target: InfoTarget) -> Result<(), CoreError> {
        match target {
            InfoTarget::All => {
                let conn = self.connections.current_mut()?;
                for id in conn.registry.ids() {
                    if let Err(err) = global_info(conn, id, &mut self.notices) {
                        self.notices.push(Notice::InfoFailed {
                            message: err.to_string(),
                        });
                    }
                }
                Ok(())
            }
            InfoTarget::Id(id) => {
                if let Some(Variable::Proxy { remote, proxy }) = self.vars.get(id) {
                    return self.proxy_info(id, remote, proxy);
                }
                let conn = self.connections.current_mut()?;
                global_info(conn, id, &mut self.notices)
            }
        }
    }

    fn proxy_info(&mut self, handle: u32, remote: u32, proxy: ProxyId) -> Result<(), CoreError> {
        let stale = CoreError::StaleHandle { handle };
        let Some(conn) = self.connections.get_mut(remote) else {
            return Err(stale);
        };
        let slot = conn.slot();
        let Some(p) = conn.proxies.get_mut(proxy) else {
            return Err(stale);
        };
        if p.is_inert() {
            return Err(stale);
        }
        match p.snapshot.as_mut() {
            Some(snapshot) => {
                let global = p.global.and_then(|g| conn.registry.lookup(g)).cloned();
                self.notices.push(Notice::ShowInfo {
                    remote: slot,
                    global,
                    snapshot: snapshot.clone(),
                });
                snapshot.clear_changes();
            }
            None => p.render_pending = true,
        }
        Ok(())
    }

    // ── Object operations ────────────────────────────────────────────

    pub fn create_device(&mut self, factory: &str, props: Option<&str>) -> Result<Created, CoreError> {
        let props = props.map(parse_properties).unwrap_or_default();
        self.create_object(ObjectKind::Device, factory, &props)
    }

    pub fn create_node(&mut self, factory: &str, props: Option<&str>) -> Result<Created, CoreError> {
        let props = props.map(parse_properties).unwrap_or_default();
        self.create_object(ObjectKind::Node, factory, &props)
    }

    /// Link an output port to an input port through the link factory.
    /// Nodes and ports are passed through as given.
    pub fn create_link(
        &mut self,
        output_node: &str,
        output_port: &str,
        input_node: &str,
        input_port: &str,
        props: Option<&str>,
    ) -> Result<Created, CoreError> {
        let mut props = props.map(parse_properties).unwrap_or_default();
        props.set("link.output.node", output_node);
        props.set("link.output.port", output_port);
        props.set("link.input.node", input_node);
        props.set("link.input.port", input_port);
        self.create_object(ObjectKind::Link, "link-factory", &props)
    }

    fn create_object(
        &mut self,
        kind: ObjectKind,
        factory: &str,
        props: &Properties,
    ) -> Result<Created, CoreError> {
        let conn = self.connections.current_mut()?;
        let proxy = conn
            .remote()
            .create_object(factory, kind.type_name(), kind.version(), props)?;
        conn.proxies
            .insert(Proxy::new(proxy, kind, ProxyOrigin::Created));
        let handle = self.vars.insert(Variable::Proxy {
            remote: conn.slot(),
            proxy,
        });
        debug!(factory, %kind, handle, proxy, "create requested");
        Ok(Created { handle, proxy })
    }

    /// Ask the service to destroy global `id`.
    pub fn destroy(&mut self, id: u32) -> Result<(), CoreError> {
        let conn = self.connections.current_mut()?;
        if conn.registry.lookup(id).is_none() {
            return Err(CoreError::UnknownGlobal { id });
        }
        conn.remote().destroy_global(id)?;
        Ok(())
    }

    /// Export local node `node` to `remote`, or to the current connection.
    pub fn export_node(&mut self, node: u32, remote: Option<u32>) -> Result<Created, CoreError> {
        let slot = self.remote_slot(remote)?;
        let object = self.context.node(node)?.export();
        let conn = self
            .connections
            .get_mut(slot)
            .ok_or(CoreError::NoRemote)?;
        let proxy = conn.remote().export(&object)?;
        conn.proxies
            .insert(Proxy::new(proxy, ObjectKind::Node, ProxyOrigin::Exported));
        let handle = self.vars.insert(Variable::Proxy {
            remote: slot,
            proxy,
        });
        Ok(Created { handle, proxy })
    }

    pub fn enum_params(&mut self, id: u32, param_id: u32) -> Result<(), CoreError> {
        let conn = self.connections.current_mut()?;
        let global = conn
            .registry
            .lookup(id)
            .ok_or(CoreError::UnknownGlobal { id })?;
        if !global.kind.is_some_and(ObjectKind::has_params) {
            return Err(CoreError::WrongType(format!(
                "enum-params not implemented on object {id} type:{}",
                global.type_name
            )));
        }
        let proxy = conn.ensure_bound(id)?;
        conn.remote().enum_params(proxy, 0, param_id, 0, 0)?;
        Ok(())
    }

    /// Grant `bits` on `object` to client `client`.
    pub fn set_permissions(
        &mut self,
        client: u32,
        object: u32,
        bits: PermissionBits,
    ) -> Result<(), CoreError> {
        let conn = self.connections.current_mut()?;
        let proxy = client_proxy(conn, client)?;
        conn.remote()
            .update_permissions(proxy, &[Permission::new(object, bits)])?;
        Ok(())
    }

    pub fn get_permissions(&mut self, client: u32) -> Result<(), CoreError> {
        let conn = self.connections.current_mut()?;
        let proxy = client_proxy(conn, client)?;
        conn.remote().get_permissions(proxy, 0, u32::MAX)?;
        Ok(())
    }

    pub fn load_module(&mut self, name: &str, args: Option<&str>) -> Result<Loaded, CoreError> {
        let id = self.context.load_module(name, args)?;
        let handle = self.vars.insert(Variable::Module { id });
        Ok(Loaded { handle, id })
    }

    /// Load a module without giving it a variable, as done at startup.
    pub fn preload_module(&mut self, name: &str, args: Option<&str>) -> Result<u32, CoreError> {
        self.context.load_module(name, args)
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Apply one transport event.
    pub fn handle_event(&mut self, envelope: Envelope) {
        let Envelope {
            remote: slot,
            event,
        } = envelope;
        let current = self.connections.current_slot() == Some(slot);
        let Some(conn) = self.connections.get_mut(slot) else {
            trace!(slot, "event for a closed connection");
            return;
        };

        match event {
            Event::RemoteInfo(info) => {
                conn.rename(info.name.as_str());
                self.notices.push(Notice::RemoteNamed {
                    remote: slot,
                    name: info.name,
                });
            }
            Event::Done { seq, .. } => {
                if conn.sequencer.complete(seq) && current {
                    self.notices.push(Notice::Prompt {
                        name: conn.name().to_owned(),
                    });
                }
            }
            Event::Error {
                id,
                seq,
                res,
                message,
            } => {
                if id == 0 {
                    self.connection_lost(slot, message);
                } else {
                    warn!(
                        remote = slot,
                        id,
                        seq,
                        res,
                        reason = errno::describe(res),
                        "{message}"
                    );
                }
            }
            Event::GlobalAdded {
                id,
                permissions,
                type_name,
                version,
                props,
            } => {
                let global = Global::new(id, permissions, type_name, version, props);
                self.notices.push(Notice::GlobalAdded {
                    remote: slot,
                    global: global.clone(),
                });
                if let Some(old) = conn.registry.upsert(global) {
                    if let Some(proxy) = old.proxy {
                        conn.release_proxy(proxy);
                    }
                }
                if self.config.bind_on_discovery {
                    if let Err(err) = conn.bind(id) {
                        self.notices.push(Notice::Error {
                            message: err.to_string(),
                        });
                    }
                }
            }
            Event::GlobalRemoved { id } => match conn.registry.remove(id) {
                Some(global) => {
                    for proxy in conn.proxies.attached_to(id) {
                        conn.release_proxy(proxy);
                    }
                    self.notices.push(Notice::GlobalRemoved {
                        remote: slot,
                        global,
                    });
                }
                None => self
                    .notices
                    .push(Notice::UnknownGlobalRemoved { remote: slot, id }),
            },
            Event::Bound { proxy, global_id } => {
                if let Some(p) = conn.proxies.get_mut(proxy) {
                    p.global = Some(global_id);
                }
            }
            Event::Info { proxy, update } => merge_info(conn, proxy, &update, &mut self.notices),
            Event::Param {
                proxy,
                id,
                index,
                param,
                ..
            } => match conn.proxies.get(proxy).and_then(|p| p.global) {
                Some(object) => self.notices.push(Notice::Param {
                    remote: slot,
                    object,
                    param_id: id,
                    index,
                    payload: param,
                }),
                None => trace!(slot, proxy, "param for an unattached proxy"),
            },
            Event::Permissions {
                proxy,
                index,
                permissions,
            } => match conn.proxies.get(proxy).and_then(|p| p.global) {
                Some(object) => self.notices.push(Notice::Permissions {
                    remote: slot,
                    object,
                    index,
                    permissions,
                }),
                None => trace!(slot, proxy, "permissions for an unattached proxy"),
            },
            Event::ProxyRemoved { proxy } => {
                if let Some(id) = conn.proxies.invalidate(proxy) {
                    if let Some(global) = conn.registry.lookup_mut(id) {
                        if global.proxy == Some(proxy) {
                            global.proxy = None;
                            global.info_pending = false;
                        }
                    }
                }
            }
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Show global `id` now if its proxy has a snapshot. Otherwise bind it if
/// needed and show it when its first info lands.
fn global_info(conn: &mut Connection, id: u32, notices: &mut Vec<Notice>) -> Result<(), CoreError> {
    let header = conn
        .registry
        .lookup(id)
        .cloned()
        .ok_or(CoreError::UnknownGlobal { id })?;
    let proxy = match header.proxy {
        Some(proxy) => proxy,
        None => conn.bind(id)?,
    };

    let slot = conn.slot();
    match conn.proxies.get_mut(proxy).and_then(|p| p.snapshot.as_mut()) {
        Some(snapshot) => {
            notices.push(Notice::ShowInfo {
                remote: slot,
                global: Some(header),
                snapshot: snapshot.clone(),
            });
            snapshot.clear_changes();
        }
        None => {
            if let Some(global) = conn.registry.lookup_mut(id) {
                global.info_pending = true;
            }
        }
    }
    Ok(())
}

fn client_proxy(conn: &mut Connection, id: u32) -> Result<ProxyId, CoreError> {
    let global = conn
        .registry
        .lookup(id)
        .ok_or(CoreError::UnknownGlobal { id })?;
    if global.kind != Some(ObjectKind::Client) {
        return Err(CoreError::WrongType(format!("object {id} is not a client")));
    }
    conn.ensure_bound(id)
}

/// Fold an info update into its proxy's snapshot, echoing changes and
/// rendering when a render was requested for the proxy or its global.
fn merge_info(conn: &mut Connection, proxy: ProxyId, update: &InfoUpdate, notices: &mut Vec<Notice>) {
    let slot = conn.slot();
    let Some(p) = conn.proxies.get_mut(proxy) else {
        trace!(slot, proxy, "info for an unknown proxy");
        return;
    };
    if p.is_inert() {
        return;
    }
    if p.kind != ObjectKind::of_update(update) {
        warn!(slot, proxy, kind = %p.kind, update = update.label(), "mismatched info update");
        return;
    }

    let global_id = *p.global.get_or_insert(update.id());
    if p.snapshot.is_some() {
        notices.push(Notice::Changed {
            remote: slot,
            kind: p.kind,
            id: update.id(),
        });
    }
    let mut snapshot = match merge(p.snapshot.take(), update) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(slot, proxy, %err, "dropping info update");
            return;
        }
    };

    let global_pending = conn
        .registry
        .lookup(global_id)
        .is_some_and(|g| g.info_pending);
    if p.render_pending || global_pending {
        notices.push(Notice::ShowInfo {
            remote: slot,
            global: conn.registry.lookup(global_id).cloned(),
            snapshot: snapshot.clone(),
        });
        snapshot.clear_changes();
        p.render_pending = false;
        if let Some(global) = conn.registry.lookup_mut(global_id) {
            global.info_pending = false;
        }
    }
    p.snapshot = Some(snapshot);
}
