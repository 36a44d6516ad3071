// ── Proxy binder ──
//
// Binding resolves the Global's kind (fixed at discovery), requests a
// proxy at that kind's protocol version and links Proxy and Global both
// ways. A failed bind leaves the Global unbound.

use pwmirror_api::ProxyId;
use tracing::debug;

use crate::connection::Connection;
use crate::error::CoreError;
use crate::proxy::Proxy;

impl Connection {
    /// Bind a proxy to the Global with `id`, replacing none.
    pub fn bind(&mut self, id: u32) -> Result<ProxyId, CoreError> {
        let global = self
            .registry
            .lookup(id)
            .ok_or(CoreError::UnknownGlobal { id })?;
        let kind = global.kind.ok_or_else(|| CoreError::UnsupportedType {
            type_name: global.type_name.clone(),
        })?;

        let proxy = self.remote().bind(id, kind.type_name(), kind.version())?;
        self.proxies.insert(Proxy::bound(proxy, kind, id));
        if let Some(global) = self.registry.lookup_mut(id) {
            global.proxy = Some(proxy);
        }
        debug!(slot = self.slot(), global = id, proxy, %kind, "bound");
        Ok(proxy)
    }

    /// The proxy bound to Global `id`, binding one first if needed.
    pub fn ensure_bound(&mut self, id: u32) -> Result<ProxyId, CoreError> {
        let global = self
            .registry
            .lookup(id)
            .ok_or(CoreError::UnknownGlobal { id })?;
        match global.proxy {
            Some(proxy) => Ok(proxy),
            None => self.bind(id),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pwmirror_api::{
        EventSink, LoopbackTransport, PermissionBits, Properties, Transport, interface,
    };
    use tokio::sync::mpsc;

    use super::*;
    use crate::model::{Global, ObjectKind};

    fn connection() -> Connection {
        let (tx, _rx) = mpsc::unbounded_channel();
        let remote = LoopbackTransport::new()
            .connect(&Properties::new(), EventSink::new(0, tx))
            .unwrap();
        Connection::new(0, "internal", remote)
    }

    #[test]
    fn binding_links_both_sides() {
        let mut conn = connection();
        conn.registry
            .upsert(Global::new(0, PermissionBits::ALL, interface::CORE, 3, None));

        let proxy = conn.bind(0).unwrap();
        assert_eq!(conn.registry.lookup(0).unwrap().proxy, Some(proxy));
        let bound = conn.proxies.get(proxy).unwrap();
        assert_eq!(bound.global, Some(0));
        assert_eq!(bound.kind, ObjectKind::Core);
    }

    #[test]
    fn ensure_bound_reuses_the_existing_proxy() {
        let mut conn = connection();
        conn.registry
            .upsert(Global::new(0, PermissionBits::ALL, interface::CORE, 3, None));
        let first = conn.ensure_bound(0).unwrap();
        let second = conn.ensure_bound(0).unwrap();
        assert_eq!(first, second);
        assert_eq!(conn.proxies.len(), 1);
    }

    #[test]
    fn unsupported_types_stay_unbound() {
        let mut conn = connection();
        conn.registry.upsert(Global::new(
            9,
            PermissionBits::ALL,
            interface::METADATA,
            3,
            None,
        ));
        let err = conn.bind(9).unwrap_err();
        assert_eq!(err.to_string(), format!("unsupported type {}", interface::METADATA));
        assert_eq!(conn.registry.lookup(9).unwrap().proxy, None);
        assert!(conn.proxies.is_empty());
    }

    #[test]
    fn unknown_ids_fail_lookup() {
        let mut conn = connection();
        assert!(matches!(conn.bind(77), Err(CoreError::UnknownGlobal { id: 77 })));
    }
}
