// ── Proxy table ──
//
// Bound proxies of one connection, keyed by transport proxy id. A Global
// refers to its proxy by id; a proxy refers back to its Global by id. Neither
// side holds the other alive.

use std::collections::BTreeMap;

use pwmirror_api::ProxyId;

use crate::model::{ObjectKind, Snapshot};

/// How a proxy came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyOrigin {
    /// Bound to a registry entry. Lives and dies with its Global.
    Bound,
    /// Returned by a factory. Owned by the variable table.
    Created,
    /// Returned by exporting a local object. Owned by the variable table.
    Exported,
}

#[derive(Debug, Clone)]
pub struct Proxy {
    pub id: ProxyId,
    pub kind: ObjectKind,
    pub origin: ProxyOrigin,
    pub global: Option<u32>,
    pub snapshot: Option<Snapshot>,
    /// Render on the next merge regardless of the Global's pending flag.
    pub render_pending: bool,
    inert: bool,
}

impl Proxy {
    pub fn new(id: ProxyId, kind: ObjectKind, origin: ProxyOrigin) -> Self {
        Self {
            id,
            kind,
            origin,
            global: None,
            snapshot: None,
            render_pending: false,
            inert: false,
        }
    }

    pub fn bound(id: ProxyId, kind: ObjectKind, global: u32) -> Self {
        Self {
            global: Some(global),
            ..Self::new(id, kind, ProxyOrigin::Bound)
        }
    }

    /// The remote object is gone; operations on this proxy are stale.
    pub fn is_inert(&self) -> bool {
        self.inert
    }
}

#[derive(Debug, Default)]
pub struct ProxyTable {
    proxies: BTreeMap<ProxyId, Proxy>,
}

impl ProxyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, proxy: Proxy) {
        self.proxies.insert(proxy.id, proxy);
    }

    pub fn get(&self, id: ProxyId) -> Option<&Proxy> {
        self.proxies.get(&id)
    }

    pub fn get_mut(&mut self, id: ProxyId) -> Option<&mut Proxy> {
        self.proxies.get_mut(&id)
    }

    /// Tear down a proxy after its remote object went away. Registry-bound
    /// proxies are dropped; factory and export proxies stay behind as inert
    /// entries so their variables report a stale handle. Returns the Global
    /// the proxy was attached to.
    pub fn invalidate(&mut self, id: ProxyId) -> Option<u32> {
        let proxy = self.proxies.get_mut(&id)?;
        let global = proxy.global.take();
        match proxy.origin {
            ProxyOrigin::Bound => {
                self.proxies.remove(&id);
            }
            ProxyOrigin::Created | ProxyOrigin::Exported => {
                proxy.inert = true;
                proxy.snapshot = None;
                proxy.render_pending = false;
            }
        }
        global
    }

    /// Live proxies attached to `global`.
    pub fn attached_to(&self, global: u32) -> Vec<ProxyId> {
        self.proxies
            .values()
            .filter(|p| !p.inert && p.global == Some(global))
            .map(|p| p.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bound_proxies_vanish_on_invalidation() {
        let mut table = ProxyTable::new();
        table.insert(Proxy::bound(2, ObjectKind::Node, 40));
        assert_eq!(table.invalidate(2), Some(40));
        assert!(table.get(2).is_none());
    }

    #[test]
    fn created_proxies_turn_inert() {
        let mut table = ProxyTable::new();
        let mut proxy = Proxy::new(5, ObjectKind::Node, ProxyOrigin::Created);
        proxy.global = Some(41);
        table.insert(proxy);

        assert_eq!(table.invalidate(5), Some(41));
        let proxy = table.get(5).unwrap();
        assert!(proxy.is_inert());
        assert!(proxy.snapshot.is_none());
        assert_eq!(proxy.global, None);
        assert!(table.attached_to(41).is_empty());
    }

    #[test]
    fn invalidating_an_unknown_proxy_is_a_no_op() {
        let mut table = ProxyTable::new();
        assert_eq!(table.invalidate(9), None);
        assert!(table.is_empty());
    }

    #[test]
    fn several_proxies_can_share_a_global() {
        let mut table = ProxyTable::new();
        table.insert(Proxy::bound(2, ObjectKind::Node, 40));
        let mut created = Proxy::new(3, ObjectKind::Node, ProxyOrigin::Created);
        created.global = Some(40);
        table.insert(created);
        assert_eq!(table.attached_to(40), vec![2, 3]);
    }
}
