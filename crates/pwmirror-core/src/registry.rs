// ── Global registry ──
//
// Per-connection map from service-assigned id to Global. Ids can arrive out
// of order: only live Globals are stored, and any id at or below the
// highest one announced that holds no live Global is a placeholder. A
// removal therefore leaves a placeholder behind without storing anything.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::model::Global;

#[derive(Debug, Default)]
pub struct Registry {
    live: BTreeMap<u32, Global>,
    /// Highest id ever announced on this connection.
    high: Option<u32>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a Global at its id. Returns the live entry it displaced, if
    /// the service re-announced an id without removing it first.
    pub fn upsert(&mut self, global: Global) -> Option<Global> {
        let id = global.id;
        let next = self.high.map_or(0, |h| h.saturating_add(1));
        if id > next {
            debug!(from = next, to = id, "registry gap left as placeholders");
        }
        self.high = Some(self.high.map_or(id, |h| h.max(id)));
        let old = self.live.insert(id, global);
        if old.is_some() {
            warn!(id, "global re-announced while live");
        }
        old
    }

    /// Remove a live Global; its id reads as a placeholder afterwards.
    pub fn remove(&mut self, id: u32) -> Option<Global> {
        self.live.remove(&id)
    }

    pub fn lookup(&self, id: u32) -> Option<&Global> {
        self.live.get(&id)
    }

    pub fn lookup_mut(&mut self, id: u32) -> Option<&mut Global> {
        self.live.get_mut(&id)
    }

    /// Live Globals in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Global> {
        self.live.values()
    }

    /// Live Globals satisfying `predicate`, in id order.
    pub fn for_each<'a, P>(&'a self, mut predicate: P) -> impl Iterator<Item = &'a Global>
    where
        P: FnMut(&Global) -> bool + 'a,
    {
        self.iter().filter(move |g| predicate(g))
    }

    /// Ids of live Globals, in order. Detached from the registry borrow.
    pub fn ids(&self) -> Vec<u32> {
        self.live.keys().copied().collect()
    }

    /// An id inside the announced range with no live Global behind it.
    pub fn is_placeholder(&self, id: u32) -> bool {
        self.high.is_some_and(|h| id <= h) && !self.live.contains_key(&id)
    }

    /// Number of live Globals.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Forget everything, returning the Globals that were live.
    pub fn drain(&mut self) -> Vec<Global> {
        self.high = None;
        std::mem::take(&mut self.live).into_values().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::{Duration, Instant};

    use pretty_assertions::assert_eq;
    use pwmirror_api::{PermissionBits, interface};

    use super::*;

    fn global(id: u32) -> Global {
        Global::new(id, PermissionBits::ALL, interface::NODE, 3, None)
    }

    #[test]
    fn adding_past_the_end_backfills_placeholders() {
        let mut reg = Registry::new();
        reg.upsert(global(0));
        reg.upsert(global(1));
        reg.upsert(global(2));
        reg.upsert(global(5));

        assert!(reg.is_placeholder(3));
        assert!(reg.is_placeholder(4));
        assert!(reg.lookup(3).is_none());
        assert_eq!(reg.ids(), vec![0, 1, 2, 5]);
        assert_eq!(reg.for_each(|g| g.props.is_none()).count(), 4);
    }

    #[test]
    fn placeholders_can_be_filled_later() {
        let mut reg = Registry::new();
        reg.upsert(global(4));
        assert!(reg.is_placeholder(0));
        reg.upsert(global(2));
        assert_eq!(reg.ids(), vec![2, 4]);
    }

    #[test]
    fn removal_leaves_a_tombstone() {
        let mut reg = Registry::new();
        reg.upsert(global(0));
        reg.upsert(global(1));
        assert_eq!(reg.remove(1).map(|g| g.id), Some(1));
        assert!(reg.is_placeholder(1));
        assert!(reg.remove(1).is_none());
        assert!(reg.remove(42).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn reannouncing_a_live_id_returns_the_old_entry() {
        let mut reg = Registry::new();
        reg.upsert(global(3));
        let old = reg.upsert(Global::new(3, PermissionBits::R, interface::PORT, 3, None));
        assert_eq!(old.unwrap().type_name, interface::NODE);
        assert_eq!(reg.lookup(3).unwrap().type_name, interface::PORT);
    }

    #[test]
    fn lookup_tracks_observed_adds_and_removes() {
        // Deterministic pseudo-random add/remove sequence checked against a
        // plain set model.
        let mut reg = Registry::new();
        let mut model = BTreeSet::new();
        let mut state: u32 = 0x2545_f491;
        for _ in 0..2000 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let id = (state >> 16) % 64;
            if (state >> 8) % 3 == 0 {
                let removed = reg.remove(id).is_some();
                assert_eq!(removed, model.remove(&id));
            } else if !model.contains(&id) {
                reg.upsert(global(id));
                model.insert(id);
            }
            for known in 0..64 {
                assert_eq!(reg.lookup(known).is_some(), model.contains(&known));
            }
        }
        assert_eq!(reg.ids(), model.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn drain_returns_only_live_globals() {
        let mut reg = Registry::new();
        reg.upsert(global(1));
        reg.upsert(global(3));
        let drained: Vec<u32> = reg.drain().into_iter().map(|g| g.id).collect();
        assert_eq!(drained, vec![1, 3]);
        assert!(reg.is_empty());
        assert!(!reg.is_placeholder(0));
    }

    #[test]
    fn huge_gaps_store_nothing_for_the_gap() {
        let started = Instant::now();
        let mut reg = Registry::new();
        reg.upsert(global(0));
        reg.upsert(global(u32::MAX - 1));

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(reg.len(), 2);
        assert!(reg.is_placeholder(1));
        assert!(reg.is_placeholder(u32::MAX - 2));
        assert!(!reg.is_placeholder(u32::MAX));
        assert_eq!(reg.ids(), vec![0, u32::MAX - 1]);

        reg.upsert(global(u32::MAX));
        assert_eq!(reg.len(), 3);
        assert!(reg.remove(u32::MAX).is_some());
        assert!(reg.is_placeholder(u32::MAX));
    }

    #[test]
    fn len_counts_live_globals_only() {
        let mut reg = Registry::new();
        reg.upsert(global(10));
        assert_eq!(reg.len(), 1);
        assert!(reg.is_placeholder(3));
        reg.remove(10);
        assert!(reg.is_empty());
        assert!(reg.is_placeholder(10));
    }
}
