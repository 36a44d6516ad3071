// ── Connection set ──
//
// Live connections in most-recently-used order plus the current one.
// `current` is either `None` or a member of the set; removing the current
// connection promotes the most recently used survivor.

use std::collections::BTreeMap;

use crate::connection::Connection;
use crate::error::CoreError;

#[derive(Debug, Default)]
pub struct ConnectionSet {
    conns: BTreeMap<u32, Connection>,
    /// Slots, least recently used first.
    order: Vec<u32>,
    current: Option<u32>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection and make it current.
    pub fn insert(&mut self, conn: Connection) {
        let slot = conn.slot();
        self.order.retain(|s| *s != slot);
        self.order.push(slot);
        self.conns.insert(slot, conn);
        self.current = Some(slot);
    }

    /// Make `slot` current and most recently used.
    pub fn switch(&mut self, slot: u32) -> Result<(), CoreError> {
        if !self.conns.contains_key(&slot) {
            return Err(CoreError::NotFound(format!("Remote {slot} does not exist")));
        }
        self.order.retain(|s| *s != slot);
        self.order.push(slot);
        self.current = Some(slot);
        Ok(())
    }

    /// Take a connection out of the set. The caller tears it down.
    pub fn remove(&mut self, slot: u32) -> Option<Connection> {
        let conn = self.conns.remove(&slot)?;
        self.order.retain(|s| *s != slot);
        if self.current == Some(slot) {
            self.current = self.order.last().copied();
        }
        Some(conn)
    }

    pub fn current_slot(&self) -> Option<u32> {
        self.current
    }

    pub fn current(&self) -> Result<&Connection, CoreError> {
        self.current
            .and_then(|slot| self.conns.get(&slot))
            .ok_or(CoreError::NoRemote)
    }

    pub fn current_mut(&mut self) -> Result<&mut Connection, CoreError> {
        self.current
            .and_then(|slot| self.conns.get_mut(&slot))
            .ok_or(CoreError::NoRemote)
    }

    pub fn get(&self, slot: u32) -> Option<&Connection> {
        self.conns.get(&slot)
    }

    pub fn get_mut(&mut self, slot: u32) -> Option<&mut Connection> {
        self.conns.get_mut(&slot)
    }

    pub fn contains(&self, slot: u32) -> bool {
        self.conns.contains_key(&slot)
    }

    /// Connections, least recently used first.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.order.iter().filter_map(|slot| self.conns.get(slot))
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pwmirror_api::{EventSink, LoopbackTransport, Properties, Transport};
    use tokio::sync::mpsc;

    use super::*;

    fn set_of(slots: &[u32]) -> ConnectionSet {
        let transport = LoopbackTransport::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut set = ConnectionSet::new();
        for slot in slots {
            let remote = transport
                .connect(&Properties::new(), EventSink::new(*slot, tx.clone()))
                .unwrap();
            set.insert(Connection::new(*slot, "internal", remote));
        }
        set
    }

    fn order(set: &ConnectionSet) -> Vec<u32> {
        set.iter().map(Connection::slot).collect()
    }

    #[test]
    fn the_newest_connection_is_current() {
        let set = set_of(&[0, 3]);
        assert_eq!(set.current_slot(), Some(3));
        assert_eq!(order(&set), vec![0, 3]);
    }

    #[test]
    fn switching_moves_to_the_back() {
        let mut set = set_of(&[0, 3, 5]);
        set.switch(0).unwrap();
        assert_eq!(set.current_slot(), Some(0));
        assert_eq!(order(&set), vec![3, 5, 0]);
    }

    #[test]
    fn switching_to_an_unknown_slot_fails() {
        let mut set = set_of(&[0]);
        let err = set.switch(7).unwrap_err();
        assert_eq!(err.to_string(), "Remote 7 does not exist");
        assert_eq!(set.current_slot(), Some(0));
    }

    #[test]
    fn removing_current_promotes_the_survivor() {
        let mut set = set_of(&[0, 1]);
        set.remove(1).unwrap();
        assert_eq!(set.current_slot(), Some(0));
        assert_eq!(set.current().unwrap().slot(), 0);
    }

    #[test]
    fn removing_the_last_connection_clears_current() {
        let mut set = set_of(&[4]);
        set.remove(4).unwrap();
        assert_eq!(set.current_slot(), None);
        assert!(matches!(set.current(), Err(CoreError::NoRemote)));
    }

    #[test]
    fn removing_a_background_connection_keeps_current() {
        let mut set = set_of(&[0, 1, 2]);
        set.remove(0).unwrap();
        assert_eq!(set.current_slot(), Some(2));
        assert_eq!(order(&set), vec![1, 2]);
        assert!(set.remove(0).is_none());
    }

    #[test]
    fn current_is_always_a_member() {
        let mut set = set_of(&[0, 1, 2, 3]);
        for slot in [2, 0, 3, 1] {
            set.remove(slot);
            if let Some(current) = set.current_slot() {
                assert!(set.contains(current));
            }
        }
        assert!(set.is_empty());
        assert_eq!(set.current_slot(), None);
    }
}
