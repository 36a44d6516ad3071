// ── Connection ──
//
// One live session with the service: its request surface, its registry,
// its proxies and its barrier state. The slot id doubles as the
// connection's variable-table handle.

use pwmirror_api::{ProxyId, Remote};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::proxy::ProxyTable;
use crate::registry::Registry;
use crate::sequencer::Sequencer;

pub struct Connection {
    slot: u32,
    name: String,
    remote: Box<dyn Remote>,
    pub registry: Registry,
    pub proxies: ProxyTable,
    pub sequencer: Sequencer,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("slot", &self.slot)
            .field("name", &self.name)
            .field("globals", &self.registry.len())
            .field("proxies", &self.proxies.len())
            .field("sequencer", &self.sequencer.state())
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(slot: u32, name: impl Into<String>, remote: Box<dyn Remote>) -> Self {
        Self {
            slot,
            name: name.into(),
            remote,
            registry: Registry::new(),
            proxies: ProxyTable::new(),
            sequencer: Sequencer::new(),
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adopt the name the server reports for itself.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn remote(&mut self) -> &mut dyn Remote {
        self.remote.as_mut()
    }

    /// Issue a barrier and wait for it before taking more input.
    pub fn issue_barrier(&mut self) -> Result<u32, CoreError> {
        let seq = self.remote.sync(0, 0)?;
        self.sequencer.issue(seq);
        debug!(slot = self.slot, seq, "barrier issued");
        Ok(seq)
    }

    /// Disconnect from the service and release every Global and proxy.
    pub fn close(mut self) {
        self.remote.disconnect();
        let globals = self.registry.drain();
        if !globals.is_empty() || !self.proxies.is_empty() {
            debug!(
                slot = self.slot,
                globals = globals.len(),
                proxies = self.proxies.len(),
                "connection torn down"
            );
        }
    }

    /// Invalidate a proxy whose Global was removed or re-announced and
    /// release it service-side. Factory and export proxies stay behind
    /// inert so their variables report a stale handle.
    pub fn release_proxy(&mut self, proxy: ProxyId) {
        if self.proxies.get(proxy).is_none() {
            warn!(slot = self.slot, proxy, "releasing unknown proxy");
        }
        if let Some(id) = self.proxies.invalidate(proxy) {
            if let Some(global) = self.registry.lookup_mut(id) {
                if global.proxy == Some(proxy) {
                    global.proxy = None;
                }
            }
        }
        self.remote.destroy_proxy(proxy);
    }
}
