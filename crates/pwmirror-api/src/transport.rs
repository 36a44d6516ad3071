// ── Transport contract ──
//
// The mirror never talks to a service directly; it drives a `Remote`
// obtained from a `Transport`. Requests return immediately. Anything the
// service has to say comes back later through the connection's `EventSink`.

use tokio::sync::mpsc;
use tracing::trace;

use crate::error::Error;
use crate::event::{Envelope, Event};
use crate::props::Properties;
use crate::types::Permission;

/// Connection-local proxy identifier, allocated by the transport.
pub type ProxyId = u32;

/// Delivery handle for one connection's events.
#[derive(Debug, Clone)]
pub struct EventSink {
    remote: u32,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl EventSink {
    pub fn new(remote: u32, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { remote, tx }
    }

    /// Client-assigned slot of the connection this sink feeds.
    pub fn remote(&self) -> u32 {
        self.remote
    }

    /// Queue an event. Returns `false` once the receiving side is gone.
    pub fn emit(&self, event: Event) -> bool {
        trace!(remote = self.remote, ?event, "emit");
        self.tx
            .send(Envelope {
                remote: self.remote,
                event,
            })
            .is_ok()
    }
}

/// A client-local object handed to the service by `Remote::export`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedObject {
    pub type_name: String,
    pub props: Properties,
}

/// Connection factory.
pub trait Transport {
    fn connect(&self, props: &Properties, sink: EventSink) -> Result<Box<dyn Remote>, Error>;
}

/// Request surface of one live connection.
pub trait Remote {
    /// Issue a barrier. The returned sequence number comes back in a
    /// `Done` event once every earlier request has been processed.
    fn sync(&mut self, target: u32, seq: u32) -> Result<u32, Error>;

    /// Bind a registry entry to a new proxy of the given interface.
    fn bind(&mut self, global_id: u32, type_name: &str, version: u32) -> Result<ProxyId, Error>;

    fn create_object(
        &mut self,
        factory: &str,
        type_name: &str,
        version: u32,
        props: &Properties,
    ) -> Result<ProxyId, Error>;

    fn destroy_global(&mut self, id: u32) -> Result<(), Error>;

    fn enum_params(
        &mut self,
        proxy: ProxyId,
        seq: u32,
        param_id: u32,
        start: u32,
        num: u32,
    ) -> Result<(), Error>;

    fn update_permissions(&mut self, proxy: ProxyId, permissions: &[Permission])
    -> Result<(), Error>;

    fn get_permissions(&mut self, proxy: ProxyId, start: u32, num: u32) -> Result<(), Error>;

    fn export(&mut self, object: &ExportedObject) -> Result<ProxyId, Error>;

    /// Drop a proxy client-side. The service stops addressing it.
    fn destroy_proxy(&mut self, proxy: ProxyId);

    fn disconnect(&mut self);
}
