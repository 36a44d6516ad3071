//! Transport seam for the pwmirror remote-object client.
//!
//! This crate defines the contract between the client-side mirror and the
//! media service it inspects:
//!
//! - **[`Transport`] / [`Remote`]**: connection factory and per-connection
//!   request surface. Every request is fire-and-forget; results come back as
//!   [`Event`]s through the [`EventSink`] handed over at connect time.
//!
//! - **Wire types** ([`info`], [`types`], [`Properties`]): the eleven
//!   per-kind info updates with their typed change masks, parameter
//!   descriptors, permissions, and the ordered property dictionary.
//!
//! - **[`LoopbackTransport`]**: a single-threaded in-process media service
//!   that backs the `internal` remote. Events are emitted strictly in request
//!   order, so a `sync` completion is a real barrier.

pub mod error;
pub mod event;
pub mod info;
pub mod loopback;
pub mod props;
pub mod transport;
pub mod types;

pub use error::{Error, errno};
pub use event::{Envelope, Event};
pub use info::InfoUpdate;
pub use loopback::{LoopbackBuilder, LoopbackTransport};
pub use props::Properties;
pub use transport::{EventSink, ExportedObject, ProxyId, Remote, Transport};
pub use types::{
    Direction, ID_ANY, LinkState, NodeState, ParamFlags, ParamInfo, ParamType, Permission,
    PermissionBits, interface,
};
