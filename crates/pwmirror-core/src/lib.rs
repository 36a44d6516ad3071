//! Client-side mirror of a remote media service's object graph.
//!
//! `pwmirror-core` keeps, per connection, a registry of every object the
//! service announced, binds typed proxies to them on demand and folds the
//! incremental info updates they receive into local snapshots.
//!
//! - **[`Session`]**: owns the [`ConnectionSet`], the [`VarTable`] and the
//!   [`LocalContext`]. Commands are methods; transport events go through
//!   [`Session::handle_event`]; output comes back as [`Notice`]s.
//!
//! - **[`Registry`]**: sparse id → [`Global`] map with placeholder
//!   backfill for out-of-order ids.
//!
//! - **[`merge`]**: per-kind change-mask guarded merge of an
//!   [`InfoUpdate`](pwmirror_api::InfoUpdate) into a [`Snapshot`].
//!
//! - **[`Sequencer`]**: the one-outstanding-barrier gate that decides when
//!   the next input line may run.

pub mod bind;
pub mod config;
pub mod connection;
pub mod connection_set;
pub mod context;
pub mod error;
pub mod model;
pub mod notice;
pub mod props;
pub mod proxy;
pub mod registry;
pub mod sequencer;
pub mod session;
pub mod vars;

pub use config::{DEFAULT_REMOTE, SessionConfig};
pub use connection::Connection;
pub use connection_set::ConnectionSet;
pub use context::{LocalContext, LocalModule, LocalNode, LocalObject};
pub use error::CoreError;
pub use model::{Global, ObjectKind, Snapshot, merge};
pub use notice::Notice;
pub use props::parse_properties;
pub use proxy::{Proxy, ProxyOrigin, ProxyTable};
pub use registry::Registry;
pub use sequencer::{Sequencer, SequencerState};
pub use session::{Created, InfoTarget, Loaded, RemoteEntry, Session};
pub use vars::{VarTable, Variable};
