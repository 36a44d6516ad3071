pub mod global;
pub mod kind;
pub mod snapshot;

pub use global::Global;
pub use kind::ObjectKind;
pub use snapshot::{MergeInfo, Snapshot, merge};
