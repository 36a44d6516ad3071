// ── Shared wire-level types ──
//
// Interface names, object states, parameter descriptors and permissions.
// These are the vocabulary every info update and event is written in.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, FromRepr};

/// Interface type names announced by the registry.
pub mod interface {
    pub const CORE: &str = "PipeWire:Interface:Core";
    pub const REGISTRY: &str = "PipeWire:Interface:Registry";
    pub const MODULE: &str = "PipeWire:Interface:Module";
    pub const DEVICE: &str = "PipeWire:Interface:Device";
    pub const NODE: &str = "PipeWire:Interface:Node";
    pub const PORT: &str = "PipeWire:Interface:Port";
    pub const FACTORY: &str = "PipeWire:Interface:Factory";
    pub const CLIENT: &str = "PipeWire:Interface:Client";
    pub const LINK: &str = "PipeWire:Interface:Link";
    pub const SESSION: &str = "PipeWire:Interface:Session";
    pub const ENDPOINT: &str = "PipeWire:Interface:Endpoint";
    pub const ENDPOINT_STREAM: &str = "PipeWire:Interface:EndpointStream";
    pub const METADATA: &str = "PipeWire:Interface:Metadata";
}

/// Id that addresses "every object" in permission lists.
pub const ID_ANY: u32 = u32::MAX;

// ── States ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Error,
    #[default]
    Creating,
    Suspended,
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Error,
    Unlinked,
    #[default]
    Init,
    Negotiating,
    Allocating,
    Paused,
    Active,
}

// ── Parameters ──────────────────────────────────────────────────────

/// Well-known parameter ids.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, FromRepr,
)]
#[strum(ascii_case_insensitive)]
#[repr(u32)]
pub enum ParamType {
    Invalid = 0,
    PropInfo = 1,
    Props = 2,
    EnumFormat = 3,
    Format = 4,
    Buffers = 5,
    Meta = 6,
    #[strum(serialize = "IO")]
    Io = 7,
    EnumProfile = 8,
    Profile = 9,
    EnumPortConfig = 10,
    PortConfig = 11,
    EnumRoute = 12,
    Route = 13,
    Control = 14,
    Latency = 15,
}

impl ParamType {
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Resolve a param id given either as a number or as a name.
    pub fn parse_id(raw: &str) -> Option<u32> {
        if let Ok(n) = raw.parse::<u32>() {
            return Some(n);
        }
        raw.parse::<Self>().ok().map(Self::id)
    }

    /// Display name for a raw param id, if it is a well-known one.
    pub fn name_of(id: u32) -> Option<String> {
        Self::from_repr(id).map(|t| t.to_string())
    }
}

bitflags! {
    /// Access flags on a parameter descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ParamFlags: u32 {
        const READ = 1 << 1;
        const WRITE = 1 << 2;
        const READWRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// One entry of an object's parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub id: u32,
    pub flags: ParamFlags,
}

impl ParamInfo {
    pub fn new(id: ParamType, flags: ParamFlags) -> Self {
        Self { id: id.id(), flags }
    }

    pub fn readable(&self) -> bool {
        self.flags.contains(ParamFlags::READ)
    }
}

// ── Permissions ─────────────────────────────────────────────────────

bitflags! {
    /// Access bits a client holds on an object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PermissionBits: u32 {
        const R = 0o400;
        const W = 0o200;
        const X = 0o100;
        const M = 0o010;
        const ALL = Self::R.bits() | Self::W.bits() | Self::X.bits() | Self::M.bits();
    }
}

impl PermissionBits {
    /// `rwx` style rendering used by object headers.
    pub fn rwx(self) -> String {
        [
            (Self::R, 'r'),
            (Self::W, 'w'),
            (Self::X, 'x'),
        ]
        .iter()
        .map(|(bit, c)| if self.contains(*bit) { *c } else { '-' })
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: u32,
    pub permissions: PermissionBits,
}

impl Permission {
    pub fn new(id: u32, permissions: PermissionBits) -> Self {
        Self { id, permissions }
    }
}
