// ── Global record ──

use pwmirror_api::{PermissionBits, Properties, ProxyId};
use serde::Serialize;

use super::ObjectKind;

/// Client-side record of one object the service announced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Global {
    pub id: u32,
    pub permissions: PermissionBits,
    #[serde(rename = "type")]
    pub type_name: String,
    pub version: u32,
    pub props: Option<Properties>,
    /// Resolved at discovery. `None` for interfaces the mirror can't bind.
    #[serde(skip)]
    pub kind: Option<ObjectKind>,
    /// Proxy currently bound to this global, if any.
    #[serde(skip)]
    pub proxy: Option<ProxyId>,
    /// Render the next info merge for this global.
    #[serde(skip)]
    pub info_pending: bool,
}

impl Global {
    pub fn new(
        id: u32,
        permissions: PermissionBits,
        type_name: impl Into<String>,
        version: u32,
        props: Option<Properties>,
    ) -> Self {
        let type_name = type_name.into();
        Self {
            id,
            permissions,
            kind: ObjectKind::from_type_name(&type_name),
            type_name,
            version,
            props,
            proxy: None,
            info_pending: false,
        }
    }

    /// Substring match against the type name, as used by `list-objects`.
    pub fn matches_type(&self, filter: Option<&str>) -> bool {
        filter.is_none_or(|f| self.type_name.contains(f))
    }
}
