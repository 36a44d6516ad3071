// ── Object kinds ──
//
// The eleven interfaces the mirror knows how to bind. A global's kind is
// resolved from its type name once, when the global is announced; nothing
// downstream compares type strings again.

use pwmirror_api::{InfoUpdate, interface};
use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ObjectKind {
    Core,
    Module,
    Device,
    Node,
    Port,
    Factory,
    Client,
    Link,
    Session,
    Endpoint,
    EndpointStream,
}

impl ObjectKind {
    /// Resolve an announced interface name.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        Self::iter().find(|kind| kind.type_name() == type_name)
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Core => interface::CORE,
            Self::Module => interface::MODULE,
            Self::Device => interface::DEVICE,
            Self::Node => interface::NODE,
            Self::Port => interface::PORT,
            Self::Factory => interface::FACTORY,
            Self::Client => interface::CLIENT,
            Self::Link => interface::LINK,
            Self::Session => interface::SESSION,
            Self::Endpoint => interface::ENDPOINT,
            Self::EndpointStream => interface::ENDPOINT_STREAM,
        }
    }

    /// Protocol version proxies of this kind are bound at.
    pub fn version(self) -> u32 {
        match self {
            Self::Session | Self::Endpoint | Self::EndpointStream => 0,
            _ => 3,
        }
    }

    /// Whether the kind answers parameter enumeration.
    pub fn has_params(self) -> bool {
        matches!(
            self,
            Self::Device
                | Self::Node
                | Self::Port
                | Self::Session
                | Self::Endpoint
                | Self::EndpointStream
        )
    }

    /// Kind carried by an info update.
    pub fn of_update(update: &InfoUpdate) -> Self {
        match update {
            InfoUpdate::Core(_) => Self::Core,
            InfoUpdate::Module(_) => Self::Module,
            InfoUpdate::Device(_) => Self::Device,
            InfoUpdate::Node(_) => Self::Node,
            InfoUpdate::Port(_) => Self::Port,
            InfoUpdate::Factory(_) => Self::Factory,
            InfoUpdate::Client(_) => Self::Client,
            InfoUpdate::Link(_) => Self::Link,
            InfoUpdate::Session(_) => Self::Session,
            InfoUpdate::Endpoint(_) => Self::Endpoint,
            InfoUpdate::EndpointStream(_) => Self::EndpointStream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_its_type_name() {
        for kind in ObjectKind::iter() {
            assert_eq!(ObjectKind::from_type_name(kind.type_name()), Some(kind));
        }
        assert_eq!(ObjectKind::iter().count(), 11);
    }

    #[test]
    fn unknown_interfaces_have_no_kind() {
        assert_eq!(ObjectKind::from_type_name(interface::METADATA), None);
        assert_eq!(ObjectKind::from_type_name("PipeWire:Interface:Node:Extra"), None);
    }

    #[test]
    fn session_management_kinds_bind_at_version_zero() {
        assert_eq!(ObjectKind::Endpoint.version(), 0);
        assert_eq!(ObjectKind::Node.version(), 3);
        assert_eq!(ObjectKind::EndpointStream.to_string(), "endpoint-stream");
    }

    #[test]
    fn params_only_on_media_kinds() {
        assert!(ObjectKind::Port.has_params());
        assert!(!ObjectKind::Client.has_params());
        assert!(!ObjectKind::Link.has_params());
    }
}
