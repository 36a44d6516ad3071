use std::collections::BTreeMap;

use pwmirror_api::Properties;
use serde::{Deserialize, Serialize};

/// Remote the session connects to when none is named.
pub const DEFAULT_REMOTE: &str = "internal";

/// Session-level settings, already resolved from every config layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub application_name: String,
    pub default_remote: String,
    /// Bind every global as soon as it is announced.
    pub bind_on_discovery: bool,
    /// Extra connection properties per remote name.
    pub remotes: BTreeMap<String, Properties>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            application_name: "pwmirror".into(),
            default_remote: DEFAULT_REMOTE.into(),
            bind_on_discovery: true,
            remotes: BTreeMap::new(),
        }
    }
}

impl SessionConfig {
    /// Connection properties for `remote`, or for the default remote.
    ///
    /// A profile may redirect to another service by setting `remote.name`
    /// itself; otherwise the profile name is used.
    pub fn connect_props(&self, remote: Option<&str>) -> Properties {
        let name = remote.unwrap_or(&self.default_remote);
        let mut props = Properties::new();
        props.set("application.name", self.application_name.as_str());
        if let Some(profile) = self.remotes.get(name) {
            props.update(profile);
        }
        if !props.contains_key("remote.name") {
            props.set("remote.name", name);
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_become_the_remote_name() {
        let config = SessionConfig::default();
        let props = config.connect_props(None);
        assert_eq!(props.get("remote.name"), Some("internal"));
        assert_eq!(props.get("application.name"), Some("pwmirror"));
    }

    #[test]
    fn profiles_add_and_redirect() {
        let mut config = SessionConfig::default();
        config.remotes.insert(
            "studio".into(),
            [("remote.name", "pipewire-0"), ("media.role", "Production")]
                .into_iter()
                .collect(),
        );
        let props = config.connect_props(Some("studio"));
        assert_eq!(props.get("remote.name"), Some("pipewire-0"));
        assert_eq!(props.get("media.role"), Some("Production"));
    }
}
