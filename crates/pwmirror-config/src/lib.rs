//! Configuration for the pwmirror console.
//!
//! TOML file, `PWMIRROR_*` environment overrides and remote profiles,
//! layered with figment and translated into `pwmirror_core::SessionConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pwmirror_api::Properties;
use pwmirror_core::{DEFAULT_REMOTE, SessionConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

pub const OUTPUT_FORMATS: &[&str] = &["text", "json", "yaml"];
pub const COLOR_MODES: &[&str] = &["auto", "always", "never"];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Remote connected to at startup and by a bare `connect`.
    #[serde(default = "default_remote")]
    pub default_remote: String,

    /// Reported to the service as `application.name`.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Bind every announced global right away.
    #[serde(default = "default_true")]
    pub bind_on_discovery: bool,

    /// `text`, `json` or `yaml`.
    #[serde(default = "default_output")]
    pub output: String,

    /// `auto`, `always` or `never`.
    #[serde(default = "default_color")]
    pub color: String,

    /// Modules loaded into the local context before connecting.
    #[serde(default = "default_autoload")]
    pub autoload_modules: Vec<ModuleSpec>,

    /// Named remote profiles.
    #[serde(default)]
    pub remotes: BTreeMap<String, RemoteProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_remote: default_remote(),
            application_name: default_application_name(),
            bind_on_discovery: true,
            output: default_output(),
            color: default_color(),
            autoload_modules: default_autoload(),
            remotes: BTreeMap::new(),
        }
    }
}

fn default_remote() -> String {
    DEFAULT_REMOTE.into()
}
fn default_application_name() -> String {
    "pwmirror".into()
}
fn default_true() -> bool {
    true
}
fn default_output() -> String {
    "text".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_autoload() -> Vec<ModuleSpec> {
    vec![ModuleSpec {
        name: "libpipewire-module-link-factory".into(),
        args: None,
    }]
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModuleSpec {
    pub name: String,
    pub args: Option<String>,
}

/// Connection settings for one named remote.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RemoteProfile {
    /// Service to connect to. Defaults to the profile name.
    pub service: Option<String>,

    /// Extra connection properties.
    #[serde(default)]
    pub properties: Properties,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_choice("output", &self.output, OUTPUT_FORMATS)?;
        check_choice("color", &self.color, COLOR_MODES)?;
        if self.default_remote.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "default_remote".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Session settings for the core.
    pub fn session_config(&self) -> SessionConfig {
        let remotes = self
            .remotes
            .iter()
            .map(|(name, profile)| {
                let mut props = profile.properties.clone();
                if let Some(ref service) = profile.service {
                    props.set("remote.name", service.as_str());
                }
                (name.clone(), props)
            })
            .collect();
        SessionConfig {
            application_name: self.application_name.clone(),
            default_remote: self.default_remote.clone(),
            bind_on_discovery: self.bind_on_discovery,
            remotes,
        }
    }
}

fn check_choice(field: &str, value: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::Validation {
        field: field.into(),
        reason: format!("expected one of {}, got '{value}'", allowed.join(", ")),
    })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "pwmirror", "pwmirror").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("pwmirror");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered figment: defaults, then the TOML file, then `PWMIRROR_*`.
/// Nested keys use a double underscore, e.g.
/// `PWMIRROR_REMOTES__STUDIO__SERVICE`.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PWMIRROR_").split("__"))
}

/// Load and validate the config at `path`, or at the platform default.
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
