// ── Local context ──
//
// Client-side objects that live in this process rather than on a remote:
// loaded modules and the nodes they create. Local nodes can be exported
// to a remote, which then announces them like any other global.

use std::collections::BTreeMap;

use pwmirror_api::{ExportedObject, Properties, interface};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::props::parse_properties;

const SPA_NODE_MODULE: &str = "libpipewire-module-spa-node";

/// Modules the local context knows how to load.
const MODULES: &[&str] = &[
    "libpipewire-module-adapter",
    "libpipewire-module-client-node",
    "libpipewire-module-link-factory",
    "libpipewire-module-metadata",
    "libpipewire-module-protocol-native",
    "libpipewire-module-session-manager",
    "libpipewire-module-spa-device-factory",
    "libpipewire-module-spa-node-factory",
    SPA_NODE_MODULE,
];

#[derive(Debug, Clone, PartialEq)]
pub struct LocalModule {
    pub id: u32,
    pub name: String,
    pub args: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalNode {
    pub id: u32,
    pub module: u32,
    pub factory: String,
    pub props: Properties,
}

impl LocalNode {
    pub fn export(&self) -> ExportedObject {
        let mut props = self.props.clone();
        props.set("factory.name", self.factory.as_str());
        ExportedObject {
            type_name: interface::NODE.to_owned(),
            props,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalObject {
    Module(LocalModule),
    Node(LocalNode),
}

#[derive(Debug)]
pub struct LocalContext {
    objects: BTreeMap<u32, LocalObject>,
    next_id: u32,
}

impl Default for LocalContext {
    fn default() -> Self {
        // Id 0 is the context's own core.
        Self {
            objects: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl LocalContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Load `name` with optional arguments and return its local id.
    ///
    /// The spa-node module takes `<factory> [props]` and creates one local
    /// node, allocated the id right after the module's.
    pub fn load_module(&mut self, name: &str, args: Option<&str>) -> Result<u32, CoreError> {
        if !MODULES.contains(&name) {
            debug!(name, "module not in catalog");
            return Err(CoreError::ModuleLoad { name: name.into() });
        }

        let node = if name == SPA_NODE_MODULE {
            let args = args.map(str::trim).unwrap_or_default();
            let (factory, rest) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            if factory.is_empty() {
                debug!(name, "spa-node needs a factory name");
                return Err(CoreError::ModuleLoad { name: name.into() });
            }
            Some((factory.to_owned(), parse_properties(rest)))
        } else {
            None
        };

        let id = self.alloc_id();
        self.objects.insert(
            id,
            LocalObject::Module(LocalModule {
                id,
                name: name.to_owned(),
                args: args.map(str::to_owned),
            }),
        );
        if let Some((factory, props)) = node {
            let node_id = self.alloc_id();
            self.objects.insert(
                node_id,
                LocalObject::Node(LocalNode {
                    id: node_id,
                    module: id,
                    factory,
                    props,
                }),
            );
        }
        info!(name, id, "module loaded");
        Ok(id)
    }

    /// The local node with `id`.
    pub fn node(&self, id: u32) -> Result<&LocalNode, CoreError> {
        match self.objects.get(&id) {
            Some(LocalObject::Node(node)) => Ok(node),
            Some(_) => Err(CoreError::WrongType(format!("object {id} is not a node"))),
            None => Err(CoreError::NotFound(format!("object {id} does not exist"))),
        }
    }

    pub fn get(&self, id: u32) -> Option<&LocalObject> {
        self.objects.get(&id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &LocalModule> {
        self.objects.values().filter_map(|o| match o {
            LocalObject::Module(m) => Some(m),
            LocalObject::Node(_) => None,
        })
    }
}
