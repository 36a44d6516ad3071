//! Output formatting: console text, JSON, YAML.
//!
//! Notices and command replies are rendered to strings here; the console
//! decides which stream they go to. Object views (info, list-objects,
//! params, permissions) honour `--output`. Everything else is always text.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;

use pwmirror_api::info::{
    ClientChange, ClientInfo, CoreChange, CoreInfo, DeviceChange, DeviceInfo, EndpointChange, EndpointInfo,
    EndpointStreamChange, EndpointStreamInfo, FactoryChange, FactoryInfo, LinkChange, LinkInfo,
    ModuleChange, ModuleInfo, NodeChange, NodeInfo, PortChange, PortInfo, SessionChange,
    SessionInfo,
};
use pwmirror_api::{
    Direction, ID_ANY, LinkState, NodeState, ParamFlags, ParamInfo, ParamType, Permission,
    Properties,
};
use pwmirror_core::{Global, Notice, Snapshot};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Rendered output ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Lines for stdout.
    Out(String),
    /// Diagnostics for stderr.
    Err(String),
    /// Prompt, printed without a trailing newline.
    Prompt(String),
}

/// Print a rendered block to its stream.
pub fn emit(rendered: &Rendered) {
    match rendered {
        Rendered::Out(text) if !text.is_empty() => {
            let mut stdout = io::stdout().lock();
            let _ = writeln!(stdout, "{text}");
        }
        Rendered::Err(text) => {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "{text}");
        }
        Rendered::Prompt(text) => {
            let mut stdout = io::stdout().lock();
            let _ = write!(stdout, "{text}");
            let _ = stdout.flush();
        }
        Rendered::Out(_) => {}
    }
}

// ── View ─────────────────────────────────────────────────────────────

/// Output settings resolved from flags and config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for View {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: false,
        }
    }
}

#[derive(Serialize)]
struct InfoView<'a> {
    remote: u32,
    global: Option<&'a Global>,
    info: &'a Snapshot,
}

impl View {
    /// The console's echo of a failed command.
    pub fn error(&self, message: &str) -> String {
        let label = if self.color {
            "Error:".red().bold().to_string()
        } else {
            "Error:".to_owned()
        };
        format!("{label} \"{message}\"")
    }

    /// Render one session notice.
    pub fn notice(&self, notice: &Notice) -> Result<Rendered, CliError> {
        let out = match notice {
            Notice::RemoteNamed { remote, name } => format!("remote {remote} is named '{name}'"),
            Notice::Prompt { name } => return Ok(Rendered::Prompt(format!("{name}>>"))),
            Notice::GlobalAdded { remote, global } => {
                format!("remote {remote} added global: {}", global_line(global))
            }
            Notice::GlobalRemoved { remote, global } => {
                format!("remote {remote} removed global: {}", global_line(global))
            }
            Notice::UnknownGlobalRemoved { remote, id } => {
                format!("remote {remote} removed unknown global {id}")
            }
            Notice::Changed { remote, kind, id } => format!("remote {remote} {kind} {id} changed"),
            Notice::ShowInfo {
                remote,
                global,
                snapshot,
            } => match self.format {
                OutputFormat::Text => self.info_block(global.as_ref(), snapshot),
                _ => self.structured(&InfoView {
                    remote: *remote,
                    global: global.as_ref(),
                    info: snapshot,
                })?,
            },
            Notice::Param { .. } | Notice::Permissions { .. } if self.format != OutputFormat::Text => {
                self.structured(notice)?
            }
            Notice::Param {
                remote,
                object,
                param_id,
                index,
                payload,
            } => {
                let mut out = format!("remote {remote} object {object} param {param_id} index {index}");
                let body = serde_json::to_string_pretty(payload)?;
                for line in body.lines() {
                    let _ = write!(out, "\n  {line}");
                }
                out
            }
            Notice::Permissions {
                remote,
                object,
                index,
                permissions,
            } => {
                let mut out = format!("remote {remote} client {object} index {index}");
                for permission in permissions {
                    let _ = write!(out, "\n{}", permission_line(permission));
                }
                out
            }
            Notice::Error { message } => self.error(message),
            Notice::InfoFailed { message } => return Ok(Rendered::Err(format!("info: {message}"))),
            Notice::ConnectionLost { remote, message } => {
                format!("remote {remote} disconnected: {message}")
            }
        };
        Ok(Rendered::Out(out))
    }

    /// Body of `list-objects`.
    pub fn globals(&self, globals: &[Global]) -> Result<String, CliError> {
        match self.format {
            OutputFormat::Text => Ok(globals
                .iter()
                .map(global_line)
                .collect::<Vec<_>>()
                .join("\n")),
            _ => self.structured(globals),
        }
    }

    pub fn structured<T: Serialize + ?Sized>(&self, data: &T) -> Result<String, CliError> {
        match self.format {
            OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?.trim_end().to_owned()),
            _ => Ok(serde_json::to_string_pretty(data)?),
        }
    }

    fn mark(&self, changed: bool) -> String {
        match (changed, self.color) {
            (false, _) => " ".to_owned(),
            (true, false) => "*".to_owned(),
            (true, true) => "*".yellow().to_string(),
        }
    }

    // ── Info blocks ──────────────────────────────────────────────────

    /// Tab-indented view of one object, change marks in the first column.
    pub fn info_block(&self, global: Option<&Global>, snapshot: &Snapshot) -> String {
        let mut out = Block::default();
        if let Some(g) = global {
            out.line(format!("\tid: {}", g.id));
            out.line(format!("\tpermissions: {}", g.permissions.rwx()));
            out.line(format!("\ttype: {}/{}", g.type_name, g.version));
        }
        match snapshot {
            Snapshot::Core(info) => self.core(&mut out, info),
            Snapshot::Module(info) => self.module(&mut out, info),
            Snapshot::Device(info) => self.device(&mut out, info),
            Snapshot::Node(info) => self.node(&mut out, info),
            Snapshot::Port(info) => self.port(&mut out, info),
            Snapshot::Factory(info) => self.factory(&mut out, info),
            Snapshot::Client(info) => self.client(&mut out, info),
            Snapshot::Link(info) => self.link(&mut out, info),
            Snapshot::Session(info) => self.session(&mut out, info),
            Snapshot::Endpoint(info) => self.endpoint(&mut out, info),
            Snapshot::EndpointStream(info) => self.endpoint_stream(&mut out, info),
        }
        out.finish()
    }

    fn core(&self, out: &mut Block, info: &CoreInfo) {
        out.line(format!("\tcookie: {}", info.cookie));
        out.line(format!("\tuser-name: \"{}\"", info.user_name));
        out.line(format!("\thost-name: \"{}\"", info.host_name));
        out.line(format!("\tversion: \"{}\"", info.version));
        out.line(format!("\tname: \"{}\"", info.name));
        self.properties(out, &info.props, info.change_mask.contains(CoreChange::PROPS));
    }

    fn module(&self, out: &mut Block, info: &ModuleInfo) {
        out.line(format!("\tname: \"{}\"", info.name));
        out.line(format!("\tfilename: \"{}\"", info.filename));
        out.line(format!("\targs: \"{}\"", info.args.as_deref().unwrap_or_default()));
        self.properties(out, &info.props, info.change_mask.contains(ModuleChange::PROPS));
    }

    fn device(&self, out: &mut Block, info: &DeviceInfo) {
        self.properties(out, &info.props, info.change_mask.contains(DeviceChange::PROPS));
        self.params(out, &info.params, info.change_mask.contains(DeviceChange::PARAMS));
    }

    fn node(&self, out: &mut Block, info: &NodeInfo) {
        let mask = info.change_mask;
        out.line(format!(
            "{}\tinput ports: {}/{}",
            self.mark(mask.contains(NodeChange::INPUT_PORTS)),
            info.n_input_ports,
            info.max_input_ports
        ));
        out.line(format!(
            "{}\toutput ports: {}/{}",
            self.mark(mask.contains(NodeChange::OUTPUT_PORTS)),
            info.n_output_ports,
            info.max_output_ports
        ));
        let error = match (&info.state, &info.error) {
            (NodeState::Error, Some(error)) => format!(" \"{error}\""),
            _ => String::new(),
        };
        out.line(format!(
            "{}\tstate: \"{}\"{error}",
            self.mark(mask.contains(NodeChange::STATE)),
            info.state
        ));
        self.properties(out, &info.props, mask.contains(NodeChange::PROPS));
        self.params(out, &info.params, mask.contains(NodeChange::PARAMS));
    }

    fn port(&self, out: &mut Block, info: &PortInfo) {
        out.line(format!("\tdirection: \"{}\"", info.direction));
        self.properties(out, &info.props, info.change_mask.contains(PortChange::PROPS));
        self.params(out, &info.params, info.change_mask.contains(PortChange::PARAMS));
    }

    fn factory(&self, out: &mut Block, info: &FactoryInfo) {
        out.line(format!("\tname: \"{}\"", info.name));
        out.line(format!("\tobject-type: {}/{}", info.object_type, info.version));
        self.properties(out, &info.props, info.change_mask.contains(FactoryChange::PROPS));
    }

    fn client(&self, out: &mut Block, info: &ClientInfo) {
        self.properties(out, &info.props, info.change_mask.contains(ClientChange::PROPS));
    }

    fn link(&self, out: &mut Block, info: &LinkInfo) {
        let mask = info.change_mask;
        out.line(format!("\toutput-node-id: {}", info.output_node_id));
        out.line(format!("\toutput-port-id: {}", info.output_port_id));
        out.line(format!("\tinput-node-id: {}", info.input_node_id));
        out.line(format!("\tinput-port-id: {}", info.input_port_id));
        let error = match (&info.state, &info.error) {
            (LinkState::Error, Some(error)) => format!(" \"{error}\""),
            _ => String::new(),
        };
        out.line(format!(
            "{}\tstate: \"{}\"{error}",
            self.mark(mask.contains(LinkChange::STATE)),
            info.state
        ));
        out.line(format!("{}\tformat:", self.mark(mask.contains(LinkChange::FORMAT))));
        self.pod(out, info.format.as_ref());
        self.properties(out, &info.props, mask.contains(LinkChange::PROPS));
    }

    fn session(&self, out: &mut Block, info: &SessionInfo) {
        self.properties(out, &info.props, info.change_mask.contains(SessionChange::PROPS));
        self.params(out, &info.params, info.change_mask.contains(SessionChange::PARAMS));
    }

    fn endpoint(&self, out: &mut Block, info: &EndpointInfo) {
        let mask = info.change_mask;
        let direction = match info.direction {
            Direction::Output => "source",
            Direction::Input => "sink",
        };
        out.line(format!("\tname: {}", info.name));
        out.line(format!("\tmedia-class: {}", info.media_class));
        out.line(format!("\tdirection: {direction}"));
        out.line(format!("\tflags: 0x{:x}", info.flags));
        out.line(format!(
            "{}\tstreams: {}",
            self.mark(mask.contains(EndpointChange::STREAMS)),
            info.n_streams
        ));
        out.line(format!(
            "{}\tsession: {}",
            self.mark(mask.contains(EndpointChange::SESSION)),
            info.session_id
        ));
        self.properties(out, &info.props, mask.contains(EndpointChange::PROPS));
        self.params(out, &info.params, mask.contains(EndpointChange::PARAMS));
    }

    fn endpoint_stream(&self, out: &mut Block, info: &EndpointStreamInfo) {
        let mask = info.change_mask;
        out.line(format!("\tid: {}", info.id));
        out.line(format!("\tendpoint-id: {}", info.endpoint_id));
        out.line(format!("\tname: {}", info.name));
        out.line(format!(
            "{}\tlink-params:",
            self.mark(mask.contains(EndpointStreamChange::LINK_PARAMS))
        ));
        self.pod(out, info.link_params.as_ref());
        self.properties(out, &info.props, mask.contains(EndpointStreamChange::PROPS));
        self.params(out, &info.params, mask.contains(EndpointStreamChange::PARAMS));
    }

    // ── Shared groups ────────────────────────────────────────────────

    fn properties(&self, out: &mut Block, props: &Properties, changed: bool) {
        let mark = self.mark(changed);
        out.line(format!("{mark}\tproperties:"));
        if props.is_empty() {
            out.line("\t\tnone".to_owned());
            return;
        }
        for (key, value) in props.iter() {
            out.line(format!("{mark}\t\t{key} = \"{value}\""));
        }
    }

    fn params(&self, out: &mut Block, params: &[ParamInfo], changed: bool) {
        let mark = self.mark(changed);
        out.line(format!("{mark}\tparams: ({})", params.len()));
        if params.is_empty() {
            out.line("\t\tnone".to_owned());
            return;
        }
        for param in params {
            out.line(format!("{mark}\t  {}", param_line(param)));
        }
    }

    #[allow(clippy::unused_self)]
    fn pod(&self, out: &mut Block, pod: Option<&serde_json::Value>) {
        let body = pod.and_then(|value| serde_json::to_string_pretty(value).ok());
        match body {
            Some(body) => {
                for line in body.lines() {
                    out.line(format!("\t\t{line}"));
                }
            }
            None => out.line("\t\tnone".to_owned()),
        }
    }
}

/// Line-by-line string builder.
#[derive(Default)]
struct Block(Vec<String>);

impl Block {
    fn line(&mut self, line: String) {
        self.0.push(line);
    }

    fn finish(self) -> String {
        self.0.join("\n")
    }
}

// ── Free renderers ───────────────────────────────────────────────────

/// `\tid N, type T/V` followed by the global's properties.
pub fn global_line(global: &Global) -> String {
    let mut out = format!(
        "\tid {}, type {}/{}",
        global.id, global.type_name, global.version
    );
    if let Some(props) = &global.props {
        for (key, value) in props.iter() {
            let _ = write!(out, "\n \t\t{key} = \"{value}\"");
        }
    }
    out
}

fn param_line(param: &ParamInfo) -> String {
    let name = ParamType::name_of(param.id).unwrap_or_else(|| "unknown".to_owned());
    let r = if param.flags.contains(ParamFlags::READ) { 'r' } else { '-' };
    let w = if param.flags.contains(ParamFlags::WRITE) { 'w' } else { '-' };
    format!("{} ({name}) {r}{w}", param.id)
}

fn permission_line(permission: &Permission) -> String {
    let bits = permission.permissions.bits();
    if permission.id == ID_ANY {
        format!("  default: {bits:08x}")
    } else {
        format!("  {}: {bits:08x}", permission.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use pwmirror_api::{PermissionBits, interface};
    use pwmirror_core::ObjectKind;

    use super::*;

    fn node_snapshot(mask: NodeChange) -> Snapshot {
        Snapshot::Node(NodeInfo {
            id: 40,
            max_input_ports: 2,
            n_input_ports: 2,
            change_mask: mask,
            state: NodeState::Suspended,
            props: [("node.name", "sink")].into_iter().collect(),
            params: vec![ParamInfo::new(ParamType::Props, ParamFlags::READWRITE)],
            ..NodeInfo::default()
        })
    }

    fn node_global() -> Global {
        Global::new(
            40,
            PermissionBits::R | PermissionBits::X,
            interface::NODE,
            3,
            Some([("node.name", "sink")].into_iter().collect()),
        )
    }

    #[test]
    fn node_block_marks_only_changed_groups() {
        let view = View::default();
        let text = view.info_block(Some(&node_global()), &node_snapshot(NodeChange::PROPS));
        assert_eq!(
            text,
            "\tid: 40\n\
             \tpermissions: r-x\n\
             \ttype: PipeWire:Interface:Node/3\n \
             \tinput ports: 2/2\n \
             \toutput ports: 0/0\n \
             \tstate: \"suspended\"\n\
             *\tproperties:\n\
             *\t\tnode.name = \"sink\"\n \
             \tparams: (1)\n \
             \t  2 (Props) rw"
        );
    }

    #[test]
    fn empty_groups_render_none() {
        let view = View::default();
        let snap = Snapshot::Client(ClientInfo {
            id: 31,
            ..ClientInfo::default()
        });
        assert_eq!(view.info_block(None, &snap), " \tproperties:\n\t\tnone");
    }

    #[test]
    fn registry_echo_lines() {
        let view = View::default();
        let added = view
            .notice(&Notice::GlobalAdded {
                remote: 0,
                global: node_global(),
            })
            .unwrap();
        assert_eq!(
            added,
            Rendered::Out(
                "remote 0 added global: \tid 40, type PipeWire:Interface:Node/3\n \t\tnode.name = \"sink\""
                    .into()
            )
        );
        let changed = view
            .notice(&Notice::Changed {
                remote: 1,
                kind: ObjectKind::EndpointStream,
                id: 9,
            })
            .unwrap();
        assert_eq!(changed, Rendered::Out("remote 1 endpoint-stream 9 changed".into()));
    }

    #[test]
    fn permissions_use_hex_and_default_label() {
        let view = View::default();
        let rendered = view
            .notice(&Notice::Permissions {
                remote: 0,
                object: 31,
                index: 0,
                permissions: vec![
                    Permission::new(ID_ANY, PermissionBits::ALL),
                    Permission::new(40, PermissionBits::R),
                ],
            })
            .unwrap();
        assert_eq!(
            rendered,
            Rendered::Out(
                "remote 0 client 31 index 0\n  default: 000001c8\n  40: 00000100".into()
            )
        );
    }

    #[test]
    fn prompt_and_failures_have_their_own_streams() {
        let view = View::default();
        assert_eq!(
            view.notice(&Notice::Prompt {
                name: "pipewire-0".into()
            })
            .unwrap(),
            Rendered::Prompt("pipewire-0>>".into())
        );
        assert_eq!(
            view.notice(&Notice::InfoFailed {
                message: "unsupported type PipeWire:Interface:Metadata".into()
            })
            .unwrap(),
            Rendered::Err("info: unsupported type PipeWire:Interface:Metadata".into())
        );
        assert_eq!(view.error("boom"), "Error: \"boom\"");
    }

    #[test]
    fn structured_info_carries_the_kind_tag() {
        let view = View {
            format: OutputFormat::Json,
            color: false,
        };
        let Rendered::Out(json) = view
            .notice(&Notice::ShowInfo {
                remote: 0,
                global: Some(node_global()),
                snapshot: node_snapshot(NodeChange::all()),
            })
            .unwrap()
        else {
            panic!("expected stdout output");
        };
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["info"]["kind"], "node");
        assert_eq!(value["global"]["type"], interface::NODE);
    }
}
