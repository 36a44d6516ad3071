// ── Console event loop ──
//
// One loop multiplexes transport events and input lines. A new line is
// only read while the current connection has no barrier outstanding, so
// everything a command set in motion is printed before the next prompt.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use pwmirror_api::Envelope;
use pwmirror_config::ModuleSpec;
use pwmirror_core::{Notice, Session};

use crate::commands::{self, Ctx};
use crate::error::CliError;
use crate::output::{Rendered, View, emit};
use crate::tokenize::tokenize;

pub struct Console {
    session: Session,
    events: mpsc::UnboundedReceiver<Envelope>,
    view: View,
    prompts: bool,
}

impl Console {
    pub fn new(session: Session, events: mpsc::UnboundedReceiver<Envelope>, view: View) -> Self {
        Self {
            session,
            events,
            view,
            prompts: true,
        }
    }

    /// Load modules into the local context. Failures are logged, not fatal.
    pub fn preload(&mut self, modules: &[ModuleSpec]) {
        for module in modules {
            match self
                .session
                .preload_module(&module.name, module.args.as_deref())
            {
                Ok(id) => debug!(module = %module.name, id, "module preloaded"),
                Err(err) => warn!(module = %module.name, %err, "could not preload module"),
            }
        }
    }

    // ── Interactive mode ─────────────────────────────────────────────

    /// Greet, connect to the default remote, then run one command per
    /// input line until EOF or until no usable connection is left.
    pub async fn interactive<R>(&mut self, input: R) -> Result<(), CliError>
    where
        R: AsyncBufRead + Unpin,
    {
        emit(&Rendered::Out(format!(
            "Welcome to pwmirror version {}. Type 'help' for usage.",
            env!("CARGO_PKG_VERSION")
        )));
        self.echo_command("connect");
        self.session.end_command();
        self.flush();

        let mut lines = input.lines();
        while !self.session.is_finished() {
            if self.session.is_idle() {
                tokio::select! {
                    biased;
                    Some(envelope) = self.events.recv() => self.session.handle_event(envelope),
                    line = lines.next_line() => {
                        let Some(line) = line? else {
                            emit(&Rendered::Prompt("\n".into()));
                            break;
                        };
                        self.echo_command(&line);
                        self.session.end_command();
                    }
                }
            } else {
                let Some(envelope) = self.events.recv().await else {
                    break;
                };
                self.session.handle_event(envelope);
            }
            self.flush();
        }
        self.flush();
        Ok(())
    }

    /// Run a line and echo any failure as `Error: "<message>"`.
    fn echo_command(&mut self, raw: &str) {
        if let Err(err) = self.command(raw) {
            emit(&Rendered::Out(self.view.error(&err.to_string())));
        }
    }

    // ── One-shot mode ────────────────────────────────────────────────

    /// Connect, wait for the registry to settle, run `raw`, wait for its
    /// barrier and print what it produced. Startup chatter is dropped.
    pub async fn one_shot(&mut self, raw: &str) -> Result<(), CliError> {
        self.prompts = false;
        let entry = self.session.connect(None)?;
        debug!(handle = entry.handle, remote = %entry.name, "connected for one command");
        self.session.end_command();
        self.settle().await;

        for notice in self.session.take_notices() {
            if let Notice::ConnectionLost { remote, message } = notice {
                return Err(CliError::ConnectionLost { remote, message });
            }
        }

        let result = self.command(raw);
        self.session.end_command();
        self.settle().await;
        self.flush();
        result
    }

    async fn settle(&mut self) {
        while !self.session.is_finished() && !self.session.is_idle() {
            let Some(envelope) = self.events.recv().await else {
                break;
            };
            self.session.handle_event(envelope);
        }
        while let Ok(envelope) = self.events.try_recv() {
            self.session.handle_event(envelope);
        }
    }

    // ── Shared ───────────────────────────────────────────────────────

    fn command(&mut self, raw: &str) -> Result<(), CliError> {
        let Some(line) = tokenize(raw) else {
            return Ok(());
        };
        let mut ctx = Ctx {
            session: &mut self.session,
            view: self.view,
        };
        let reply = commands::dispatch(&mut ctx, line)?;
        emit(&Rendered::Out(reply));
        Ok(())
    }

    fn flush(&mut self) {
        for notice in self.session.take_notices() {
            if !self.prompts && matches!(notice, Notice::Prompt { .. }) {
                continue;
            }
            match self.view.notice(&notice) {
                Ok(rendered) => emit(&rendered),
                Err(err) => emit(&Rendered::Err(err.to_string())),
            }
        }
    }
}
