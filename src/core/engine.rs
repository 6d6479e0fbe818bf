//! Purpose: Seam between the session layer and the external protocol engine.
//! Exports: `ProtocolEngine`, `ResultSink`, `CommandSpec`, `ConnectInfo`, `ScriptedEngine`.
//! Role: The closed native client library sits behind `ProtocolEngine`; this
//! crate never frames RPCs or translates charsets itself.
//! Invariants: Within one `run` call, sink invocations are serialized; the sink
//! is not internally synchronized and the engine must not interleave threads on it.

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::core::context::Severity;
use crate::core::error::{Error, ErrorKind};
use crate::core::merge::{MergeData, MergeStatus, ResolveData};
use crate::core::session::ConnectionParams;

/// One command invocation as handed to the engine.
#[derive(Clone, Copy, Debug)]
pub struct CommandSpec<'a> {
    pub name: &'a str,
    pub cmd_id: i32,
    pub tagged: bool,
    pub args: &'a [String],
    /// Staged input for input-from-caller style commands, if any.
    pub data_set: Option<&'a [u8]>,
}

/// What the engine reports after a successful handshake. Session getters fall
/// back to these when the caller never set a value explicitly.
#[derive(Clone, Debug, Default)]
pub struct ConnectInfo {
    pub endpoint: Option<String>,
    pub user: Option<String>,
    pub workspace: Option<String>,
    pub charset: Option<String>,
    pub unicode: bool,
    pub api_level: i32,
    pub requires_login: bool,
}

/// Receiver for the callback-shaped output channels of one command.
pub trait ResultSink {
    fn begin_record(&mut self) {}
    fn key_value(&mut self, _key: &str, _value: &str) {}
    fn text(&mut self, _fragment: &[u8]) {}
    fn binary(&mut self, _bytes: &[u8]) {}
    fn info(&mut self, _level: u8, _code: i32, _text: &str) {}
    fn error(&mut self, _severity: Severity, _code: i32, _text: &str) {}
    fn transfer_progress(&mut self, _done: u64, _total: u64) {}

    /// Ask the caller to answer an interactive prompt. `None` means no prompt
    /// handler is installed.
    fn prompt(&mut self, _message: &str, _echo: bool) -> Option<String> {
        None
    }

    /// Ask the caller to decide a content resolve. Defaults to skipping.
    fn resolve(&mut self, _merge: &MergeData) -> MergeStatus {
        MergeStatus::Skip
    }

    /// Ask the caller to decide an action resolve (branch/delete/filetype and
    /// the like). Defaults to skipping.
    fn resolve_action(&mut self, _resolve: &ResolveData) -> MergeStatus {
        MergeStatus::Skip
    }
}

/// The external client engine. Implementations own transport, RPC framing,
/// charset translation, and credential handling.
pub trait ProtocolEngine: Send {
    /// Perform the handshake using the given parameters and the protocol
    /// overrides staged before this call.
    fn connect(
        &mut self,
        params: &ConnectionParams,
        protocol: &[(String, String)],
    ) -> Result<ConnectInfo, Error>;

    /// Re-verify an existing connection without a fresh handshake.
    fn verify(&mut self) -> Result<(), Error>;

    fn disconnect(&mut self);

    /// Execute one command, reporting output through the sink. `Ok(false)`
    /// is a command-level failure (error chain populated via the sink);
    /// `Err` is a transport-level failure.
    fn run(&mut self, spec: &CommandSpec<'_>, sink: &mut dyn ResultSink) -> Result<bool, Error>;

    /// Best-effort cancellation; the command may already have completed.
    fn cancel(&mut self, cmd_id: i32);
}

impl<E: ProtocolEngine + ?Sized> ProtocolEngine for Box<E> {
    fn connect(
        &mut self,
        params: &ConnectionParams,
        protocol: &[(String, String)],
    ) -> Result<ConnectInfo, Error> {
        (**self).connect(params, protocol)
    }

    fn verify(&mut self) -> Result<(), Error> {
        (**self).verify()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn run(&mut self, spec: &CommandSpec<'_>, sink: &mut dyn ResultSink) -> Result<bool, Error> {
        (**self).run(spec, sink)
    }

    fn cancel(&mut self, cmd_id: i32) {
        (**self).cancel(cmd_id)
    }
}

/// One scripted sink event replayed by `ScriptedEngine`.
#[derive(Clone, Debug)]
pub enum ScriptEvent {
    Record,
    KeyValue(String, String),
    Text(Vec<u8>),
    Binary(Vec<u8>),
    Info {
        level: u8,
        code: i32,
        text: String,
    },
    Error {
        severity: Severity,
        code: i32,
        text: String,
    },
    Prompt(String),
    Resolve(MergeData),
    ResolveAction(ResolveData),
    Transfer {
        done: u64,
        total: u64,
    },
    /// End the command with this command-level verdict.
    Finish(bool),
}

/// Deterministic engine double: replays scripted events per command name.
///
/// This is the in-tree stand-in for the closed client library, usable both by
/// this crate's tests and by embedders testing against the bridge without a
/// live server.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    connected: bool,
    info: ConnectInfo,
    connect_failure: Option<String>,
    scripts: HashMap<String, VecDeque<Vec<ScriptEvent>>>,
    connect_count: usize,
    protocol_at_connect: Vec<(String, String)>,
    invocations: Vec<(String, Vec<String>, bool)>,
    data_sets: Vec<Option<Vec<u8>>>,
    prompt_answers: Vec<Option<String>>,
    resolve_answers: Vec<MergeStatus>,
    cancelled: Vec<i32>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_info(mut self, info: ConnectInfo) -> Self {
        self.info = info;
        self
    }

    /// Make every subsequent connect fail with this message.
    pub fn fail_connects_with(mut self, message: impl Into<String>) -> Self {
        self.connect_failure = Some(message.into());
        self
    }

    /// Queue one scripted run for `command`; runs are consumed in FIFO order.
    pub fn script(mut self, command: impl Into<String>, events: Vec<ScriptEvent>) -> Self {
        self.scripts
            .entry(command.into())
            .or_default()
            .push_back(events);
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count
    }

    pub fn protocol_at_connect(&self) -> &[(String, String)] {
        &self.protocol_at_connect
    }

    pub fn invocations(&self) -> &[(String, Vec<String>, bool)] {
        &self.invocations
    }

    pub fn data_sets(&self) -> &[Option<Vec<u8>>] {
        &self.data_sets
    }

    pub fn prompt_answers(&self) -> &[Option<String>] {
        &self.prompt_answers
    }

    pub fn resolve_answers(&self) -> &[MergeStatus] {
        &self.resolve_answers
    }

    pub fn cancelled(&self) -> &[i32] {
        &self.cancelled
    }
}

impl ProtocolEngine for ScriptedEngine {
    fn connect(
        &mut self,
        _params: &ConnectionParams,
        protocol: &[(String, String)],
    ) -> Result<ConnectInfo, Error> {
        if let Some(message) = &self.connect_failure {
            return Err(Error::new(ErrorKind::Connect).with_message(message.clone()));
        }
        self.connected = true;
        self.connect_count += 1;
        self.protocol_at_connect = protocol.to_vec();
        Ok(self.info.clone())
    }

    fn verify(&mut self) -> Result<(), Error> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::Connect).with_message("not connected"))
        }
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn run(&mut self, spec: &CommandSpec<'_>, sink: &mut dyn ResultSink) -> Result<bool, Error> {
        if !self.connected {
            return Err(Error::new(ErrorKind::Connect).with_message("not connected"));
        }
        self.invocations
            .push((spec.name.to_string(), spec.args.to_vec(), spec.tagged));
        self.data_sets.push(spec.data_set.map(<[u8]>::to_vec));

        let Some(events) = self
            .scripts
            .get_mut(spec.name)
            .and_then(VecDeque::pop_front)
        else {
            sink.error(
                Severity::Failed,
                1,
                &format!("unknown command: {}", spec.name),
            );
            return Ok(false);
        };

        let mut verdict = true;
        for event in events {
            match event {
                ScriptEvent::Record => sink.begin_record(),
                ScriptEvent::KeyValue(key, value) => sink.key_value(&key, &value),
                ScriptEvent::Text(bytes) => sink.text(&bytes),
                ScriptEvent::Binary(bytes) => sink.binary(&bytes),
                ScriptEvent::Info { level, code, text } => sink.info(level, code, &text),
                ScriptEvent::Error {
                    severity,
                    code,
                    text,
                } => {
                    sink.error(severity, code, &text);
                    if severity >= Severity::Failed {
                        verdict = false;
                    }
                }
                ScriptEvent::Prompt(message) => {
                    let answer = sink.prompt(&message, false);
                    self.prompt_answers.push(answer);
                }
                ScriptEvent::Resolve(merge) => {
                    let status = sink.resolve(&merge);
                    self.resolve_answers.push(status);
                }
                ScriptEvent::ResolveAction(resolve) => {
                    let status = sink.resolve_action(&resolve);
                    self.resolve_answers.push(status);
                }
                ScriptEvent::Transfer { done, total } => sink.transfer_progress(done, total),
                ScriptEvent::Finish(ok) => {
                    verdict = ok;
                    break;
                }
            }
        }
        Ok(verdict)
    }

    fn cancel(&mut self, cmd_id: i32) {
        self.cancelled.push(cmd_id);
    }
}
