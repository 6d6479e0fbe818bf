//! Purpose: Connection-state owner and command mediator for one engine connection.
//! Exports: `Session`, `ConnectionParams`, `KNOWN_CHARSETS`.
//! Invariants: Protocol overrides staged via `set_protocol` reach the engine
//! only at the next handshake; staging while connected is accepted but inert
//! until a disconnect/reconnect cycle.
//! Invariants: One command id maps to at most one live context; rerunning an id
//! clears and reuses its context.

use std::collections::HashMap;
use std::path::Path;

use bstr::BString;

use crate::core::context::{CommandContext, Severity};
use crate::core::engine::{CommandSpec, ConnectInfo, ProtocolEngine, ResultSink};
use crate::core::env::{EnvStore, VC_CHARSET, VC_CLIENT, VC_PASSWD, VC_PORT, VC_USER};
use crate::core::error::{to_code, Error, ErrorKind};
use crate::core::handlers::Handlers;
use crate::core::merge::{MergeData, MergeStatus, ResolveData};

/// Command-data charsets accepted by `set_character_set`.
pub const KNOWN_CHARSETS: &[&str] = &[
    "none",
    "utf8",
    "utf8-bom",
    "utf16",
    "utf16le",
    "utf16be",
    "utf32",
    "iso8859-1",
    "iso8859-5",
    "iso8859-15",
    "shiftjis",
    "eucjp",
    "winansi",
    "macosroman",
    "cp949",
    "cp936",
    "cp950",
];

/// Caller-supplied connection parameters. `None` means "never explicitly set";
/// getters then fall back to the engine-negotiated value, if any.
#[derive(Clone, Debug, Default)]
pub struct ConnectionParams {
    pub endpoint: Option<String>,
    pub user: Option<String>,
    pub credential: Option<String>,
    pub workspace: Option<String>,
    pub cwd: Option<String>,
    pub program_name: Option<String>,
    pub program_version: Option<String>,
    pub charset: Option<String>,
    pub file_charset: Option<String>,
}

/// One connection to the external engine plus the registry of per-command
/// result contexts. Not safe for concurrent command invocation; callers
/// serialize access per session, and independent sessions do not interact.
#[derive(Debug)]
pub struct Session<E> {
    params: ConnectionParams,
    engine: E,
    connected: bool,
    negotiated: Option<ConnectInfo>,
    protocol: Vec<(String, String)>,
    contexts: HashMap<i32, CommandContext>,
    handlers: Handlers,
}

impl<E: ProtocolEngine> Session<E> {
    /// Store parameters without connecting. Empty credential and workspace are
    /// valid (anonymous and no-client modes).
    pub fn new(endpoint: &str, user: &str, credential: &str, workspace: &str, engine: E) -> Self {
        Self {
            params: ConnectionParams {
                endpoint: Some(endpoint.to_string()),
                user: Some(user.to_string()),
                credential: Some(credential.to_string()),
                workspace: Some(workspace.to_string()),
                ..ConnectionParams::default()
            },
            engine,
            connected: false,
            negotiated: None,
            protocol: Vec::new(),
            contexts: HashMap::new(),
            handlers: Handlers::new(),
        }
    }

    /// Build an unconnected session from per-directory configuration: each
    /// connection key resolves through a config file discovered from `cwd`,
    /// then through the environment store tiers.
    pub fn from_path(cwd: &Path, env: &EnvStore, engine: E) -> Self {
        let value = |key: &str| env.resolve(Some(cwd), key).unwrap_or_default();
        let mut session = Self::new(
            &value(VC_PORT),
            &value(VC_USER),
            &value(VC_PASSWD),
            &value(VC_CLIENT),
            engine,
        );
        session.params.cwd = Some(cwd.to_string_lossy().into_owned());
        let charset = value(VC_CHARSET);
        if !charset.is_empty() {
            session.params.charset = Some(charset);
        }
        session
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn handlers_mut(&mut self) -> &mut Handlers {
        &mut self.handlers
    }

    pub fn set_handlers(&mut self, handlers: Handlers) {
        self.handlers = handlers;
    }

    /// Feed the caller's log channel, if installed. Level 0 is an error,
    /// 2 an informational lifecycle note.
    #[track_caller]
    fn emit_log(&mut self, level: i32, message: &str) {
        if let Some(handler) = self.handlers.log.as_mut() {
            let location = std::panic::Location::caller();
            handler(level, location.file(), location.line(), message);
        }
    }

    // Connection lifecycle ---------------------------------------------------

    /// Handshake with the engine. Idempotent when already connected: the
    /// existing connection is re-verified and staged protocol overrides are
    /// kept for the next real handshake.
    pub fn connect(&mut self) -> Result<(), Error> {
        if self.connected {
            return match self.engine.verify() {
                Ok(()) => Ok(()),
                Err(err) => {
                    self.connected = false;
                    self.emit_log(0, "connection verification failed");
                    Err(err)
                }
            };
        }
        let info = match self.engine.connect(&self.params, &self.protocol) {
            Ok(info) => info,
            Err(err) => {
                self.emit_log(0, &err.to_string());
                return Err(err);
            }
        };
        tracing::debug!(
            endpoint = self.endpoint(),
            unicode = info.unicode,
            api_level = info.api_level,
            "connected"
        );
        self.negotiated = Some(info);
        self.connected = true;
        self.emit_log(2, "connected");
        Ok(())
    }

    /// Tear down the transport without destroying the session. Staged protocol
    /// overrides become effective again at the next `connect`.
    pub fn disconnect(&mut self) {
        if self.connected {
            self.engine.disconnect();
            self.connected = false;
            self.emit_log(2, "disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Stage a raw protocol key/value for the next handshake. Accepted while
    /// connected, but without observable effect until a reconnect.
    pub fn set_protocol(&mut self, key: &str, value: &str) {
        if self.connected {
            tracing::debug!(key, "protocol override staged while connected; inert until reconnect");
        }
        self.protocol.push((key.to_string(), value.to_string()));
    }

    pub fn protocol(&self) -> &[(String, String)] {
        &self.protocol
    }

    /// Engine-negotiated connection info from the last successful handshake.
    pub fn connect_info(&self) -> Option<&ConnectInfo> {
        self.negotiated.as_ref()
    }

    pub fn is_unicode(&self) -> bool {
        self.negotiated.as_ref().is_some_and(|info| info.unicode)
    }

    pub fn api_level(&self) -> i32 {
        self.negotiated
            .as_ref()
            .map(|info| info.api_level)
            .unwrap_or(0)
    }

    pub fn requires_login(&self) -> bool {
        self.negotiated
            .as_ref()
            .is_some_and(|info| info.requires_login)
    }

    // Command execution ------------------------------------------------------

    /// Run one command. Auto-connects when necessary; a connection-level
    /// failure is the `Err` case. `Ok(false)` is a command-level failure with
    /// the context error chain populated.
    pub fn run_command(
        &mut self,
        name: &str,
        cmd_id: i32,
        tagged: bool,
        args: &[String],
    ) -> Result<bool, Error> {
        if !self.connected {
            self.connect()?;
        }

        let ctx = self
            .contexts
            .entry(cmd_id)
            .or_insert_with(|| CommandContext::new(cmd_id));
        ctx.reset();
        ctx.begin_populating();
        let data_set = if ctx.data_set().is_empty() {
            None
        } else {
            Some(ctx.data_set().to_vec())
        };

        let spec = CommandSpec {
            name,
            cmd_id,
            tagged,
            args,
            data_set: data_set.as_deref(),
        };
        tracing::debug!(command = name, cmd_id, tagged, "run");
        let run = {
            let mut sink = ChannelSink {
                cmd_id,
                ctx,
                handlers: &mut self.handlers,
            };
            self.engine.run(&spec, &mut sink)
        };

        let Some(ctx) = self.contexts.get_mut(&cmd_id) else {
            return Err(Error::new(ErrorKind::Internal)
                .with_message("context vanished during run")
                .with_cmd_id(cmd_id));
        };
        let verdict = match run {
            Ok(ok) => ok,
            Err(err) => {
                // Transport failures still leave a reconstructable error chain.
                let code = to_code(err.kind());
                let text = err.to_string();
                ctx.push_error(Severity::Failed, code, text.clone());
                if let Some(handler) = self.handlers.error.as_mut() {
                    handler(cmd_id, Severity::Failed.code(), code, &text);
                }
                if err.kind() == ErrorKind::Connect {
                    self.connected = false;
                }
                false
            }
        };
        ctx.complete();
        Ok(verdict)
    }

    /// Forward a best-effort cancellation request; the command may already
    /// have completed.
    pub fn cancel_command(&mut self, cmd_id: i32) {
        self.engine.cancel(cmd_id);
    }

    // Context registry -------------------------------------------------------

    pub fn find_context(&self, cmd_id: i32) -> Option<&CommandContext> {
        self.contexts.get(&cmd_id)
    }

    pub fn find_context_mut(&mut self, cmd_id: i32) -> Option<&mut CommandContext> {
        self.contexts.get_mut(&cmd_id)
    }

    pub fn get_or_create_context(&mut self, cmd_id: i32) -> &mut CommandContext {
        self.contexts
            .entry(cmd_id)
            .or_insert_with(|| CommandContext::new(cmd_id))
    }

    /// Drop the context registered under `cmd_id`. Contexts are never evicted
    /// implicitly; this and session teardown are the only ways out.
    pub fn release_context(&mut self, cmd_id: i32) -> bool {
        self.contexts.remove(&cmd_id).is_some()
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Stage input data for an input-from-caller style command under `cmd_id`.
    pub fn set_data_set(&mut self, cmd_id: i32, data: impl Into<BString>) {
        self.get_or_create_context(cmd_id).set_data_set(data);
    }

    // Connection attributes --------------------------------------------------

    pub fn endpoint(&self) -> &str {
        self.explicit_or_negotiated(&self.params.endpoint, |info| info.endpoint.as_deref())
    }

    pub fn set_endpoint(&mut self, value: impl Into<String>) {
        self.params.endpoint = Some(value.into());
    }

    pub fn user(&self) -> &str {
        self.explicit_or_negotiated(&self.params.user, |info| info.user.as_deref())
    }

    pub fn set_user(&mut self, value: impl Into<String>) {
        self.params.user = Some(value.into());
    }

    pub fn credential(&self) -> &str {
        self.params.credential.as_deref().unwrap_or("")
    }

    pub fn set_credential(&mut self, value: impl Into<String>) {
        self.params.credential = Some(value.into());
    }

    pub fn workspace(&self) -> &str {
        self.explicit_or_negotiated(&self.params.workspace, |info| info.workspace.as_deref())
    }

    pub fn set_workspace(&mut self, value: impl Into<String>) {
        self.params.workspace = Some(value.into());
    }

    pub fn cwd(&self) -> &str {
        self.params.cwd.as_deref().unwrap_or("")
    }

    pub fn set_cwd(&mut self, value: impl Into<String>) {
        self.params.cwd = Some(value.into());
    }

    pub fn program_name(&self) -> &str {
        self.params.program_name.as_deref().unwrap_or("")
    }

    pub fn set_program_name(&mut self, value: impl Into<String>) {
        self.params.program_name = Some(value.into());
    }

    pub fn program_version(&self) -> &str {
        self.params.program_version.as_deref().unwrap_or("")
    }

    pub fn set_program_version(&mut self, value: impl Into<String>) {
        self.params.program_version = Some(value.into());
    }

    pub fn charset(&self) -> &str {
        self.explicit_or_negotiated(&self.params.charset, |info| info.charset.as_deref())
    }

    pub fn file_charset(&self) -> &str {
        self.params.file_charset.as_deref().unwrap_or("")
    }

    /// Set the command-data and file-content charset pair. Takes effect on the
    /// next command or connect.
    pub fn set_character_set(&mut self, charset: &str, file_charset: &str) -> Result<(), Error> {
        for name in [charset, file_charset] {
            if !name.is_empty() && !KNOWN_CHARSETS.contains(&name) {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("unknown charset: {name}")));
            }
        }
        self.params.charset = Some(charset.to_string());
        self.params.file_charset = Some(file_charset.to_string());
        Ok(())
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    fn explicit_or_negotiated<'a>(
        &'a self,
        explicit: &'a Option<String>,
        pick: impl Fn(&'a ConnectInfo) -> Option<&'a str>,
    ) -> &'a str {
        explicit
            .as_deref()
            .filter(|value| !value.is_empty())
            .or_else(|| self.negotiated.as_ref().and_then(pick))
            .unwrap_or("")
    }
}

/// Sink wiring one context and the push handlers together: every arrival is
/// accumulated for pull access and, when a handler is installed, pushed.
struct ChannelSink<'a> {
    cmd_id: i32,
    ctx: &'a mut CommandContext,
    handlers: &'a mut Handlers,
}

impl ResultSink for ChannelSink<'_> {
    fn begin_record(&mut self) {
        self.ctx.begin_record();
    }

    fn key_value(&mut self, key: &str, value: &str) {
        if self.ctx.key_value(key, value) {
            if let Some(handler) = self.handlers.tagged.as_mut() {
                handler(self.cmd_id, key, value);
            }
        }
    }

    fn text(&mut self, fragment: &[u8]) {
        self.ctx.append_text(fragment);
        if let Some(handler) = self.handlers.text.as_mut() {
            handler(self.cmd_id, fragment);
        }
    }

    fn binary(&mut self, bytes: &[u8]) {
        self.ctx.append_binary(bytes);
        if let Some(handler) = self.handlers.binary.as_mut() {
            handler(self.cmd_id, bytes);
        }
    }

    fn info(&mut self, level: u8, code: i32, text: &str) {
        self.ctx.push_info(level, code, text);
        if let Some(handler) = self.handlers.info.as_mut() {
            handler(self.cmd_id, level, code, text);
        }
    }

    fn error(&mut self, severity: Severity, code: i32, text: &str) {
        self.ctx.push_error(severity, code, text);
        if let Some(handler) = self.handlers.error.as_mut() {
            handler(self.cmd_id, severity.code(), code, text);
        }
    }

    fn transfer_progress(&mut self, done: u64, total: u64) {
        if let Some(handler) = self.handlers.transfer.as_mut() {
            handler(self.cmd_id, done, total);
        }
    }

    fn prompt(&mut self, message: &str, echo: bool) -> Option<String> {
        self.handlers
            .prompt
            .as_mut()
            .map(|handler| handler(self.cmd_id, message, echo))
    }

    fn resolve(&mut self, merge: &MergeData) -> MergeStatus {
        match self.handlers.resolve.as_mut() {
            Some(handler) => handler(self.cmd_id, merge),
            None => MergeStatus::Skip,
        }
    }

    fn resolve_action(&mut self, resolve: &ResolveData) -> MergeStatus {
        match self.handlers.resolve_action.as_mut() {
            Some(handler) => handler(self.cmd_id, resolve),
            None => MergeStatus::Skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::core::context::Severity;
    use crate::core::engine::{ConnectInfo, ScriptEvent, ScriptedEngine};

    fn record(entries: &[(&str, &str)]) -> Vec<ScriptEvent> {
        let mut events = vec![ScriptEvent::Record];
        for (key, value) in entries {
            events.push(ScriptEvent::KeyValue(key.to_string(), value.to_string()));
        }
        events
    }

    fn session_with(engine: ScriptedEngine) -> Session<ScriptedEngine> {
        Session::new("ssl:depot:1666", "mei", "", "mei-ws", engine)
    }

    #[test]
    fn run_command_auto_connects() {
        let engine = ScriptedEngine::new().script("files", record(&[("depotFile", "//depot/a")]));
        let mut session = session_with(engine);
        assert!(!session.is_connected());
        let ok = session
            .run_command("files", 1, true, &[])
            .expect("run_command");
        assert!(ok);
        assert!(session.is_connected());
        assert_eq!(session.engine().connect_count(), 1);
    }

    #[test]
    fn connect_failure_is_an_error() {
        let engine = ScriptedEngine::new().fail_connects_with("server unreachable");
        let mut session = session_with(engine);
        let err = session.connect().expect_err("must fail");
        assert!(err.to_string().contains("server unreachable"));
        assert!(!session.is_connected());
    }

    #[test]
    fn protocol_staged_before_connect_reaches_engine() {
        let engine = ScriptedEngine::new();
        let mut session = session_with(engine);
        session.set_protocol("tag", "yes");
        session.set_protocol("api", "99");
        session.connect().expect("connect");
        assert_eq!(
            session.engine().protocol_at_connect(),
            &[
                ("tag".to_string(), "yes".to_string()),
                ("api".to_string(), "99".to_string())
            ]
        );
    }

    #[test]
    fn protocol_staged_while_connected_waits_for_reconnect() {
        let engine = ScriptedEngine::new();
        let mut session = session_with(engine);
        session.connect().expect("connect");
        session.set_protocol("maxresults", "1000");
        // Idempotent connect re-verifies without a handshake; the override stays staged.
        session.connect().expect("reconnect check");
        assert!(session.engine().protocol_at_connect().is_empty());
        assert_eq!(session.engine().connect_count(), 1);

        session.disconnect();
        session.connect().expect("reconnect");
        assert_eq!(
            session.engine().protocol_at_connect(),
            &[("maxresults".to_string(), "1000".to_string())]
        );
        assert_eq!(session.engine().connect_count(), 2);
    }

    #[test]
    fn rerun_replaces_tagged_records() {
        let engine = ScriptedEngine::new()
            .script("fstat", record(&[("stale", "1"), ("also", "stale")]))
            .script("fstat", record(&[("fresh", "2")]));
        let mut session = session_with(engine);
        session.run_command("fstat", 7, true, &[]).expect("first");
        session.run_command("fstat", 7, true, &[]).expect("second");

        let ctx = session.find_context(7).expect("context");
        assert_eq!(ctx.tagged_count(), 1);
        let mut cursor = ctx.tagged_output();
        let only = cursor.next_record().expect("record");
        assert_eq!(only.get("stale"), None);
        assert_eq!(only.get("fresh"), Some("2"));
        assert!(cursor.next_record().is_none());
    }

    #[test]
    fn command_failure_populates_error_chain() {
        let engine = ScriptedEngine::new().script(
            "sync",
            vec![
                ScriptEvent::Error {
                    severity: Severity::Failed,
                    code: 6001,
                    text: "file(s) not on client".to_string(),
                },
            ],
        );
        let mut session = session_with(engine);
        let ok = session.run_command("sync", 3, true, &[]).expect("run");
        assert!(!ok);
        let errors = session.find_context(3).expect("ctx").error_results();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, 6001);
        assert_eq!(errors[0].severity, Severity::Failed);
    }

    #[test]
    fn untagged_listing_fills_info_and_leaves_tagged_empty() {
        // Anonymous session against a non-unicode remote, tagged=false.
        let engine = ScriptedEngine::new()
            .with_connect_info(ConnectInfo {
                unicode: false,
                api_level: 36,
                ..ConnectInfo::default()
            })
            .script(
                "dirs",
                vec![
                    ScriptEvent::Info {
                        level: 0,
                        code: 0,
                        text: "//depot/proj".to_string(),
                    },
                    ScriptEvent::Info {
                        level: 0,
                        code: 0,
                        text: "//depot/tools".to_string(),
                    },
                ],
            );
        let mut session = Session::new("depot:1666", "anon", "", "", engine);
        let ok = session.run_command("dirs", 1, false, &[]).expect("run");
        assert!(ok);
        let ctx = session.find_context(1).expect("ctx");
        assert_eq!(ctx.info_results().len(), 2);
        assert_eq!(ctx.info_results()[0].text, "//depot/proj");
        assert_eq!(ctx.tagged_count(), 0);
        assert!(!session.is_unicode());
    }

    #[test]
    fn getters_fall_back_to_negotiated_values() {
        let engine = ScriptedEngine::new().with_connect_info(ConnectInfo {
            endpoint: Some("depot.example.com:1666".to_string()),
            user: Some("mei".to_string()),
            workspace: Some("mei-auto".to_string()),
            charset: Some("utf8".to_string()),
            unicode: true,
            api_level: 99,
            requires_login: true,
        });
        let mut session = Session::new("depot:1666", "", "", "", engine);
        session.connect().expect("connect");

        // Explicit wins where set; negotiated fills the rest.
        assert_eq!(session.endpoint(), "depot:1666");
        assert_eq!(session.user(), "mei");
        assert_eq!(session.workspace(), "mei-auto");
        assert_eq!(session.charset(), "utf8");
        assert_eq!(session.api_level(), 99);
        assert!(session.requires_login());

        session.set_workspace("mei-manual");
        assert_eq!(session.workspace(), "mei-manual");
    }

    #[test]
    fn unknown_charset_is_rejected() {
        let engine = ScriptedEngine::new();
        let mut session = session_with(engine);
        assert!(session.set_character_set("utf8", "").is_ok());
        assert!(session.set_character_set("klingon", "").is_err());
        assert_eq!(session.charset(), "utf8");
    }

    #[test]
    fn cancel_is_forwarded() {
        let engine = ScriptedEngine::new();
        let mut session = session_with(engine);
        session.cancel_command(42);
        assert_eq!(session.engine().cancelled(), &[42]);
    }

    #[test]
    fn data_set_reaches_engine_and_survives_reset() {
        let engine = ScriptedEngine::new().script("change", record(&[("Change", "new")]));
        let mut session = session_with(engine);
        session.set_data_set(5, "Change: new\nDescription: demo\n");
        session.run_command("change", 5, true, &["-i".to_string()]).expect("run");
        let staged = &session.engine().data_sets()[0];
        assert_eq!(
            staged.as_deref(),
            Some(b"Change: new\nDescription: demo\n".as_slice())
        );
    }

    #[test]
    fn release_context_and_lookup_miss() {
        let engine = ScriptedEngine::new().script("files", record(&[("a", "b")]));
        let mut session = session_with(engine);
        assert!(session.find_context(1).is_none());
        session.run_command("files", 1, true, &[]).expect("run");
        assert!(session.find_context(1).is_some());
        assert!(session.release_context(1));
        assert!(!session.release_context(1));
        assert!(session.find_context(1).is_none());
    }

    #[test]
    fn action_resolve_handler_decides_and_absent_handler_skips() {
        use crate::core::engine::ScriptEvent;
        use crate::core::merge::{MergeStatus, ResolveData};

        let action = ResolveData {
            resolve_type: "Branch resolve".to_string(),
            yours_action: "ignore".to_string(),
            their_action: "branch".to_string(),
            ..ResolveData::default()
        };
        let engine = ScriptedEngine::new()
            .script(
                "resolve",
                vec![
                    ScriptEvent::ResolveAction(action.clone()),
                    ScriptEvent::Finish(true),
                ],
            )
            .script(
                "resolve",
                vec![
                    ScriptEvent::ResolveAction(action),
                    ScriptEvent::Finish(true),
                ],
            );
        let mut session = session_with(engine);
        session.handlers_mut().resolve_action = Some(Box::new(|_, resolve| {
            assert_eq!(resolve.their_action, "branch");
            MergeStatus::Theirs
        }));
        session.run_command("resolve", 1, true, &[]).expect("first");

        session.handlers_mut().resolve_action = None;
        session.run_command("resolve", 2, true, &[]).expect("second");

        assert_eq!(
            session.engine().resolve_answers(),
            &[MergeStatus::Theirs, MergeStatus::Skip]
        );
    }

    #[test]
    fn log_handler_sees_lifecycle_events() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut session = session_with(ScriptedEngine::new());
        session.handlers_mut().log = Some(Box::new(move |level, _file, _line, msg| {
            sink.lock().expect("lock").push((level, msg.to_string()));
        }));

        session.connect().expect("connect");
        session.disconnect();

        let events = seen.lock().expect("lock").clone();
        assert_eq!(
            events,
            vec![(2, "connected".to_string()), (2, "disconnected".to_string())]
        );
    }

    #[test]
    fn prompt_handler_answers_engine() {
        let engine = ScriptedEngine::new().script(
            "login",
            vec![
                ScriptEvent::Prompt("Enter password: ".to_string()),
                ScriptEvent::Finish(true),
            ],
        );
        let mut session = session_with(engine);
        session.handlers_mut().prompt = Some(Box::new(|_, _, _| "hunter2".to_string()));
        session.run_command("login", 9, false, &[]).expect("run");
        assert_eq!(
            session.engine().prompt_answers(),
            &[Some("hunter2".to_string())]
        );
    }
}
