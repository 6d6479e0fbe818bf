//! Purpose: Per-command result accumulation: the single aggregation point for command output.
//! Exports: `CommandContext`, `TaggedRecord`, `InfoMessage`, `ErrorMessage`, `Severity`.
//! Invariants: A context collects into exactly one of tagged/text/binary per command; the
//! other channels stay empty rather than null.
//! Invariants: Message chains preserve arrival order, oldest first.

use bstr::{BStr, BString};

use crate::core::tagged::TaggedCursor;

/// Severity attached to error-chain entries, lowest to highest.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Severity {
    Empty,
    Info,
    Warning,
    Failed,
    Fatal,
}

impl Severity {
    pub fn code(self) -> i32 {
        match self {
            Severity::Empty => 0,
            Severity::Info => 1,
            Severity::Warning => 2,
            Severity::Failed => 3,
            Severity::Fatal => 4,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Severity::Empty,
            1 => Severity::Info,
            2 => Severity::Warning,
            3 => Severity::Failed,
            _ => Severity::Fatal,
        }
    }
}

/// One record of tagged output: an ordered list of key/value pairs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TaggedRecord {
    entries: Vec<(String, String)>,
}

impl TaggedRecord {
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, key: String, value: String) {
        self.entries.push((key, value));
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InfoMessage {
    pub level: u8,
    pub code: i32,
    pub text: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ErrorMessage {
    pub severity: Severity,
    pub code: i32,
    pub text: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContextState {
    Created,
    Populating,
    Complete,
}

/// Everything one command invocation produced, keyed by the caller-chosen command id.
///
/// Reissuing a command under the same id reuses the context after clearing the four
/// result channels; the data-set slot survives the clear because it stages *input*
/// for the command about to run.
#[derive(Debug)]
pub struct CommandContext {
    cmd_id: i32,
    state: ContextState,
    tagged: Vec<TaggedRecord>,
    text: BString,
    binary: Vec<u8>,
    info: Vec<InfoMessage>,
    errors: Vec<ErrorMessage>,
    data_set: BString,
}

impl CommandContext {
    pub fn new(cmd_id: i32) -> Self {
        Self {
            cmd_id,
            state: ContextState::Created,
            tagged: Vec::new(),
            text: BString::default(),
            binary: Vec::new(),
            info: Vec::new(),
            errors: Vec::new(),
            data_set: BString::default(),
        }
    }

    pub fn cmd_id(&self) -> i32 {
        self.cmd_id
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Clear the result channels for reuse under the same id. The data-set slot
    /// is left alone: it was staged for the run that is about to happen.
    pub fn reset(&mut self) {
        self.state = ContextState::Created;
        self.tagged.clear();
        self.text.clear();
        self.binary.clear();
        self.info.clear();
        self.errors.clear();
    }

    pub fn begin_populating(&mut self) {
        self.state = ContextState::Populating;
    }

    pub fn complete(&mut self) {
        self.state = ContextState::Complete;
    }

    fn accepting(&self) -> bool {
        // Complete -> Populating is not a valid transition; drop late arrivals.
        if self.state == ContextState::Complete {
            tracing::warn!(cmd_id = self.cmd_id, "append after completion dropped");
            return false;
        }
        true
    }

    /// Open a new tagged record; subsequent key/value appends target it.
    pub fn begin_record(&mut self) {
        if !self.accepting() {
            return;
        }
        self.tagged.push(TaggedRecord::default());
    }

    /// Append a key/value pair to the open record, implicitly opening one when
    /// the engine calls out of order. The `func` protocol key never reaches
    /// callers and is suppressed here, at the append boundary.
    ///
    /// Returns whether the pair was stored.
    pub fn key_value(&mut self, key: &str, value: &str) -> bool {
        if !self.accepting() {
            return false;
        }
        if key == "func" {
            return false;
        }
        if self.tagged.is_empty() {
            self.tagged.push(TaggedRecord::default());
        }
        if let Some(record) = self.tagged.last_mut() {
            record.push(key.to_string(), value.to_string());
        }
        true
    }

    /// Concatenate a text fragment. No line-ending normalization happens here;
    /// whatever the engine produced is preserved byte for byte.
    pub fn append_text(&mut self, fragment: &[u8]) {
        if !self.accepting() {
            return;
        }
        self.text.extend_from_slice(fragment);
    }

    pub fn append_binary(&mut self, bytes: &[u8]) {
        if !self.accepting() {
            return;
        }
        self.binary.extend_from_slice(bytes);
    }

    pub fn push_info(&mut self, level: u8, code: i32, text: impl Into<String>) {
        if !self.accepting() {
            return;
        }
        self.info.push(InfoMessage {
            level,
            code,
            text: text.into(),
        });
    }

    pub fn push_error(&mut self, severity: Severity, code: i32, text: impl Into<String>) {
        if !self.accepting() {
            return;
        }
        self.errors.push(ErrorMessage {
            severity,
            code,
            text: text.into(),
        });
    }

    /// A fresh single-pass cursor over the accumulated records. The cursor
    /// snapshots the records; releasing it never touches the context, and a
    /// later rerun under this id cannot leak stale records into it.
    pub fn tagged_output(&self) -> TaggedCursor {
        TaggedCursor::snapshot(&self.tagged)
    }

    pub fn tagged_records(&self) -> &[TaggedRecord] {
        &self.tagged
    }

    pub fn tagged_count(&self) -> usize {
        self.tagged.len()
    }

    pub fn text_results(&self) -> &BStr {
        self.text.as_ref()
    }

    pub fn binary_results(&self) -> &[u8] {
        &self.binary
    }

    pub fn binary_count(&self) -> usize {
        self.binary.len()
    }

    pub fn info_results(&self) -> &[InfoMessage] {
        &self.info
    }

    pub fn error_results(&self) -> &[ErrorMessage] {
        &self.errors
    }

    /// Highest severity accumulated so far, `Empty` when the chain is empty.
    pub fn max_severity(&self) -> Severity {
        self.errors
            .iter()
            .map(|entry| entry.severity)
            .max()
            .unwrap_or(Severity::Empty)
    }

    pub fn set_data_set(&mut self, data: impl Into<BString>) {
        self.data_set = data.into();
    }

    pub fn data_set(&self) -> &BStr {
        self.data_set.as_ref()
    }
}
