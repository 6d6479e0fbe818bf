//! Purpose: Push-notification capability set injected into command execution.
//! Exports: `Handlers` and the per-channel handler type aliases.
//! Invariants: Every channel defaults to absent; an absent handler only
//! withholds push notifications, pull accessors still see accumulated data.

use std::fmt;

use crate::core::merge::{MergeData, MergeStatus, ResolveData};

pub type LogHandler = Box<dyn FnMut(i32, &str, u32, &str) + Send>;
pub type TaggedHandler = Box<dyn FnMut(i32, &str, &str) + Send>;
pub type ErrorHandler = Box<dyn FnMut(i32, i32, i32, &str) + Send>;
pub type InfoHandler = Box<dyn FnMut(i32, u8, i32, &str) + Send>;
pub type TextHandler = Box<dyn FnMut(i32, &[u8]) + Send>;
pub type BinaryHandler = Box<dyn FnMut(i32, &[u8]) + Send>;
pub type PromptHandler = Box<dyn FnMut(i32, &str, bool) -> String + Send>;
pub type TransferHandler = Box<dyn FnMut(i32, u64, u64) + Send>;
pub type ResolveHandler = Box<dyn FnMut(i32, &MergeData) -> MergeStatus + Send>;
pub type ActionResolveHandler = Box<dyn FnMut(i32, &ResolveData) -> MergeStatus + Send>;

/// The capability set replacing the original null-checked callback pointers.
/// Each field is one delivery channel; set a field to `Some` to receive pushes,
/// back to `None` to disable that channel without side effects.
#[derive(Default)]
pub struct Handlers {
    pub log: Option<LogHandler>,
    pub tagged: Option<TaggedHandler>,
    pub error: Option<ErrorHandler>,
    pub info: Option<InfoHandler>,
    pub text: Option<TextHandler>,
    pub binary: Option<BinaryHandler>,
    pub prompt: Option<PromptHandler>,
    pub transfer: Option<TransferHandler>,
    pub resolve: Option<ResolveHandler>,
    pub resolve_action: Option<ActionResolveHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |o: bool| if o { "set" } else { "-" };
        f.debug_struct("Handlers")
            .field("log", &set(self.log.is_some()))
            .field("tagged", &set(self.tagged.is_some()))
            .field("error", &set(self.error.is_some()))
            .field("info", &set(self.info.is_some()))
            .field("text", &set(self.text.is_some()))
            .field("binary", &set(self.binary.is_some()))
            .field("prompt", &set(self.prompt.is_some()))
            .field("transfer", &set(self.transfer.is_some()))
            .field("resolve", &set(self.resolve.is_some()))
            .field("resolve_action", &set(self.resolve_action.is_some()))
            .finish()
    }
}
