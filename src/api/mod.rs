//! Purpose: Define the stable public Rust API boundary for depotbridge.
//! Exports: Core types and operations needed by bindings and embedders.
//! Role: Public, additive-only surface; `core` module layout is an
//! implementation detail behind these re-exports.
//! Invariants: Everything a binding needs is reachable from here.

pub use crate::core::context::{
    CommandContext, ContextState, ErrorMessage, InfoMessage, Severity, TaggedRecord,
};
pub use crate::core::engine::{
    CommandSpec, ConnectInfo, ProtocolEngine, ResultSink, ScriptEvent, ScriptedEngine,
};
pub use crate::core::env::{
    EnvStore, VC_CHARSET, VC_CLIENT, VC_CONFIG, VC_IGNORE, VC_PASSWD, VC_PORT, VC_USER,
};
pub use crate::core::error::{to_code, Error, ErrorKind};
pub use crate::core::handlers::Handlers;
pub use crate::core::ignore::{is_ignored, IgnoreFile};
pub use crate::core::log::init_trace;
pub use crate::core::merge::{MergeData, MergeForce, MergeStatus, ResolveData};
pub use crate::core::session::{ConnectionParams, Session, KNOWN_CHARSETS};
pub use crate::core::tagged::TaggedCursor;
