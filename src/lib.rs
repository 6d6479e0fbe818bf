//! Purpose: Session and result-buffering model for an external version-control client engine.
//! Exports: `core` (session, contexts, env store, merge), `api` (stable Rust surface), `abi` (flat C surface).
//! Role: Library crate built as rlib + cdylib; the flat C surface is consumed over P/Invoke-style bindings.
//! Invariants: The wire protocol lives behind `core::engine::ProtocolEngine`; this crate never speaks it.
//! Invariants: Nothing in `abi` lets a panic cross the C boundary.
pub mod abi;
pub mod api;
pub mod core;
