// Core modules implementing session state, result buffering, and error modeling.
pub mod context;
pub mod engine;
pub mod env;
pub mod error;
pub mod handlers;
pub mod ignore;
pub mod log;
pub mod merge;
pub mod session;
pub mod tagged;
