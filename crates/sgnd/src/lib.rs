//! Library surface for the `sgnd` binary, split out so integration
//! tests can drive the assembled `axum::Router` directly (the
//! `main.rs`/`lib.rs` split used by the pack's own daemon binaries).

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod shutdown;
pub mod state;
pub mod verify_logic;
