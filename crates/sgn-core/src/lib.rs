//! KU types, canonical encoding, and content addressing.
//!
//! This crate has no I/O and no async runtime dependency; it is the
//! shared vocabulary every other `sgn-*` crate builds on.

pub mod canonical;
pub mod error;
pub mod types;

pub use canonical::{canonical_bytes, cid, parse_cid};
pub use error::{Error, ErrorKind, Result};
pub use types::{
    Edge, EdgeType, Ku, KuRecord, Provenance, SearchQuery, Signature, DEFAULT_CONTENT_TYPE,
    SCHEMA_ID, SEARCH_DEFAULT_LIMIT, SEARCH_MAX_LIMIT,
};
