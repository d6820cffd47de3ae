//! Content-addressed blob storage and the sqlite KU index.

pub mod blob;
pub mod error;
pub mod index;
pub mod object;

pub use blob::BlobStore;
pub use error::{Error, Result};
pub use index::IndexStore;
pub use object::{ConsistencyReport, ObjectStore, StoreOutcome};
