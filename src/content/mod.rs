//! Content layer
//!
//! Owns the single persisted JSON site document.

mod store;

pub use store::{ContentStore, MAX_DOCUMENT_BYTES};
