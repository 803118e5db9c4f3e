//! Repository indexing and semantic retrieval.
//!
//! Files are decoded and split into bounded fragments, each fragment is
//! embedded through an LLM provider, and the resulting snapshot is persisted
//! per repository identity and queried by cosine similarity.

pub mod chunker;
pub mod error;
pub mod indexer;
pub mod snapshot;

pub use error::{IndexError, Result};
