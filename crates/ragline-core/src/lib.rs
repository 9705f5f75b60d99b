//! Shared domain model for the ragline workspace.
//!
//! Holds the content types that flow between ingestion and retrieval, the
//! error taxonomy, configuration loading, the traits behind which external
//! collaborators (embedders, generative models, stores, extractors) live,
//! and the chunking policy.

pub mod chunker;
pub mod config;
pub mod content;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
