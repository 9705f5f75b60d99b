//! Retrieval-augmented generation pipeline.
//!
//! Ingestion: chunk → summarize → embed → multi-vector store.
//! Query: embed → search → resolve → re-rank → assemble context → answer.
//! `RagEngine` ties the stages together; `bootstrap::build_engine` builds
//! one from configuration.

pub mod answer;
pub mod bootstrap;
pub mod context;
pub mod engine;
pub mod ingest;
pub mod rerank;
pub mod retriever;

pub use bootstrap::build_engine;
pub use engine::{QueryOutcome, RagEngine};
pub use ingest::{IngestRequest, IngestionSummary, Ingestor, RawContent};
