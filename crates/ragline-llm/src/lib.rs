//! Gemini REST clients: text/vision generation, remote embeddings and
//! media-to-text extraction.

pub mod embedding;
pub mod extract;
pub mod gemini;
pub mod types;

pub use embedding::GeminiEmbedder;
pub use extract::GeminiExtractor;
pub use gemini::{GeminiClient, GeminiConfig};
