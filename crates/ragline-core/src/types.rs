//! Domain types shared by ingestion, storage and retrieval.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type DocId = String;
pub type Meta = HashMap<String, String>;

/// Metadata key holding the summary text that was embedded for a unit.
pub const META_SUMMARY: &str = "summary";
/// Metadata key holding the `ContentKind` label of the stored unit.
pub const META_KIND: &str = "kind";
/// Metadata key holding the unit's source reference.
pub const META_SOURCE: &str = "source_ref";
/// Metadata key holding the chunk topic for text units.
pub const META_TOPIC: &str = "topic";

/// Topic assigned to chunks whose topic could not be determined.
pub const FALLBACK_TOPIC: &str = "General";

/// Modality tag attached at ingestion time and carried through retrieval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Table,
    Image,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Table => "table",
            ContentKind::Image => "image",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "text" => Some(ContentKind::Text),
            "table" => Some(ContentKind::Table),
            "image" => Some(ContentKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a stored unit. Text and tables are strings, images keep their
/// original encoded bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Image(Vec<u8>),
}

impl Content {
    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(t) => t.trim().is_empty(),
            Content::Image(b) => b.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(t) => Some(t),
            Content::Image(_) => None,
        }
    }
}

/// An immutable unit of ingested content.
///
/// - `id`: identity assigned by the store (unique within one corpus)
/// - `kind`: modality tag decided at ingestion
/// - `content`: the full-fidelity payload handed to generation
/// - `source_ref`: file path or caller-provided reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentUnit {
    pub id: DocId,
    pub kind: ContentKind,
    pub content: Content,
    pub source_ref: String,
}

impl DocumentUnit {
    pub fn text(id: impl Into<String>, kind: ContentKind, text: impl Into<String>, source_ref: impl Into<String>) -> Self {
        Self { id: id.into(), kind, content: Content::Text(text.into()), source_ref: source_ref.into() }
    }

    pub fn image(id: impl Into<String>, bytes: Vec<u8>, source_ref: impl Into<String>) -> Self {
        Self { id: id.into(), kind: ContentKind::Image, content: Content::Image(bytes), source_ref: source_ref.into() }
    }
}

/// A retrieval-sized fragment produced by the chunker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub topic_label: String,
}

impl Chunk {
    pub fn new(topic_label: impl Into<String>, text: impl Into<String>) -> Self {
        Self { text: text.into(), topic_label: topic_label.into() }
    }

    pub fn general(text: impl Into<String>) -> Self {
        Self::new(FALLBACK_TOPIC, text)
    }

    /// `"<topic>: <text>"`, the form that gets stored and embedded.
    pub fn render(&self) -> String {
        format!("{}: {}", self.topic_label, self.text)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.topic_label, self.text)
    }
}

/// A vector keyed by the id of the unit it stands for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub doc_id: DocId,
    pub vector: Vec<f32>,
    pub metadata: Meta,
}

/// Nearest-neighbor match returned by a vector index. Lower distance is closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    pub doc_id: DocId,
    pub metadata: Meta,
    pub distance: f32,
}

/// A resolved retrieval result: the original unit and its distance to the query.
#[derive(Debug, Clone)]
pub struct RetrievedItem {
    pub unit: DocumentUnit,
    pub distance: f32,
    pub summary: Option<String>,
}

/// One row of the corpus listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub doc_id: DocId,
    pub kind: ContentKind,
    pub source_ref: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
}

/// Declared kind of a raw source handed to ingestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Text,
    Table,
    Image,
    Pdf,
    Audio,
    Video,
}

impl SourceKind {
    /// Guess a kind from a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "md" | "text" => Some(SourceKind::Text),
            "csv" | "tsv" => Some(SourceKind::Table),
            "jpg" | "jpeg" | "png" | "gif" | "webp" => Some(SourceKind::Image),
            "pdf" => Some(SourceKind::Pdf),
            "mp3" | "wav" | "m4a" | "ogg" => Some(SourceKind::Audio),
            "mp4" | "mov" | "mkv" | "webm" => Some(SourceKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Text => "text",
            SourceKind::Table => "table",
            SourceKind::Image => "image",
            SourceKind::Pdf => "pdf",
            SourceKind::Audio => "audio",
            SourceKind::Video => "video",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the final step of a query is produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseMode {
    /// Return the retrieved text verbatim without calling the model.
    #[serde(alias = "db_only")]
    RetrievalOnly,
    /// Condition the generative model on the retrieved context.
    #[default]
    #[serde(alias = "db_gemini")]
    RetrievalAndGeneration,
}

impl std::str::FromStr for ResponseMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retrieval-only" | "db_only" | "db-only" => Ok(ResponseMode::RetrievalOnly),
            "retrieval-and-generation" | "generate" | "db_gemini" | "db-gemini" => Ok(ResponseMode::RetrievalAndGeneration),
            other => Err(crate::Error::InvalidConfig(format!("unknown response mode '{other}'"))),
        }
    }
}

/// A piece of a generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

/// Provider-neutral request for a generative model: ordered text and image parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub parts: Vec<Part>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self { parts: vec![Part::Text(prompt.into())] }
    }

    pub fn with_image(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.parts.push(Part::Image { mime_type: mime_type.into(), data });
        self
    }

    pub fn image_count(&self) -> usize {
        self.parts.iter().filter(|p| matches!(p, Part::Image { .. })).count()
    }

    /// Concatenation of all text parts.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
