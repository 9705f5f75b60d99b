//! Ingestion: raw source → units → summaries → embeddings → store.
//!
//! Summaries and embeddings are computed concurrently up to the configured
//! limit, then units are written one by one in input order. A unit that
//! cannot be embedded or stored is skipped without failing its siblings.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use ragline_core::chunker::Chunker;
use ragline_core::config::IngestSettings;
use ragline_core::content::sniff_image;
use ragline_core::traits::{ContentExtractor, Generator};
use ragline_core::types::{
    Content, ContentKind, DocId, DocumentUnit, GenerationRequest, Meta, SourceKind, META_SUMMARY, META_TOPIC,
};
use ragline_core::Error;
use ragline_embed::EmbeddingAdapter;
use ragline_vector::MultiVectorStore;

pub const NO_CONTENT: &str = "No content extracted";

/// Appended to the summary message when an image had neither a caption nor
/// an image embedding to index it by.
pub const IMAGE_NEEDS_CAPTION: &str =
    "images need a captioning model (set llm.api_key) or an embedder with image support";

const TEXT_SUMMARY_PROMPT: &str =
    "You are an assistant tasked with summarizing content for retrieval. Create a concise summary optimized for retrieval. Content: ";
const IMAGE_SUMMARY_PROMPT: &str = "You are an assistant tasked with summarizing images for retrieval. \
     These summaries will be embedded and used to retrieve the raw image. Give a concise summary optimized for retrieval.";

#[derive(Debug, Clone)]
pub enum RawContent {
    Bytes(Vec<u8>),
    Text(String),
}

impl RawContent {
    fn as_bytes(&self) -> &[u8] {
        match self {
            RawContent::Bytes(b) => b,
            RawContent::Text(t) => t.as_bytes(),
        }
    }

    fn into_text(self) -> String {
        match self {
            RawContent::Text(t) => t,
            RawContent::Bytes(b) => String::from_utf8(b).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub content: RawContent,
    pub kind: SourceKind,
    pub source_ref: String,
    pub metadata: Meta,
}

impl IngestRequest {
    pub fn text(text: impl Into<String>, source_ref: impl Into<String>) -> Self {
        Self { content: RawContent::Text(text.into()), kind: SourceKind::Text, source_ref: source_ref.into(), metadata: Meta::new() }
    }

    pub fn bytes(bytes: Vec<u8>, kind: SourceKind, source_ref: impl Into<String>) -> Self {
        Self { content: RawContent::Bytes(bytes), kind, source_ref: source_ref.into(), metadata: Meta::new() }
    }

    pub fn with_metadata(mut self, metadata: Meta) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Outcome of ingesting one source.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionSummary {
    pub source_ref: String,
    pub declared_kind: SourceKind,
    pub stored_ids: Vec<DocId>,
    pub skipped: usize,
    pub chunks: usize,
    pub message: String,
}

impl IngestionSummary {
    fn empty(req: &IngestRequest, message: impl Into<String>) -> Self {
        Self {
            source_ref: req.source_ref.clone(),
            declared_kind: req.kind,
            stored_ids: Vec::new(),
            skipped: 0,
            chunks: 0,
            message: message.into(),
        }
    }
}

/// A unit waiting for its summary and key vector.
struct Pending {
    unit: DocumentUnit,
    topic: Option<String>,
}

struct Prepared {
    unit: DocumentUnit,
    vector: Vec<f32>,
    metadata: Meta,
}

pub struct Ingestor {
    chunker: Chunker,
    embedder: EmbeddingAdapter,
    store: Arc<MultiVectorStore>,
    summarizer: Option<Arc<dyn Generator>>,
    extractor: Option<Arc<dyn ContentExtractor>>,
    options: IngestSettings,
}

impl Ingestor {
    pub fn new(
        chunker: Chunker,
        embedder: EmbeddingAdapter,
        store: Arc<MultiVectorStore>,
        summarizer: Option<Arc<dyn Generator>>,
        options: IngestSettings,
    ) -> Self {
        Self { chunker, embedder, store, summarizer, extractor: None, options }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub async fn ingest(&self, req: IngestRequest) -> IngestionSummary {
        let pending = match self.units_for(&req).await {
            Ok(p) => p,
            Err(e) => {
                warn!(source = %req.source_ref, kind = %req.kind, error = %e, "ingestion rejected");
                return IngestionSummary::empty(&req, e.to_string());
            }
        };
        if pending.is_empty() {
            return IngestionSummary::empty(&req, NO_CONTENT);
        }

        let chunks = pending.len();
        let concurrency = self.options.concurrency.max(1);
        let base_meta = &req.metadata;
        let prepared: Vec<Prepared> = stream::iter(pending)
            .map(|p| self.prepare(p, base_meta))
            .buffered(concurrency)
            .collect()
            .await;

        let mut stored_ids = Vec::new();
        let mut skipped = 0usize;
        let mut uncaptioned = false;
        for p in prepared {
            if p.vector.is_empty() {
                debug!(doc_id = %p.unit.id, "no embedding; unit skipped");
                if matches!(p.unit.content, Content::Image(_)) {
                    uncaptioned = true;
                }
                skipped += 1;
                continue;
            }
            let requested = p.unit.id.clone();
            match self.store.put(p.unit, p.vector, p.metadata).await {
                Ok(Some(id)) => stored_ids.push(id),
                Ok(None) => skipped += 1,
                Err(e) => {
                    warn!(doc_id = %requested, error = %e, "storing unit failed");
                    skipped += 1;
                }
            }
        }

        let mut message = if skipped == 0 {
            format!("Stored {} unit(s)", stored_ids.len())
        } else {
            format!("Stored {} unit(s), skipped {}", stored_ids.len(), skipped)
        };
        if uncaptioned {
            warn!(source = %req.source_ref, "image left unindexed: no caption and no image embedding");
            message = format!("{message}: {IMAGE_NEEDS_CAPTION}");
        }
        info!(source = %req.source_ref, kind = %req.kind, stored = stored_ids.len(), skipped, "ingested");
        IngestionSummary { source_ref: req.source_ref.clone(), declared_kind: req.kind, stored_ids, skipped, chunks, message }
    }

    /// One summary per request, in order.
    pub async fn ingest_batch(&self, requests: Vec<IngestRequest>) -> Vec<IngestionSummary> {
        let mut out = Vec::with_capacity(requests.len());
        for req in requests {
            out.push(self.ingest(req).await);
        }
        out
    }

    async fn units_for(&self, req: &IngestRequest) -> Result<Vec<Pending>, Error> {
        let base = base_id(&req.source_ref, req.kind);
        match req.kind {
            SourceKind::Text => Ok(self.text_units(&base, req.content.clone().into_text(), &req.source_ref).await),
            SourceKind::Table => {
                let text = req.content.clone().into_text();
                if text.trim().is_empty() {
                    return Ok(Vec::new());
                }
                let unit = DocumentUnit::text(format!("{base}-0"), ContentKind::Table, text.trim(), &req.source_ref);
                Ok(vec![Pending { unit, topic: None }])
            }
            SourceKind::Image => {
                let (_, bytes) = sniff_image(req.content.as_bytes())
                    .ok_or_else(|| Error::UnsupportedContentKind("payload is not a recognised image".into()))?;
                Ok(vec![Pending { unit: DocumentUnit::image(format!("{base}-0"), bytes, &req.source_ref), topic: None }])
            }
            SourceKind::Pdf | SourceKind::Audio | SourceKind::Video => {
                let extractor = self
                    .extractor
                    .as_ref()
                    .ok_or_else(|| Error::UnsupportedContentKind(format!("{} (no extractor configured)", req.kind)))?;
                let text = extractor
                    .extract(req.content.as_bytes(), req.kind)
                    .await
                    .map_err(|e| Error::ExternalService(format!("extraction failed: {e}")))?;
                Ok(self.text_units(&base, text, &req.source_ref).await)
            }
        }
    }

    async fn text_units(&self, base: &str, text: String, source_ref: &str) -> Vec<Pending> {
        self.chunker
            .chunk(&text)
            .await
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| Pending {
                unit: DocumentUnit::text(format!("{base}-{i}"), ContentKind::Text, chunk.render(), source_ref),
                topic: Some(chunk.topic_label),
            })
            .collect()
    }

    async fn prepare(&self, pending: Pending, base_meta: &Meta) -> Prepared {
        let Pending { unit, topic } = pending;
        let summary = self.summarize(&unit).await;
        let vector = match &unit.content {
            Content::Image(bytes) if summary.is_empty() => self.embedder.embed_image(bytes).await,
            _ => self.embedder.embed(&summary).await,
        };
        let mut metadata = base_meta.clone();
        metadata.insert(META_SUMMARY.to_string(), summary);
        if let Some(topic) = topic {
            metadata.insert(META_TOPIC.to_string(), topic);
        }
        Prepared { unit, vector, metadata }
    }

    /// The text that gets embedded for a unit. Falls back to the unit's own
    /// text when summarization is off or fails; images without a caption
    /// yield an empty summary.
    async fn summarize(&self, unit: &DocumentUnit) -> String {
        match (&unit.content, unit.kind) {
            (Content::Text(text), ContentKind::Text) if self.options.summarize_texts => {
                self.llm_summary(GenerationRequest::text(format!("{TEXT_SUMMARY_PROMPT}{text}"))).await.unwrap_or_else(|| text.clone())
            }
            (Content::Text(text), ContentKind::Table) if self.options.summarize_tables => {
                self.llm_summary(GenerationRequest::text(format!("{TEXT_SUMMARY_PROMPT}{text}"))).await.unwrap_or_else(|| text.clone())
            }
            (Content::Text(text), _) => text.clone(),
            (Content::Image(bytes), _) => {
                let mime = ragline_core::content::image_format(bytes).map(|f| f.mime_type()).unwrap_or("image/jpeg");
                let request = GenerationRequest::text(IMAGE_SUMMARY_PROMPT).with_image(mime, bytes.clone());
                self.llm_summary(request).await.unwrap_or_default()
            }
        }
    }

    async fn llm_summary(&self, request: GenerationRequest) -> Option<String> {
        let generator = self.summarizer.as_ref()?;
        match generator.generate(&request).await {
            Ok(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Ok(_) => {
                warn!("summarizer returned nothing");
                None
            }
            Err(e) => {
                warn!(error = %e, "summarization failed");
                None
            }
        }
    }
}

/// Stable id prefix for units of one source: the file name when the
/// reference looks like a path, the kind otherwise.
fn base_id(source_ref: &str, kind: SourceKind) -> String {
    let name = Path::new(source_ref.trim()).file_name().and_then(|n| n.to_str()).unwrap_or("").trim();
    if name.is_empty() {
        kind.as_str().to_string()
    } else {
        name.to_string()
    }
}
