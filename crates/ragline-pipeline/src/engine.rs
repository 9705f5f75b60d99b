use std::sync::Arc;
use tracing::{info, warn};

use ragline_core::chunker::Chunker;
use ragline_core::config::Settings;
use ragline_core::traits::{ContentExtractor, Generator};
use ragline_core::types::{ResponseMode, RetrievedItem, StoredEntry};
use ragline_core::Result;
use ragline_embed::EmbeddingAdapter;
use ragline_vector::MultiVectorStore;

use crate::answer::{retrieval_only, AnswerGenerator};
use crate::context::{partition, ContextAssembler};
use crate::ingest::{IngestRequest, IngestionSummary, Ingestor};
use crate::rerank::Reranker;
use crate::retriever::Retriever;

/// Answer used in generation mode when no model is configured.
pub const NO_MODEL: &str = "Error: no generative model configured";

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub items: Vec<RetrievedItem>,
    pub answer: String,
}

/// Everything a caller needs, built once at start-up and shared by reference.
pub struct RagEngine {
    store: Arc<MultiVectorStore>,
    ingestor: Ingestor,
    retriever: Retriever,
    assembler: ContextAssembler,
    answerer: Option<AnswerGenerator>,
    settings: Settings,
}

impl RagEngine {
    pub fn new(
        store: Arc<MultiVectorStore>,
        embedder: EmbeddingAdapter,
        generator: Option<Arc<dyn Generator>>,
        settings: Settings,
    ) -> Self {
        let chunker = match &generator {
            Some(g) if settings.ingest.agentic_chunking => Chunker::agentic(g.clone()),
            _ => Chunker::sentences(),
        };
        let reranker = match &generator {
            Some(g) if settings.retrieval.rerank => Reranker::new(g.clone()),
            _ => Reranker::disabled(),
        };
        let ingestor =
            Ingestor::new(chunker, embedder.clone(), store.clone(), generator.clone(), settings.ingest.clone());
        let retriever = Retriever::new(embedder, store.clone(), reranker);
        Self {
            store,
            ingestor,
            retriever,
            assembler: ContextAssembler::new(settings.retrieval.context_char_budget)
                .with_image_max_side(settings.retrieval.image_max_side),
            answerer: generator.map(AnswerGenerator::new),
            settings,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.ingestor = self.ingestor.with_extractor(extractor);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn ingest(&self, request: IngestRequest) -> IngestionSummary {
        self.ingestor.ingest(request).await
    }

    pub async fn ingest_batch(&self, requests: Vec<IngestRequest>) -> Vec<IngestionSummary> {
        self.ingestor.ingest_batch(requests).await
    }

    /// Retrieval is identical in both modes; only the final step differs.
    /// `k` defaults to `retrieval.k`.
    pub async fn query(&self, text: &str, mode: ResponseMode, k: Option<usize>) -> Result<QueryOutcome> {
        let k = k.unwrap_or(self.settings.retrieval.k);
        let items = self.retriever.retrieve(text, k, self.settings.retrieval.initial_k).await?;
        let buckets = partition(&items);
        let answer = match mode {
            ResponseMode::RetrievalOnly => retrieval_only(&buckets.texts),
            ResponseMode::RetrievalAndGeneration => match &self.answerer {
                Some(answerer) => answerer.answer(&self.assembler.assemble(text, &buckets)).await,
                None => {
                    warn!("generation requested without a configured model");
                    NO_MODEL.to_string()
                }
            },
        };
        Ok(QueryOutcome { items, answer })
    }

    pub async fn reset(&self) -> Result<()> {
        self.store.clear().await?;
        info!("corpus reset");
        Ok(())
    }

    pub async fn entries(&self) -> Result<Vec<StoredEntry>> {
        self.store.entries().await
    }

    pub async fn len(&self) -> Result<usize> {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        self.store.is_empty().await
    }
}
