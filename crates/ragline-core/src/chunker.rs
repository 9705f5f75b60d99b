//! Chunking policy: turns extracted raw text into retrieval-sized chunks.
//!
//! The chunker is an ordered chain of strategies. The first strategy that
//! returns a non-empty result wins; a failing or empty strategy hands over
//! to the next one. The usual chain is LLM-assisted topic segmentation
//! followed by deterministic sentence splitting.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::traits::Generator;
use crate::types::{Chunk, GenerationRequest, FALLBACK_TOPIC};

#[async_trait]
pub trait ChunkStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn split(&self, text: &str) -> anyhow::Result<Vec<Chunk>>;
}

pub struct Chunker {
    strategies: Vec<Box<dyn ChunkStrategy>>,
}

impl Chunker {
    pub fn new(strategies: Vec<Box<dyn ChunkStrategy>>) -> Self {
        Self { strategies }
    }

    /// Topic segmentation by the model, sentence splitting when it fails.
    pub fn agentic(generator: Arc<dyn Generator>) -> Self {
        Self::new(vec![Box::new(AgenticChunker::new(generator)), Box::new(SentenceChunker)])
    }

    /// Deterministic sentence splitting only.
    pub fn sentences() -> Self {
        Self::new(vec![Box::new(SentenceChunker)])
    }

    /// Whitespace-only input yields no chunks. Otherwise at least one chunk
    /// with non-empty text is returned.
    pub async fn chunk(&self, raw_text: &str) -> Vec<Chunk> {
        let text = raw_text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        for strategy in &self.strategies {
            match strategy.split(text).await {
                Ok(chunks) if !chunks.is_empty() => {
                    debug!(strategy = strategy.name(), count = chunks.len(), "chunked text");
                    return chunks;
                }
                Ok(_) => debug!(strategy = strategy.name(), "strategy produced no chunks"),
                Err(e) => warn!(strategy = strategy.name(), error = %e, "chunking strategy failed"),
            }
        }
        vec![Chunk::general(text)]
    }
}

pub struct AgenticChunker {
    generator: Arc<dyn Generator>,
}

impl AgenticChunker {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub fn prompt(text: &str) -> String {
        format!(
            "You are preparing a document for semantic search.\n\
             First decide whether the text below covers a single topic or several topics.\n\
             Then list every self-contained piece of information as one bullet line in the exact format\n\
             - <topic>: <summary>\n\
             Keep each topic label short. Reuse the same label for facts about the same topic.\n\
             Output only the bullet lines.\n\n\
             Text:\n{text}"
        )
    }
}

#[async_trait]
impl ChunkStrategy for AgenticChunker {
    fn name(&self) -> &'static str {
        "agentic"
    }

    async fn split(&self, text: &str) -> anyhow::Result<Vec<Chunk>> {
        let reply = self.generator.generate(&GenerationRequest::text(Self::prompt(text))).await?;
        Ok(parse_topic_lines(&reply))
    }
}

/// Splits on `.`, `!` or `?` followed by whitespace. A sentence already
/// written as `<topic>: <summary>` keeps its topic; every other sentence goes
/// under the fallback topic.
pub struct SentenceChunker;

#[async_trait]
impl ChunkStrategy for SentenceChunker {
    fn name(&self) -> &'static str {
        "sentence"
    }

    async fn split(&self, text: &str) -> anyhow::Result<Vec<Chunk>> {
        Ok(split_sentences(text).into_iter().map(sentence_chunk).collect())
    }
}

/// Only `": "` counts as a separator here, so clock times and ratios stay
/// inside the sentence.
fn sentence_chunk(sentence: String) -> Chunk {
    match sentence.split_once(": ") {
        Some((topic, summary)) if !topic.trim().is_empty() && !summary.trim().is_empty() => {
            Chunk::new(topic.trim(), summary.trim())
        }
        _ => Chunk::general(sentence),
    }
}

pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() {
                    let end = idx + c.len_utf8();
                    push_trimmed(&mut sentences, &text[start..end]);
                    start = end;
                }
            }
        }
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

/// Parses `<topic>: <summary>` lines emitted by the model. Bullet markup is
/// stripped, lines without a separator fall back to the `General` topic and
/// header-like lines with nothing after the colon are dropped.
pub fn parse_topic_lines(reply: &str) -> Vec<Chunk> {
    reply.lines().filter_map(parse_topic_line).collect()
}

fn parse_topic_line(line: &str) -> Option<Chunk> {
    let cleaned = strip_bullet(line);
    if cleaned.is_empty() {
        return None;
    }
    match cleaned.split_once(':') {
        Some((topic, summary)) => {
            let topic = topic.trim().trim_matches('*').trim();
            let summary = summary.trim().trim_matches('*').trim();
            if summary.is_empty() {
                return None;
            }
            let topic = if topic.is_empty() { FALLBACK_TOPIC } else { topic };
            Some(Chunk::new(topic, summary))
        }
        None => Some(Chunk::general(cleaned)),
    }
}

fn strip_bullet(line: &str) -> &str {
    let mut s = line.trim();
    s = s.trim_start_matches(|c: char| matches!(c, '-' | '*' | '•' | '+')).trim_start();
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &s[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                s = rest.trim_start();
            }
        }
    }
    s.trim()
}
