use std::sync::Arc;

use async_trait::async_trait;
use ragline_core::chunker::{parse_topic_lines, split_sentences, Chunker};
use ragline_core::traits::Generator;
use ragline_core::types::{Chunk, GenerationRequest};

struct Reply(&'static str);

#[async_trait]
impl Generator for Reply {
    fn name(&self) -> &str { "reply" }
    async fn generate(&self, _request: &GenerationRequest) -> anyhow::Result<String> { Ok(self.0.to_string()) }
}

struct Down;

#[async_trait]
impl Generator for Down {
    fn name(&self) -> &str { "down" }
    async fn generate(&self, _request: &GenerationRequest) -> anyhow::Result<String> { anyhow::bail!("connection refused") }
}

#[tokio::test]
async fn empty_and_whitespace_input_yield_no_chunks() {
    let chunker = Chunker::agentic(Arc::new(Reply("- A: b")));
    assert!(chunker.chunk("").await.is_empty());
    assert!(chunker.chunk("   ").await.is_empty());
    assert!(chunker.chunk("\n\t ").await.is_empty());
}

#[tokio::test]
async fn agentic_output_is_cleaned_into_topic_chunks() {
    let reply = "- Solar: Panels convert light to power.\n* Storage: Batteries hold the surplus.\n\n3. Untitled remark without separator";
    let chunker = Chunker::agentic(Arc::new(Reply(reply)));
    let chunks = chunker.chunk("whatever the source text is").await;
    assert_eq!(
        chunks,
        vec![
            Chunk::new("Solar", "Panels convert light to power."),
            Chunk::new("Storage", "Batteries hold the surplus."),
            Chunk::new("General", "Untitled remark without separator"),
        ]
    );
}

#[tokio::test]
async fn model_failure_falls_back_to_sentences() {
    let chunker = Chunker::agentic(Arc::new(Down));
    let chunks = chunker.chunk("Water boils at 100C. Does it freeze at 0C? Yes!").await;
    let rendered: Vec<String> = chunks.iter().map(Chunk::render).collect();
    assert_eq!(rendered, vec!["General: Water boils at 100C.", "General: Does it freeze at 0C?", "General: Yes!"]);
}

#[tokio::test]
async fn blank_model_output_falls_back_to_sentences() {
    let chunker = Chunker::agentic(Arc::new(Reply("\n  \n- Heading:\n")));
    let chunks = chunker.chunk("One fact. Another fact.").await;
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| c.topic_label == "General"));
}

#[tokio::test]
async fn every_chunk_is_non_empty_and_carries_a_separator() {
    let inputs = ["x", "no terminator at all", "A. B. C.", "Ends with space. ", "3.14 is pi. e is 2.71"];
    let chunker = Chunker::sentences();
    for input in inputs {
        let chunks = chunker.chunk(input).await;
        assert!(!chunks.is_empty(), "input {input:?}");
        for c in &chunks {
            assert!(!c.text.trim().is_empty());
            assert!(c.render().contains(':'));
        }
    }
}

#[tokio::test]
async fn sentences_keep_an_explicit_topic() {
    let chunks = Chunker::sentences().chunk("Topic A: fact one. Meet at 10:30 today. : dangling").await;
    let rendered: Vec<String> = chunks.iter().map(Chunk::render).collect();
    assert_eq!(rendered, vec!["Topic A: fact one.", "General: Meet at 10:30 today.", "General: : dangling"]);
}

#[test]
fn sentence_split_requires_whitespace_after_terminator() {
    assert_eq!(split_sentences("3.14 is pi. e is 2.71"), vec!["3.14 is pi.", "e is 2.71"]);
    assert_eq!(split_sentences("Wait...what? Ok"), vec!["Wait...what?", "Ok"]);
}

#[test]
fn topic_line_parser_handles_markup() {
    let chunks = parse_topic_lines("1) **Budget**: Up 4%\n- : orphan summary\n2024 plan: ship it\nHeader:");
    assert_eq!(
        chunks,
        vec![
            Chunk::new("Budget", "Up 4%"),
            Chunk::new("General", "orphan summary"),
            Chunk::new("2024 plan", "ship it"),
        ]
    );
}
