use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ragline_core::config::LlmSettings;
use ragline_core::traits::{ContentExtractor, Embedder, Generator};
use ragline_core::types::{GenerationRequest, SourceKind};
use ragline_llm::extract::media_mime_type;
use ragline_llm::{GeminiClient, GeminiConfig, GeminiEmbedder, GeminiExtractor};

fn config(server: &MockServer) -> GeminiConfig {
    let settings = LlmSettings {
        api_key: "test-key".into(),
        model: "text-model".into(),
        vision_model: "vision-model".into(),
        timeout_secs: 5,
        ..LlmSettings::default()
    };
    GeminiConfig::from(&settings).with_base_url(server.uri())
}

fn reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] }, "finishReason": "STOP" }]
    }))
}

#[tokio::test]
async fn text_request_hits_text_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/text-model:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }],
            "generationConfig": { "maxOutputTokens": 2048 }
        })))
        .respond_with(reply("hi there"))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(config(&server)).unwrap();
    let out = client.generate(&GenerationRequest::text("hello")).await.unwrap();
    assert_eq!(out, "hi there");
}

#[tokio::test]
async fn image_request_uses_vision_model_and_inline_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/vision-model:generateContent"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [
                { "text": "describe" },
                { "inlineData": { "mimeType": "image/png", "data": "AQID" } }
            ] }]
        })))
        .respond_with(reply("a picture"))
        .mount(&server)
        .await;

    let client = GeminiClient::new(config(&server)).unwrap();
    let request = GenerationRequest::text("describe").with_image("image/png", vec![1, 2, 3]);
    assert_eq!(client.generate(&request).await.unwrap(), "a picture");
}

#[tokio::test]
async fn http_error_and_empty_candidates_are_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/text-model:generateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
        .mount(&server)
        .await;
    let client = GeminiClient::new(config(&server)).unwrap();
    let err = client.generate(&GenerationRequest::text("x")).await.unwrap_err();
    assert!(err.to_string().contains("429"));

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [],
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;
    let client = GeminiClient::new(config(&server)).unwrap();
    let err = client.generate(&GenerationRequest::text("x")).await.unwrap_err();
    assert!(err.to_string().contains("SAFETY"));
}

#[tokio::test]
async fn batch_embeddings_keep_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/text-embedding-004:batchEmbedContents"))
        .and(body_partial_json(json!({
            "requests": [
                { "model": "models/text-embedding-004", "content": { "parts": [{ "text": "a" }] } },
                { "model": "models/text-embedding-004", "content": { "parts": [{ "text": "b" }] } }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [{ "values": [0.1, 0.2] }, { "values": [0.3, 0.4] }]
        })))
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new(config(&server), "text-embedding-004").unwrap();
    let out = embedder.embed_batch(&["a".to_string(), "b".to_string()]).await.unwrap();
    assert_eq!(out, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn embedding_count_mismatch_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [] })))
        .mount(&server)
        .await;
    let embedder = GeminiEmbedder::new(config(&server), "text-embedding-004").unwrap();
    assert!(embedder.embed_batch(&["a".to_string()]).await.is_err());
}

#[tokio::test]
async fn extractor_sends_pdf_inline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/vision-model:generateContent"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{}, { "inlineData": { "mimeType": "application/pdf" } }] }]
        })))
        .respond_with(reply("page one text"))
        .mount(&server)
        .await;
    let client: Arc<dyn Generator> = Arc::new(GeminiClient::new(config(&server)).unwrap());
    let extractor = GeminiExtractor::new(client);
    let text = extractor.extract(b"%PDF-1.4 ...", SourceKind::Pdf).await.unwrap();
    assert_eq!(text, "page one text");
    assert!(extractor.extract(b"", SourceKind::Pdf).await.is_err());
    assert!(extractor.extract(b"plain", SourceKind::Text).await.is_err());
}

#[test]
fn media_sniffing() {
    assert_eq!(media_mime_type(b"RIFF\0\0\0\0WAVEfmt ", SourceKind::Audio), Some("audio/wav"));
    assert_eq!(media_mime_type(b"OggS....", SourceKind::Audio), Some("audio/ogg"));
    assert_eq!(media_mime_type(b"ID3....", SourceKind::Audio), Some("audio/mpeg"));
    assert_eq!(media_mime_type(&[0x1A, 0x45, 0xDF, 0xA3, 0], SourceKind::Video), Some("video/webm"));
    assert_eq!(media_mime_type(b"\0\0\0\x18ftypmp42", SourceKind::Video), Some("video/mp4"));
    assert_eq!(media_mime_type(b"x", SourceKind::Table), None);
}
