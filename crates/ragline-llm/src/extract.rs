use async_trait::async_trait;
use std::sync::Arc;

use ragline_core::traits::{ContentExtractor, Generator};
use ragline_core::types::{GenerationRequest, SourceKind};
use ragline_core::Error;

/// Turns PDFs, audio and video into text by handing the file to a
/// multimodal generator.
pub struct GeminiExtractor {
    generator: Arc<dyn Generator>,
}

impl GeminiExtractor {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    fn instruction(kind: SourceKind) -> &'static str {
        match kind {
            SourceKind::Pdf => "Extract all text from this PDF, including text inside figures. Output plain text only.",
            SourceKind::Audio => "Transcribe this audio recording verbatim. Output plain text only.",
            SourceKind::Video => "Transcribe the speech in this video and describe any on-screen text. Output plain text only.",
            _ => "Extract all text from this file. Output plain text only.",
        }
    }
}

/// Best-effort MIME type for a media payload of the given kind.
pub fn media_mime_type(bytes: &[u8], kind: SourceKind) -> Option<&'static str> {
    match kind {
        SourceKind::Pdf => Some("application/pdf"),
        SourceKind::Audio => Some(if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WAVE"[..]) {
            "audio/wav"
        } else if bytes.starts_with(b"OggS") {
            "audio/ogg"
        } else if bytes.get(4..8) == Some(&b"ftyp"[..]) {
            "audio/mp4"
        } else {
            "audio/mpeg"
        }),
        SourceKind::Video => Some(if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            "video/webm"
        } else if bytes.get(4..12) == Some(&b"ftypqt  "[..]) {
            "video/quicktime"
        } else {
            "video/mp4"
        }),
        SourceKind::Text | SourceKind::Table | SourceKind::Image => None,
    }
}

#[async_trait]
impl ContentExtractor for GeminiExtractor {
    async fn extract(&self, bytes: &[u8], kind: SourceKind) -> anyhow::Result<String> {
        if bytes.is_empty() {
            return Err(Error::EmptyInput.into());
        }
        let mime = media_mime_type(bytes, kind).ok_or_else(|| Error::UnsupportedContentKind(kind.to_string()))?;
        let request = GenerationRequest::text(Self::instruction(kind)).with_image(mime, bytes.to_vec());
        self.generator.generate(&request).await
    }
}
