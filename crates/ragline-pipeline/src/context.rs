use image::imageops::FilterType;
use image::GenericImageView;
use std::io::Cursor;
use tracing::{debug, warn};

use ragline_core::content::{image_format, ImageFormat};
use ragline_core::types::{Content, ContentKind, GenerationRequest, RetrievedItem};

pub const DEFAULT_CONTEXT_BUDGET: usize = 10_000;
pub const DEFAULT_IMAGE_MAX_SIDE: u32 = 512;

/// Shown to the model in place of context when retrieval found nothing.
pub const NO_CONTEXT_NOTICE: &str = "No relevant document found in the database.";

/// Retrieved content split by modality.
#[derive(Debug, Clone, Default)]
pub struct ContextBuckets {
    pub texts: Vec<String>,
    pub images: Vec<(ImageFormat, Vec<u8>)>,
}

impl ContextBuckets {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.images.is_empty()
    }
}

/// Partitions by the stored `ContentKind`; payloads are never re-sniffed.
pub fn partition(items: &[RetrievedItem]) -> ContextBuckets {
    let mut buckets = ContextBuckets::default();
    for item in items {
        match (&item.unit.kind, &item.unit.content) {
            (ContentKind::Image, Content::Image(bytes)) => {
                let format = image_format(bytes).unwrap_or(ImageFormat::Jpeg);
                buckets.images.push((format, bytes.clone()));
            }
            (_, Content::Text(text)) => buckets.texts.push(text.clone()),
            (kind, Content::Image(_)) => {
                warn!(doc_id = %item.unit.id, kind = %kind, "binary payload on a non-image unit; skipped");
            }
        }
    }
    buckets
}

/// Cuts `text` to at most `budget` characters on a char boundary.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn codec(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Gif => image::ImageFormat::Gif,
        ImageFormat::Webp => image::ImageFormat::WebP,
    }
}

/// Scales an encoded image so its longest side is at most `max_side`,
/// keeping the aspect ratio and the original format. Images that already
/// fit, `max_side == 0` and payloads that fail to decode or re-encode come
/// back unchanged.
pub fn downsize_image(bytes: &[u8], format: ImageFormat, max_side: u32) -> Vec<u8> {
    if max_side == 0 {
        return bytes.to_vec();
    }
    let img = match image::load_from_memory_with_format(bytes, codec(format)) {
        Ok(img) => img,
        Err(e) => {
            debug!(error = %e, "image not decodable; sending as stored");
            return bytes.to_vec();
        }
    };
    let (width, height) = img.dimensions();
    if width <= max_side && height <= max_side {
        return bytes.to_vec();
    }
    let ratio = max_side as f32 / width.max(height) as f32;
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);
    let resized = img.resize(new_width, new_height, FilterType::Lanczos3);

    let mut out = Vec::new();
    match resized.write_to(&mut Cursor::new(&mut out), codec(format)) {
        Ok(()) => {
            debug!(from = ?(width, height), to = ?resized.dimensions(), "downsized image");
            out
        }
        Err(e) => {
            warn!(error = %e, "re-encoding downsized image failed; sending as stored");
            bytes.to_vec()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    budget: usize,
    image_max_side: u32,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_BUDGET)
    }
}

impl ContextAssembler {
    pub fn new(budget: usize) -> Self {
        Self { budget, image_max_side: DEFAULT_IMAGE_MAX_SIDE }
    }

    pub fn with_image_max_side(mut self, max_side: u32) -> Self {
        self.image_max_side = max_side;
        self
    }

    pub fn assemble(&self, query: &str, context: &ContextBuckets) -> GenerationRequest {
        let prompt = if context.is_empty() {
            format!(
                "Question: {query}\nContext:\n{NO_CONTEXT_NOTICE}\n\
                 Answer from general knowledge, or say that you cannot find supporting evidence."
            )
        } else {
            let joined = context.texts.join("\n");
            let text = truncate_chars(&joined, self.budget);
            format!(
                "You are a helpful assistant. Answer the question using the context below and any attached images.\n\
                 Question: {query}\nContext:\n{text}"
            )
        };
        context.images.iter().fold(GenerationRequest::text(prompt), |req, (format, bytes)| {
            req.with_image(format.mime_type(), downsize_image(bytes, *format, self.image_max_side))
        })
    }
}
