//! Payload sniffing for image content.
//!
//! Images may arrive as raw bytes or as base64 text. A payload counts as an
//! image only when it decodes (if needed) and starts with a known file
//! signature, so base64-looking prose is never treated as image data.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

const SIGNATURES: &[(&[u8], ImageFormat)] = &[
    (&[0xFF, 0xD8, 0xFF], ImageFormat::Jpeg),
    (&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], ImageFormat::Png),
    (&[0x47, 0x49, 0x46, 0x38], ImageFormat::Gif),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Matches the leading bytes against known image signatures. WEBP is a RIFF
/// container, so it also needs the `WEBP` form type at offset 8.
pub fn image_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WEBP"[..]) {
        return Some(ImageFormat::Webp);
    }
    SIGNATURES.iter().find(|(sig, _)| bytes.starts_with(sig)).map(|(_, fmt)| *fmt)
}

/// True when `s` is non-empty and made only of the standard base64 alphabet
/// with at most two trailing `=`.
pub fn looks_like_base64(s: &str) -> bool {
    let body = s.trim_end_matches('=');
    let padding = s.len() - body.len();
    !body.is_empty()
        && padding <= 2
        && body.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Decodes base64 text into image bytes when both checks pass.
pub fn decode_base64_image(s: &str) -> Option<(ImageFormat, Vec<u8>)> {
    let s = s.trim();
    if !looks_like_base64(s) {
        return None;
    }
    let bytes = STANDARD.decode(s).ok()?;
    image_format(&bytes).map(|fmt| (fmt, bytes))
}

/// Accepts either raw image bytes or base64 text and returns the raw bytes.
pub fn sniff_image(payload: &[u8]) -> Option<(ImageFormat, Vec<u8>)> {
    if let Some(fmt) = image_format(payload) {
        return Some((fmt, payload.to_vec()));
    }
    std::str::from_utf8(payload).ok().and_then(decode_base64_image)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
