//! Image sniffing and encoding: raw bytes → checked format → base64 `ImageData`.
//!
//! The scanner never decodes pixels. It only needs to know what the bytes
//! are (for the MIME type sent to the vision model and the file extension in
//! object storage), so [`sniff`] reads magic bytes via `image::guess_format`.

use crate::error::ScanError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::ImageFormat;
use tracing::debug;

/// Formats a phone camera or scanner plausibly produces.
const ACCEPTED: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

/// A recognised image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind(ImageFormat);

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        self.0.to_mime_type()
    }

    /// File extension used for stored objects.
    pub fn extension(&self) -> &'static str {
        self.0.extensions_str().first().copied().unwrap_or("bin")
    }
}

/// Identify the image format from its magic bytes.
///
/// Rejects empty input as [`ScanError::NoInput`] and anything that is not one
/// of the accepted formats as [`ScanError::UnsupportedImage`].
pub fn sniff(bytes: &[u8]) -> Result<ImageKind, ScanError> {
    if bytes.is_empty() {
        return Err(ScanError::NoInput);
    }
    match image::guess_format(bytes) {
        Ok(format) if ACCEPTED.contains(&format) => Ok(ImageKind(format)),
        _ => Err(ScanError::UnsupportedImage {
            magic: bytes.iter().take(4).copied().collect(),
        }),
    }
}

/// Encode image bytes as base64 `ImageData` for a vision request.
///
/// `detail: "high"` keeps small handwriting legible on GPT-4-class models,
/// which otherwise downscale to a single 512 px tile.
pub fn encode_image(bytes: &[u8], kind: ImageKind) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", kind.mime_type(), b64.len());
    ImageData::new(b64, kind.mime_type()).with_detail("high")
}
