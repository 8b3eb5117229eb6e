//! Image OCR through the completion capability.

use super::{failure_for, ExtractContext, ExtractionResult, Extras};
use crate::completion::{CompletionRequest, ImageAttachment};
use crate::error::ExtractError;
use crate::file_types::DocumentKind;
use std::io::Cursor;
use tracing::{debug, warn};

const OCR_INSTRUCTION: &str = "Extract ALL text from this image. Preserve the original formatting, \
line breaks and reading order as closely as possible, including text in tables, captions and labels. \
Output ONLY the extracted text, with no commentary or description of the image.";

/// Trimmed OCR output longer than this is trusted more.
const CONFIDENT_CHARS: usize = 50;
const OCR_MAX_TOKENS: u32 = 4096;

pub async fn extract(data: &[u8], ctx: &ExtractContext) -> ExtractionResult {
    let Some(completer) = ctx.completer.as_ref() else {
        return ExtractionResult::failed(
            "ocr-unavailable",
            "Image text extraction requires an AI vision service, which is not configured. \
             Set OPENROUTER_API_KEY to enable OCR for images.",
            None,
        );
    };

    let dimensions = image_dimensions(data);
    let request = CompletionRequest::new(OCR_INSTRUCTION)
        .with_image(ImageAttachment {
            mime: ctx.mime.unwrap_or("image/png").to_string(),
            data: data.to_vec(),
        })
        .with_temperature(0.0)
        .with_max_tokens(OCR_MAX_TOKENS);

    let outcome = tokio::time::timeout(ctx.completion_timeout, completer.complete(request))
        .await
        .map_err(|_| ExtractError::Timeout(ctx.completion_timeout))
        .and_then(|r| r.map_err(ExtractError::from));

    match outcome {
        Ok(text) => {
            let text = text.trim().to_string();
            let confidence = if text.chars().count() > CONFIDENT_CHARS { 0.85 } else { 0.5 };
            debug!("OCR returned {} chars", text.chars().count());

            let extras = Extras {
                image_width: dimensions.map(|(w, _)| w),
                image_height: dimensions.map(|(_, h)| h),
                ..Default::default()
            };
            ExtractionResult::new(text, confidence, "ai-vision-ocr").with_extras(extras)
        }
        Err(e) => {
            warn!("Image OCR failed: {}", e);
            failure_for(DocumentKind::Image, e.to_string())
        }
    }
}

/// Width and height when the image header is decodable.
pub fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
