//! Optional LLM cleanup pass for low-confidence extractions.

use crate::completion::{CompletionRequest, TextCompleter};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Results at or above this confidence are never sent for cleanup.
pub const ENHANCE_BELOW: f64 = 0.7;
const MIN_CHARS: usize = 100;
const SLICE_CHARS: usize = 3000;
const CONFIDENCE_BUMP: f64 = 0.2;
const CONFIDENCE_CAP: f64 = 0.9;
/// Enough for a cleaned 3000-char slice.
const CLEANUP_MAX_TOKENS: u32 = 4096;

const CLEANUP_INSTRUCTION: &str = "You clean up text extracted from documents. Fix broken words, \
stray symbols, garbled characters and formatting damage caused by the extraction, while preserving \
the original meaning, wording and language. Do not summarize, translate or add commentary. If the \
text already looks fine, return it unchanged. Output ONLY the cleaned text.";

#[derive(Debug, Clone, PartialEq)]
pub struct Enhancement {
    pub text: String,
    pub enhanced: bool,
    pub confidence: f64,
    pub original_confidence: f64,
}

impl Enhancement {
    fn unchanged(text: String, confidence: f64) -> Self {
        Self {
            text,
            enhanced: false,
            confidence,
            original_confidence: confidence,
        }
    }
}

/// Attempt a cleanup pass. Failures and rejected replies keep the input.
pub async fn maybe_enhance(
    text: String,
    confidence: f64,
    file_name: &str,
    completer: Option<&dyn TextCompleter>,
    timeout: Duration,
) -> Enhancement {
    let Some(completer) = completer else {
        return Enhancement::unchanged(text, confidence);
    };
    if confidence >= ENHANCE_BELOW || text.chars().count() <= MIN_CHARS {
        return Enhancement::unchanged(text, confidence);
    }

    let split = text
        .char_indices()
        .nth(SLICE_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let (head, rest) = text.split_at(split);

    let request = CompletionRequest::new(format!("File: {}\n\nExtracted text:\n{}", file_name, head))
        .with_system(CLEANUP_INSTRUCTION)
        .with_temperature(0.1)
        .with_max_tokens(CLEANUP_MAX_TOKENS);

    debug!("Requesting cleanup for {} ({} chars)", file_name, head.chars().count());
    let reply = match tokio::time::timeout(timeout, completer.complete(request)).await {
        Ok(Ok(reply)) => reply.trim().to_string(),
        Ok(Err(e)) => {
            warn!("Enhancement failed for {}: {}", file_name, e);
            return Enhancement::unchanged(text, confidence);
        }
        Err(_) => {
            warn!("Enhancement timed out for {} after {:?}", file_name, timeout);
            return Enhancement::unchanged(text, confidence);
        }
    };

    if !accept(head, &reply) {
        debug!("Enhancement rejected for {}", file_name);
        return Enhancement::unchanged(text, confidence);
    }

    let boosted = (confidence + CONFIDENCE_BUMP).min(CONFIDENCE_CAP);
    info!(
        "Enhanced {}: confidence {:.2} -> {:.2}",
        file_name, confidence, boosted
    );
    Enhancement {
        text: format!("{}{}", reply, rest),
        enhanced: true,
        confidence: boosted,
        original_confidence: confidence,
    }
}

/// A reply must change the slice and keep at least half of its length.
fn accept(original: &str, reply: &str) -> bool {
    reply != original && reply.chars().count() * 2 >= original.chars().count()
}
