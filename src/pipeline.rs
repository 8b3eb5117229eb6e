//! Request-scoped orchestration: resolve, extract, enhance, summarize.

use crate::completion::TextCompleter;
use crate::enhancer;
use crate::extractors::{self, ExtractContext};
use crate::file_types::{extension_of, FileTypeRegistry};
use crate::schema::{format_size, now_iso8601, preview, BatchItem, ParseResponse, ProcessingMetadata, ProcessingStages};
use crate::stats;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Stateless document parser shared by every request.
#[derive(Clone)]
pub struct DocumentParser {
    registry: Arc<FileTypeRegistry>,
    completer: Option<Arc<dyn TextCompleter>>,
    completion_timeout: Duration,
}

impl DocumentParser {
    pub fn new(
        registry: Arc<FileTypeRegistry>,
        completer: Option<Arc<dyn TextCompleter>>,
        completion_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            completer,
            completion_timeout,
        }
    }

    /// Parse one upload. Extraction failures are reported in the response,
    /// never as an error.
    pub async fn parse(&self, upload: Upload) -> ParseResponse {
        let span = info_span!("parse", file = %upload.file_name);
        self.parse_inner(upload).instrument(span).await
    }

    async fn parse_inner(&self, upload: Upload) -> ParseResponse {
        let Upload {
            file_name,
            content_type,
            data,
        } = upload;
        info!("Processing {} ({} bytes, {})", file_name, data.len(), content_type);

        let mut stages = ProcessingStages::start();

        let type_key = self.registry.resolve_type(&file_name, &content_type);
        let kind = self.registry.kind_of(&type_key);
        let category = self
            .registry
            .lookup(&type_key)
            .map(|e| e.category.as_str())
            .unwrap_or("unknown");
        stages.record("File type detection");

        let size = data.len();
        let content_hash = format!("{:x}", Sha256::digest(&data));

        let ctx = ExtractContext {
            completer: self.completer.clone(),
            completion_timeout: self.completion_timeout,
            type_key: type_key.clone(),
            mime: self.registry.mime_for(&type_key),
        };
        let result = extractors::extract(kind, Arc::new(data), &ctx).await;
        stages.record("Content extraction");

        let enhancement = enhancer::maybe_enhance(
            result.text,
            result.confidence,
            &file_name,
            self.completer.as_deref(),
            self.completion_timeout,
        )
        .await;
        if enhancement.enhanced {
            stages.record("AI enhancement");
        }

        let content = enhancement.text;
        let doc_stats = stats::summarize(&content);
        let language = stats::detect_language(&content);
        stages.record("Statistics");

        let processing_time_ms = stages.elapsed_ms();
        info!(
            "Parsed {} as {} via {} (confidence {:.2}, {} words, {}ms)",
            file_name, type_key, result.method, enhancement.confidence, doc_stats.word_count, processing_time_ms
        );

        let metadata = ProcessingMetadata {
            extension: extension_of(&file_name),
            file_name,
            file_type: content_type,
            size,
            size_formatted: format_size(size),
            processed_at: now_iso8601(),
            processing_stages: stages.into_vec(),
            detected_type: type_key,
            category: category.to_string(),
            extraction_method: result.method.to_string(),
            confidence: enhancement.confidence,
            language: language.to_string(),
            processing_time_ms,
            ai_enhanced: enhancement.enhanced.then_some(true),
            original_confidence: enhancement.enhanced.then_some(enhancement.original_confidence),
            extraction_error: result.error,
            content_hash,
            extras: result.extras,
        };

        ParseResponse {
            success: true,
            preview: preview(&content),
            character_count: content.chars().count(),
            word_count: doc_stats.word_count,
            structured_data: result.structured_data,
            metadata,
            stats: doc_stats,
            content,
        }
    }

    /// Parse several uploads with at most `concurrency` in flight. Results
    /// keep the input order.
    pub async fn parse_batch(&self, uploads: Vec<Upload>, concurrency: usize) -> Vec<BatchItem> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let names: Vec<String> = uploads.iter().map(|u| u.file_name.clone()).collect();

        let mut tasks = JoinSet::new();
        for (index, upload) in uploads.into_iter().enumerate() {
            let parser = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, parser.parse(upload).await)
            });
        }

        let mut results: Vec<Option<ParseResponse>> = vec![None; names.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, response)) => results[index] = Some(response),
                Err(e) => error!("Batch task failed: {}", e),
            }
        }

        results
            .into_iter()
            .zip(names)
            .map(|(response, file_name)| match response {
                Some(response) => BatchItem::Parsed(Box::new(response)),
                None => BatchItem::Rejected {
                    file_name,
                    error: "Processing failed unexpectedly".to_string(),
                },
            })
            .collect()
    }
}
