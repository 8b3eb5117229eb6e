//! docparse - document text extraction server.

mod completion;
mod config;
mod enhancer;
mod error;
mod extractors;
mod file_types;
mod ooxml;
mod pipeline;
mod schema;
mod server;
mod slides;
mod stats;

use completion::{OpenRouterClient, TextCompleter};
use config::AppConfig;
use file_types::FileTypeRegistry;
use pipeline::DocumentParser;
use server::{AppState, UploadLimits};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "docparse=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    info!(
        "Max upload {} bytes, batch concurrency {}, completion timeout {}s",
        config.max_file_size_bytes, config.batch_concurrency, config.completion_timeout_secs
    );

    let completer: Option<Arc<dyn TextCompleter>> = match OpenRouterClient::from_config(&config)? {
        Some(client) => {
            info!("OpenRouter client initialized (model: {})", client.model());
            Some(Arc::new(client))
        }
        None => {
            info!("OPENROUTER_API_KEY not set; AI enhancement and image OCR disabled");
            None
        }
    };

    let parser = DocumentParser::new(
        Arc::new(FileTypeRegistry::builtin()?),
        completer,
        Duration::from_secs(config.completion_timeout_secs),
    );

    let state = AppState {
        parser: Arc::new(parser),
        limits: UploadLimits {
            max_file_size_bytes: config.max_file_size_bytes,
            batch_concurrency: config.batch_concurrency,
            max_batch_files: config.max_batch_files,
        },
    };
    let app = server::router(state);

    // Run server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
