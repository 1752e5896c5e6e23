use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use easel_genai::{GenAiConfig, HttpContentGenerator};
use easel_pipeline::{Coordinator, RegistryConfig, SessionRegistry};
use easel_render::{HttpRenderer, RenderConfig};
use easel_server::ServerConfig;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Easel generation service");

    let genai_url = env_or("EASEL_GENAI_URL", "http://127.0.0.1:8200");
    let api_key = SecretString::from(std::env::var("EASEL_GENAI_API_KEY").unwrap_or_default());
    let mut genai_config = GenAiConfig::new(genai_url, api_key);
    genai_config.timeout = Duration::from_secs(120);
    let generator =
        Arc::new(HttpContentGenerator::new(genai_config).expect("Failed to build generation client"));

    let render_url = env_or("EASEL_RENDER_URL", "http://127.0.0.1:8201");
    let renderer =
        Arc::new(HttpRenderer::new(RenderConfig::new(render_url)).expect("Failed to build render client"));

    let registry = SessionRegistry::new(RegistryConfig::default());
    let coordinator = Arc::new(Coordinator::new(generator, renderer, registry));

    let mut config = ServerConfig::default();
    if let Ok(port) = std::env::var("PORT") {
        match port.parse() {
            Ok(port) => config.port = port,
            Err(_) => tracing::warn!(port = %port, "Ignoring unparseable PORT"),
        }
    }

    let handle = easel_server::start(config, coordinator)
        .await
        .expect("Failed to start server");
    tracing::info!(port = handle.port, "Easel server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
