mod catalog;
mod config;
mod engine;
mod error;
mod explain;
mod index;
mod model;
mod scorer;
mod server;
mod service;
#[cfg(test)]
mod testing;
mod validation;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use diag_common::openai::{OpenAiClient, OpenAiClientConfig};
use explain::Explainer;
use server::CarDiagnosticsServer;
use service::DiagnosticService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr (stdout is reserved for MCP JSON-RPC)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting car-diagnostics MCP server");

    // 1. Load config from environment
    let config = Config::from_env()?;
    info!(
        symptoms = %config.symptoms_path.display(),
        rules = %config.rules_path.display(),
        embedding_model = config.embedding_model.name(),
        explanations = config.explain_model.is_some(),
        "configuration loaded"
    );

    // 2. Catalog, embedding model and symptom index
    let service = Arc::new(DiagnosticService::bootstrap(&config).await?);

    // 3. Optional explanation backend
    let explainer = Explainer::from_model(config.explain_model.clone(), || {
        OpenAiClient::new(OpenAiClientConfig::from_env())
    })?;
    if let Explainer::Llm { client, model } = &explainer {
        info!(model = %model, base_url = %client.config().base_url, "explanations enabled");
    } else {
        info!("explanations disabled");
    }

    // 4. Build MCP server and serve
    let server = CarDiagnosticsServer::new(
        service,
        Arc::new(explainer),
        config.limits.clone(),
        config.search_top_k,
    );

    if let Some(addr) = config.tcp_listen_addr.as_deref() {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
