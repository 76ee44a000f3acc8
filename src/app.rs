use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use rmcp::transport::SseServer;
use rmcp::transport::sse_server::SseServerConfig;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::middleware::trace::http_trace_layer;
use crate::network::Network;
use crate::service::TradeBotService;

/// Builds the HTTP app: `/health` plus the MCP SSE transport under `/trading`.
pub fn build_app(cancellation_token: CancellationToken, config: Config) -> anyhow::Result<Router> {
    let addr = config.server_uri().parse()?;

    let sse_config = SseServerConfig {
        bind: addr,
        sse_path: "/sse".to_string(),
        post_path: "/message".to_string(),
        ct: cancellation_token,
        sse_keep_alive: Some(Duration::from_secs(15)),
    };

    let (sse_server, sse_router) = SseServer::new(sse_config);

    let config = Arc::new(config);
    for network in Network::ALL {
        let network_config = config.network_config(network);
        tracing::info!(
            "{} (chain {}) via edge router {}",
            network_config.name,
            network_config.chain_id,
            network_config.edge_router
        );
    }

    // One service per MCP session
    sse_server.with_service(move || TradeBotService::new(&config));

    let app = Router::new()
        .route("/health", get(health))
        .nest("/trading", sse_router)
        .layer(http_trace_layer());

    Ok(app)
}

async fn health() -> Json<Value> {
    let networks: Vec<&str> = Network::ALL.iter().map(Network::key).collect();
    Json(json!({ "status": "ok", "networks": networks }))
}
