//! Gateway server
//!
//! Streamable HTTP transport: JSON-RPC requests arrive as POST /mcp and
//! each response is framed as a single SSE event. The core pipeline
//! never streams; this layer only wraps one finished result per call.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::header::CACHE_CONTROL,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::invoker::Invoker;
use crate::protocol::{
    Content, Info, InitializeResult, JsonRpcResponse, PROTOCOL_VERSION, RequestId,
    ServerCapabilities, ToolsCallParams, ToolsCallResult, ToolsCapability, ToolsListResult,
};
use crate::registry::EndpointRegistry;
use crate::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Tool invocation pipeline
    pub invoker: Invoker,
    /// Whether a credential is configured (for /health)
    pub api_configured: bool,
    /// Upstream base URL (for /health)
    pub base_url: String,
    /// Selected upstream generation (for the banner)
    pub version_tag: &'static str,
}

/// CAMARA MCP gateway server
pub struct Gateway {
    config: Config,
    state: Arc<AppState>,
}

impl Gateway {
    /// Build the full pipeline from configuration
    ///
    /// # Errors
    ///
    /// Fails on an invalid endpoint table, rule/table drift, or an HTTP
    /// client that cannot be constructed — all startup-fatal defects.
    pub fn new(config: Config) -> Result<Self> {
        let registry = EndpointRegistry::new()?;
        let catalog = Catalog::new();

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;
        let dispatcher = Dispatcher::new(
            client,
            &config.base_url,
            config.api_key.clone(),
            config.timeout,
        );

        let invoker = Invoker::new(catalog, registry, dispatcher, config.version)?;

        let state = Arc::new(AppState {
            invoker,
            api_configured: config.api_configured(),
            base_url: config.base_url.clone(),
            version_tag: config.version.as_str(),
        });

        Ok(Self { config, state })
    }

    /// Run the gateway until shutdown
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let tool_count = self.state.invoker.tools().len();
        let app = create_router(Arc::clone(&self.state));
        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("CAMARA MCP GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = self.config.server.port, "Listening");
        info!(version = %self.state.version_tag, tools = tool_count, "Serving CAMARA tools");
        info!(
            "  POST http://{}:{}/mcp  (Streamable HTTP)",
            self.config.server.host, self.config.server.port
        );
        if !self.state.api_configured {
            warn!("No API key configured - upstream calls will be rejected");
        }
        info!("============================================================");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Config(format!("Server error: {e}")))?;

        Ok(())
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/mcp", post(mcp_handler))
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Server banner
async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "name": "CAMARA MCP Gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "MCP Streamable HTTP (2025-03-26)",
        "endpoint": "/mcp",
        "tools": state.invoker.tools().len(),
        "camara_version": state.version_tag,
    }))
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "api_configured": state.api_configured,
        "base_url": state.base_url,
    }))
}

/// MCP Streamable HTTP endpoint (POST /mcp)
async fn mcp_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    // A malformed body degrades to an empty request so the method match
    // below answers with a JSON-RPC error instead of a transport 400.
    let request: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));

    let id = parse_id(&request);
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    info!(method = %method, "MCP request");

    let response = match method {
        "initialize" => {
            let result = InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability {}),
                },
                server_info: Info {
                    name: "CAMARA-MCP".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
            };
            rpc_success(id, &result)
        }
        "tools/list" => {
            let result = ToolsListResult {
                tools: state.invoker.tools(),
            };
            rpc_success(id, &result)
        }
        "tools/call" => match parse_call_params(&request) {
            Ok(params) => {
                let outcome = state.invoker.invoke(&params.name, &params.arguments).await;
                let result = ToolsCallResult {
                    content: vec![Content::json(&outcome.to_json())],
                    is_error: !outcome.is_success(),
                };
                rpc_success(id, &result)
            }
            Err(message) => JsonRpcResponse::error(id, -32602, message),
        },
        other => JsonRpcResponse::error(
            id.or(Some(RequestId::Number(0))),
            -32601,
            format!("Method not found: {other}"),
        ),
    };

    sse_response(&response)
}

fn parse_id(request: &Value) -> Option<RequestId> {
    request
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value(id).ok())
}

fn parse_call_params(request: &Value) -> std::result::Result<ToolsCallParams, String> {
    let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {e}"))
}

fn rpc_success<T: serde::Serialize>(id: Option<RequestId>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id.unwrap_or(RequestId::Number(0)), value),
        Err(e) => JsonRpcResponse::error(id, -32603, format!("Serialization error: {e}")),
    }
}

/// Frame one JSON-RPC response as a single-event SSE stream
fn sse_response(response: &JsonRpcResponse) -> Response {
    let payload = serde_json::to_string(response)
        .unwrap_or_else(|_| r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Serialization error"},"id":null}"#.to_string());

    let stream =
        futures::stream::once(async move { Ok::<_, Infallible>(Event::default().data(payload)) });

    let mut response = Sse::new(stream).into_response();
    if let Ok(value) = "no-cache".parse() {
        response.headers_mut().insert(CACHE_CONTROL, value);
    }
    response
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
