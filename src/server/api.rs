use crate::llm::chat::ChatClient;
use crate::models::chat::{ ChatMessage, ChatReply };
use super::error::ApiError;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::post,
    Router,
    body::Bytes,
    extract::State,
    Json,
};
use serde_json::Value;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error, debug };

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn ChatClient>,
}

/// TLS material for serving HTTPS; both paths are PEM files.
#[derive(Clone, Debug)]
pub struct TlsPaths {
    pub cert_path: String,
    pub key_path: String,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: SocketAddr,
    state: AppState,
    tls: Option<TlsPaths>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(state);

    if let Some(tls) = tls {
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            &tls.cert_path,
            &tls.key_path
        ).await.map_err(|e| format!("Failed to load TLS certificate/key: {}", e))?;

        info!("Starting HTTPS API server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;

        info!("Starting HTTP API server on: http://{}", addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

/// Pulls the `messages` array out of a request body.
pub fn parse_messages(body: Value) -> Result<Vec<ChatMessage>, ApiError> {
    let messages = match body {
        Value::Object(mut map) => map.remove("messages"),
        _ => None,
    };

    match messages {
        Some(Value::Array(items)) => {
            serde_json::from_value(Value::Array(items))
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid message in array: {}", e)))
        }
        Some(_) | None => Err(ApiError::InvalidRequest("Messages array is required".into())),
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    // The body is read as JSON whatever the Content-Type header says.
    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid JSON body: {}", e)))?;
    let messages = parse_messages(body)?;

    debug!(
        "Forwarding {} messages to {} ({}) at {}",
        messages.len(),
        state.client.get_llm_type(),
        state.client.get_model(),
        state.client.get_base_url()
    );

    match state.client.complete(&messages).await {
        Ok(message) => Ok(Json(ChatReply { message })),
        Err(e) => {
            error!("Chat API error: {}", e);
            Err(ApiError::Upstream(e))
        }
    }
}
