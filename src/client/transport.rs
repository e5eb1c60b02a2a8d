use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, StatusCode };
use thiserror::Error;

use crate::models::chat::{ ChatMessage, ChatReply, ChatRequest };

pub const CHAT_ROUTE: &str = "/api/chat";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    Status(StatusCode),
}

/// Carries a conversation to the chat proxy and brings back one reply.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ChatMessage, TransportError>;
}

pub struct HttpTransport {
    http: HttpClient,
    url: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Self {
        Self::with_client(HttpClient::new(), endpoint)
    }

    pub fn with_client(http: HttpClient, endpoint: &str) -> Self {
        Self {
            http,
            url: format!("{}{}", endpoint.trim_end_matches('/'), CHAT_ROUTE),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ChatMessage, TransportError> {
        let request = ChatRequest { messages: messages.to_vec() };
        debug!("POST {} with {} messages", self.url, messages.len());

        let resp = self.http.post(&self.url).json(&request).send().await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status()));
        }

        Ok(resp.json::<ChatReply>().await?.message)
    }
}
