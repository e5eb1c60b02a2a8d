pub mod groq;
pub mod openai;

use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, StatusCode, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::sync::Arc;
use thiserror::Error;
use super::{ LlmConfig, LlmType, MAX_TOKENS, TEMPERATURE };
use self::groq::GroqChatClient;
use self::openai::OpenAIChatClient;
use crate::models::chat::{ ChatMessage, Role };

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0} API key is required")]
    MissingApiKey(LlmType),

    #[error("Invalid API key format: {0}")]
    InvalidApiKey(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Request to completion provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion provider returned {status}: {body}")]
    Status {
        status: StatusCode,
        body: String,
    },

    #[error("No response from completion provider")]
    EmptyCompletion,
}

/// A hosted chat-completion backend. Implementations are stateless across
/// calls: the full conversation is passed in every time.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ChatError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> String;
    fn get_llm_type(&self) -> LlmType;
}

#[derive(Serialize, Debug)]
pub(crate) struct CompletionRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(messages: &'a [ChatMessage], model: &'a str) -> Self {
        Self {
            messages,
            model,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: false,
        }
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Deserialize, Debug)]
pub(crate) struct CompletionMessage {
    pub role: Role,
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Takes the first choice. A choice without text counts as no completion.
    pub fn into_reply(self) -> Result<ChatMessage, ChatError> {
        let message = self.choices
            .into_iter()
            .next()
            .ok_or(ChatError::EmptyCompletion)?
            .message;

        match message.content {
            Some(content) if !content.trim().is_empty() => Ok(ChatMessage::new(message.role, content)),
            _ => Err(ChatError::EmptyCompletion),
        }
    }
}

pub(crate) fn build_http_client(api_key: &str) -> Result<HttpClient, ChatError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", api_key))?);

    Ok(HttpClient::builder().default_headers(headers).build()?)
}

/// Posts an OpenAI-compatible chat completion and waits for the whole reply.
pub(crate) async fn post_completion(
    http: &HttpClient,
    url: &str,
    request: &CompletionRequest<'_>
) -> Result<ChatMessage, ChatError> {
    debug!("POST {} ({} messages, model {})", url, request.messages.len(), request.model);

    let resp = http.post(url).json(request).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ChatError::Status { status, body });
    }

    resp.json::<CompletionResponse>().await?.into_reply()
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, ChatError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Groq => {
            let specific_client = GroqChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}
