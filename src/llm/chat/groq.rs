use async_trait::async_trait;
use log::info;
use reqwest::Client as HttpClient;

use super::{ build_http_client, post_completion, ChatClient, ChatError, CompletionRequest };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::ChatMessage;

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com";
const COMPLETIONS_ROUTE: &str = "/openai/v1/chat/completions";

pub struct GroqChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

impl GroqChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ChatError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = build_http_client(&api_key)?;

        info!("Groq client ready (model {}, base {})", chat_model, api_url);

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ChatError::MissingApiKey(LlmType::Groq))?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
        )
    }

    fn completions_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), COMPLETIONS_ROUTE)
    }
}

#[async_trait]
impl ChatClient for GroqChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatMessage, ChatError> {
        let req = CompletionRequest::new(messages, &self.model);
        post_completion(&self.http, &self.completions_url(), &req).await
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone()
    }

    fn get_llm_type(&self) -> LlmType {
        LlmType::Groq
    }
}
