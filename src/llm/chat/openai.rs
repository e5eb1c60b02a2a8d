use async_trait::async_trait;
use log::info;
use reqwest::Client as HttpClient;

use super::{ build_http_client, post_completion, ChatClient, ChatError, CompletionRequest };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::ChatMessage;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ChatError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = build_http_client(&api_key)?;

        info!("OpenAI client ready (model {}, base {})", chat_model, api_url);

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
            .ok_or(ChatError::MissingApiKey(LlmType::OpenAI))?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
        )
    }

    // Accepts either the bare host or a full completions URL.
    fn completions_url(&self) -> String {
        if self.base_url.ends_with("/chat/completions") {
            self.base_url.clone()
        } else {
            format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
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
        LlmType::OpenAI
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        let client = OpenAIChatClient::new("sk".into(), None, None).unwrap();
        assert_eq!(client.completions_url(), "https://api.openai.com/v1/chat/completions");

        let client = OpenAIChatClient::new(
            "sk".into(),
            None,
            Some("http://localhost:8080/v1/chat/completions".into()),
        ).unwrap();
        assert_eq!(client.completions_url(), "http://localhost:8080/v1/chat/completions");
    }
}
