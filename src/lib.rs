pub mod models;
pub mod server;
pub mod llm;
pub mod cli;
pub mod client;

use cli::{ Args, ChatArgs, Command, ServeArgs };
use client::{ ChatSession, HttpTransport };
use client::render::Renderer;
use client::repl::run_repl;
use llm::{ LlmConfig, LlmType };
use log::{ info, warn };
use server::Server;
use std::error::Error;
use tokio::io::BufReader;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Chat(chat_args) => chat(chat_args).await,
    }
}

pub fn llm_config(args: &ServeArgs) -> Result<LlmConfig, Box<dyn Error + Send + Sync>> {
    let llm_type = args.chat_llm_type.parse::<LlmType>()?;
    let api_key = Some(args.chat_api_key.clone()).filter(|k| !k.trim().is_empty());

    Ok(LlmConfig {
        llm_type,
        api_key,
        completion_model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
    })
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = llm_config(&args)?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat LLM Type: {}", config.llm_type);
    info!("Chat Model: {}", config.completion_model.as_deref().unwrap_or("(provider default)"));
    info!("Chat Base URL: {}", config.base_url.as_deref().unwrap_or("(provider default)"));
    info!("API Key Set: {}", config.api_key.is_some());
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    if config.api_key.is_none() {
        warn!("No API key configured for {}; set GROQ_API_KEY.", config.llm_type);
    }

    let client = llm::chat::new_client(&config)?;
    info!("Completions via {} {} at {}", client.get_llm_type(), client.get_model(), client.get_base_url());
    let server = Server::new(args.server_addr.clone(), client, args);
    server.run().await
}

async fn chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let transport = HttpTransport::new(&args.endpoint);
    info!("Chatting via {}", transport.url());

    let mut session = ChatSession::new();
    let renderer = Renderer::new(!args.plain);
    let stdin = BufReader::new(tokio::io::stdin());

    run_repl(&mut session, &transport, renderer, stdin, tokio::io::stdout()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn serve_args(extra: &[&str]) -> ServeArgs {
        let mut argv = vec!["chatrelay", "serve"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Serve(serve) => serve,
            other => panic!("Expected serve, got {:?}", other),
        }
    }

    #[test]
    fn test_llm_config_from_args() {
        let args = serve_args(&["--chat-llm-type", "openai", "--chat-api-key", "sk-x", "--chat-model", "gpt-4o-mini"]);
        let config = llm_config(&args).unwrap();
        assert_eq!(config.llm_type, LlmType::OpenAI);
        assert_eq!(config.api_key.as_deref(), Some("sk-x"));
        assert_eq!(config.completion_model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_llm_config_rejects_unknown_provider() {
        let args = serve_args(&["--chat-llm-type", "ollama"]);
        assert!(llm_config(&args).is_err());
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let args = serve_args(&["--chat-api-key", "   "]);
        assert!(llm_config(&args).unwrap().api_key.is_none());
    }
}
