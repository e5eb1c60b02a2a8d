pub mod api;
pub mod error;

use crate::cli::ServeArgs;
use crate::llm::chat::ChatClient;
use self::api::{ AppState, TlsPaths };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use log::{ info, warn, error };

pub struct Server {
    addr: String,
    client: Arc<dyn ChatClient>,
    args: ServeArgs,
}

impl Server {
    pub fn new(
        addr: String,
        client: Arc<dyn ChatClient>,
        args: ServeArgs,
    ) -> Self {
        Self {
            addr,
            client,
            args,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()
            .map_err(|e| format!("Invalid server address '{}': {}", self.addr, e))?;
        let tls = self.tls_paths()?;
        let state = AppState { client: self.client.clone() };

        api::start_http_server(addr, state, tls).await
    }

    fn tls_paths(&self) -> Result<Option<TlsPaths>, Box<dyn Error + Send + Sync>> {
        if !self.args.enable_tls {
            if self.args.tls_cert_path.is_some() || self.args.tls_key_path.is_some() {
                warn!("TLS paths given but --enable-tls is not set; serving plain HTTP.");
            }
            info!("TLS not enabled. Running plain HTTP server.");
            return Ok(None);
        }

        match (&self.args.tls_cert_path, &self.args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => {
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    cert_path,
                    key_path
                );
                Ok(Some(TlsPaths {
                    cert_path: cert_path.clone(),
                    key_path: key_path.clone(),
                }))
            }
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                Err("Missing TLS certificate or key path".into())
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                Err("TLS enabled without cert/key".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::groq::GroqChatClient;

    fn serve_args(enable_tls: bool, cert: Option<&str>, key: Option<&str>) -> ServeArgs {
        ServeArgs {
            server_addr: "127.0.0.1:0".into(),
            chat_llm_type: "groq".into(),
            chat_base_url: None,
            chat_api_key: "gsk_test".into(),
            chat_model: None,
            tls_cert_path: cert.map(String::from),
            tls_key_path: key.map(String::from),
            enable_tls,
        }
    }

    fn server(args: ServeArgs) -> Server {
        let client = Arc::new(GroqChatClient::new("gsk_test".into(), None, None).unwrap());
        Server::new(args.server_addr.clone(), client, args)
    }

    #[test]
    fn test_tls_disabled() {
        let s = server(serve_args(false, Some("cert.pem"), None));
        assert!(s.tls_paths().unwrap().is_none());
    }

    #[test]
    fn test_tls_requires_both_paths() {
        let s = server(serve_args(true, Some("cert.pem"), None));
        assert!(s.tls_paths().is_err());

        let s = server(serve_args(true, None, None));
        assert!(s.tls_paths().is_err());
    }

    #[test]
    fn test_tls_paths_passed_through() {
        let s = server(serve_args(true, Some("cert.pem"), Some("key.pem")));
        let tls = s.tls_paths().unwrap().unwrap();
        assert_eq!(tls.cert_path, "cert.pem");
        assert_eq!(tls.key_path, "key.pem");
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let mut args = serve_args(false, None, None);
        args.server_addr = "not-an-address".into();
        let s = server(args);
        assert!(s.run().await.is_err());
    }
}
