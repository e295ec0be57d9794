use std::sync::Arc;

use async_trait::async_trait;
use rag_config::Config;
use rag_core::CoreResult;
use rag_providers::{CookieStore, GeminiWebSession};

pub struct WebSessionInput {
    pub prompt: String,
}

/// Reads session cookies from the `GEMINI_SESSION_COOKIES` environment
/// variable. Harvesting those cookies in the first place is a collaborator
/// concern (the desktop shell's own login flow); this only reads them.
struct EnvCookieStore;

#[async_trait]
impl CookieStore for EnvCookieStore {
    async fn cookie_header(&self) -> CoreResult<String> {
        std::env::var("GEMINI_SESSION_COOKIES")
            .map_err(|_| rag_core::CoreError::Auth("GEMINI_SESSION_COOKIES is not set".to_string()))
    }
}

/// Sends a single prompt through the web-session client and prints the
/// extracted response text.
#[derive(Debug, Clone, Copy)]
pub struct WebSessionStrategy;

impl super::CommandStrategy for WebSessionStrategy {
    type Input = WebSessionInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        if !config.web_session.enabled {
            anyhow::bail!("web_session feature is disabled in config; set web_session.enabled = true");
        }

        let session = GeminiWebSession::new("https://gemini.google.com", Arc::new(EnvCookieStore));
        let response = session.send(&input.prompt, |_text| {}).await?;
        println!("{response}");

        Ok(())
    }
}
