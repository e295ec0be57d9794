//! Gemini-class web-session client: authenticates with harvested cookies
//! rather than an API key, caches a short-lived CSRF-style token, and posts
//! through the same nested-array wire format `parser` decodes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rag_core::{CoreError, CoreResult};
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::warn;

use crate::parser::parse_response_text;

const TOKEN_TTL: Duration = Duration::from_secs(25 * 60);
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Collaborator-supplied cookie jar. The OAuth dance that produces the
/// session cookies is out of scope here; this client only reads them.
#[async_trait]
pub trait CookieStore: Send + Sync {
    async fn cookie_header(&self) -> CoreResult<String>;

    /// Authenticated iff both `PSID` and `PSIDTS` are present in the
    /// header `cookie_header` returns. Implementations with a richer view
    /// of the jar than a flat header string may override this directly.
    async fn is_authenticated(&self) -> CoreResult<bool> {
        let header = self.cookie_header().await?;
        Ok(has_cookie(&header, "PSID") && has_cookie(&header, "PSIDTS"))
    }
}

/// Looks for `name=` as a distinct cookie pair in a `Cookie:` header,
/// matching on the segment between `;` separators rather than a raw
/// substring search (so `PSID` doesn't false-match inside `PSIDTS`).
fn has_cookie(header: &str, name: &str) -> bool {
    header
        .split(';')
        .map(str::trim)
        .any(|pair| pair.split_once('=').is_some_and(|(k, _)| k == name))
}

struct TokenCacheEntry {
    token: String,
    fetched_at: Instant,
}

impl TokenCacheEntry {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < TOKEN_TTL
    }
}

pub struct GeminiWebSession {
    base_url: String,
    http: Client,
    cookies: std::sync::Arc<dyn CookieStore>,
    token_cache: RwLock<Option<TokenCacheEntry>>,
}

impl GeminiWebSession {
    #[must_use]
    pub fn new(base_url: impl Into<String>, cookies: std::sync::Arc<dyn CookieStore>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
            cookies,
            token_cache: RwLock::new(None),
        }
    }

    /// Returns the cached CSRF-style token if it is still within its TTL,
    /// otherwise fetches a fresh one and caches it. Guarded so a fresh read
    /// under the read lock avoids taking the write lock on the common path.
    async fn csrf_token(&self) -> CoreResult<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(entry) = cache.as_ref() {
                if entry.is_fresh() {
                    return Ok(entry.token.clone());
                }
            }
        }

        let token = self.fetch_token().await?;

        let mut cache = self.token_cache.write().await;
        *cache = Some(TokenCacheEntry { token: token.clone(), fetched_at: Instant::now() });
        Ok(token)
    }

    async fn fetch_token(&self) -> CoreResult<String> {
        let cookie_header = self.cookies.cookie_header().await?;

        let response = self
            .http
            .get(&self.base_url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::COOKIE, cookie_header)
            .send()
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;

        extract_token(&body)
    }

    async fn clear_token_cache(&self) {
        let mut cache = self.token_cache.write().await;
        *cache = None;
    }

    /// `true` iff the underlying cookie jar carries both `PSID` and
    /// `PSIDTS`. `send` requires this before attempting the token fetch.
    pub async fn is_authenticated(&self) -> CoreResult<bool> {
        self.cookies.is_authenticated().await
    }

    /// Sends `prompt` through the web session and returns the extracted
    /// response text. `on_chunk` is invoked once with the full text (this
    /// transport is not actually streaming; the callback shape matches the
    /// streaming-capable interface collaborators expect).
    pub async fn send<F>(&self, prompt: &str, on_chunk: F) -> CoreResult<String>
    where
        F: FnOnce(&str),
    {
        if !self.is_authenticated().await? {
            return Err(CoreError::Auth("session cookies are missing PSID or PSIDTS".to_string()));
        }

        let token = self.csrf_token().await?;
        let cookie_header = self.cookies.cookie_header().await?;

        let response = self
            .http
            .post(format!("{}/_/BardChatUi/data/assistant.lamda.BardFrontendService/StreamGenerate", self.base_url))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::COOKIE, cookie_header)
            .query(&[("at", token.as_str())])
            .form(&[("f.req", build_request_payload(prompt))])
            .send()
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            self.clear_token_cache().await;
            return Err(CoreError::Auth(format!("web session rejected credentials (status {status})")));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CoreError::RateLimit);
        }

        if status.is_server_error() {
            return Err(CoreError::Unavailable(format!("web session upstream error (status {status})")));
        }

        if !status.is_success() {
            return Err(CoreError::Unavailable(format!("unexpected web session status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;

        let text = parse_response_text(&body)?;
        on_chunk(&text);
        Ok(text)
    }
}

fn build_request_payload(prompt: &str) -> String {
    serde_json::json!([[prompt]]).to_string()
}

/// Looks for a `SNlM0e` token assignment in the page body, the way the
/// browser-side script reads it out of an inline `<script>` tag.
fn extract_token(body: &str) -> CoreResult<String> {
    const MARKER: &str = "\"SNlM0e\":\"";
    let start = body
        .find(MARKER)
        .ok_or_else(|| CoreError::Auth("could not locate csrf token in session page".to_string()))?
        + MARKER.len();
    let end = body[start..]
        .find('"')
        .ok_or_else(|| CoreError::Auth("malformed csrf token field".to_string()))?;
    Ok(body[start..start + end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeCookies;

    #[async_trait]
    impl CookieStore for FakeCookies {
        async fn cookie_header(&self) -> CoreResult<String> {
            Ok("SID=fake; PSID=fake; PSIDTS=fake".to_string())
        }
    }

    struct MissingPsidtsCookies;

    #[async_trait]
    impl CookieStore for MissingPsidtsCookies {
        async fn cookie_header(&self) -> CoreResult<String> {
            Ok("SID=fake; PSID=fake".to_string())
        }
    }

    #[test]
    fn has_cookie_matches_exact_name_only() {
        let header = "SID=fake; PSID=fake; PSIDTS=fake";
        assert!(has_cookie(header, "PSID"));
        assert!(has_cookie(header, "PSIDTS"));
        assert!(!has_cookie(header, "PSIDTX"));
    }

    #[tokio::test]
    async fn is_authenticated_true_when_both_cookies_present() {
        let session = GeminiWebSession::new("https://example.test", Arc::new(FakeCookies));
        assert!(session.is_authenticated().await.expect("no error"));
    }

    #[tokio::test]
    async fn is_authenticated_false_when_psidts_missing() {
        let session = GeminiWebSession::new("https://example.test", Arc::new(MissingPsidtsCookies));
        assert!(!session.is_authenticated().await.expect("no error"));
    }

    #[tokio::test]
    async fn send_fails_fast_with_auth_error_when_not_authenticated() {
        let session = GeminiWebSession::new("https://example.test", Arc::new(MissingPsidtsCookies));
        let result = session.send("hello", |_| {}).await;
        assert!(matches!(result, Err(CoreError::Auth(_))));
    }

    #[test]
    fn extracts_token_from_inline_script() {
        let body = r#"<script>window.WIZ_global_data = {"SNlM0e":"AF1234token"};</script>"#;
        assert_eq!(extract_token(body).expect("token"), "AF1234token");
    }

    #[test]
    fn missing_token_is_auth_error() {
        let result = extract_token("<html>no token here</html>");
        assert!(matches!(result, Err(CoreError::Auth(_))));
    }

    #[tokio::test]
    async fn token_cache_entry_expires_after_ttl() {
        let entry = TokenCacheEntry {
            token: "t".to_string(),
            fetched_at: Instant::now() - Duration::from_secs(26 * 60),
        };
        assert!(!entry.is_fresh());
    }

    #[tokio::test]
    async fn token_cache_entry_is_fresh_within_ttl() {
        let entry = TokenCacheEntry {
            token: "t".to_string(),
            fetched_at: Instant::now(),
        };
        assert!(entry.is_fresh());
    }

    #[tokio::test]
    async fn clearing_cache_forces_next_read_to_miss() {
        let session = GeminiWebSession::new("https://example.test", Arc::new(FakeCookies));
        {
            let mut cache = session.token_cache.write().await;
            *cache = Some(TokenCacheEntry { token: "cached".to_string(), fetched_at: Instant::now() });
        }
        session.clear_token_cache().await;
        let cache = session.token_cache.read().await;
        assert!(cache.is_none());
    }

    // Exercises that a counting cookie store is only consulted once per
    // cache hit, matching the "no second GET within the TTL" property.
    struct CountingCookies {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CookieStore for CountingCookies {
        async fn cookie_header(&self) -> CoreResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("SID=fake".to_string())
        }
    }

    #[tokio::test]
    async fn cached_token_skips_cookie_lookup_on_hit() {
        let cookies = Arc::new(CountingCookies { calls: AtomicUsize::new(0) });
        let session = GeminiWebSession::new("https://example.test", cookies.clone());
        {
            let mut cache = session.token_cache.write().await;
            *cache = Some(TokenCacheEntry { token: "cached".to_string(), fetched_at: Instant::now() });
        }
        let token = session.csrf_token().await.expect("cached token");
        assert_eq!(token, "cached");
        assert_eq!(cookies.calls.load(Ordering::SeqCst), 0);
    }
}
