//! Chat-completion client that rewrites text into Singlish.
//!
//! On the free tier the first upstream failure downgrades the client to the paid
//! model for the rest of its lifetime, and the failed text is retried once there.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::ModelTier;

pub const FALLBACK_PREFIX: &str = "Aiyah, cannot translate lah! Got problem:";
pub const REPO_URL: &str = "https://github.com/tengfone/limpeh_says";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TEMPERATURE: f32 = 0.5;
const MAX_TOKENS: u32 = 100;

const SYSTEM_PROMPT: &str = "You are a Singaporean who speaks Singlish fluently. Translate text to authentic \
Singlish using common particles (lah, leh, lor, ah, sia), local expressions, and proper Singlish grammar. \
Keep responses short and natural.";

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: [ApiMessage; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct TranslationClient {
    api_key: String,
    api_url: String,
    primary_model: String,
    /// Only set on the free tier.
    secondary_model: Option<String>,
    downgraded: AtomicBool,
    timeout: Duration,
    http: reqwest::Client,
}

impl TranslationClient {
    pub fn new(api_key: String, api_url: String, tier: ModelTier) -> Self {
        let secondary_model = match tier {
            ModelTier::Free => Some(ModelTier::Paid.model_id().to_string()),
            ModelTier::Paid => None,
        };

        Self {
            api_key,
            api_url,
            primary_model: tier.model_id().to_string(),
            secondary_model,
            downgraded: AtomicBool::new(false),
            timeout: REQUEST_TIMEOUT,
            http: reqwest::Client::new(),
        }
    }

    /// Override the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True once the primary model has failed.
    pub fn is_downgraded(&self) -> bool {
        self.downgraded.load(Ordering::Acquire)
    }

    /// Model the next call will try first.
    pub fn active_model(&self) -> &str {
        match &self.secondary_model {
            Some(secondary) if self.is_downgraded() => secondary,
            _ => &self.primary_model,
        }
    }

    /// Translate `text`, mapping any failure to an in-persona fallback message.
    pub async fn translate(&self, text: &str) -> String {
        match self.try_translate(text).await {
            Ok(translated) => translated,
            Err(e) => format!("{FALLBACK_PREFIX} {e}"),
        }
    }

    /// Translate `text`, retrying once on the secondary model if the primary fails.
    pub async fn try_translate(&self, text: &str) -> Result<String, Error> {
        info!("Received text to translate: {}", preview(text));

        let model = self.active_model();
        let e = match self.complete(model, text).await {
            Ok(translated) => return Ok(translated),
            Err(e) => e,
        };
        error!("Translation with {model} failed: {e}");

        let secondary = match &self.secondary_model {
            Some(secondary) if model == self.primary_model => secondary,
            _ => return Err(e),
        };

        if self
            .downgraded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            warn!("Free model failed, switching to {secondary} for the rest of this session");
        }

        self.complete(secondary, text).await.inspect_err(|e2| {
            error!("Fallback model {secondary} also failed: {e2}");
        })
    }

    async fn complete(&self, model: &str, text: &str) -> Result<String, Error> {
        info!("Using model: {model}");

        let request = ApiRequest {
            model,
            messages: [
                ApiMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ApiMessage {
                    role: "user",
                    content: format!("Convert this to Singlish (keep it short and natural): {text}"),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REPO_URL)
            .header("X-Title", "LimpehSays Telegram Bot")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(Error::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let parsed: ApiResponse = serde_json::from_str(&body).map_err(|e| Error::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(Error::Empty)?;

        let translated = content.trim();
        if translated.is_empty() {
            return Err(Error::Empty);
        }

        info!("Translation: '{}' → '{}'", preview(text), translated);
        Ok(translated.to_string())
    }
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 200;
    if text.chars().count() > MAX_CHARS {
        let truncated: String = text.chars().take(MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Timeout,
    Api { status: u16, body: String },
    Parse(String),
    Empty,
}

impl Error {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Http(e.to_string())
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Timeout => write!(f, "request timed out"),
            Error::Api { status, body } => write!(f, "API error {status}: {body}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FREE: &str = "deepseek/deepseek-chat:free";
    const PAID: &str = "deepseek/deepseek-chat";

    fn client(server: &MockServer, tier: ModelTier) -> TranslationClient {
        TranslationClient::new(
            "test-api-key".to_string(),
            format!("{}/api/v1/chat/completions", server.uri()),
            tier,
        )
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "gen-123",
            "model": PAID,
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_success_sends_request_and_trims() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(header("http-referer", REPO_URL))
            .and(header("x-title", "LimpehSays Telegram Bot"))
            .and(body_partial_json(json!({
                "model": FREE,
                "temperature": 0.5,
                "max_tokens": 100,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": "Convert this to Singlish (keep it short and natural): hello" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Eh hello lah!\n")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, ModelTier::Free);
        assert_eq!(client.translate("hello").await, "Eh hello lah!");
        assert!(!client.is_downgraded());
    }

    #[tokio::test]
    async fn test_primary_failure_downgrades_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "model": FREE })))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "model": PAID })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Wah, hi ah")))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server, ModelTier::Free);
        assert_eq!(client.active_model(), FREE);

        assert_eq!(client.translate("hi").await, "Wah, hi ah");
        assert!(client.is_downgraded());
        assert_eq!(client.active_model(), PAID);

        // Goes straight to the paid model
        assert_eq!(client.translate("hi again").await, "Wah, hi ah");
    }

    #[tokio::test]
    async fn test_both_models_fail_returns_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server, ModelTier::Free);
        let reply = client.translate("hi").await;
        assert!(reply.starts_with(FALLBACK_PREFIX), "got {reply:?}");
        assert!(reply.contains("500"));
        assert!(client.is_downgraded());
    }

    #[tokio::test]
    async fn test_downgraded_failure_does_not_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let client = client(&server, ModelTier::Free);
        client.translate("first").await;
        assert!(client.is_downgraded());

        // One attempt on the secondary, no recursion
        let reply = client.translate("second").await;
        assert!(reply.starts_with(FALLBACK_PREFIX));
        assert!(client.is_downgraded());
    }

    #[tokio::test]
    async fn test_paid_tier_never_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "model": PAID })))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, ModelTier::Paid);
        let result = client.try_translate("hi").await;
        assert!(matches!(result, Err(Error::Api { status: 500, .. })));
        assert!(!client.is_downgraded());
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("too late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = client(&server, ModelTier::Paid).with_timeout(Duration::from_millis(50));
        let result = client.try_translate("hi").await;
        assert!(matches!(result, Err(Error::Timeout)), "got {result:?}");

        let reply = client.translate("hi").await;
        assert!(reply.starts_with(FALLBACK_PREFIX));
    }

    #[tokio::test]
    async fn test_malformed_response_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client(&server, ModelTier::Paid);
        let result = client.try_translate("hi").await;
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_choices_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = client(&server, ModelTier::Paid);
        assert!(matches!(client.try_translate("hi").await, Err(Error::Empty)));
    }

    #[tokio::test]
    async fn test_malformed_primary_response_triggers_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "model": FREE })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "rate limited" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "model": PAID })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok lor")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, ModelTier::Free);
        assert_eq!(client.try_translate("ok").await.unwrap(), "ok lor");
        assert!(client.is_downgraded());
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "x".repeat(300);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 203);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
