//! LLM client: the single point of entry for completion API calls.
//!
//! No other module talks to the completion service directly.
//! Speaks the OpenAI-compatible `POST {base}/chat/completions` protocol.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod prompts;

/// Output token budget for every call.
pub const MAX_TOKENS: u32 = 700;
/// One initial attempt plus a single retry.
const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unavailable after {attempts} attempts: {reason}")]
    Unavailable { attempts: u32, reason: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl LlmResponse {
    /// Text of the first choice, if the model produced any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Wraps the completion API with a per-attempt timeout, one bounded retry
/// and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    backoff: Duration,
}

impl LlmClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
        backoff: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
            backoff,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Self::new(
            &config.openai_base_url,
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.llm_timeout,
            config.llm_retry_backoff,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a raw call to the completion API, returning the full response object.
    /// Timeouts, connection failures, 429 and 5xx are retried once after the backoff delay.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut last_failure = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                warn!(
                    "LLM call attempt {} failed ({}), retrying after {}ms...",
                    attempt,
                    last_failure,
                    self.backoff.as_millis()
                );
                tokio::time::sleep(self.backoff).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    last_failure = "request timed out".to_string();
                    continue;
                }
                Err(e) if e.is_connect() || e.is_request() => {
                    last_failure = format!("transport error: {e}");
                    continue;
                }
                Err(e) => return Err(LlmError::Client(e)),
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_failure = format!("status {}", status.as_u16());
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            let llm_response: LlmResponse = serde_json::from_str(&body)?;

            if let Some(usage) = &llm_response.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(llm_response);
        }

        Err(LlmError::Unavailable {
            attempts: MAX_ATTEMPTS,
            reason: last_failure,
        })
    }

    /// Calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
/// The language tag is matched case-insensitively.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    let rest = rest.trim_start();
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_tag_is_case_insensitive() {
        let input = "```JSON\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
        let input = "```Json {\"key\": 1}```";
        assert_eq!(strip_json_fences(input), "{\"key\": 1}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "  {\"key\": \"value\"}\n";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_response_text_skips_blank_content() {
        let response: LlmResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": "  "}}]})).unwrap();
        assert!(response.text().is_none());
    }

    /// Scripted upstream: replies with `statuses[n]` on the n-th call, then 200s.
    #[derive(Clone)]
    struct Upstream {
        calls: Arc<AtomicUsize>,
        statuses: Arc<Vec<u16>>,
        delay: Duration,
    }

    async fn fake_completion(State(upstream): State<Upstream>) -> (StatusCode, Json<Value>) {
        let n = upstream.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(upstream.delay).await;
        let status = upstream.statuses.get(n).copied().unwrap_or(200);
        if status == 200 {
            (
                StatusCode::OK,
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "```json\n{\"ok\": true}\n```"}}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 5}
                })),
            )
        } else {
            (
                StatusCode::from_u16(status).unwrap(),
                Json(json!({"error": {"message": format!("scripted {status}")}})),
            )
        }
    }

    async fn spawn_upstream(statuses: Vec<u16>, delay: Duration) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let upstream = Upstream {
            calls: calls.clone(),
            statuses: Arc::new(statuses),
            delay,
        };
        let app = Router::new()
            .route("/v1/chat/completions", post(fake_completion))
            .with_state(upstream);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1"), calls)
    }

    fn client(base_url: &str, timeout: Duration) -> LlmClient {
        LlmClient::new(
            base_url,
            "test-key".to_string(),
            "test-model".to_string(),
            timeout,
            Duration::from_millis(10),
        )
        .unwrap()
    }

    #[derive(Debug, Deserialize)]
    struct Flag {
        ok: bool,
    }

    #[tokio::test]
    async fn test_call_json_parses_fenced_reply() {
        let (base, calls) = spawn_upstream(vec![], Duration::ZERO).await;
        let parsed: Flag = client(&base, Duration::from_secs(5))
            .call_json("prompt", "system")
            .await
            .unwrap();
        assert!(parsed.ok);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_once() {
        let (base, calls) = spawn_upstream(vec![500], Duration::ZERO).await;
        let parsed: Flag = client(&base, Duration::from_secs(5))
            .call_json("prompt", "system")
            .await
            .unwrap();
        assert!(parsed.ok);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_exhausts_to_unavailable() {
        let (base, calls) = spawn_upstream(vec![429, 429, 429], Duration::ZERO).await;
        let err = client(&base, Duration::from_secs(5))
            .call("prompt", "system")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Unavailable { attempts: 2, .. }), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let (base, calls) = spawn_upstream(vec![401], Duration::ZERO).await;
        let err = client(&base, Duration::from_secs(5))
            .call("prompt", "system")
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "scripted 401");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out_then_gives_up() {
        let (base, calls) = spawn_upstream(vec![], Duration::from_millis(500)).await;
        let err = client(&base, Duration::from_millis(100))
            .call("prompt", "system")
            .await
            .unwrap_err();
        match err {
            LlmError::Unavailable { attempts, reason } => {
                assert_eq!(attempts, 2);
                assert!(reason.contains("timed out"), "{reason}");
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
