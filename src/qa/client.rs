use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::QaBackend;

const SYSTEM_PROMPT: &str = "You answer questions about one team's season. \
The user message holds a CSV table with the columns date (YYYY-MM-DD), opponent, \
venue (Home, Away or Neutral), result (W or L, from the team's side), goals_for and \
goals_against, followed by a question. Answer from the table only and state the \
figures you used.";

const BASE_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 30_000;

/// Client for an OpenAI-compatible chat-completions API.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
}

enum Failure {
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

impl LlmClient {
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(LlmClient {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            max_retries,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_url)
    }

    fn request_body(&self, csv: &str, question: &str) -> Value {
        let prompt = format!("{}\n\nQuestion: {}", csv.trim_end(), question);
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        })
    }

    async fn post(&self, body: &Value) -> std::result::Result<String, Failure> {
        let mut req = self.http.post(self.endpoint()).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Failure::Retryable(anyhow!(e).context("LLM request failed")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let err = anyhow!("LLM API error {}: {}", status, text);
            return Err(if is_retryable(status) {
                Failure::Retryable(err)
            } else {
                Failure::Fatal(err)
            });
        }

        let raw: Value = resp
            .json()
            .await
            .map_err(|e| Failure::Fatal(anyhow!(e).context("Failed to parse LLM response")))?;
        parse_chat_response(&raw).map_err(Failure::Fatal)
    }
}

#[async_trait]
impl QaBackend for LlmClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn ask(&self, csv: &str, question: &str) -> Result<String> {
        let body = self.request_body(csv, question);
        debug!("POST {} ({} chars of CSV)", self.endpoint(), csv.len());

        let mut attempt = 0u32;
        loop {
            match self.post(&body).await {
                Ok(answer) => return Ok(answer),
                Err(Failure::Retryable(e)) if attempt < self.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        "{:#}; retrying in {}ms ({}/{})",
                        e,
                        delay.as_millis(),
                        attempt + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(Failure::Retryable(e)) | Err(Failure::Fatal(e)) => return Err(e),
            }
        }
    }
}

/// Rate limiting and server faults are worth another try; client errors are not.
pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Exponential backoff from 500ms, capped at 30s, plus up to 250ms jitter.
pub fn backoff_delay(attempt: u32) -> Duration {
    let base = BASE_DELAY_MS
        .saturating_mul(1u64 << attempt.min(16))
        .min(MAX_DELAY_MS);
    let jitter = rand::thread_rng().gen_range(0..=250u64);
    Duration::from_millis(base + jitter)
}

/// Pull the first choice's message content out of a chat-completions reply.
pub fn parse_chat_response(raw: &Value) -> Result<String> {
    if let Some(content) = raw["choices"][0]["message"]["content"].as_str() {
        return Ok(content.trim().to_string());
    }
    if let Some(msg) = raw["error"]["message"].as_str() {
        bail!("LLM API returned an error: {}", msg);
    }
    bail!("LLM response has no choices[0].message.content")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_of_first_choice() {
        let raw = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  The record was 10-9.\n" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        });
        assert_eq!(parse_chat_response(&raw).unwrap(), "The record was 10-9.");
    }

    #[test]
    fn error_body_is_surfaced() {
        let raw = json!({ "error": { "message": "model not found" } });
        let err = parse_chat_response(&raw).unwrap_err();
        assert!(err.to_string().contains("model not found"));
        assert!(parse_chat_response(&json!({})).is_err());
    }

    #[test]
    fn retry_classification() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let first = backoff_delay(0).as_millis();
        assert!((500..=750).contains(&first));
        let third = backoff_delay(2).as_millis();
        assert!((2000..=2250).contains(&third));
        let late = backoff_delay(40).as_millis();
        assert!((30_000..=30_250).contains(&late));
    }

    #[test]
    fn request_carries_csv_and_question() {
        let client = LlmClient::new(
            "https://llm.example/v1/",
            Some("k".into()),
            "test-model",
            Duration::from_secs(5),
            0,
        )
        .unwrap();
        assert_eq!(client.endpoint(), "https://llm.example/v1/chat/completions");

        let body = client.request_body("date,opponent\n2024-03-02,Navy\n", "How many games?");
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.starts_with("date,opponent\n2024-03-02,Navy"));
        assert!(user.ends_with("Question: How many games?"));
    }
}
