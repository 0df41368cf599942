// Generative-text client for farming advice
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::ClientError;
use crate::prompt::frame_advice_prompt;

pub const FALLBACK_ADVICE: &str =
    "Sorry, I encountered an error while processing your request. Please try again later.";

/// Outcome of an advice request. Failures never escape the client as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advice {
    Answer(String),
    Unavailable,
}

impl Advice {
    pub fn text(&self) -> &str {
        match self {
            Advice::Answer(text) => text,
            Advice::Unavailable => FALLBACK_ADVICE,
        }
    }
}

#[async_trait]
pub trait AdviceClient: Send + Sync {
    async fn get_farming_advice(&self, query: &str) -> Advice;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ClientError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let req = GenerateRequest {
            contents: [Content { role: "user", parts: [Part { text: prompt }] }],
        };
        let res = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(ClientError::status(status, &body));
        }
        let out: GenerateResponse = serde_json::from_str(&body)?;
        out.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or(ClientError::EmptyCompletion)
    }
}

#[async_trait]
impl AdviceClient for GeminiClient {
    async fn get_farming_advice(&self, query: &str) -> Advice {
        debug!(model = %self.model, "requesting farming advice");
        match self.generate(&frame_advice_prompt(query)).await {
            Ok(text) => Advice::Answer(text),
            Err(e) => {
                error!(error = %e, "error getting farming advice");
                Advice::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key", "gemini-test", &server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn returns_first_candidate_text_verbatim() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .header("x-goog-api-key", "test-key")
                    .json_body(json!({
                        "contents": [{
                            "role": "user",
                            "parts": [{ "text": frame_advice_prompt("How deep to plant garlic?") }]
                        }]
                    }));
                then.status(200).json_body(json!({
                    "candidates": [
                        { "content": { "parts": [{ "text": "## Depth\nPlant cloves 5 cm deep." }] } },
                        { "content": { "parts": [{ "text": "ignored" }] } }
                    ]
                }));
            })
            .await;

        let advice = client(&server).get_farming_advice("How deep to plant garlic?").await;
        assert_eq!(advice, Advice::Answer("## Depth\nPlant cloves 5 cm deep.".into()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_becomes_fallback() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(403).body("{\"error\":{\"message\":\"API key not valid\"}}");
            })
            .await;

        let advice = client(&server).get_farming_advice("anything").await;
        assert_eq!(advice, Advice::Unavailable);
        assert_eq!(advice.text(), FALLBACK_ADVICE);
    }

    #[tokio::test]
    async fn status_error_carries_body() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(500).body("backend exploded");
            })
            .await;

        let err = client(&server).generate("p").await.unwrap_err();
        assert!(matches!(err, ClientError::Status { ref body, .. } if body == "backend exploded"));
    }

    #[tokio::test]
    async fn response_without_candidates_is_empty_completion() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
            })
            .await;

        let err = client(&server).generate("p").await.unwrap_err();
        assert!(matches!(err, ClientError::EmptyCompletion));
    }

    #[tokio::test]
    async fn unreachable_endpoint_becomes_fallback() {
        let client = GeminiClient::new("k", "m", "http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert_eq!(client.get_farming_advice("q").await, Advice::Unavailable);
    }
}
