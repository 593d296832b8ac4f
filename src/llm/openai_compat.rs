//! OpenAI-compatible chat completions client

use super::LanguageModel;
use crate::config::LlmConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_completion_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any `/chat/completions` endpoint (Groq, OpenAI, vLLM, Ollama)
pub struct ChatCompletionsModel {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    retries: usize,
}

impl ChatCompletionsModel {
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let endpoint = Url::parse(&base)?
            .join("chat/completions")
            .map_err(|e| Error::Config(format!("Invalid language model URL: {}", e)))?;

        if api_key.is_none() {
            warn!(
                "No API key for {}; sending unauthenticated requests",
                endpoint
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            retries: config.retries,
        })
    }

    async fn send_with_retry(&self, request: reqwest::RequestBuilder) -> Result<ChatResponse> {
        let mut last_err: Option<Error> = None;
        for attempt in 0..=self.retries {
            let req = request
                .try_clone()
                .ok_or_else(|| Error::Llm("Failed to clone model request".to_string()))?;
            match req.send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(ok) => return Ok(ok.json::<ChatResponse>().await?),
                    Err(e) => last_err = Some(Error::Llm(e.to_string())),
                },
                Err(e) => last_err = Some(Error::Llm(e.to_string())),
            }

            if attempt < self.retries {
                debug!("Model request failed, retrying (attempt {})", attempt + 1);
                tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Llm("Model request failed".to_string())))
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_completion_tokens: self.max_tokens,
            top_p: self.top_p,
            stream: false,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = self.send_with_retry(request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Llm("Model returned no content".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            retries: 1,
            timeout_secs: 5,
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_complete_sends_chat_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "model": "openai/gpt-oss-120b",
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Answer: hi\nCitations: a.pdf, Page 1"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let model = ChatCompletionsModel::new(
            &config(&format!("{}/openai/v1", server.uri())),
            Some("secret".to_string()),
        )
        .unwrap();
        let reply = model.complete("sys", "hello").await.unwrap();
        assert_eq!(reply, "Answer: hi\nCitations: a.pdf, Page 1");
    }

    #[tokio::test]
    async fn test_complete_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let model = ChatCompletionsModel::new(&config(&server.uri()), None).unwrap();
        let err = model.complete("sys", "hello").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[tokio::test]
    async fn test_complete_without_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let model = ChatCompletionsModel::new(&config(&server.uri()), None).unwrap();
        assert!(model.complete("sys", "hello").await.is_err());
    }
}
