use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use heatlens_core::{LlmProvider, LlmRequest, LlmResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions provider.
///
/// Works against OpenAI itself, OpenRouter and local gateways that speak the
/// same `/chat/completions` dialect; images travel as `image_url` data URIs.
pub struct OpenAiProvider {
    name: String,
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "openai".to_string(),
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

fn build_body(request: &LlmRequest) -> ChatRequest {
    let mut messages = Vec::new();
    if !request.system_prompt.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: MessageContent::Text(request.system_prompt.clone()),
        });
    }

    let content = if request.images.is_empty() {
        MessageContent::Text(request.user_prompt.clone())
    } else {
        let mut parts = vec![ContentPart::Text {
            text: request.user_prompt.clone(),
        }];
        parts.extend(request.images.iter().map(|image| ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.data_uri(),
            },
        }));
        MessageContent::Parts(parts)
    };
    messages.push(ChatMessage {
        role: "user",
        content,
    });

    ChatRequest {
        model: request.model.clone(),
        messages,
        max_tokens: Some(request.max_tokens),
        temperature: Some(request.temperature),
        response_format: request.json_output.then_some(ResponseFormat {
            kind: "json_object",
        }),
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let start = Instant::now();
        let body = build_body(request);

        debug!(
            provider = %self.name,
            model = %request.model,
            images = request.images.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{} HTTP request failed", self.name))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", self.name, status, error_body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", self.name))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let tokens_used = chat_response
            .usage
            .and_then(|u| u.total_tokens)
            .unwrap_or(0);

        Ok(LlmResponse {
            content,
            provider: self.name.clone(),
            model: request.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use heatlens_core::InlineImage;
    use serde_json::{json, Value};

    /// Echoes the received request body back as the completion text.
    async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer test-key");
        if !authorized {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
        }
        (
            StatusCode::OK,
            Json(json!({
                "choices": [{ "message": { "content": body.to_string() } }],
                "usage": { "total_tokens": 42 }
            })),
        )
    }

    async fn spawn_stub() -> String {
        let app = Router::new().route("/chat/completions", post(echo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn sends_image_parts_and_json_mode() {
        let base = spawn_stub().await;
        let provider = OpenAiProvider::new("test-key").with_base_url(format!("{base}/"));
        let mut request = LlmRequest::new("gpt-4o", "describe")
            .with_system_prompt("you are a UX analyst")
            .with_image(InlineImage::png("AAAA"));
        request.json_output = true;

        let response = provider.complete(&request).await.unwrap();
        assert_eq!(response.tokens_used, 42);
        assert_eq!(response.provider, "openai");

        let sent: Value = serde_json::from_str(&response.content).unwrap();
        assert_eq!(sent["model"], "gpt-4o");
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][1]["content"][0]["type"], "text");
        assert_eq!(
            sent["messages"][1]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
        assert_eq!(sent["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn text_only_request_uses_plain_content() {
        let base = spawn_stub().await;
        let provider = OpenAiProvider::new("test-key").with_base_url(base);
        let response = provider
            .complete(&LlmRequest::new("gpt-4o", "hello"))
            .await
            .unwrap();
        let sent: Value = serde_json::from_str(&response.content).unwrap();
        assert_eq!(sent["messages"][0]["content"], "hello");
        assert!(sent.get("response_format").is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let base = spawn_stub().await;
        let provider = OpenAiProvider::new("wrong").with_base_url(base);
        let err = provider
            .complete(&LlmRequest::new("gpt-4o", "hello"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
