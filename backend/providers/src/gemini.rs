use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use heatlens_core::{LlmProvider, LlmRequest, LlmResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` provider with `inlineData` image parts.
pub struct GeminiProvider {
    name: String,
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "gemini".to_string(),
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
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_string()),
        inline_data: None,
    }
}

fn build_body(request: &LlmRequest) -> GenerateRequest {
    let mut parts = vec![text_part(&request.user_prompt)];
    parts.extend(request.images.iter().map(|image| Part {
        text: None,
        inline_data: Some(InlineData {
            mime_type: image.mime_type.clone(),
            data: image.base64.clone(),
        }),
    }));

    GenerateRequest {
        system_instruction: (!request.system_prompt.is_empty()).then(|| Content {
            role: None,
            parts: vec![text_part(&request.system_prompt)],
        }),
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
            response_mime_type: request.json_output.then_some("application/json"),
        },
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
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
            "Sending generateContent request"
        );

        // Key goes in a header so it never shows up in request-error URLs.
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, request.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{} HTTP request failed", self.name))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", self.name, status, error_body);
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", self.name))?;

        let content = generated
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let tokens_used = generated
            .usage_metadata
            .and_then(|u| u.total_token_count)
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
    use axum::{extract::Path, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use heatlens_core::InlineImage;
    use serde_json::{json, Value};

    async fn echo(
        Path(model_action): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("g-key") {
            return (StatusCode::FORBIDDEN, Json(json!({"error": "denied"})));
        }
        let echoed = json!({ "path": model_action, "body": body }).to_string();
        let (head, tail) = echoed.split_at(echoed.len() / 2);
        (
            StatusCode::OK,
            Json(json!({
                "candidates": [{ "content": { "role": "model", "parts": [
                    { "text": head }, { "text": tail }
                ]}}],
                "usageMetadata": { "totalTokenCount": 7 }
            })),
        )
    }

    async fn spawn_stub() -> String {
        let app = Router::new().route("/models/:model_action", post(echo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn sends_inline_data_and_joins_parts() {
        let base = spawn_stub().await;
        let provider = GeminiProvider::new("g-key").with_base_url(base);
        let mut request = LlmRequest::new("gemini-2.0-flash", "analyze")
            .with_system_prompt("be precise")
            .with_image(InlineImage::png("QUJD"));
        request.json_output = true;

        let response = provider.complete(&request).await.unwrap();
        assert_eq!(response.tokens_used, 7);

        let echoed: Value = serde_json::from_str(&response.content).unwrap();
        assert_eq!(echoed["path"], "gemini-2.0-flash:generateContent");
        let body = &echoed["body"];
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be precise");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["data"], "QUJD");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn rejected_key_is_error() {
        let base = spawn_stub().await;
        let provider = GeminiProvider::new("nope").with_base_url(base);
        let err = provider
            .complete(&LlmRequest::new("gemini-2.0-flash", "x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
    }
}
