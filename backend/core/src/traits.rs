use anyhow::Result;
use async_trait::async_trait;

/// Trait for LLM providers used by the analyzer and the synthesis stages.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// Send a completion request and return the response text.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// An image attached to a request, already transport-encoded.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub base64: String,
}

impl InlineImage {
    pub fn png(base64: impl Into<String>) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            base64: base64.into(),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub images: Vec<InlineImage>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the provider for a JSON object response where it supports one.
    pub json_output: bool,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: String::new(),
            user_prompt: user_prompt.into(),
            images: Vec::new(),
            max_tokens: 4096,
            temperature: 0.2,
            json_output: false,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.images.push(image);
        self
    }
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
