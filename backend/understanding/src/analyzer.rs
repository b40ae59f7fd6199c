//! Vision analysis of one combined image.

use std::sync::Arc;

use anyhow::Result;
use heatlens_config::{HeatlensConfig, Stage, StageSettings};
use heatlens_core::{
    HeatlensError, InlineImage, LlmProvider, LlmRequest, PerImageReport, RetryPolicy, retry_async,
};
use heatlens_logging::redact_sensitive_data;
use heatlens_media::CombinedImage;
use heatlens_providers::ProviderRegistry;
use tracing::{debug, info};

use crate::parse::parse_analysis;
use crate::prompt::{ANALYZER_SYSTEM_PROMPT, ANALYZER_USER_PROMPT};

/// Model parameters for the analyzer call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Reject replies that are not a JSON report.
    pub require_structured: bool,
}

impl From<StageSettings> for AnalyzerSettings {
    fn from(stage: StageSettings) -> Self {
        Self {
            model: stage.model,
            max_tokens: stage.max_tokens,
            temperature: stage.temperature,
            require_structured: stage.require_structured,
        }
    }
}

/// Sends combined images to a vision-capable LLM.
pub struct ImageAnalyzer {
    provider: Arc<dyn LlmProvider>,
    settings: AnalyzerSettings,
    retry: RetryPolicy,
}

impl ImageAnalyzer {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: AnalyzerSettings) -> Self {
        Self {
            provider,
            settings,
            retry: RetryPolicy::no_retry(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn from_config(config: &HeatlensConfig, registry: &ProviderRegistry) -> Result<Self> {
        let stage = config.stage(Stage::Analyzer);
        let provider = registry.require(&stage.provider)?;
        Ok(Self::new(provider, stage.into()).with_retry(config.retry_policy()))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn build_request(&self, image: InlineImage) -> LlmRequest {
        let mut request = LlmRequest::new(&self.settings.model, ANALYZER_USER_PROMPT)
            .with_system_prompt(ANALYZER_SYSTEM_PROMPT)
            .with_image(image);
        request.max_tokens = self.settings.max_tokens;
        request.temperature = self.settings.temperature;
        request.json_output = true;
        request
    }

    /// Analyze a combined image. Transport failures and unusable replies
    /// both surface as [`HeatlensError::ExternalService`].
    pub async fn analyze(&self, image: &CombinedImage) -> Result<PerImageReport, HeatlensError> {
        let inline = image.to_inline_png()?;
        self.analyze_inline(inline).await
    }

    pub async fn analyze_inline(
        &self,
        image: InlineImage,
    ) -> Result<PerImageReport, HeatlensError> {
        let request = self.build_request(image);
        let provider = &self.provider;
        let request = &request;
        let service = self.provider.name();
        let require_structured = self.settings.require_structured;

        let report = retry_async(&self.retry, "analyzer", || async move {
            let response = provider.complete(request).await.map_err(|e| {
                HeatlensError::external(service, redact_sensitive_data(&format!("{e:#}")))
            })?;
            debug!(
                provider = %response.provider,
                tokens = response.tokens_used,
                latency_ms = response.latency_ms,
                "Analyzer reply received"
            );
            parse_analysis(&response.content, require_structured)
                .map_err(|e| HeatlensError::external(service, format!("malformed response: {e}")))
        })
        .await?;

        info!(
            provider = service,
            structured = report.is_structured(),
            "Image analyzed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlens_providers::MockProvider;
    use image::{Rgba, RgbaImage};

    const REPORT: &str = r#"```json
{"strengths": [{"strength": "Clear CTA"}],
 "weaknesses": [{"weakness": "Dense footer", "severity": "Low"}],
 "accessibility": "Meets AA"}
```"#;

    fn settings(require_structured: bool) -> AnalyzerSettings {
        AnalyzerSettings {
            model: "vision-model".into(),
            max_tokens: 512,
            temperature: 0.1,
            require_structured,
        }
    }

    fn image() -> CombinedImage {
        CombinedImage::from(RgbaImage::from_pixel(3, 3, Rgba([200, 10, 10, 255])))
    }

    #[tokio::test]
    async fn structured_reply_becomes_structured_report() {
        let mock = Arc::new(MockProvider::new("vision").with_response(REPORT));
        let analyzer = ImageAnalyzer::new(mock.clone(), settings(false));

        let report = analyzer.analyze(&image()).await.unwrap();
        assert!(report.is_structured());

        let sent = &mock.requests()[0];
        assert_eq!(sent.model, "vision-model");
        assert_eq!(sent.max_tokens, 512);
        assert!(sent.json_output);
        assert_eq!(sent.images.len(), 1);
        assert_eq!(sent.images[0].mime_type, "image/png");
    }

    #[tokio::test]
    async fn strict_mode_rejects_free_text() {
        let mock = Arc::new(MockProvider::new("vision").with_response("looks fine to me"));
        let err = ImageAnalyzer::new(mock.clone(), settings(true))
            .analyze(&image())
            .await
            .unwrap_err();
        assert!(matches!(err, HeatlensError::ExternalService { .. }));

        let lenient = ImageAnalyzer::new(mock, settings(false));
        assert!(!lenient.analyze(&image()).await.unwrap().is_structured());
    }

    #[tokio::test]
    async fn transport_failure_is_external_error() {
        let mock = Arc::new(MockProvider::new("vision").failing_times(1));
        let err = ImageAnalyzer::new(mock, settings(false))
            .analyze(&image())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HeatlensError::ExternalService { ref service, .. } if service == "vision"
        ));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let mock = Arc::new(MockProvider::new("vision").with_response(REPORT).failing_times(1));
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1,
            jitter: false,
            ..Default::default()
        };
        let analyzer = ImageAnalyzer::new(mock.clone(), settings(true)).with_retry(policy);

        assert!(analyzer.analyze(&image()).await.unwrap().is_structured());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_reply_is_rejected() {
        let mock = Arc::new(MockProvider::new("vision").with_response("   "));
        let analyzer = ImageAnalyzer::new(mock, settings(false));
        assert!(analyzer.analyze(&image()).await.is_err());
    }
}
