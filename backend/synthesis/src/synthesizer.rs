use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use heatlens_config::{HeatlensConfig, Stage, StageSettings};
use heatlens_core::{
    retry_async, Batch, ConsolidatedReport, HeatlensError, LlmProvider, LlmRequest, RetryPolicy,
};
use heatlens_logging::redact_sensitive_data;
use heatlens_providers::ProviderRegistry;
use tracing::{debug, info, warn};

use crate::prompt::{
    compiler_prompt, recommender_prompt, COMPILER_SYSTEM_PROMPT, RECOMMENDER_SYSTEM_PROMPT,
};
use crate::RecommendationDraft;

/// One LLM stage bound to its provider and model parameters.
pub struct StageRunner {
    stage: Stage,
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl StageRunner {
    pub fn new(stage: Stage, provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            stage,
            provider,
            model: model.into(),
            max_tokens: 4096,
            temperature: 0.2,
        }
    }

    pub fn from_settings(
        stage: Stage,
        settings: &StageSettings,
        registry: &ProviderRegistry,
    ) -> Result<Self> {
        let provider = registry.require(&settings.provider)?;
        let mut runner = Self::new(stage, provider, &settings.model);
        runner.max_tokens = settings.max_tokens;
        runner.temperature = settings.temperature;
        Ok(runner)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn request(&self, system_prompt: &str, user_prompt: String, json_output: bool) -> LlmRequest {
        let mut request = LlmRequest::new(&self.model, user_prompt).with_system_prompt(system_prompt);
        request.max_tokens = self.max_tokens;
        request.temperature = self.temperature;
        request.json_output = json_output;
        request
    }

    /// One call, with failures labelled by stage name.
    async fn call(&self, request: &LlmRequest) -> Result<String, HeatlensError> {
        let service = self.stage.name();
        let response = self.provider.complete(request).await.map_err(|e| {
            HeatlensError::external(
                service,
                redact_sensitive_data(&format!("{}: {e:#}", self.provider.name())),
            )
        })?;
        debug!(
            stage = service,
            provider = %response.provider,
            tokens = response.tokens_used,
            latency_ms = response.latency_ms,
            "Stage reply received"
        );
        if response.content.trim().is_empty() {
            return Err(HeatlensError::external(service, "empty response"));
        }
        Ok(response.content)
    }
}

/// Runs `ui_recommender` then `report_compiler` over a full batch.
pub struct ReportSynthesizer {
    recommender: StageRunner,
    compiler: StageRunner,
    retry: RetryPolicy,
}

impl ReportSynthesizer {
    pub fn new(recommender: StageRunner, compiler: StageRunner) -> Self {
        Self {
            recommender,
            compiler,
            retry: RetryPolicy::no_retry(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn from_config(config: &HeatlensConfig, registry: &ProviderRegistry) -> Result<Self> {
        let recommender = StageRunner::from_settings(
            Stage::Recommender,
            &config.stage(Stage::Recommender),
            registry,
        )?;
        let compiler =
            StageRunner::from_settings(Stage::Compiler, &config.stage(Stage::Compiler), registry)?;
        Ok(Self::new(recommender, compiler).with_retry(config.retry_policy()))
    }

    /// Stage one: typed per-image recommendations for the whole batch.
    pub async fn recommend(&self, batch: &Batch) -> Result<RecommendationDraft, HeatlensError> {
        if batch.is_empty() {
            return Err(HeatlensError::InvalidRequest(
                "cannot synthesize an empty batch".to_string(),
            ));
        }
        let runner = &self.recommender;
        let request = runner.request(RECOMMENDER_SYSTEM_PROMPT, recommender_prompt(batch), true);
        let request = &request;
        let expected = batch.len();
        let service = runner.stage.name();

        retry_async(&self.retry, service, || async move {
            let text = runner.call(request).await?;
            RecommendationDraft::parse(&text, expected).map_err(|e| {
                HeatlensError::external(service, format!("malformed response: {e:#}"))
            })
        })
        .await
    }

    /// Stage two: the narrative report. Accepts only a recommender draft.
    pub async fn compile(
        &self,
        draft: &RecommendationDraft,
    ) -> Result<ConsolidatedReport, HeatlensError> {
        let runner = &self.compiler;
        let request = runner.request(COMPILER_SYSTEM_PROMPT, compiler_prompt(draft), false);
        let request = &request;

        let text = retry_async(&self.retry, runner.stage.name(), || async move {
            runner.call(request).await
        })
        .await?;

        let report = ConsolidatedReport::new(text.trim(), draft.len());
        let sections = report.sections().len();
        if sections != draft.len() {
            warn!(
                expected = draft.len(),
                sections, "Compiled report section count differs from batch size"
            );
        }
        Ok(report)
    }

    /// Both stages, strictly in order. Any failure aborts with no partial report.
    pub async fn synthesize(&self, batch: &Batch) -> Result<ConsolidatedReport, HeatlensError> {
        let start = Instant::now();
        let draft = self.recommend(batch).await?;
        info!(images = draft.len(), "Recommendations drafted");
        let report = self.compile(&draft).await?;
        info!(
            images = report.image_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Consolidated report compiled"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlens_core::{BatchEntry, PerImageReport};
    use heatlens_providers::MockProvider;
    use serde_json::json;

    fn batch(n: usize) -> Batch {
        Batch::new(
            (1..=n)
                .map(|i| {
                    BatchEntry::new(
                        PerImageReport::Narrative(format!("analysis {i}")),
                        format!("outputs/images/{i}.png"),
                    )
                })
                .collect(),
        )
    }

    fn draft_reply(n: u32) -> String {
        let images: Vec<_> = (1..=n)
            .map(|i| {
                json!({
                    "image_number": i,
                    "strengths": [{"strength": format!("s{i}")}],
                    "weaknesses": [{"weakness": format!("w{i}"), "severity": "High",
                                    "impact": "x", "recommendation": "y"}],
                    "wcag": {"level": "AA", "explanation": "fine"}
                })
            })
            .collect();
        json!({ "images": images }).to_string()
    }

    const COMPILED: &str = "# Report\nImage 1 text\n---\nImage 2 text\n---\nImage 3 text";

    fn synthesizer(
        recommender: Arc<MockProvider>,
        compiler: Arc<MockProvider>,
    ) -> ReportSynthesizer {
        ReportSynthesizer::new(
            StageRunner::new(Stage::Recommender, recommender, "rec-model"),
            StageRunner::new(Stage::Compiler, compiler, "comp-model"),
        )
    }

    #[tokio::test]
    async fn runs_both_stages_in_order() {
        let recommender = Arc::new(MockProvider::new("rec").with_response(draft_reply(3)));
        let compiler = Arc::new(MockProvider::new("comp").with_response(COMPILED));
        let synth = synthesizer(recommender.clone(), compiler.clone());

        let report = synth.synthesize(&batch(3)).await.unwrap();
        assert_eq!(report.image_count, 3);
        assert_eq!(report.sections().len(), 3);

        let rec_req = &recommender.requests()[0];
        assert!(rec_req.json_output);
        assert!(rec_req.user_prompt.contains("analysis 2"));

        // The compiler only sees the rendered draft.
        let comp_req = &compiler.requests()[0];
        assert_eq!(comp_req.model, "comp-model");
        assert!(comp_req.user_prompt.contains("## Image 3"));
        assert!(!comp_req.user_prompt.contains("analysis 2"));
    }

    #[tokio::test]
    async fn recommender_count_mismatch_aborts_before_compile() {
        let recommender = Arc::new(MockProvider::new("rec").with_response(draft_reply(2)));
        let compiler = Arc::new(MockProvider::new("comp").with_response(COMPILED));
        let synth = synthesizer(recommender, compiler.clone());

        let err = synth.synthesize(&batch(3)).await.unwrap_err();
        assert!(matches!(
            err,
            HeatlensError::ExternalService { ref service, .. } if service == "ui_recommender"
        ));
        assert_eq!(compiler.call_count(), 0);
    }

    #[tokio::test]
    async fn compiler_failure_returns_no_report() {
        let recommender = Arc::new(MockProvider::new("rec").with_response(draft_reply(3)));
        let compiler = Arc::new(MockProvider::new("comp").failing_times(1));
        let err = synthesizer(recommender, compiler)
            .synthesize(&batch(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HeatlensError::ExternalService { ref service, .. } if service == "report_compiler"
        ));
    }

    #[tokio::test]
    async fn malformed_draft_is_retried() {
        let recommender = Arc::new(MockProvider::new("rec").with_response(draft_reply(3)));
        recommender.push_response("not json at all");
        let compiler = Arc::new(MockProvider::new("comp").with_response(COMPILED));
        let synth = synthesizer(recommender.clone(), compiler).with_retry(RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1,
            jitter: false,
            ..Default::default()
        });

        synth.synthesize(&batch(3)).await.unwrap();
        assert_eq!(recommender.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let synth = synthesizer(
            Arc::new(MockProvider::new("rec")),
            Arc::new(MockProvider::new("comp")),
        );
        let err = synth.synthesize(&Batch::new(vec![])).await.unwrap_err();
        assert!(matches!(err, HeatlensError::InvalidRequest(_)));
    }
}
