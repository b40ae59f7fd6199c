use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use heatlens_core::{LlmProvider, LlmRequest, LlmResponse};

/// A mock LLM provider that returns canned responses.
///
/// Scripted replies are consumed first, in order; once the script is empty
/// every call gets the fixed response. Every request is recorded.
pub struct MockProvider {
    name: String,
    fixed_response: Option<String>,
    script: Mutex<VecDeque<Result<String, String>>>,
    fail_remaining: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
    delay: Option<Duration>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_response: None,
            script: Mutex::new(VecDeque::new()),
            fail_remaining: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    /// Fail the next `n` calls before anything else is returned.
    pub fn failing_times(self, n: usize) -> Self {
        self.fail_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.lock_script().push_back(Ok(response.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock_script().push_back(Err(message.into()));
    }

    pub fn call_count(&self) -> usize {
        self.lock_requests().len()
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.lock_requests().clone()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<LlmRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_reply(&self) -> Result<String> {
        let injected = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            anyhow::bail!("{}: injected failure", self.name);
        }

        match self.lock_script().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => anyhow::bail!("{}: {}", self.name, message),
            None => Ok(self
                .fixed_response
                .clone()
                .unwrap_or_else(|| "Mock response".to_string())),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, req: &LlmRequest) -> Result<LlmResponse> {
        self.lock_requests().push(req.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(LlmResponse {
            content: self.next_reply()?,
            provider: self.name.clone(),
            model: req.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_then_fixed_response() {
        let mock = MockProvider::new("m").with_response("fixed");
        mock.push_response("first");
        mock.push_failure("boom");

        let req = LlmRequest::new("mock", "hi");
        assert_eq!(mock.complete(&req).await.unwrap().content, "first");
        assert!(mock.complete(&req).await.unwrap_err().to_string().contains("boom"));
        assert_eq!(mock.complete(&req).await.unwrap().content, "fixed");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn injected_failures_run_out() {
        let mock = MockProvider::new("m").failing_times(2);
        let req = LlmRequest::new("mock", "hi");
        assert!(mock.complete(&req).await.is_err());
        assert!(mock.complete(&req).await.is_err());
        assert_eq!(mock.complete(&req).await.unwrap().content, "Mock response");
        assert_eq!(mock.requests()[0].user_prompt, "hi");
    }

    #[tokio::test]
    async fn delayed_reply_still_arrives() {
        let mock = MockProvider::new("m")
            .with_response("late")
            .with_delay(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let reply = mock.complete(&LlmRequest::new("mock", "hi")).await.unwrap();
        assert_eq!(reply.content, "late");
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
