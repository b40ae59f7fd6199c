use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use heatlens_config::{HeatlensConfig, ProviderConfig, ProviderKind};
use heatlens_core::LlmProvider;
use reqwest::Client;
use tracing::info;

use crate::{GeminiProvider, MockProvider, OpenAiProvider};

/// Build the shared HTTP client; every external call inherits the timeout.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Registry of LLM providers, looked up by name.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Build every provider named in the config, sharing one HTTP client.
    pub fn from_config(config: &HeatlensConfig) -> Result<Self> {
        let client = build_http_client(config.request_timeout())?;
        let mut registry = Self::new();
        for (name, provider) in &config.providers {
            let built = build_provider(name, provider, &client)
                .with_context(|| format!("Failed to build provider '{name}'"))?;
            registry.register(name.clone(), built);
        }
        info!(providers = ?registry.list(), "Provider registry ready");
        Ok(registry)
    }

    /// Register a provider by name.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(name).cloned()
    }

    /// Like [`get`](Self::get) but unknown names are an error.
    pub fn require(&self, name: &str) -> Result<Arc<dyn LlmProvider>> {
        self.get(name)
            .with_context(|| format!("Unknown provider '{name}'"))
    }

    /// Get all registered provider names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn build_provider(
    name: &str,
    config: &ProviderConfig,
    client: &Client,
) -> Result<Arc<dyn LlmProvider>> {
    let api_key = || {
        config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .context("missing apiKey")
    };

    let provider: Arc<dyn LlmProvider> = match config.kind {
        ProviderKind::OpenAi => {
            let mut p = OpenAiProvider::new(api_key()?)
                .with_name(name)
                .with_client(client.clone());
            if let Some(url) = &config.base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        ProviderKind::Gemini => {
            let mut p = GeminiProvider::new(api_key()?)
                .with_name(name)
                .with_client(client.clone());
            if let Some(url) = &config.base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        ProviderKind::Mock => {
            let mut p = MockProvider::new(name);
            if let Some(response) = &config.response {
                p = p.with_response(response);
            }
            Arc::new(p)
        }
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlens_core::LlmRequest;

    fn config_with(entries: &[(&str, ProviderConfig)]) -> HeatlensConfig {
        let mut cfg = HeatlensConfig::default();
        for (name, provider) in entries {
            cfg.providers.insert(name.to_string(), provider.clone());
        }
        cfg
    }

    #[tokio::test]
    async fn builds_named_providers_from_config() {
        let mut mock = ProviderConfig::new(ProviderKind::Mock);
        mock.response = Some("canned".into());
        let mut gemini = ProviderConfig::new(ProviderKind::Gemini);
        gemini.api_key = Some("g-key".into());

        let registry =
            ProviderRegistry::from_config(&config_with(&[("local", mock), ("vision", gemini)]))
                .unwrap();
        assert_eq!(registry.list(), vec!["local".to_string(), "vision".to_string()]);

        let local = registry.require("local").unwrap();
        assert_eq!(local.name(), "local");
        let reply = local.complete(&LlmRequest::new("mock", "hi")).await.unwrap();
        assert_eq!(reply.content, "canned");
        assert_eq!(registry.require("vision").unwrap().name(), "vision");
    }

    #[test]
    fn keyless_remote_provider_fails_to_build() {
        let cfg = config_with(&[("openai", ProviderConfig::new(ProviderKind::OpenAi))]);
        let err = ProviderRegistry::from_config(&cfg).err().unwrap();
        assert!(format!("{err:#}").contains("missing apiKey"));
    }

    #[test]
    fn unknown_name_is_error() {
        assert!(ProviderRegistry::new().require("ghost").is_err());
    }
}
