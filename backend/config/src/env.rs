//! Environment handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside string values, resolved at load time.
//!   Only uppercase `[A-Z_][A-Z0-9_]*` names match; `$${VAR}` is a literal.
//! - `HEATLENS_*` overrides and provider API-key fallbacks applied to the
//!   typed config after parsing.

use std::collections::HashMap;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::schema::{BatchConfig, HeatlensConfig, ProviderKind, ServerConfig, StorageConfig};

/// `$${VAR}` (escaped) or `${VAR}`.
static ENV_REF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute `${VAR}` references using a provided map (useful for testing).
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute_value(value, env, "")?)
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                out.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing = None;
    let out = ENV_REF_PATTERN.replace_all(s, |caps: &Captures| {
        let whole = &caps[0];
        let name = &caps[1];
        if whole.starts_with("$$") {
            return format!("${{{name}}}");
        }
        match env.get(name).filter(|v| !v.is_empty()) {
            Some(v) => v.clone(),
            None => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(out.into_owned()),
    }
}

/// Environment variable each provider kind reads its key from when the
/// config does not set one.
pub fn api_key_var(kind: ProviderKind) -> Option<&'static str> {
    match kind {
        ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
        ProviderKind::Gemini => Some("GEMINI_API_KEY"),
        ProviderKind::Mock => None,
    }
}

/// Apply `HEATLENS_*` overrides and provider key fallbacks from the process
/// environment.
pub fn apply_env_overrides(config: HeatlensConfig) -> HeatlensConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

pub fn apply_env_overrides_with(
    mut config: HeatlensConfig,
    env: &HashMap<String, String>,
) -> HeatlensConfig {
    let get = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(bind) = get("HEATLENS_BIND") {
        config.server.get_or_insert_with(ServerConfig::default).bind = Some(bind);
    }
    if let Some(port) = get("HEATLENS_PORT").and_then(|p| p.parse().ok()) {
        config.server.get_or_insert_with(ServerConfig::default).port = Some(port);
    }
    if let Some(dir) = get("HEATLENS_OUTPUT_DIR") {
        config.storage.get_or_insert_with(StorageConfig::default).output_dir = Some(dir);
    }
    if let Some(size) = get("HEATLENS_BATCH_SIZE").and_then(|s| s.parse().ok()) {
        config.batch.get_or_insert_with(BatchConfig::default).size = Some(size);
    }

    for provider in config.providers.values_mut() {
        if provider.api_key.is_none() {
            provider.api_key = api_key_var(provider.kind).and_then(get);
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ProviderConfig;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_var() {
        let v = json!({"providers": {"openai": {"apiKey": "${OPENAI_API_KEY}"}}});
        let result = resolve_env_vars_with(&v, &env(&[("OPENAI_API_KEY", "sk-abc123")])).unwrap();
        assert_eq!(result["providers"]["openai"]["apiKey"], "sk-abc123");
    }

    #[test]
    fn error_names_missing_var_and_path() {
        let v = json!({"storage": {"outputDir": "${MISSING_DIR}/out"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("MISSING_DIR"));
        assert!(err.contains("storage.outputDir"));
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = json!({"a": "cost $${DOLLARS}", "b": ["plain"]});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["a"], "cost ${DOLLARS}");
        assert_eq!(result["b"][0], "plain");
    }

    #[test]
    fn overrides_port_and_fills_api_keys() {
        let mut cfg = HeatlensConfig::default();
        cfg.providers
            .insert("g".to_string(), ProviderConfig::new(ProviderKind::Gemini));
        let mut explicit = ProviderConfig::new(ProviderKind::OpenAi);
        explicit.api_key = Some("from-file".to_string());
        cfg.providers.insert("o".to_string(), explicit);

        let cfg = apply_env_overrides_with(
            cfg,
            &env(&[
                ("HEATLENS_PORT", "9001"),
                ("HEATLENS_BATCH_SIZE", "not-a-number"),
                ("GEMINI_API_KEY", "g-key"),
                ("OPENAI_API_KEY", "ignored"),
            ]),
        );
        assert_eq!(cfg.port(), 9001);
        assert_eq!(cfg.batch_size(), crate::defaults::DEFAULT_BATCH_SIZE);
        assert_eq!(cfg.providers["g"].api_key.as_deref(), Some("g-key"));
        assert_eq!(cfg.providers["o"].api_key.as_deref(), Some("from-file"));
    }
}
