//! `heatlens status`: query a running gateway.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use heatlens_config::HeatlensConfig;

pub async fn run(config_path: &Path, url: Option<String>) -> Result<()> {
    let base = match url {
        Some(url) => url,
        None => gateway_url(&heatlens_config::load(config_path).await?),
    };
    let base = base.trim_end_matches('/');

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    match client.get(format!("{base}/api/health")).send().await {
        Ok(resp) => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => {
            println!("heatlens is not running at {base}");
        }
    }
    Ok(())
}

/// Local URL of the configured gateway; wildcard binds map to loopback.
fn gateway_url(config: &HeatlensConfig) -> String {
    let bind = config.bind_address();
    let host = match bind.as_str() {
        "0.0.0.0" => "127.0.0.1".to_string(),
        "::" => "[::1]".to_string(),
        other if other.contains(':') => format!("[{other}]"),
        other => other.to_string(),
    };
    format!("http://{}:{}", host, config.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> HeatlensConfig {
        heatlens_config::apply_all_defaults(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn wildcard_bind_uses_loopback() {
        assert_eq!(gateway_url(&config("{}")), "http://127.0.0.1:5000");
    }

    #[test]
    fn explicit_bind_is_kept() {
        let cfg = config("server:\n  bind: 10.0.0.5\n  port: 8088\n");
        assert_eq!(gateway_url(&cfg), "http://10.0.0.5:8088");
        let cfg = config("server:\n  bind: \"::1\"\n  port: 8088\n");
        assert_eq!(gateway_url(&cfg), "http://[::1]:8088");
    }
}
