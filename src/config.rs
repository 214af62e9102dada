use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

pub const DEFAULT_TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";
pub const HELICONE_TOGETHER_BASE_URL: &str = "https://together.helicone.ai/v1";
pub const DEFAULT_FIRECRAWL_BASE_URL: &str = "https://api.firecrawl.dev";
pub const DEFAULT_CODING_MODEL: &str = "meta-llama/Meta-Llama-3.1-405B-Instruct-Turbo";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// How a generation request is turned into model calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// One streaming call: coding prompt and image in the same message.
    SingleCall,
    /// Describe the image first, then stream code from the description.
    #[default]
    TwoCall,
}

impl PipelineMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "single-call" | "single" => Ok(Self::SingleCall),
            "two-call" | "two" => Ok(Self::TwoCall),
            other => bail!("unknown PIPELINE_MODE `{other}` (expected single-call or two-call)"),
        }
    }
}

/// Settings for the chat-completions provider.
#[derive(Debug, Clone)]
pub struct ModelProviderConfig {
    pub api_key: String,
    pub base_url: String,
    /// Extra auth header sent when calls go through the telemetry proxy.
    pub proxy_auth: Option<String>,
    pub coding_model: String,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Process-wide configuration, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelProviderConfig,
    pub capture: CaptureConfig,
    pub pipeline: PipelineMode,
    pub bind_addr: String,
    pub upstream_timeout: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests can avoid
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("TOGETHER_API_KEY").ok_or_else(|| anyhow!("TOGETHER_API_KEY is not set"))?;
        let proxy_auth = get("HELICONE_API_KEY").map(|key| format!("Bearer {key}"));
        let base_url = match (get("TOGETHER_BASE_URL"), &proxy_auth) {
            (Some(explicit), _) => explicit,
            (None, Some(_)) => HELICONE_TOGETHER_BASE_URL.to_string(),
            (None, None) => DEFAULT_TOGETHER_BASE_URL.to_string(),
        };

        let capture_key =
            get("FIRECRAWL_API_KEY").ok_or_else(|| anyhow!("FIRECRAWL_API_KEY is not set"))?;

        let pipeline = get("PIPELINE_MODE")
            .map(|raw| PipelineMode::parse(&raw))
            .transpose()?
            .unwrap_or_default();

        let upstream_timeout = get("UPSTREAM_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("UPSTREAM_TIMEOUT_SECS must be an integer, got `{raw}`"))
            })
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            model: ModelProviderConfig {
                api_key,
                base_url: trim_base(base_url),
                proxy_auth,
                coding_model: get("CODING_MODEL").unwrap_or_else(|| DEFAULT_CODING_MODEL.to_string()),
            },
            capture: CaptureConfig {
                api_key: capture_key,
                base_url: trim_base(
                    get("FIRECRAWL_BASE_URL").unwrap_or_else(|| DEFAULT_FIRECRAWL_BASE_URL.to_string()),
                ),
            },
            pipeline,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            upstream_timeout,
        })
    }

    /// Shared HTTP client for both providers.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.upstream_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().context("failed to build HTTP client")
    }
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_keys_are_set() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("TOGETHER_API_KEY", "tk"),
            ("FIRECRAWL_API_KEY", "fk"),
        ]))
        .unwrap();

        assert_eq!(cfg.model.base_url, DEFAULT_TOGETHER_BASE_URL);
        assert_eq!(cfg.model.coding_model, DEFAULT_CODING_MODEL);
        assert!(cfg.model.proxy_auth.is_none());
        assert_eq!(cfg.capture.base_url, DEFAULT_FIRECRAWL_BASE_URL);
        assert_eq!(cfg.pipeline, PipelineMode::TwoCall);
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert!(cfg.upstream_timeout.is_none());
    }

    #[test]
    fn helicone_key_switches_base_url_and_adds_auth() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("TOGETHER_API_KEY", "tk"),
            ("FIRECRAWL_API_KEY", "fk"),
            ("HELICONE_API_KEY", "hk"),
        ]))
        .unwrap();

        assert_eq!(cfg.model.base_url, HELICONE_TOGETHER_BASE_URL);
        assert_eq!(cfg.model.proxy_auth.as_deref(), Some("Bearer hk"));
    }

    #[test]
    fn explicit_base_url_wins_and_is_trimmed() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("TOGETHER_API_KEY", "tk"),
            ("FIRECRAWL_API_KEY", "fk"),
            ("HELICONE_API_KEY", "hk"),
            ("TOGETHER_BASE_URL", "http://127.0.0.1:9999/v1/"),
            ("UPSTREAM_TIMEOUT_SECS", "30"),
            ("PIPELINE_MODE", "single_call"),
        ]))
        .unwrap();

        assert_eq!(cfg.model.base_url, "http://127.0.0.1:9999/v1");
        assert_eq!(cfg.upstream_timeout, Some(Duration::from_secs(30)));
        assert_eq!(cfg.pipeline, PipelineMode::SingleCall);
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("FIRECRAWL_API_KEY", "fk")])).unwrap_err();
        assert!(err.to_string().contains("TOGETHER_API_KEY"));

        let err = AppConfig::from_lookup(lookup(&[("TOGETHER_API_KEY", "tk")])).unwrap_err();
        assert!(err.to_string().contains("FIRECRAWL_API_KEY"));
    }

    #[test]
    fn bad_pipeline_mode_is_an_error() {
        assert!(PipelineMode::parse("three-call").is_err());
        assert_eq!(PipelineMode::parse(" Two-Call ").unwrap(), PipelineMode::TwoCall);
    }
}
