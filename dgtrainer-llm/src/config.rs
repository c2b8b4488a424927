//! Provider configuration: model specs, credentials, endpoints.

use dgtrainer_error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

/// Model used when neither `--model` nor `DG_TRAINER_MODEL` is given
pub const DEFAULT_MODEL: &str = "anthropic:claude-sonnet-4-0";

pub const ENV_MODEL: &str = "DG_TRAINER_MODEL";
pub const ENV_TIMEOUT: &str = "DG_TRAINER_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Anthropic,
    OpenAI,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "anthropic",
            ProviderType::OpenAI => "openai",
        }
    }

    fn api_key_var(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "ANTHROPIC_API_KEY",
            ProviderType::OpenAI => "OPENAI_API_KEY",
        }
    }

    fn base_url_var(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "ANTHROPIC_BASE_URL",
            ProviderType::OpenAI => "OPENAI_BASE_URL",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `provider:model` pair such as `anthropic:claude-sonnet-4-0`.
///
/// A bare model name without a prefix is assumed to be an Anthropic model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: ProviderType,
    pub model: String,
}

impl ModelSpec {
    pub fn new(provider: ProviderType, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::new(ProviderType::Anthropic, "claude-sonnet-4-0")
    }
}

impl FromStr for ModelSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (provider, model) = match s.split_once(':') {
            Some((prefix, model)) => {
                let provider = match prefix.to_ascii_lowercase().as_str() {
                    "anthropic" => ProviderType::Anthropic,
                    "openai" => ProviderType::OpenAI,
                    other => {
                        return Err(Error::config_invalid(format!("unknown provider '{}'", other))
                            .with_operation("config::parse_model")
                            .with_context("model", s));
                    }
                };
                (provider, model.trim())
            }
            None => (ProviderType::Anthropic, s),
        };

        if model.is_empty() {
            return Err(Error::config_invalid("model name is empty")
                .with_operation("config::parse_model")
                .with_context("model", s));
        }

        Ok(Self::new(provider, model))
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Configuration for creating providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.openai.com/v1".into()),
            default_model: Some("gpt-4o".into()),
            headers: HashMap::new(),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn anthropic(api_key: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("anthropic-version".into(), "2023-06-01".into());

        Self {
            provider_type: ProviderType::Anthropic,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.anthropic.com/v1".into()),
            default_model: Some("claude-sonnet-4-0".into()),
            headers,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the config for `spec` from process environment variables.
    pub fn from_env(spec: &ModelSpec) -> Result<Self> {
        Self::from_lookup(spec, |key| std::env::var(key).ok())
    }

    /// Build the config for `spec` reading variables through `lookup`.
    ///
    /// The API key is required; base URL and timeout are optional overrides.
    pub fn from_lookup<F>(spec: &ModelSpec, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key_var = spec.provider.api_key_var();
        let api_key = lookup(key_var)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::missing_env(key_var)
                    .with_operation("config::from_env")
                    .with_context("provider", spec.provider.as_str())
            })?;

        let mut config = match spec.provider {
            ProviderType::Anthropic => Self::anthropic(api_key),
            ProviderType::OpenAI => Self::openai(api_key),
        }
        .with_model(spec.model.clone());

        if let Some(url) = lookup(spec.provider.base_url_var()).filter(|u| !u.trim().is_empty()) {
            config = config.with_base_url(url.trim_end_matches('/'));
        }

        if let Some(raw) = lookup(ENV_TIMEOUT) {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                Error::config_invalid(format!("{} must be a whole number of seconds", ENV_TIMEOUT))
                    .with_operation("config::from_env")
                    .with_context("value", raw.clone())
                    .set_source(e)
            })?;
            config = config.with_timeout(secs);
        }

        debug!(
            provider = %spec.provider,
            model = %spec.model,
            base_url = config.base_url.as_deref().unwrap_or_default(),
            "provider config resolved"
        );
        Ok(config)
    }
}

/// Load a `.env` file from the working directory, if there is one.
///
/// Returns `None` when there is no file. Runs before logging is set up, so
/// the caller reports the outcome with [`log_dotenv`] once it is.
pub fn load_dotenv() -> Option<dotenvy::Result<PathBuf>> {
    dotenv_outcome(dotenvy::dotenv())
}

fn dotenv_outcome(result: dotenvy::Result<PathBuf>) -> Option<dotenvy::Result<PathBuf>> {
    match result {
        Err(e) if e.not_found() => None,
        outcome => Some(outcome),
    }
}

/// Log what [`load_dotenv`] did.
pub fn log_dotenv(outcome: &Option<dotenvy::Result<PathBuf>>) {
    match outcome {
        Some(Ok(path)) => debug!(path = %path.display(), "loaded environment file"),
        Some(Err(e)) => warn!(error = %e, "ignoring unreadable .env file"),
        None => {}
    }
}
