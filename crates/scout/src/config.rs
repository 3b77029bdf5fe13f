//! Configuration loaded from environment variables.

use std::env;
use std::fmt::{self, Debug};
use std::str::FromStr;

use scout_anthropic_model::{AnthropicConfig, AnthropicConfigBuilder};

use crate::tools::{DEFAULT_MAX_RESULTS, TavilyClient, WebSearchTool};

/// An error in the startup configuration.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set, or is empty.
    #[error("{0} environment variable is not set")]
    MissingVar(&'static str),
    /// A numeric variable could not be parsed.
    #[error("{name} must be a positive integer, got `{value}`")]
    InvalidNumber {
        /// Name of the variable.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Everything `scout` needs to talk to the model and the search engine.
#[derive(Clone)]
pub struct AppConfig {
    anthropic_api_key: String,
    anthropic_model: Option<String>,
    anthropic_base_url: Option<String>,
    anthropic_max_tokens: Option<u32>,
    tavily_api_key: String,
    tavily_max_results: u32,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &'static str| {
            var(name).ok_or(ConfigError::MissingVar(name))
        };

        Ok(Self {
            anthropic_api_key: required("ANTHROPIC_API_KEY")?,
            anthropic_model: var("ANTHROPIC_MODEL"),
            anthropic_base_url: var("ANTHROPIC_BASE_URL"),
            anthropic_max_tokens: parse_number(
                "ANTHROPIC_MAX_TOKENS",
                var("ANTHROPIC_MAX_TOKENS"),
            )?,
            tavily_api_key: required("TAVILY_API_KEY")?,
            tavily_max_results: parse_number(
                "TAVILY_MAX_RESULTS",
                var("TAVILY_MAX_RESULTS"),
            )?
            .unwrap_or(DEFAULT_MAX_RESULTS),
        })
    }

    /// Returns the configuration of the model provider.
    pub fn anthropic_config(&self) -> AnthropicConfig {
        let mut builder =
            AnthropicConfigBuilder::with_api_key(&self.anthropic_api_key);
        if let Some(model) = &self.anthropic_model {
            builder = builder.with_model(model);
        }
        if let Some(base_url) = &self.anthropic_base_url {
            builder = builder.with_base_url(base_url);
        }
        if let Some(max_tokens) = self.anthropic_max_tokens {
            builder = builder.with_max_tokens(max_tokens);
        }
        builder.build()
    }

    /// Creates the web search tool backed by Tavily.
    pub fn web_search_tool(&self) -> WebSearchTool<TavilyClient> {
        WebSearchTool::new(TavilyClient::new(&self.tavily_api_key))
            .with_max_results(self.tavily_max_results)
    }
}

impl Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("anthropic_api_key", &"<redacted>")
            .field("anthropic_model", &self.anthropic_model)
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("anthropic_max_tokens", &self.anthropic_max_tokens)
            .field("tavily_api_key", &"<redacted>")
            .field("tavily_max_results", &self.tavily_max_results)
            .finish()
    }
}

fn parse_number<T: FromStr + PartialOrd + Default>(
    name: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.parse::<T>() {
        Ok(number) if number > T::default() => Ok(Some(number)),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}
