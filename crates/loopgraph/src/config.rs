//! Configuration loaded at startup.

use std::collections::HashMap;
use std::env;
use std::fmt::{self, Debug, Formatter};

use loopgraph_openai_model::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAIConfig, OpenAIConfigBuilder,
};
use thiserror::Error;

const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const LANGCHAIN_API_KEY: &str = "LANGCHAIN_API_KEY";
const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
const OPENAI_MODEL: &str = "OPENAI_MODEL";

/// Errors raised while loading [`Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is neither set nor present in `.env`.
    #[error("environment variable `{0}` is not set")]
    MissingVar(&'static str),

    /// The `.env` file exists but could not be read.
    #[error("failed to load .env file: {0}")]
    DotEnv(#[from] dotenv::Error),
}

/// Settings of the ready-made agent.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    openai_api_key: String,
    langchain_api_key: Option<String>,
    base_url: String,
    model: String,
}

impl Settings {
    /// Loads the settings from the process environment, falling back to a
    /// `.env` file in the current directory (or its parents).
    ///
    /// Variables already set in the environment take precedence over the
    /// file. The environment itself is left untouched.
    pub fn from_env() -> Result<Self, ConfigError> {
        let dotenv_vars = load_dotenv()?;
        Self::from_lookup(|key| {
            env::var(key)
                .ok()
                .or_else(|| dotenv_vars.get(key).cloned())
        })
    }

    /// Loads the settings with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let openai_api_key = lookup(OPENAI_API_KEY)
            .ok_or(ConfigError::MissingVar(OPENAI_API_KEY))?;
        Ok(Self {
            openai_api_key,
            langchain_api_key: lookup(LANGCHAIN_API_KEY),
            base_url: lookup(OPENAI_BASE_URL)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            model: lookup(OPENAI_MODEL)
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        })
    }

    /// Overrides the model.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the base URL of the completion service.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the key of the tracing service, if configured.
    ///
    /// The key is carried for hosts that export traces, nothing in this
    /// crate sends data with it.
    #[inline]
    pub fn langchain_api_key(&self) -> Option<&str> {
        self.langchain_api_key.as_deref()
    }

    /// Returns the base URL of the completion service.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model name.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the provider configuration, sampling at temperature 0.
    pub fn openai_config(&self) -> OpenAIConfig {
        OpenAIConfigBuilder::with_api_key(self.openai_api_key.clone())
            .with_base_url(self.base_url.clone())
            .with_model(self.model.clone())
            .with_temperature(0.0)
            .build()
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("openai_api_key", &"<redacted>")
            .field(
                "langchain_api_key",
                &self.langchain_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

fn load_dotenv() -> Result<HashMap<String, String>, ConfigError> {
    let iter = match dotenv::dotenv_iter() {
        Ok(iter) => iter,
        Err(err) if err.not_found() => {
            debug!("no .env file found");
            return Ok(HashMap::new());
        }
        Err(err) => return Err(err.into()),
    };
    let vars = iter.collect::<Result<HashMap<_, _>, _>>()?;
    debug!("loaded {} variables from .env", vars.len());
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(
        vars: &'a [(&'a str, &'a str)],
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn test_defaults() {
        let settings =
            Settings::from_lookup(lookup(&[(OPENAI_API_KEY, "sk-test")]))
                .unwrap();
        assert_eq!(settings.model(), DEFAULT_MODEL);
        assert_eq!(settings.base_url(), DEFAULT_BASE_URL);
        assert_eq!(settings.langchain_api_key(), None);

        let config = settings.openai_config();
        assert_eq!(config.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (OPENAI_API_KEY, "sk-test"),
            (LANGCHAIN_API_KEY, "ls-test"),
            (OPENAI_BASE_URL, "http://localhost:8080/v1"),
            (OPENAI_MODEL, "gpt-4o"),
        ]))
        .unwrap()
        .with_model("local-model");
        assert_eq!(settings.model(), "local-model");
        assert_eq!(settings.base_url(), "http://localhost:8080/v1");
        assert_eq!(settings.langchain_api_key(), Some("ls-test"));
    }

    #[test]
    fn test_missing_api_key() {
        for vars in [&[][..], &[(OPENAI_API_KEY, "")][..]] {
            let err = Settings::from_lookup(lookup(vars)).unwrap_err();
            assert!(matches!(err, ConfigError::MissingVar(OPENAI_API_KEY)));
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = Settings::from_lookup(lookup(&[
            (OPENAI_API_KEY, "sk-secret"),
            (LANGCHAIN_API_KEY, "ls-secret"),
        ]))
        .unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("secret"), "{debug}");
        assert!(debug.contains(DEFAULT_MODEL));
    }
}
