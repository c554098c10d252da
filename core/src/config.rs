//! Client configuration.
//!
//! Loaded in priority order (lowest to highest):
//! 1. Struct defaults
//! 2. Environment variables with the `MEDIAWIKI_` prefix

use std::time::Duration;

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings shared by every session built from this configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MediaWikiConfig {
    /// Sent as `User-Agent` on every request. Wikimedia wikis reject
    /// requests without one.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upper bound for a whole request, in seconds. Unset means the HTTP
    /// agent's defaults apply.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_user_agent() -> String {
    format!("mediawiki-core/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for MediaWikiConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl MediaWikiConfig {
    /// Load from defaults overridden by `MEDIAWIKI_*` environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError` if a variable cannot be parsed or the result
    /// fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("MEDIAWIKI_"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// # Errors
    /// Returns `ConfigError::Invalid` for a blank user agent or a zero
    /// timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("user_agent must not be empty".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_identify_the_crate() {
        let config = MediaWikiConfig::default();
        assert!(config.user_agent.starts_with("mediawiki-core/"));
        assert_eq!(config.timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("MEDIAWIKI_USER_AGENT", "StatsBot/2.0 (ops@example.org)");
            jail.set_env("MEDIAWIKI_TIMEOUT_SECS", "30");
            let config = MediaWikiConfig::load().unwrap();
            assert_eq!(config.user_agent, "StatsBot/2.0 (ops@example.org)");
            assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
            Ok(())
        });
    }

    #[test]
    fn blank_user_agent_is_rejected() {
        let config = MediaWikiConfig::default().with_user_agent("   ");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_timeout_from_env_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("MEDIAWIKI_TIMEOUT_SECS", "0");
            let err = MediaWikiConfig::load().unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
            Ok(())
        });
    }

    #[test]
    fn unparseable_timeout_is_a_figment_error() {
        Jail::expect_with(|jail| {
            jail.set_env("MEDIAWIKI_TIMEOUT_SECS", "soon");
            let err = MediaWikiConfig::load().unwrap_err();
            assert!(matches!(err, ConfigError::Figment(_)));
            Ok(())
        });
    }

    #[test]
    fn builders_set_fields() {
        let config = MediaWikiConfig::default()
            .with_user_agent("x/1")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.user_agent, "x/1");
        assert_eq!(config.timeout_secs, Some(5));
    }
}
