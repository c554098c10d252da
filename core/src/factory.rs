//! Constructors for `MediaWiki` sessions and the process-wide default
//! configuration they fall back to.
//!
//! Replacing the default only affects sessions created afterwards; a
//! session copies what it needs at construction time. Wikimedia-hosted
//! wikis all serve the API from `/w/api.php` over HTTPS, which is what
//! `connect_wikimedia` and `connect_wikipedia` assume.

use std::sync::{PoisonError, RwLock};

use url::Url;

use crate::config::{ConfigError, MediaWikiConfig};
use crate::error::{MediaWikiError, Result};
use crate::http::UreqTransport;
use crate::params::build_api_uri;
use crate::session::MediaWiki;

const HTTPS_SCHEME: &str = "https";
const HTTPS_PORT: u16 = 443;
const WIKIMEDIA_API_PATH: &str = "/w/api.php";

static DEFAULT_CONFIG: RwLock<Option<MediaWikiConfig>> = RwLock::new(None);

/// The configuration `connect` uses. Falls back to
/// `MediaWikiConfig::default()` until one is set.
pub fn default_config() -> MediaWikiConfig {
    DEFAULT_CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .unwrap_or_default()
}

/// Replace the configuration used by sessions opened later.
///
/// # Errors
/// Returns `ConfigError::Invalid` and keeps the previous default if
/// `config` fails validation.
pub fn set_default_config(config: MediaWikiConfig) -> Result<(), ConfigError> {
    config.validate()?;
    *DEFAULT_CONFIG.write().unwrap_or_else(PoisonError::into_inner) = Some(config);
    Ok(())
}

/// Open a session against `api_uri` with the default configuration.
pub fn connect(api_uri: Url) -> Result<MediaWiki> {
    connect_with(api_uri, &default_config())
}

/// # Errors
/// `MediaWikiError::Config` if `config` fails validation.
pub fn connect_with(api_uri: Url, config: &MediaWikiConfig) -> Result<MediaWiki> {
    config.validate()?;
    tracing::debug!(%api_uri, user_agent = %config.user_agent, "opening MediaWiki session");
    let transport = UreqTransport::with_timeout(config.timeout());
    Ok(MediaWiki::with_transport(api_uri, config.user_agent.clone(), transport))
}

/// Open a session against `<scheme>://<host>:<port><path>`.
pub fn connect_parts(scheme: &str, host: &str, port: u16, path: &str) -> Result<MediaWiki> {
    connect(build_api_uri(scheme, host, port, path)?)
}

/// Open a session against `https://<host>/w/api.php`.
pub fn connect_wikimedia(host: &str) -> Result<MediaWiki> {
    connect_parts(HTTPS_SCHEME, host, HTTPS_PORT, WIKIMEDIA_API_PATH)
}

/// Open a session against the Wikipedia edition for a language code such
/// as `de` or `simple`.
pub fn connect_wikipedia(language: &str) -> Result<MediaWiki> {
    if language.is_empty() {
        return Err(MediaWikiError::InvalidArgument("language is empty".to_string()));
    }
    connect_wikimedia(&format!("{language}.wikipedia.org"))
}
