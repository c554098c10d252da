//! Blocking client for the MediaWiki web API (`api.php`).
//!
//! # Overview
//! Posts form-encoded parameters to a wiki's API endpoint and maps the JSON
//! answers onto typed results: user lookup, contribution counts, first
//! edit, action tokens, login and logout, and raw passthrough.
//!
//! # Design
//! - `ApiClient` is stateless: it builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network.
//! - `MediaWiki` pairs an `ApiClient` with a `Transport` (a `ureq` agent by
//!   default) and runs build, execute, parse for each operation.
//! - Every failure is a `MediaWikiError` variant; nothing is retried.
//!
//! ```no_run
//! use mediawiki_core::{connect_wikipedia, ContribQuery, Period};
//! use std::num::NonZeroU32;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let wiki = connect_wikipedia("en")?;
//! let user = wiki.user_data("Jimbo Wales")?;
//! let query = ContribQuery::new(&user.name, NonZeroU32::new(500).unwrap())
//!     .end(chrono::Utc::now())
//!     .period(Period::months(1));
//! println!("{user}: {} edits last month", wiki.contrib_count(&query)?);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod http;
pub mod params;
pub mod session;
pub mod timestamp;
pub mod types;

pub use client::{ApiClient, JsonObject, LoginStep};
pub use config::{ConfigError, MediaWikiConfig};
pub use error::{MediaWikiError, Result};
pub use factory::{
    connect, connect_parts, connect_wikimedia, connect_wikipedia, connect_with, default_config, set_default_config,
};
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use params::{build_api_uri, Params};
pub use session::MediaWiki;
pub use timestamp::{format_api_timestamp, parse_api_timestamp, Period};
pub use types::{ContribQuery, Namespace, TokenType, UserData};
