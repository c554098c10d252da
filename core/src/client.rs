//! Stateless request builder and response parser for the MediaWiki API.
//!
//! # Design
//! `ApiClient` holds only the endpoint URL and the User-Agent, and carries
//! no mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that
//! consumes an `HttpResponse`. `MediaWiki` drives the round-trip in between.
//!
//! All JSON actions go through the same envelope: `format=json` and a
//! lower-cased `action` are forced into the parameters, a top-level `error`
//! object becomes `MediaWikiError::Api`, and the payload under the action
//! key is handed to the per-operation parser.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{MediaWikiError, Result};
use crate::http::{check_status, HttpRequest, HttpResponse};
use crate::params::Params;
use crate::timestamp::{format_api_timestamp, parse_api_timestamp};
use crate::types::{ContribQuery, Namespace, TokenType, UserData};

/// Payload object returned for an action.
pub type JsonObject = Map<String, Value>;

const ACTION_LOGIN: &str = "login";
const ACTION_LOGOUT: &str = "logout";
const ACTION_QUERY: &str = "query";
const ACTION_TOKENS: &str = "tokens";

const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Outcome of one `action=login` round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    /// The user is logged in.
    Success,
    /// The server wants the request repeated with this `lgtoken`.
    NeedToken(String),
}

/// Synchronous, stateless client for the MediaWiki API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    api_uri: Url,
    user_agent: String,
}

impl ApiClient {
    pub fn new(api_uri: Url, user_agent: impl Into<String>) -> Self {
        Self {
            api_uri,
            user_agent: user_agent.into(),
        }
    }

    pub fn api_uri(&self) -> &Url {
        &self.api_uri
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// POST `params` verbatim, without the JSON envelope.
    pub fn build_request(&self, params: &Params) -> HttpRequest {
        HttpRequest {
            url: self.api_uri.to_string(),
            headers: vec![
                ("User-Agent".to_string(), self.user_agent.clone()),
                ("Content-Type".to_string(), CONTENT_TYPE_FORM.to_string()),
            ],
            body: params.to_form_body(),
        }
    }

    /// Body text of a raw request.
    pub fn parse_raw(&self, response: HttpResponse) -> Result<String> {
        check_status(&response)?;
        Ok(response.body)
    }

    /// Build a JSON request for `action`. `format` and `action` in `params`
    /// are overridden.
    pub fn build_action(&self, action: &str, params: &Params) -> Result<HttpRequest> {
        if action.is_empty() {
            return Err(MediaWikiError::InvalidArgument("action is empty".to_string()));
        }
        Ok(self.build_request(&envelope_params(action, params)))
    }

    /// Unwrap the envelope of a response to `action`.
    ///
    /// Returns the object under the action key, or an empty object when the
    /// server sent none.
    pub fn parse_action(&self, action: &str, response: HttpResponse) -> Result<JsonObject> {
        check_status(&response)?;
        let root: Value = serde_json::from_str(&response.body)
            .map_err(|e| MediaWikiError::MalformedResponse(format!("invalid JSON: {e}")))?;
        let Value::Object(mut root) = root else {
            return Err(malformed("response is not a JSON object"));
        };

        if let Some(error) = root.get("error") {
            let code = error
                .get("code")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("error object without code"))?;
            tracing::warn!(action, code, "API returned an error");
            return Err(MediaWikiError::Api {
                code: code.to_string(),
            });
        }

        match root.remove(&action.to_lowercase()) {
            Some(Value::Object(payload)) => Ok(payload),
            Some(_) => Err(malformed(&format!("`{action}` is not an object"))),
            None => Ok(JsonObject::new()),
        }
    }

    pub fn build_user_data(&self, user: &str) -> HttpRequest {
        let params = Params::from([
            ("list", "users"),
            ("usprop", "registration"),
            ("ususers", user),
        ]);
        self.build_request(&envelope_params(ACTION_QUERY, &params))
    }

    pub fn parse_user_data(&self, user: &str, response: HttpResponse) -> Result<UserData> {
        let payload = self.parse_action(ACTION_QUERY, response)?;
        let entry = array_field(&payload, "users")?
            .first()
            .ok_or_else(|| malformed("`users` is empty"))?;
        let entry = entry
            .as_object()
            .ok_or_else(|| malformed("`users` entry is not an object"))?;

        if entry.contains_key("missing") {
            return Err(MediaWikiError::NotFound(user.to_string()));
        }

        let name = str_field(entry, "name")?.to_string();
        let id = entry
            .get("userid")
            .and_then(Value::as_u64)
            .ok_or_else(|| missing_field("userid"))?;
        let registration = parse_api_timestamp(str_field(entry, "registration")?)?;

        Ok(UserData {
            name,
            id,
            registration,
        })
    }

    pub fn build_contrib_count(&self, query: &ContribQuery) -> Result<HttpRequest> {
        let params = contrib_count_params(query)?;
        Ok(self.build_request(&envelope_params(ACTION_QUERY, &params)))
    }

    /// Number of contributions returned. The server caps it at `uclimit`.
    pub fn parse_contrib_count(&self, response: HttpResponse) -> Result<usize> {
        let payload = self.parse_action(ACTION_QUERY, response)?;
        Ok(array_field(&payload, "usercontribs")?.len())
    }

    pub fn build_first_edit(&self, user: &str) -> HttpRequest {
        let params = Params::from([
            ("list", "usercontribs"),
            ("ucuser", user),
            ("uclimit", "1"),
            ("ucdir", "newer"),
            ("ucprop", "timestamp"),
        ]);
        self.build_request(&envelope_params(ACTION_QUERY, &params))
    }

    /// Timestamp of the oldest contribution, or `None` for users who never
    /// edited.
    pub fn parse_first_edit(&self, response: HttpResponse) -> Result<Option<DateTime<Utc>>> {
        let payload = self.parse_action(ACTION_QUERY, response)?;
        let Some(first) = array_field(&payload, "usercontribs")?.first() else {
            return Ok(None);
        };
        let first = first
            .as_object()
            .ok_or_else(|| malformed("`usercontribs` entry is not an object"))?;
        parse_api_timestamp(str_field(first, "timestamp")?).map(Some)
    }

    pub fn build_token(&self, token_type: TokenType) -> HttpRequest {
        let params = Params::from([("type", token_type.as_str())]);
        self.build_request(&envelope_params(ACTION_TOKENS, &params))
    }

    pub fn parse_token(&self, token_type: TokenType, response: HttpResponse) -> Result<String> {
        let payload = self.parse_action(ACTION_TOKENS, response)?;
        Ok(str_field(&payload, &token_type.result_field())?.to_string())
    }

    /// # Errors
    /// `InvalidArgument` if the user, the password or a given token is empty.
    pub fn build_login(&self, user: &str, password: &str, token: Option<&str>) -> Result<HttpRequest> {
        require_nonempty("user", user)?;
        require_nonempty("password", password)?;
        let mut params = Params::from([("lgname", user), ("lgpassword", password)]);
        if let Some(token) = token {
            require_nonempty("token", token)?;
            params.insert("lgtoken", token);
        }
        Ok(self.build_request(&envelope_params(ACTION_LOGIN, &params)))
    }

    pub fn parse_login(&self, user: &str, response: HttpResponse) -> Result<LoginStep> {
        let payload = self.parse_action(ACTION_LOGIN, response)?;
        match str_field(&payload, "result")? {
            "Success" => Ok(LoginStep::Success),
            "NeedToken" => Ok(LoginStep::NeedToken(str_field(&payload, "token")?.to_string())),
            "NotExists" => Err(MediaWikiError::NotFound(user.to_string())),
            "WrongPass" => Err(MediaWikiError::WrongPassword(user.to_string())),
            other => Err(MediaWikiError::Api {
                code: other.to_string(),
            }),
        }
    }

    pub fn build_logout(&self) -> HttpRequest {
        self.build_request(&envelope_params(ACTION_LOGOUT, &Params::new()))
    }

    /// The server answers a logout with an empty object; only errors matter.
    pub fn parse_logout(&self, response: HttpResponse) -> Result<()> {
        self.parse_action(ACTION_LOGOUT, response).map(drop)
    }
}

/// Copy `params`, forcing `format=json` and the lower-cased action.
fn envelope_params(action: &str, params: &Params) -> Params {
    params
        .clone()
        .with("format", "json")
        .with("action", action.to_lowercase())
}

/// `usercontribs` arguments for a contribution count.
pub fn contrib_count_params(query: &ContribQuery) -> Result<Params> {
    let mut params = Params::from([
        ("list", "usercontribs"),
        ("ucuser", query.user.as_str()),
        ("ucdir", "newer"),
        ("ucprop", "timestamp"),
    ]);
    params.insert("uclimit", query.limit.to_string());
    if !query.namespaces.is_empty() {
        params.insert("ucnamespace", Namespace::join_ids(&query.namespaces));
    }
    if let Some(end) = &query.end {
        params.insert("ucend", format_api_timestamp(end));
        if let Some(period) = &query.period {
            let start = period.before(end).ok_or_else(|| {
                MediaWikiError::InvalidArgument(format!("period {period} before {end} is out of range"))
            })?;
            params.insert("ucstart", format_api_timestamp(&start));
        }
    }
    Ok(params)
}

fn require_nonempty(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(MediaWikiError::InvalidArgument(format!("{name} is empty")));
    }
    Ok(())
}

fn malformed(what: &str) -> MediaWikiError {
    MediaWikiError::MalformedResponse(what.to_string())
}

fn missing_field(name: &str) -> MediaWikiError {
    MediaWikiError::MalformedResponse(format!("missing or mistyped field `{name}`"))
}

fn str_field<'a>(object: &'a JsonObject, name: &str) -> Result<&'a str> {
    object
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| missing_field(name))
}

fn array_field<'a>(object: &'a JsonObject, name: &str) -> Result<&'a Vec<Value>> {
    object
        .get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| missing_field(name))
}
