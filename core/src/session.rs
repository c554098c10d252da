//! Blocking MediaWiki session: `ApiClient` plus a `Transport`.
//!
//! Every operation is build, execute, parse. The only multi-request flow
//! is login, which repeats the call once when the server answers
//! `NeedToken`.

use chrono::{DateTime, Utc};
use url::Url;

use crate::client::{ApiClient, JsonObject, LoginStep};
use crate::error::{MediaWikiError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::params::Params;
use crate::types::{ContribQuery, TokenType, UserData};

/// A client bound to one wiki endpoint.
///
/// Created once and used for the lifetime of the caller. `close` consumes
/// the session, so the transport is released exactly once.
pub struct MediaWiki<T: Transport = UreqTransport> {
    client: ApiClient,
    transport: T,
}

impl<T: Transport> MediaWiki<T> {
    pub fn with_transport(api_uri: Url, user_agent: impl Into<String>, transport: T) -> Self {
        Self {
            client: ApiClient::new(api_uri, user_agent),
            transport,
        }
    }

    pub fn api_uri(&self) -> &Url {
        self.client.api_uri()
    }

    pub fn user_agent(&self) -> &str {
        self.client.user_agent()
    }

    /// The request layer, for callers that execute requests themselves.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// POST `params` as-is and return the body text.
    pub fn perform_request(&self, params: &Params) -> Result<String> {
        let response = self.execute(&self.client.build_request(params))?;
        self.client.parse_raw(response)
    }

    /// Run `action` with `params` and return the payload under the action key.
    pub fn perform_json_request(&self, action: &str, params: &Params) -> Result<JsonObject> {
        let request = self.client.build_action(action, params)?;
        let response = self.execute(&request)?;
        self.client.parse_action(action, response)
    }

    pub fn user_data(&self, user: &str) -> Result<UserData> {
        let response = self.execute(&self.client.build_user_data(user))?;
        self.client.parse_user_data(user, response)
    }

    pub fn contrib_count(&self, query: &ContribQuery) -> Result<usize> {
        let request = self.client.build_contrib_count(query)?;
        let response = self.execute(&request)?;
        self.client.parse_contrib_count(response)
    }

    pub fn first_edit(&self, user: &str) -> Result<Option<DateTime<Utc>>> {
        let response = self.execute(&self.client.build_first_edit(user))?;
        self.client.parse_first_edit(response)
    }

    pub fn token(&self, token_type: TokenType) -> Result<String> {
        let response = self.execute(&self.client.build_token(token_type))?;
        self.client.parse_token(token_type, response)
    }

    /// Log in, fetching a login token first if the server asks for one.
    pub fn login(&self, user: &str, password: &str) -> Result<()> {
        match self.login_step(user, password, None)? {
            LoginStep::Success => Ok(()),
            LoginStep::NeedToken(token) => {
                tracing::debug!(user, "login token required, retrying with token");
                self.login_with_token(user, password, &token)
            }
        }
    }

    /// Log in with a token obtained earlier. A second `NeedToken` means the
    /// token was rejected.
    pub fn login_with_token(&self, user: &str, password: &str, token: &str) -> Result<()> {
        match self.login_step(user, password, Some(token))? {
            LoginStep::Success => Ok(()),
            LoginStep::NeedToken(_) => Err(MediaWikiError::Api {
                code: "NeedToken".to_string(),
            }),
        }
    }

    /// End the logged-in session on the server.
    pub fn logout(&self) -> Result<()> {
        let response = self.execute(&self.client.build_logout())?;
        self.client.parse_logout(response)?;
        tracing::debug!(api_uri = %self.client.api_uri(), "logged out");
        Ok(())
    }

    /// Release the transport.
    pub fn close(self) {
        tracing::debug!(api_uri = %self.client.api_uri(), "closing MediaWiki session");
    }

    fn login_step(&self, user: &str, password: &str, token: Option<&str>) -> Result<LoginStep> {
        let request = self.client.build_login(user, password, token)?;
        let response = self.execute(&request)?;
        let step = self.client.parse_login(user, response)?;
        if step == LoginStep::Success {
            tracing::debug!(user, "logged in");
        }
        Ok(step)
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(url = %request.url, body_len = request.body.len(), "POST");
        let response = self.transport.execute(request)?;
        tracing::debug!(status = response.status, "response");
        Ok(response)
    }
}

impl MediaWiki<UreqTransport> {
    /// A session over a fresh `ureq` agent.
    pub fn new(api_uri: Url, user_agent: impl Into<String>) -> Self {
        Self::with_transport(api_uri, user_agent, UreqTransport::new())
    }
}

impl<T: Transport> std::fmt::Debug for MediaWiki<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaWiki")
            .field("api_uri", &self.client.api_uri().as_str())
            .field("user_agent", &self.client.user_agent())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{BTreeMap, VecDeque};
    use std::num::NonZeroU32;

    use url::form_urlencoded;

    use super::*;

    /// Replays canned responses and records every request it sees.
    #[derive(Default)]
    struct RecordingTransport {
        responses: RefCell<VecDeque<Result<HttpResponse>>>,
        requests: RefCell<Vec<HttpRequest>>,
    }

    impl RecordingTransport {
        fn replying(bodies: &[&str]) -> Self {
            let transport = Self::default();
            for body in bodies {
                transport
                    .responses
                    .borrow_mut()
                    .push_back(Ok(HttpResponse::ok(*body)));
            }
            transport
        }

        fn forms(&self) -> Vec<BTreeMap<String, String>> {
            self.requests
                .borrow()
                .iter()
                .map(|r| form_urlencoded::parse(r.body.as_bytes()).into_owned().collect())
                .collect()
        }
    }

    impl Transport for RecordingTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected request: {}", request.body))
        }
    }

    fn wiki(transport: RecordingTransport) -> MediaWiki<RecordingTransport> {
        MediaWiki::with_transport(
            Url::parse("https://wiki.example.org/w/api.php").unwrap(),
            "session-tests/0.1",
            transport,
        )
    }

    #[test]
    fn login_success_makes_one_call() {
        let wiki = wiki(RecordingTransport::replying(&[r#"{"login":{"result":"Success"}}"#]));
        wiki.login("Alice", "secret").unwrap();

        let forms = wiki.transport.forms();
        assert_eq!(forms.len(), 1);
        assert!(!forms[0].contains_key("lgtoken"));
    }

    #[test]
    fn login_need_token_makes_exactly_one_follow_up_with_token() {
        let wiki = wiki(RecordingTransport::replying(&[
            r#"{"login":{"result":"NeedToken","token":"8d3f"}}"#,
            r#"{"login":{"result":"Success","lguserid":1,"lgusername":"Alice"}}"#,
        ]));
        wiki.login("Alice", "secret").unwrap();

        let forms = wiki.transport.forms();
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[1]["lgtoken"], "8d3f");
        assert_eq!(forms[1]["lgname"], "Alice");
        assert_eq!(forms[1]["lgpassword"], "secret");
    }

    #[test]
    fn login_does_not_loop_on_repeated_need_token() {
        let wiki = wiki(RecordingTransport::replying(&[
            r#"{"login":{"result":"NeedToken","token":"a"}}"#,
            r#"{"login":{"result":"NeedToken","token":"b"}}"#,
        ]));
        let err = wiki.login("Alice", "secret").unwrap_err();
        assert_eq!(err.code(), Some("NeedToken"));
        assert_eq!(wiki.transport.forms().len(), 2);
    }

    #[test]
    fn login_failure_after_token_is_surfaced() {
        let wiki = wiki(RecordingTransport::replying(&[
            r#"{"login":{"result":"NeedToken","token":"a"}}"#,
            r#"{"login":{"result":"WrongPass"}}"#,
        ]));
        let err = wiki.login("Alice", "nope").unwrap_err();
        assert!(matches!(err, MediaWikiError::WrongPassword(_)));
    }

    #[test]
    fn login_with_token_sends_it_immediately() {
        let wiki = wiki(RecordingTransport::replying(&[r#"{"login":{"result":"Success"}}"#]));
        wiki.login_with_token("Alice", "secret", "tok").unwrap();
        assert_eq!(wiki.transport.forms()[0]["lgtoken"], "tok");
    }

    #[test]
    fn empty_login_arguments_send_nothing() {
        let wiki = wiki(RecordingTransport::default());
        assert!(matches!(wiki.login("", "secret"), Err(MediaWikiError::InvalidArgument(_))));
        assert!(matches!(wiki.login("Alice", ""), Err(MediaWikiError::InvalidArgument(_))));
        assert!(matches!(
            wiki.login_with_token("Alice", "secret", ""),
            Err(MediaWikiError::InvalidArgument(_))
        ));
        assert!(wiki.transport.forms().is_empty());
    }

    #[test]
    fn logout_makes_one_call() {
        let wiki = wiki(RecordingTransport::replying(&["{}"]));
        wiki.logout().unwrap();
        let forms = wiki.transport.forms();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0]["action"], "logout");
    }

    #[test]
    fn transport_failure_aborts_operation() {
        let transport = RecordingTransport::default();
        transport.responses.borrow_mut().push_back(Err(MediaWikiError::request(
            std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"),
        )));
        let wiki = wiki(transport);
        let err = wiki.user_data("Alice").unwrap_err();
        assert!(matches!(err, MediaWikiError::Request(_)));
    }

    #[test]
    fn perform_json_request_overrides_envelope_keys() {
        let wiki = wiki(RecordingTransport::replying(&[r#"{"parse":{"title":"Main Page"}}"#]));
        let params = Params::from([("format", "php"), ("action", "query"), ("page", "Main Page")]);
        let payload = wiki.perform_json_request("PARSE", &params).unwrap();
        assert_eq!(payload["title"], "Main Page");

        let form = &wiki.transport.forms()[0];
        assert_eq!(form["format"], "json");
        assert_eq!(form["action"], "parse");
    }

    #[test]
    fn perform_request_posts_params_verbatim() {
        let wiki = wiki(RecordingTransport::replying(&["<?xml version=\"1.0\"?><api />"]));
        let params = Params::from([("action", "query"), ("format", "xml")]);
        let body = wiki.perform_request(&params).unwrap();
        assert!(body.starts_with("<?xml"));

        let requests = wiki.transport.requests.borrow();
        assert_eq!(requests[0].body, "action=query&format=xml");
        assert_eq!(requests[0].header("User-Agent"), Some("session-tests/0.1"));
    }

    #[test]
    fn contrib_count_and_first_edit_use_one_call_each() {
        let wiki = wiki(RecordingTransport::replying(&[
            r#"{"query":{"usercontribs":[{"timestamp":"2005-07-01T00:00:00Z"},{"timestamp":"2005-08-01T00:00:00Z"}]}}"#,
            r#"{"query":{"usercontribs":[]}}"#,
        ]));
        let query = ContribQuery::new("Alice", NonZeroU32::new(2).unwrap());
        assert_eq!(wiki.contrib_count(&query).unwrap(), 2);
        assert_eq!(wiki.first_edit("Bob").unwrap(), None);
        assert_eq!(wiki.transport.forms().len(), 2);
    }

    #[test]
    fn token_reads_typed_field() {
        let wiki = wiki(RecordingTransport::replying(&[r#"{"tokens":{"edittoken":"+\\"}}"#]));
        assert_eq!(wiki.token(TokenType::Edit).unwrap(), "+\\");
    }

    #[test]
    fn debug_hides_transport() {
        let wiki = wiki(RecordingTransport::default());
        let rendered = format!("{wiki:?}");
        assert!(rendered.contains("wiki.example.org"));
        wiki.close();
    }
}
