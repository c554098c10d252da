//! In-memory stand-in for a wiki's `api.php`.
//!
//! Implements the slice of the MediaWiki API the client uses: `query` with
//! `list=users` and `list=usercontribs`, `tokens`, and the two-step `login`
//! handshake. Answers follow the shape of real MediaWiki JSON, including
//! the `{"error":{"code":..}}` envelope for bad requests.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Form, Json, Router,
};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const API_PATH: &str = "/w/api.php";

/// Token handed out in `NeedToken` answers and expected back as `lgtoken`.
pub const LOGIN_TOKEN: &str = "b5780b6e2f27e20b450921d9461010b4";

/// What MediaWiki returns for every action token to an anonymous session.
pub const ANONYMOUS_TOKEN: &str = "+\\";

const TOKEN_TYPES: [&str; 14] = [
    "block",
    "centralauth",
    "delete",
    "deleteglobalaccount",
    "edit",
    "email",
    "import",
    "move",
    "options",
    "patrol",
    "protect",
    "setglobalaccountstatus",
    "unblock",
    "watch",
];

const DEFAULT_UCLIMIT: usize = 10;
const MAX_UCLIMIT: usize = 500;

#[derive(Clone, Debug)]
pub struct Contribution {
    pub namespace: u32,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct MockUser {
    pub id: u64,
    pub name: String,
    pub password: String,
    pub registration: DateTime<Utc>,
    pub contributions: Vec<Contribution>,
}

#[derive(Clone, Debug, Default)]
pub struct Wiki {
    pub users: Vec<MockUser>,
}

impl Wiki {
    /// Two users: `Alice` with six edits between July 2005 and March 2006,
    /// and `Bob` with none.
    pub fn seeded() -> Self {
        let edit = |namespace, title: &str, y, m, d, h, min| Contribution {
            namespace,
            title: title.to_string(),
            timestamp: utc(y, m, d, h, min),
        };
        Self {
            users: vec![
                MockUser {
                    id: 1,
                    name: "Alice".to_string(),
                    password: "wonderland".to_string(),
                    registration: utc(2005, 6, 1, 12, 0),
                    contributions: vec![
                        edit(0, "Rabbit hole", 2005, 7, 4, 8, 30),
                        edit(1, "Talk:Rabbit hole", 2005, 10, 15, 10, 0),
                        edit(0, "Tea party", 2005, 11, 20, 9, 15),
                        edit(2, "User:Alice", 2005, 12, 24, 18, 0),
                        edit(0, "Queen of Hearts", 2006, 1, 15, 0, 0),
                        edit(10, "Template:Cheshire", 2006, 3, 1, 12, 0),
                    ],
                },
                MockUser {
                    id: 2,
                    name: "Bob".to_string(),
                    password: "builder".to_string(),
                    registration: utc(2006, 2, 1, 0, 0),
                    contributions: Vec::new(),
                },
            ],
        }
    }

    fn user(&self, name: &str) -> Option<&MockUser> {
        self.users.iter().find(|u| u.name == name)
    }
}

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub type Db = Arc<Wiki>;

type Params = HashMap<String, String>;

pub fn app() -> Router {
    app_with(Wiki::seeded())
}

pub fn app_with(wiki: Wiki) -> Router {
    Router::new()
        .route(API_PATH, post(api))
        .with_state(Arc::new(wiki))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn api(
    State(db): State<Db>,
    headers: HeaderMap,
    Form(params): Form<Params>,
) -> Result<Json<Value>, (StatusCode, &'static str)> {
    if !headers.contains_key(header::USER_AGENT) {
        return Err((
            StatusCode::FORBIDDEN,
            "Scripts should use an informative User-Agent string",
        ));
    }
    tracing::debug!(?params, "api request");

    let answer = match params.get("format").map(String::as_str) {
        Some("json") => dispatch(&db, &params),
        _ => Err(ApiError::new("unknown_format", "Only format=json is supported")),
    };
    Ok(Json(answer.unwrap_or_else(ApiError::into_json)))
}

/// A failure rendered in MediaWiki's error envelope.
#[derive(Debug)]
struct ApiError {
    code: &'static str,
    info: String,
}

impl ApiError {
    fn new(code: &'static str, info: impl Into<String>) -> Self {
        Self {
            code,
            info: info.into(),
        }
    }

    fn into_json(self) -> Value {
        json!({ "error": { "code": self.code, "info": self.info } })
    }
}

fn dispatch(wiki: &Wiki, params: &Params) -> Result<Value, ApiError> {
    match params.get("action").map(String::as_str) {
        Some("query") => query(wiki, params),
        Some("tokens") => tokens(params),
        Some("login") => login(wiki, params),
        // Logging out always succeeds, even for anonymous sessions.
        Some("logout") => Ok(json!({})),
        Some(other) => Err(ApiError::new(
            "unknown_action",
            format!("Unrecognized value for parameter 'action': {other}"),
        )),
        None => Err(ApiError::new("help", "No action given")),
    }
}

fn required<'a>(params: &'a Params, name: &str) -> Result<&'a str, ApiError> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::new("missingparam", format!("The {name} parameter must be set")))
}

fn query(wiki: &Wiki, params: &Params) -> Result<Value, ApiError> {
    let payload = match params.get("list").map(String::as_str) {
        None => return Ok(json!({ "batchcomplete": "" })),
        Some("users") => json!({ "users": list_users(wiki, params) }),
        Some("usercontribs") => json!({ "usercontribs": list_usercontribs(wiki, params)? }),
        Some(other) => {
            return Err(ApiError::new(
                "unknown_list",
                format!("Unrecognized value for parameter 'list': {other}"),
            ))
        }
    };
    Ok(json!({ "batchcomplete": "", "query": payload }))
}

#[derive(Serialize)]
#[serde(untagged)]
enum UserEntry {
    Found {
        userid: u64,
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        registration: Option<String>,
    },
    Missing {
        name: String,
        missing: &'static str,
    },
}

fn list_users(wiki: &Wiki, params: &Params) -> Vec<UserEntry> {
    let with_registration = params
        .get("usprop")
        .is_some_and(|p| p.split('|').any(|p| p == "registration"));
    params
        .get("ususers")
        .map(String::as_str)
        .unwrap_or_default()
        .split('|')
        .filter(|n| !n.is_empty())
        .map(|name| match wiki.user(name) {
            Some(user) => UserEntry::Found {
                userid: user.id,
                name: user.name.clone(),
                registration: with_registration.then(|| timestamp(&user.registration)),
            },
            None => UserEntry::Missing {
                name: name.to_string(),
                missing: "",
            },
        })
        .collect()
}

#[derive(Serialize)]
struct ContribEntry {
    userid: u64,
    user: String,
    ns: u32,
    title: String,
    timestamp: String,
}

fn list_usercontribs(wiki: &Wiki, params: &Params) -> Result<Vec<ContribEntry>, ApiError> {
    let name = required(params, "ucuser")?;
    let limit = match params.get("uclimit") {
        None => DEFAULT_UCLIMIT,
        Some(raw) if raw == "max" => MAX_UCLIMIT,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::new("badinteger", format!("Invalid value \"{raw}\" for integer parameter uclimit")))?
            .clamp(1, MAX_UCLIMIT),
    };
    let newer = match params.get("ucdir").map(String::as_str) {
        None | Some("older") => false,
        Some("newer") => true,
        Some(other) => {
            return Err(ApiError::new(
                "badvalue",
                format!("Unrecognized value for parameter 'ucdir': {other}"),
            ))
        }
    };
    let namespaces = match params.get("ucnamespace") {
        None => None,
        Some(raw) => Some(
            raw.split('|')
                .map(|id| {
                    id.parse::<u32>()
                        .map_err(|_| ApiError::new("badvalue", format!("Unrecognized namespace {id}")))
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };
    let start = optional_timestamp(params, "ucstart")?;
    let end = optional_timestamp(params, "ucend")?;

    // ucstart is where enumeration begins, so with ucdir=older it is the
    // newest bound and with ucdir=newer the oldest.
    let (oldest, newest) = if newer { (start, end) } else { (end, start) };

    let Some(user) = wiki.user(name) else {
        return Ok(Vec::new());
    };
    let mut contribs: Vec<&Contribution> = user
        .contributions
        .iter()
        .filter(|c| namespaces.as_ref().is_none_or(|ns| ns.contains(&c.namespace)))
        .filter(|c| oldest.is_none_or(|t| c.timestamp >= t))
        .filter(|c| newest.is_none_or(|t| c.timestamp <= t))
        .collect();
    contribs.sort_by_key(|c| c.timestamp);
    if !newer {
        contribs.reverse();
    }

    Ok(contribs
        .into_iter()
        .take(limit)
        .map(|c| ContribEntry {
            userid: user.id,
            user: user.name.clone(),
            ns: c.namespace,
            title: c.title.clone(),
            timestamp: timestamp(&c.timestamp),
        })
        .collect())
}

fn optional_timestamp(params: &Params, name: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    params
        .get(name)
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| ApiError::new("badtimestamp", format!("Invalid value \"{raw}\" for timestamp parameter {name}")))
        })
        .transpose()
}

fn tokens(params: &Params) -> Result<Value, ApiError> {
    let requested = params.get("type").map(String::as_str).unwrap_or("edit");
    let mut fields = serde_json::Map::new();
    for kind in requested.split('|') {
        if !TOKEN_TYPES.contains(&kind) {
            return Err(ApiError::new(
                "unknown_type",
                format!("Unrecognized value for parameter 'type': {kind}"),
            ));
        }
        fields.insert(format!("{kind}token"), Value::from(ANONYMOUS_TOKEN));
    }
    Ok(json!({ "tokens": fields }))
}

fn login(wiki: &Wiki, params: &Params) -> Result<Value, ApiError> {
    let Some(name) = params.get("lgname").filter(|n| !n.is_empty()) else {
        return Ok(json!({ "login": { "result": "NoName" } }));
    };
    let Some(token) = params.get("lgtoken") else {
        return Ok(json!({
            "login": {
                "result": "NeedToken",
                "token": LOGIN_TOKEN,
                "cookieprefix": "mockwiki",
                "sessionid": "17ab96bd8ffbe8ca58a78657a918558e",
            }
        }));
    };
    if token != LOGIN_TOKEN {
        return Ok(json!({ "login": { "result": "WrongToken" } }));
    }
    let Some(user) = wiki.user(name) else {
        return Ok(json!({ "login": { "result": "NotExists" } }));
    };
    let password = params.get("lgpassword").map(String::as_str).unwrap_or_default();
    if password.is_empty() {
        return Ok(json!({ "login": { "result": "EmptyPass" } }));
    }
    if password != user.password {
        return Ok(json!({ "login": { "result": "WrongPass" } }));
    }
    Ok(json!({
        "login": {
            "result": "Success",
            "lguserid": user.id,
            "lgusername": user.name,
            "lgtoken": LOGIN_TOKEN,
            "cookieprefix": "mockwiki",
            "sessionid": "17ab96bd8ffbe8ca58a78657a918558e",
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn seeded_wiki_has_alice_and_bob() {
        let wiki = Wiki::seeded();
        assert_eq!(wiki.user("Alice").unwrap().contributions.len(), 6);
        assert!(wiki.user("Bob").unwrap().contributions.is_empty());
        assert!(wiki.user("Carol").is_none());
    }

    #[test]
    fn users_entry_serializes_missing_marker() {
        let wiki = Wiki::seeded();
        let entries = list_users(&wiki, &params(&[("ususers", "Carol"), ("usprop", "registration")]));
        let json = serde_json::to_value(&entries).unwrap();
        assert_eq!(json, json!([{ "name": "Carol", "missing": "" }]));
    }

    #[test]
    fn users_registration_only_when_requested() {
        let wiki = Wiki::seeded();
        let entries = list_users(&wiki, &params(&[("ususers", "Bob")]));
        let json = serde_json::to_value(&entries).unwrap();
        assert_eq!(json, json!([{ "userid": 2, "name": "Bob" }]));
    }

    #[test]
    fn usercontribs_newer_is_ascending_and_bounded() {
        let wiki = Wiki::seeded();
        let entries = list_usercontribs(
            &wiki,
            &params(&[
                ("ucuser", "Alice"),
                ("ucdir", "newer"),
                ("ucstart", "2005-11-01T00:00:00Z"),
                ("ucend", "2006-01-01T00:00:00Z"),
                ("uclimit", "50"),
            ]),
        )
        .unwrap();
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Tea party", "User:Alice"]);
    }

    #[test]
    fn usercontribs_older_is_descending() {
        let wiki = Wiki::seeded();
        let entries = list_usercontribs(&wiki, &params(&[("ucuser", "Alice"), ("uclimit", "2")])).unwrap();
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Template:Cheshire", "Queen of Hearts"]);
    }

    #[test]
    fn usercontribs_filters_namespaces() {
        let wiki = Wiki::seeded();
        let entries = list_usercontribs(
            &wiki,
            &params(&[("ucuser", "Alice"), ("ucnamespace", "1|10"), ("uclimit", "max")]),
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn usercontribs_rejects_bad_arguments() {
        let wiki = Wiki::seeded();
        let cases: [&[(&str, &str)]; 4] = [
            &[],
            &[("ucuser", "Alice"), ("uclimit", "lots")],
            &[("ucuser", "Alice"), ("ucdir", "sideways")],
            &[("ucuser", "Alice"), ("ucend", "tomorrow")],
        ];
        for case in cases {
            assert!(list_usercontribs(&wiki, &params(case)).is_err(), "{case:?}");
        }
    }

    #[test]
    fn login_walks_the_handshake() {
        let wiki = Wiki::seeded();
        let first = login(&wiki, &params(&[("lgname", "Alice"), ("lgpassword", "wonderland")])).unwrap();
        assert_eq!(first["login"]["result"], "NeedToken");
        assert_eq!(first["login"]["token"], LOGIN_TOKEN);

        let second = login(
            &wiki,
            &params(&[("lgname", "Alice"), ("lgpassword", "wonderland"), ("lgtoken", LOGIN_TOKEN)]),
        )
        .unwrap();
        assert_eq!(second["login"]["result"], "Success");
        assert_eq!(second["login"]["lguserid"], 1);
    }

    #[test]
    fn tokens_reject_unknown_types() {
        let err = tokens(&params(&[("type", "rollback")])).unwrap_err();
        assert_eq!(err.code, "unknown_type");
        let ok = tokens(&params(&[("type", "edit|watch")])).unwrap();
        assert_eq!(ok["tokens"]["watchtoken"], ANONYMOUS_TOKEN);
        let global = tokens(&params(&[("type", "centralauth|setglobalaccountstatus")])).unwrap();
        assert_eq!(global["tokens"]["centralauthtoken"], ANONYMOUS_TOKEN);
        assert_eq!(global["tokens"]["setglobalaccountstatustoken"], ANONYMOUS_TOKEN);
    }
}
