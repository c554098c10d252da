//! Domain types for the MediaWiki API.
//!
//! # Design
//! `Namespace` and `TokenType` are closed sets with fixed wire names, so
//! they are plain enums with lookup methods rather than free-form strings.
//! `ContribQuery` collects the optional filters of a contribution count
//! in one value instead of a long positional argument list.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MediaWikiError;
use crate::timestamp::{format_api_timestamp, Period};

/// A registered wiki user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserData {
    pub name: String,
    pub id: u64,
    pub registration: DateTime<Utc>,
}

impl fmt::Display for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User[name='{}',id={},registration={}]",
            self.name,
            self.id,
            format_api_timestamp(&self.registration)
        )
    }
}

/// Token kinds understood by `action=tokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Block,
    CentralAuth,
    Delete,
    DeleteGlobalAccount,
    Edit,
    Email,
    Import,
    Move,
    Options,
    Patrol,
    Protect,
    SetGlobalAccountStatus,
    Unblock,
    Watch,
}

impl TokenType {
    pub const ALL: [TokenType; 14] = [
        Self::Block,
        Self::CentralAuth,
        Self::Delete,
        Self::DeleteGlobalAccount,
        Self::Edit,
        Self::Email,
        Self::Import,
        Self::Move,
        Self::Options,
        Self::Patrol,
        Self::Protect,
        Self::SetGlobalAccountStatus,
        Self::Unblock,
        Self::Watch,
    ];

    /// Wire name passed as `type=`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::CentralAuth => "centralauth",
            Self::Delete => "delete",
            Self::DeleteGlobalAccount => "deleteglobalaccount",
            Self::Edit => "edit",
            Self::Email => "email",
            Self::Import => "import",
            Self::Move => "move",
            Self::Options => "options",
            Self::Patrol => "patrol",
            Self::Protect => "protect",
            Self::SetGlobalAccountStatus => "setglobalaccountstatus",
            Self::Unblock => "unblock",
            Self::Watch => "watch",
        }
    }

    /// Name of the field holding the token in the `tokens` payload.
    pub fn result_field(self) -> String {
        format!("{}token", self.as_str())
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = MediaWikiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MediaWikiError::InvalidArgument(format!("unknown token type {s:?}")))
    }
}

/// The content namespaces every MediaWiki installation ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Main,
    Talk,
    User,
    UserTalk,
    Project,
    ProjectTalk,
    File,
    FileTalk,
    MediaWiki,
    MediaWikiTalk,
    Template,
    TemplateTalk,
    Help,
    HelpTalk,
    Category,
    CategoryTalk,
}

impl Namespace {
    pub const ALL: [Namespace; 16] = [
        Self::Main,
        Self::Talk,
        Self::User,
        Self::UserTalk,
        Self::Project,
        Self::ProjectTalk,
        Self::File,
        Self::FileTalk,
        Self::MediaWiki,
        Self::MediaWikiTalk,
        Self::Template,
        Self::TemplateTalk,
        Self::Help,
        Self::HelpTalk,
        Self::Category,
        Self::CategoryTalk,
    ];

    pub fn id(self) -> u32 {
        match self {
            Self::Main => 0,
            Self::Talk => 1,
            Self::User => 2,
            Self::UserTalk => 3,
            Self::Project => 4,
            Self::ProjectTalk => 5,
            Self::File => 6,
            Self::FileTalk => 7,
            Self::MediaWiki => 8,
            Self::MediaWikiTalk => 9,
            Self::Template => 10,
            Self::TemplateTalk => 11,
            Self::Help => 12,
            Self::HelpTalk => 13,
            Self::Category => 14,
            Self::CategoryTalk => 15,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.id() == id)
    }

    /// Canonical (English) namespace prefix; empty for the main namespace.
    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Main => "",
            Self::Talk => "Talk",
            Self::User => "User",
            Self::UserTalk => "User talk",
            Self::Project => "Project",
            Self::ProjectTalk => "Project talk",
            Self::File => "File",
            Self::FileTalk => "File talk",
            Self::MediaWiki => "MediaWiki",
            Self::MediaWikiTalk => "MediaWiki talk",
            Self::Template => "Template",
            Self::TemplateTalk => "Template talk",
            Self::Help => "Help",
            Self::HelpTalk => "Help talk",
            Self::Category => "Category",
            Self::CategoryTalk => "Category talk",
        }
    }

    /// Join ids with `|`, the list syntax of `ucnamespace`.
    pub fn join_ids(namespaces: &[Namespace]) -> String {
        namespaces
            .iter()
            .map(|ns| ns.id().to_string())
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("(Main)"),
            other => f.write_str(other.canonical_name()),
        }
    }
}

/// Filters for counting a user's contributions.
///
/// `end` bounds the newest edit counted; with a `period` as well, the
/// oldest edit counted is `end - period`. A period without an end is
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContribQuery {
    pub user: String,
    pub limit: NonZeroU32,
    pub namespaces: Vec<Namespace>,
    pub end: Option<DateTime<Utc>>,
    pub period: Option<Period>,
}

impl ContribQuery {
    pub fn new(user: impl Into<String>, limit: NonZeroU32) -> Self {
        Self {
            user: user.into(),
            limit,
            namespaces: Vec::new(),
            end: None,
            period: None,
        }
    }

    pub fn namespaces(mut self, namespaces: impl IntoIterator<Item = Namespace>) -> Self {
        self.namespaces = namespaces.into_iter().collect();
        self
    }

    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }
}
