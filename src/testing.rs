// Test doubles shared by the unit tests: a recording API client and a UI
// that replays scripted answers.

use std::collections::VecDeque;

use crate::api::{AccessGrant, ApiClient, Cursor, Page, RequestToken, SearchResult, Status, User};
use crate::error::{ApiError, InputError};
use crate::oauth::KeyPair;
use crate::ui::Ui;

#[derive(Default)]
pub struct MockApi {
    /// `None` makes the request-token call fail.
    pub request_token: Option<RequestToken>,
    /// `None` makes the exchange fail as if the PIN were rejected.
    pub grant: Option<AccessGrant>,
    pub search: Option<SearchResult>,
    pub post_fails: bool,
    pub users: Vec<User>,
    pub pages: VecDeque<Result<Page<User>, ApiError>>,

    pub calls: Vec<String>,
    pub access: Option<(String, String)>,
    pub cursors: Vec<Option<String>>,
    pub follower_targets: Vec<Option<String>>,
    pub pins: Vec<String>,
}

impl MockApi {
    pub fn called(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == name).count()
    }
}

pub fn grant(token: &str, secret: &str, screen_name: Option<&str>) -> AccessGrant {
    let mut grant = AccessGrant {
        token: KeyPair::new(token, secret),
        ..AccessGrant::default()
    };
    if let Some(name) = screen_name {
        grant
            .values
            .insert("screen_name".into(), vec![name.to_string()]);
    }
    grant
}

pub fn user(screen_name: &str, name: &str) -> User {
    User {
        screen_name: screen_name.into(),
        name: name.into(),
        ..User::default()
    }
}

pub fn page(names: &[&str], cursor: i64) -> Result<Page<User>, ApiError> {
    Ok(Page {
        items: names.iter().map(|n| user(n, &n.to_uppercase())).collect(),
        next_cursor: Cursor::new(cursor),
    })
}

impl ApiClient for MockApi {
    fn request_token(&mut self) -> Result<RequestToken, ApiError> {
        self.calls.push("request_token".into());
        self.request_token
            .clone()
            .ok_or_else(|| ApiError::ServerError("token endpoint down".into()))
    }

    fn authorize_url(&self, request: &RequestToken) -> String {
        format!("https://example.test/authorize?oauth_token={}", request.key)
    }

    fn access_token(&mut self, request: &RequestToken, pin: &str) -> Result<AccessGrant, ApiError> {
        self.calls.push("access_token".into());
        self.pins.push(format!("{}:{}", request.key, pin));
        self.grant
            .clone()
            .ok_or_else(|| ApiError::Unauthorized("Invalid PIN".into()))
    }

    fn set_access(&mut self, token: &str, secret: &str) {
        self.access = Some((token.to_string(), secret.to_string()));
    }

    fn search(&mut self, _query: &str) -> Result<SearchResult, ApiError> {
        self.calls.push("search".into());
        self.search
            .clone()
            .ok_or_else(|| ApiError::ServerError("search down".into()))
    }

    fn post_status(&mut self, text: &str) -> Result<Status, ApiError> {
        self.calls.push("post_status".into());
        if self.post_fails {
            return Err(ApiError::AccessDenied("duplicate status".into()));
        }
        Ok(Status {
            id_str: "42".into(),
            text: text.to_string(),
            ..Status::default()
        })
    }

    fn lookup_users(&mut self, _screen_name: &str) -> Result<Vec<User>, ApiError> {
        self.calls.push("lookup_users".into());
        Ok(self.users.clone())
    }

    fn followers_page(
        &mut self,
        screen_name: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Page<User>, ApiError> {
        self.calls.push("followers_page".into());
        self.follower_targets.push(screen_name.map(str::to_string));
        self.cursors.push(cursor.map(str::to_string));
        self.pages
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::ServerError("no more scripted pages".into())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Output,
    Info,
    Warn,
    Error,
}

/// Replays answers in order; running out behaves like end of input.
#[derive(Default)]
pub struct ScriptedUi {
    pub answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub lines: Vec<(Level, String)>,
}

impl ScriptedUi {
    pub fn with_answers(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn lines_at(&self, level: Level) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, m)| m.contains(needle))
    }
}

impl Ui for ScriptedUi {
    fn ask(&mut self, prompt: &str) -> Result<String, InputError> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .map(|a| a.trim().to_string())
            .ok_or_else(|| {
                InputError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "no scripted answer",
                ))
            })
    }

    fn output(&mut self, msg: &str) {
        self.lines.push((Level::Output, msg.to_string()));
    }

    fn info(&mut self, msg: &str) {
        self.lines.push((Level::Info, msg.to_string()));
    }

    fn warn(&mut self, msg: &str) {
        self.lines.push((Level::Warn, msg.to_string()));
    }

    fn error(&mut self, msg: &str) {
        self.lines.push((Level::Error, msg.to_string()));
    }
}
