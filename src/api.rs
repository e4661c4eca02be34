// API client module: the `ApiClient` trait that the session and command
// handlers talk to, the response shapes they consume, and a blocking
// reqwest implementation for the platform's REST endpoints.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::error::{ApiError, ConfigError};
use crate::oauth::{KeyPair, Signer};

const OAUTH_BASE_URL: &str = "https://api.twitter.com/oauth";
const API_BASE_URL: &str = "https://api.twitter.com/1.1";

/// Callback value that selects the PIN (out-of-band) flow
pub const OOB_CALLBACK: &str = "oob";

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Temporary token pair returned by the request-token endpoint. Lives only
/// for a single handshake attempt.
pub type RequestToken = KeyPair;

/// Result of the token exchange: the access pair plus every other field
/// the endpoint returned, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct AccessGrant {
    pub token: KeyPair,
    pub values: HashMap<String, Vec<String>>,
}

impl AccessGrant {
    /// First entry of the `screen_name` collection, or empty if absent.
    pub fn screen_name(&self) -> &str {
        self.values
            .get("screen_name")
            .and_then(|names| names.first())
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub id_str: String,
    pub text: String,
    pub full_text: Option<String>,
    pub created_at: String,
}

impl Status {
    pub fn body(&self) -> &str {
        self.full_text.as_deref().unwrap_or(&self.text)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub statuses: Vec<Status>,
}

/// Account profile as returned by lookup and listing endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id_str: String,
    pub name: String,
    pub screen_name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub created_at: String,
    pub followers_count: u64,
    pub friends_count: u64,
    pub statuses_count: u64,
    pub favourites_count: u64,
    pub listed_count: u64,
    pub protected: bool,
    pub verified: bool,
    pub lang: Option<String>,
}

/// Opaque pagination marker. `value == 0` means there are no more pages;
/// `raw` is what gets sent back as the next request's `cursor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub value: i64,
    pub raw: String,
}

impl Cursor {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            raw: value.to_string(),
        }
    }

    pub fn is_end(&self) -> bool {
        self.value == 0
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Cursor,
}

#[derive(Debug, Deserialize)]
struct UsersCursor {
    #[serde(default)]
    users: Vec<User>,
    next_cursor: i64,
    #[serde(default)]
    next_cursor_str: String,
}

impl From<UsersCursor> for Page<User> {
    fn from(page: UsersCursor) -> Self {
        let raw = if page.next_cursor_str.is_empty() {
            page.next_cursor.to_string()
        } else {
            page.next_cursor_str
        };
        Page {
            items: page.users,
            next_cursor: Cursor {
                value: page.next_cursor,
                raw,
            },
        }
    }
}

/// Operations the command layer needs from the platform.
pub trait ApiClient {
    /// Obtain a temporary request token for the PIN flow.
    fn request_token(&mut self) -> Result<RequestToken, ApiError>;

    /// URL the operator visits to approve the app and get a PIN.
    fn authorize_url(&self, request: &RequestToken) -> String;

    /// Exchange a request token and the operator's PIN for an access grant.
    fn access_token(&mut self, request: &RequestToken, pin: &str)
        -> Result<AccessGrant, ApiError>;

    /// Install the access pair used to sign every later call.
    fn set_access(&mut self, token: &str, secret: &str);

    fn search(&mut self, query: &str) -> Result<SearchResult, ApiError>;

    fn post_status(&mut self, text: &str) -> Result<Status, ApiError>;

    fn lookup_users(&mut self, screen_name: &str) -> Result<Vec<User>, ApiError>;

    /// One page of followers, of `screen_name` or the authenticated account.
    fn followers_page(
        &mut self,
        screen_name: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Page<User>, ApiError>;
}

/// Blocking client for the platform's REST API.
pub struct TwitterClient {
    client: Client,
    consumer: KeyPair,
    access: Option<KeyPair>,
    oauth_base: String,
    api_base: String,
}

impl TwitterClient {
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));
        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|_| ConfigError::InvalidProxy(proxy.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            consumer: KeyPair::new(&config.consumer_key, &config.consumer_secret),
            access: None,
            oauth_base: OAUTH_BASE_URL.to_string(),
            api_base: API_BASE_URL.to_string(),
        })
    }

    fn signed(
        &self,
        method: reqwest::Method,
        url: &str,
        params: &[(String, String)],
        signer: Signer<'_>,
    ) -> Result<RequestBuilder, ApiError> {
        let header = signer.authorization(method.as_str(), url, params)?;
        debug!(%method, url, "signed request");
        Ok(self
            .client
            .request(method, url)
            .header(AUTHORIZATION, header)
            .header(USER_AGENT, concat!("tweetpin/", env!("CARGO_PKG_VERSION"))))
    }

    fn access(&self) -> Result<&KeyPair, ApiError> {
        self.access.as_ref().ok_or(ApiError::MissingAccess)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.api_base, path);
        let signer = Signer::new(&self.consumer, Some(self.access()?));
        let res = self
            .signed(reqwest::Method::GET, &url, params, signer)?
            .query(params)
            .send()?;
        Self::decode_json(res)
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.api_base, path);
        let signer = Signer::new(&self.consumer, Some(self.access()?));
        let res = self
            .signed(reqwest::Method::POST, &url, params, signer)?
            .form(params)
            .send()?;
        Self::decode_json(res)
    }

    fn post_token_endpoint(
        &self,
        path: &str,
        signer: Signer<'_>,
    ) -> Result<HashMap<String, Vec<String>>, ApiError> {
        let url = format!("{}/{}", self.oauth_base, path);
        let res = self.signed(reqwest::Method::POST, &url, &[], signer)?.send()?;
        let status = res.status();
        let body = res.text()?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        Ok(parse_form(&body))
    }

    fn decode_json<T: DeserializeOwned>(res: reqwest::blocking::Response) -> Result<T, ApiError> {
        let status = res.status();
        let body = res.text()?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

/// Parse a form-urlencoded body, keeping repeated keys.
pub fn parse_form(body: &str) -> HashMap<String, Vec<String>> {
    let mut values: HashMap<String, Vec<String>> = HashMap::new();
    for (k, v) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        values.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    values
}

fn first(values: &HashMap<String, Vec<String>>, key: &str) -> String {
    values
        .get(key)
        .and_then(|v| v.first())
        .cloned()
        .unwrap_or_default()
}

impl ApiClient for TwitterClient {
    fn request_token(&mut self) -> Result<RequestToken, ApiError> {
        let signer = Signer::new(&self.consumer, None).with("oauth_callback", OOB_CALLBACK);
        let values = self.post_token_endpoint("request_token", signer)?;
        Ok(KeyPair::new(
            first(&values, "oauth_token"),
            first(&values, "oauth_token_secret"),
        ))
    }

    fn authorize_url(&self, request: &RequestToken) -> String {
        let mut url = format!("{}/authorize", self.oauth_base);
        url.push_str("?oauth_token=");
        url.push_str(&crate::oauth::encode(&request.key));
        url
    }

    fn access_token(
        &mut self,
        request: &RequestToken,
        pin: &str,
    ) -> Result<AccessGrant, ApiError> {
        let signer = Signer::new(&self.consumer, Some(request)).with("oauth_verifier", pin);
        let values = self.post_token_endpoint("access_token", signer)?;
        Ok(AccessGrant {
            token: KeyPair::new(
                first(&values, "oauth_token"),
                first(&values, "oauth_token_secret"),
            ),
            values,
        })
    }

    fn set_access(&mut self, token: &str, secret: &str) {
        self.access = Some(KeyPair::new(token, secret));
    }

    fn search(&mut self, query: &str) -> Result<SearchResult, ApiError> {
        let params = vec![
            ("q".to_string(), query.to_string()),
            ("tweet_mode".to_string(), "extended".to_string()),
        ];
        self.get_json("search/tweets.json", &params)
    }

    fn post_status(&mut self, text: &str) -> Result<Status, ApiError> {
        let params = vec![("status".to_string(), text.to_string())];
        self.post_json("statuses/update.json", &params)
    }

    fn lookup_users(&mut self, screen_name: &str) -> Result<Vec<User>, ApiError> {
        let params = vec![("screen_name".to_string(), screen_name.to_string())];
        self.get_json("users/lookup.json", &params)
    }

    fn followers_page(
        &mut self,
        screen_name: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Page<User>, ApiError> {
        let mut params = Vec::new();
        if let Some(name) = screen_name {
            params.push(("screen_name".to_string(), name.to_string()));
        }
        if let Some(cursor) = cursor {
            params.push(("cursor".to_string(), cursor.to_string()));
        }
        let page: UsersCursor = self.get_json("followers/list.json", &params)?;
        Ok(page.into())
    }
}
