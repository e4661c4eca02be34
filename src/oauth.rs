// OAuth 1.0a request signing (HMAC-SHA1) for the platform's REST API.
// Produces the value of the `Authorization` header; the HTTP client adds
// it to each request.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::{distributions::Alphanumeric, Rng};
use sha1::Sha1;

use crate::error::ApiError;

/// RFC 3986 unreserved characters stay as-is, everything else is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const NONCE_LEN: usize = 32;

type HmacSha1 = Hmac<Sha1>;

pub fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// A key/secret pair: the app's consumer credentials, a request token, or
/// an access token.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct KeyPair {
    pub key: String,
    pub secret: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl KeyPair {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

/// Everything needed to sign one request.
pub struct Signer<'a> {
    pub consumer: &'a KeyPair,
    pub token: Option<&'a KeyPair>,
    /// Extra `oauth_*` protocol parameters such as `oauth_callback` or
    /// `oauth_verifier`.
    pub extra: Vec<(&'static str, String)>,
}

impl<'a> Signer<'a> {
    pub fn new(consumer: &'a KeyPair, token: Option<&'a KeyPair>) -> Self {
        Self {
            consumer,
            token,
            extra: Vec::new(),
        }
    }

    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.extra.push((name, value.into()));
        self
    }

    /// Build the `Authorization` header for `method url` with the given
    /// query/form parameters, using a fresh nonce and the current time.
    pub fn authorization(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.authorization_with(method, url, params, &nonce, timestamp)
    }

    pub fn authorization_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: u64,
    ) -> Result<String, ApiError> {
        let mut oauth_params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), self.consumer.key.clone()),
            ("oauth_nonce".into(), nonce.to_string()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), timestamp.to_string()),
            ("oauth_version".into(), "1.0".into()),
        ];
        if let Some(token) = self.token {
            oauth_params.push(("oauth_token".into(), token.key.clone()));
        }
        for (name, value) in &self.extra {
            oauth_params.push((name.to_string(), value.clone()));
        }

        let signature = self.signature(method, url, params, &oauth_params)?;
        oauth_params.push(("oauth_signature".into(), signature));
        oauth_params.sort();

        let fields = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {}", fields))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        oauth_params: &[(String, String)],
    ) -> Result<String, ApiError> {
        let base = base_string(method, url, params.iter().chain(oauth_params));
        let key = format!(
            "{}&{}",
            encode(&self.consumer.secret),
            encode(self.token.map(|t| t.secret.as_str()).unwrap_or(""))
        );
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| ApiError::InvalidResponse(format!("signing key rejected: {e}")))?;
        mac.update(base.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// `METHOD&url&params`, with parameters encoded then sorted by name and value.
fn base_string<'p>(
    method: &str,
    url: &str,
    params: impl Iterator<Item = &'p (String, String)>,
) -> String {
    let mut encoded: Vec<(String, String)> =
        params.map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();
    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&joined)
    )
}
