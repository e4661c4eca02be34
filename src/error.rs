// Error types shared by the library modules. Each enum maps to one class
// of operator-visible failure; handlers turn them into messages and exit
// codes, nothing here is retried automatically.

use std::path::PathBuf;

use thiserror::Error;

/// Missing or invalid app identity. Fatal before dispatch.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write default config file {path}: {source}")]
    WriteTemplate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config is incomplete: {0} is empty")]
    Incomplete(&'static str),

    #[error("Invalid proxy address {0}")]
    InvalidProxy(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failures loading or saving the stored access credential.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("No stored credential at {0} - run `auth` first")]
    NotFound(PathBuf),

    #[error("Failed to read credential file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode credential file {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write credential file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Stored credential is incomplete: token or secret is empty")]
    Unusable,
}

/// Failures talking to the platform.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - credentials rejected: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Client is missing access credentials")]
    MissingAccess,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(serde::Deserialize)]
struct PlatformErrors {
    errors: Vec<PlatformError>,
}

#[derive(serde::Deserialize)]
struct PlatformError {
    #[serde(default)]
    code: i64,
    message: String,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Prefer the platform's `{"errors":[...]}` messages over the raw body.
    fn describe_body(body: &str) -> String {
        match serde_json::from_str::<PlatformErrors>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => parsed
                .errors
                .iter()
                .map(|e| format!("{} (code {})", e.message, e.code))
                .collect::<Vec<_>>()
                .join("; "),
            _ => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::describe_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(detail),
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }
}

/// Failures of the PIN handshake.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Cannot start handshake: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to obtain request token: {0}")]
    HandshakeInit(ApiError),

    #[error("Token endpoint returned an empty request token")]
    EmptyRequestToken,

    #[error("No handshake in progress - request an authorization URL first")]
    NoPendingRequestToken,

    #[error("PIN code is empty")]
    EmptyPin,

    #[error("PIN exchange failed: {0}")]
    PinExchange(ApiError),

    #[error("Token exchange returned an empty access token")]
    EmptyAccessToken,
}

/// Invalid or unreadable operator response to a prompt.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input is empty")]
    Empty,
}

/// Failure of a paginated listing; operator decline is not an error.
#[derive(Error, Debug)]
pub enum ListError {
    #[error("Page request failed: {0}")]
    Remote(#[from] ApiError),

    #[error("Continue prompt failed: {0}")]
    Input(#[from] InputError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_maps_common_codes() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "nope"),
            ApiError::AccessDenied(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_from_status_extracts_platform_message() {
        let body = r#"{"errors":[{"code":89,"message":"Invalid or expired token."}]}"#;
        match ApiError::from_status(StatusCode::UNAUTHORIZED, body) {
            ApiError::Unauthorized(detail) => {
                assert_eq!(detail, "Invalid or expired token. (code 89)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 520 total bytes)"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
