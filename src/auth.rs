// PIN-based OAuth handshake.
//
// `Idle -> RequestTokenObtained -> Authenticated`, or `Failed` when any
// step errors. A failed session goes back to `Idle` on the next
// `begin_handshake`. The request token only ever lives in this struct and
// is consumed by the first exchange attempt, successful or not.

use tracing::{debug, info, warn};

use crate::api::{ApiClient, RequestToken};
use crate::config::AppConfig;
use crate::credential::{Credential, CredentialStore};
use crate::error::{AuthError, CredentialError};

#[derive(Debug, Default)]
pub enum HandshakeState {
    #[default]
    Idle,
    RequestTokenObtained(RequestToken),
    Authenticated(Credential),
    Failed,
}

/// A completed exchange. `saved` carries the persistence result; a save
/// failure does not undo the authentication.
#[derive(Debug)]
pub struct Authenticated {
    pub credential: Credential,
    pub saved: Result<(), CredentialError>,
}

pub struct AuthSession<'s> {
    store: &'s CredentialStore,
    state: HandshakeState,
}

impl<'s> AuthSession<'s> {
    pub fn new(store: &'s CredentialStore) -> Self {
        Self {
            store,
            state: HandshakeState::Idle,
        }
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, HandshakeState::Authenticated(_))
    }

    /// Drop any pending request token and go back to `Idle`.
    pub fn reset(&mut self) {
        self.state = HandshakeState::Idle;
    }

    /// Obtain a fresh request token and return the URL the operator must
    /// visit to get a PIN. Any earlier request token is discarded.
    pub fn begin_handshake(
        &mut self,
        api: &mut dyn ApiClient,
        config: &AppConfig,
    ) -> Result<String, AuthError> {
        self.reset();

        if let Err(e) = config.validate() {
            self.state = HandshakeState::Failed;
            return Err(e.into());
        }

        let request = match api.request_token() {
            Ok(token) => token,
            Err(e) => {
                self.state = HandshakeState::Failed;
                return Err(AuthError::HandshakeInit(e));
            }
        };
        if request.key.is_empty() || request.secret.is_empty() {
            self.state = HandshakeState::Failed;
            return Err(AuthError::EmptyRequestToken);
        }

        let url = api.authorize_url(&request);
        debug!("request token obtained");
        self.state = HandshakeState::RequestTokenObtained(request);
        Ok(url)
    }

    /// Exchange the pending request token plus `pin` for an access token,
    /// persist it, and install it into `api`.
    pub fn complete_pin(
        &mut self,
        api: &mut dyn ApiClient,
        pin: &str,
    ) -> Result<Authenticated, AuthError> {
        let request = match std::mem::replace(&mut self.state, HandshakeState::Failed) {
            HandshakeState::RequestTokenObtained(request) => request,
            other => {
                self.state = other;
                return Err(AuthError::NoPendingRequestToken);
            }
        };

        let pin = pin.trim();
        if pin.is_empty() {
            return Err(AuthError::EmptyPin);
        }

        let grant = api.access_token(&request, pin).map_err(AuthError::PinExchange)?;
        if grant.token.key.is_empty() || grant.token.secret.is_empty() {
            return Err(AuthError::EmptyAccessToken);
        }

        let credential = Credential::new(
            grant.screen_name(),
            grant.token.key.as_str(),
            grant.token.secret.as_str(),
        );
        api.set_access(&credential.token, &credential.secret);

        if self.store.exists() {
            warn!(path = %self.store.path().display(), "replacing stored credential");
        }
        let saved = self.store.save(&credential);
        match &saved {
            Ok(()) => info!(name = %credential.display_name, "authenticated and saved credential"),
            Err(e) => warn!(error = %e, "authenticated but failed to save credential"),
        }

        self.state = HandshakeState::Authenticated(credential.clone());
        Ok(Authenticated { credential, saved })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::oauth::KeyPair;
    use crate::testing::{grant, MockApi};

    fn setup() -> (tempfile::TempDir, CredentialStore, AppConfig) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credential.json"));
        (dir, store, AppConfig::new("ck", "cs"))
    }

    #[test]
    fn test_full_handshake_saves_credential() {
        let (_dir, store, config) = setup();
        let mut api = MockApi {
            request_token: Some(KeyPair::new("req", "req-secret")),
            grant: Some(grant("acc", "acc-secret", Some("alice"))),
            ..MockApi::default()
        };
        let mut session = AuthSession::new(&store);

        let url = session.begin_handshake(&mut api, &config).unwrap();
        assert_eq!(url, "https://example.test/authorize?oauth_token=req");
        assert!(matches!(session.state(), HandshakeState::RequestTokenObtained(_)));

        let done = session.complete_pin(&mut api, " 1234567 ").unwrap();
        assert!(done.saved.is_ok());
        assert_eq!(done.credential, Credential::new("alice", "acc", "acc-secret"));
        assert!(session.is_authenticated());
        assert_eq!(api.pins, vec!["req:1234567"]);
        assert_eq!(api.access, Some(("acc".into(), "acc-secret".into())));
        assert_eq!(store.load().unwrap(), done.credential);
    }

    #[test]
    fn test_missing_screen_name_is_empty_not_error() {
        let (_dir, store, config) = setup();
        let mut api = MockApi {
            request_token: Some(KeyPair::new("req", "rs")),
            grant: Some(grant("acc", "as", None)),
            ..MockApi::default()
        };
        let mut session = AuthSession::new(&store);
        session.begin_handshake(&mut api, &config).unwrap();

        let done = session.complete_pin(&mut api, "1").unwrap();
        assert_eq!(done.credential.display_name, "");
    }

    #[test]
    fn test_empty_consumer_key_fails_before_network() {
        let (_dir, store, _) = setup();
        let mut api = MockApi {
            request_token: Some(KeyPair::new("req", "rs")),
            ..MockApi::default()
        };
        let mut session = AuthSession::new(&store);

        let err = session
            .begin_handshake(&mut api, &AppConfig::new("", "cs"))
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidConfig(ConfigError::Incomplete("consumer_key"))
        ));
        assert!(api.calls.is_empty());
        assert!(matches!(session.state(), HandshakeState::Failed));
    }

    #[test]
    fn test_unreachable_token_endpoint() {
        let (_dir, store, config) = setup();
        let mut api = MockApi::default();
        let mut session = AuthSession::new(&store);

        assert!(matches!(
            session.begin_handshake(&mut api, &config),
            Err(AuthError::HandshakeInit(_))
        ));
        assert_eq!(api.called("request_token"), 1);
    }

    #[test]
    fn test_empty_request_token_rejected() {
        let (_dir, store, config) = setup();
        let mut api = MockApi {
            request_token: Some(KeyPair::new("", "")),
            ..MockApi::default()
        };
        let mut session = AuthSession::new(&store);

        assert!(matches!(
            session.begin_handshake(&mut api, &config),
            Err(AuthError::EmptyRequestToken)
        ));
        assert!(matches!(
            session.complete_pin(&mut api, "123"),
            Err(AuthError::NoPendingRequestToken)
        ));
    }

    #[test]
    fn test_complete_pin_without_begin_fails() {
        let (_dir, store, _) = setup();
        let mut api = MockApi {
            grant: Some(grant("acc", "as", Some("alice"))),
            ..MockApi::default()
        };
        let mut session = AuthSession::new(&store);

        assert!(matches!(
            session.complete_pin(&mut api, "123"),
            Err(AuthError::NoPendingRequestToken)
        ));
        assert!(api.calls.is_empty());
        assert!(matches!(session.state(), HandshakeState::Idle));
        assert!(!store.exists());
    }

    #[test]
    fn test_rejected_pin_invalidates_request_token() {
        let (_dir, store, config) = setup();
        let mut api = MockApi {
            request_token: Some(KeyPair::new("req", "rs")),
            ..MockApi::default()
        };
        let mut session = AuthSession::new(&store);
        session.begin_handshake(&mut api, &config).unwrap();

        assert!(matches!(
            session.complete_pin(&mut api, "000"),
            Err(AuthError::PinExchange(_))
        ));
        assert!(matches!(session.state(), HandshakeState::Failed));

        // A retry with the right PIN needs a fresh handshake
        api.grant = Some(grant("acc", "as", Some("alice")));
        assert!(matches!(
            session.complete_pin(&mut api, "111"),
            Err(AuthError::NoPendingRequestToken)
        ));
        assert_eq!(api.called("access_token"), 1);

        session.begin_handshake(&mut api, &config).unwrap();
        assert!(session.complete_pin(&mut api, "111").is_ok());
    }

    #[test]
    fn test_empty_pin_consumes_request_token() {
        let (_dir, store, config) = setup();
        let mut api = MockApi {
            request_token: Some(KeyPair::new("req", "rs")),
            grant: Some(grant("acc", "as", None)),
            ..MockApi::default()
        };
        let mut session = AuthSession::new(&store);
        session.begin_handshake(&mut api, &config).unwrap();

        assert!(matches!(
            session.complete_pin(&mut api, "  "),
            Err(AuthError::EmptyPin)
        ));
        assert!(matches!(session.state(), HandshakeState::Failed));
        assert_eq!(api.called("access_token"), 0);
    }

    #[test]
    fn test_empty_access_token_is_failure() {
        let (_dir, store, config) = setup();
        let mut api = MockApi {
            request_token: Some(KeyPair::new("req", "rs")),
            grant: Some(grant("acc", "", Some("alice"))),
            ..MockApi::default()
        };
        let mut session = AuthSession::new(&store);
        session.begin_handshake(&mut api, &config).unwrap();

        assert!(matches!(
            session.complete_pin(&mut api, "1"),
            Err(AuthError::EmptyAccessToken)
        ));
        assert!(!store.exists());
        assert!(api.access.is_none());
    }

    #[test]
    fn test_save_failure_keeps_authenticated_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("missing").join("credential.json"));
        let mut api = MockApi {
            request_token: Some(KeyPair::new("req", "rs")),
            grant: Some(grant("acc", "as", Some("alice"))),
            ..MockApi::default()
        };
        let mut session = AuthSession::new(&store);
        session
            .begin_handshake(&mut api, &AppConfig::new("ck", "cs"))
            .unwrap();

        let done = session.complete_pin(&mut api, "1").unwrap();
        assert!(matches!(done.saved, Err(CredentialError::Write { .. })));
        assert!(session.is_authenticated());
        assert_eq!(done.credential.display_name, "alice");
    }
}
