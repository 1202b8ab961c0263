use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::token_store::{InMemorySingleUseReferenceProvider, ReferenceTokenProvider};

/// Default authorization endpoint path.
pub const DEFAULT_AUTHORIZE_ENDPOINT_PATH: &str = "/authorize";

/// Default token endpoint path.
pub const DEFAULT_TOKEN_ENDPOINT_PATH: &str = "/token";

/// Default lifetime of an authorization code.
pub const DEFAULT_AUTHORIZATION_CODE_EXPIRE_TIME_SPAN: Duration = Duration::from_secs(5 * 60);

/// Default lifetime of an access token.
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_TIME_SPAN: Duration = Duration::from_secs(20 * 60);

/// Default lifetime of a refresh token.
pub const DEFAULT_REFRESH_TOKEN_EXPIRE_TIME_SPAN: Duration = Duration::from_secs(24 * 60 * 60);

/// What the server knows about an accepted client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    /// Secret the client must present at the token endpoint, `None` for public clients.
    pub client_secret: Option<String>,
    /// The only redirect URI the client may use.
    pub redirect_uri: String,
}

impl ClientRegistration {
    /// A confidential client with a secret.
    pub fn confidential(client_secret: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_secret: Some(client_secret.into()),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// A public client without secret.
    pub fn public(redirect_uri: impl Into<String>) -> Self {
        Self {
            client_secret: None,
            redirect_uri: redirect_uri.into(),
        }
    }
}

type ValidateClientFn = dyn Fn(&str) -> Option<ClientRegistration> + Send + Sync;

/// Application callbacks consulted by the endpoints.
///
/// The client validation callback receives the client id and answers `Some` with the
/// registration when the client is accepted, `None` otherwise.
#[derive(Clone)]
pub struct AuthorizationServerProvider {
    on_validate_client: Arc<ValidateClientFn>,
}

impl AuthorizationServerProvider {
    /// A provider that rejects every client.
    pub fn new() -> Self {
        Self {
            on_validate_client: Arc::new(|_| None),
        }
    }

    /// Replaces the client validation callback.
    #[must_use]
    pub fn with_validate_client<F>(mut self, validate: F) -> Self
    where
        F: Fn(&str) -> Option<ClientRegistration> + Send + Sync + 'static,
    {
        self.set_validate_client(validate);
        self
    }

    /// Replaces the client validation callback in place.
    pub fn set_validate_client<F>(&mut self, validate: F)
    where
        F: Fn(&str) -> Option<ClientRegistration> + Send + Sync + 'static,
    {
        self.on_validate_client = Arc::new(validate);
    }

    /// Looks up a client.
    pub fn validate_client(&self, client_id: &str) -> Option<ClientRegistration> {
        (self.on_validate_client)(client_id)
    }
}

impl Default for AuthorizationServerProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AuthorizationServerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationServerProvider")
            .finish_non_exhaustive()
    }
}

/// Configuration of the embedded authorization server.
///
/// All fields are public so a test can tweak any of them before the server starts.
#[derive(Clone)]
pub struct AuthorizationServerOptions {
    /// Path of the authorization endpoint.
    pub authorize_endpoint_path: String,
    /// Path of the token endpoint.
    pub token_endpoint_path: String,
    /// Application callbacks.
    pub provider: AuthorizationServerProvider,
    /// Store behind authorization codes.
    pub authorization_code_provider: Arc<dyn ReferenceTokenProvider>,
    /// Store behind refresh tokens, refresh tokens are not issued when `None`.
    pub refresh_token_provider: Option<Arc<dyn ReferenceTokenProvider>>,
    /// Time source for issuing and expiring grants.
    pub system_clock: Arc<dyn Clock>,
    /// How long an authorization code stays redeemable.
    pub authorization_code_expire_time_span: Duration,
    /// Advertised access token lifetime.
    pub access_token_expire_time_span: Duration,
    /// How long a refresh token stays redeemable.
    pub refresh_token_expire_time_span: Duration,
}

impl Default for AuthorizationServerOptions {
    fn default() -> Self {
        Self {
            authorize_endpoint_path: DEFAULT_AUTHORIZE_ENDPOINT_PATH.to_string(),
            token_endpoint_path: DEFAULT_TOKEN_ENDPOINT_PATH.to_string(),
            provider: AuthorizationServerProvider::default(),
            authorization_code_provider: Arc::new(InMemorySingleUseReferenceProvider::new()),
            refresh_token_provider: None,
            system_clock: Arc::new(SystemClock),
            authorization_code_expire_time_span: DEFAULT_AUTHORIZATION_CODE_EXPIRE_TIME_SPAN,
            access_token_expire_time_span: DEFAULT_ACCESS_TOKEN_EXPIRE_TIME_SPAN,
            refresh_token_expire_time_span: DEFAULT_REFRESH_TOKEN_EXPIRE_TIME_SPAN,
        }
    }
}

impl fmt::Debug for AuthorizationServerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationServerOptions")
            .field("authorize_endpoint_path", &self.authorize_endpoint_path)
            .field("token_endpoint_path", &self.token_endpoint_path)
            .field("provider", &self.provider)
            .field(
                "refresh_tokens",
                &self.refresh_token_provider.is_some(),
            )
            .field("now", &self.system_clock.now())
            .field(
                "authorization_code_expire_time_span",
                &self.authorization_code_expire_time_span,
            )
            .field(
                "access_token_expire_time_span",
                &self.access_token_expire_time_span,
            )
            .field(
                "refresh_token_expire_time_span",
                &self.refresh_token_expire_time_span,
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_should_reject_everyone() {
        let provider = AuthorizationServerProvider::default();

        assert_eq!(provider.validate_client("alpha"), None);
    }

    #[test]
    fn should_replace_validate_client_callback() {
        let provider = AuthorizationServerProvider::new().with_validate_client(|client_id| {
            (client_id == "alpha").then(|| ClientRegistration::public("http://gamma.com/return"))
        });

        assert_eq!(
            provider.validate_client("alpha"),
            Some(ClientRegistration {
                client_secret: None,
                redirect_uri: "http://gamma.com/return".to_string(),
            })
        );
        assert_eq!(provider.validate_client("omega"), None);
    }

    #[test]
    fn should_have_sensible_defaults() {
        let options = AuthorizationServerOptions::default();

        assert_eq!(options.authorize_endpoint_path, "/authorize");
        assert_eq!(options.token_endpoint_path, "/token");
        assert!(options.refresh_token_provider.is_none());
        assert_eq!(
            options.authorization_code_expire_time_span,
            Duration::from_secs(300)
        );
        assert_eq!(
            options.access_token_expire_time_span,
            Duration::from_secs(1200)
        );
    }
}
