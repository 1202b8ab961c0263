//! The embedded authorization server and its test-facing handle.
//!
//! The harness has two states. [`OAuth2TestServerBuilder`] is the unstarted state where
//! every option can change. [`OAuth2TestServer`] is the started state: the server
//! listens on a loopback port, its options are frozen, and requests go through
//! [`OAuth2TestServer::request`].
//!
//! ```rust,no_run
//! use oauth2_test_server::{OAuth2TestServer, TEST_CLIENT_ID, TEST_REDIRECT_URI};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = OAuth2TestServer::start().await?;
//!
//! let transaction = server
//!     .send(&format!(
//!         "/authorize?response_type=code&client_id={TEST_CLIENT_ID}&redirect_uri={TEST_REDIRECT_URI}"
//!     ))
//!     .await?;
//! let query = transaction.parse_redirect_query_string()?;
//! assert!(query.get("code").is_some());
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::middleware;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::clock::TestClock;
use crate::server::{
    self, AuthorizationServerOptions, AuthorizationServerProvider, ClientRegistration,
};
use crate::transaction::{SendRequest, Transaction};

mod embedded;
pub use self::embedded::EmbeddedServerConfig;

mod error;
pub use self::error::HarnessError;

mod hooks;
use self::hooks::HookDispatch;
pub use self::hooks::{HookChain, HookFuture, PathMatcher, TESTPATH};

/// Client id accepted by the default provider.
pub const TEST_CLIENT_ID: &str = "alpha";

/// Secret of [`TEST_CLIENT_ID`].
pub const TEST_CLIENT_SECRET: &str = "beta";

/// Redirect URI registered for [`TEST_CLIENT_ID`].
pub const TEST_REDIRECT_URI: &str = "http://gamma.com/return";

/// A provider accepting only the test client.
pub fn test_client_provider() -> AuthorizationServerProvider {
    AuthorizationServerProvider::new().with_validate_client(|client_id| {
        (client_id == TEST_CLIENT_ID)
            .then(|| ClientRegistration::confidential(TEST_CLIENT_SECRET, TEST_REDIRECT_URI))
    })
}

/// An authorization server that is not started yet.
///
/// The options default to the usual endpoint paths, the [`test_client_provider`], a
/// fresh single-use code store and a [`TestClock`] exposed by [`Self::clock`].
#[derive(Debug)]
pub struct OAuth2TestServerBuilder {
    options: AuthorizationServerOptions,
    clock: Arc<TestClock>,
    server_config: EmbeddedServerConfig,
    hooks: HookChain,
}

impl Default for OAuth2TestServerBuilder {
    fn default() -> Self {
        let clock = Arc::new(TestClock::new());
        let options = AuthorizationServerOptions {
            provider: test_client_provider(),
            system_clock: clock.clone(),
            ..AuthorizationServerOptions::default()
        };
        Self {
            options,
            clock,
            server_config: EmbeddedServerConfig::default(),
            hooks: HookChain::default(),
        }
    }
}

impl OAuth2TestServerBuilder {
    /// The options the server will start with.
    pub fn options(&self) -> &AuthorizationServerOptions {
        &self.options
    }

    /// Mutable access to the options.
    ///
    /// Replacing `system_clock` detaches the server from [`Self::clock`].
    pub fn options_mut(&mut self) -> &mut AuthorizationServerOptions {
        &mut self.options
    }

    /// Mutable access to the client validation provider.
    pub fn provider_mut(&mut self) -> &mut AuthorizationServerProvider {
        &mut self.options.provider
    }

    /// The clock wired into the default options.
    pub fn clock(&self) -> &Arc<TestClock> {
        &self.clock
    }

    /// The hooks the server will run.
    pub fn hooks(&self) -> &HookChain {
        &self.hooks
    }

    /// Mutable access to the embedded server settings.
    pub fn server_config_mut(&mut self) -> &mut EmbeddedServerConfig {
        &mut self.server_config
    }

    /// Applies `configure` to the options.
    #[must_use]
    pub fn with_options(mut self, configure: impl FnOnce(&mut AuthorizationServerOptions)) -> Self {
        configure(&mut self.options);
        self
    }

    /// Starts the server and waits until it accepts connections.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint paths cannot be routed, if the listener cannot be bound,
    /// or if the server does not become ready.
    pub async fn start(self) -> Result<OAuth2TestServer, HarnessError> {
        let Self {
            options,
            clock,
            server_config,
            hooks,
        } = self;
        validate(&options)?;

        let options = Arc::new(options);
        let dispatch = HookDispatch {
            hooks: hooks.clone(),
            authorize_path: Arc::from(options.authorize_endpoint_path.as_str()),
        };
        let router: Router = server::router(Arc::clone(&options))
            .layer(middleware::from_fn_with_state(dispatch, hooks::dispatch))
            .layer(TraceLayer::new_for_http());

        let embedded = embedded::launch(router, &server_config).await?;
        let base_url = Url::parse(&format!("http://{}", embedded.local_addr))?;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(OAuth2TestServer {
            options,
            clock,
            hooks,
            local_addr: embedded.local_addr,
            base_url,
            client,
            handle: Some(embedded.handle),
        })
    }
}

fn validate(options: &AuthorizationServerOptions) -> Result<(), HarnessError> {
    for path in [
        &options.authorize_endpoint_path,
        &options.token_endpoint_path,
    ] {
        if !path.starts_with('/') {
            return Err(HarnessError::InvalidConfiguration {
                reason: format!("endpoint path '{path}' must start with '/'"),
            });
        }
    }
    if options.authorize_endpoint_path == options.token_endpoint_path {
        return Err(HarnessError::InvalidConfiguration {
            reason: "authorize and token endpoints share the same path".to_string(),
        });
    }
    Ok(())
}

/// A running authorization server.
///
/// The server task is aborted when this value is dropped.
#[derive(Debug)]
pub struct OAuth2TestServer {
    options: Arc<AuthorizationServerOptions>,
    clock: Arc<TestClock>,
    hooks: HookChain,
    local_addr: SocketAddr,
    base_url: Url,
    client: reqwest::Client,
    handle: Option<JoinHandle<()>>,
}

impl OAuth2TestServer {
    /// Starts a server with the default options.
    ///
    /// # Errors
    ///
    /// See [`OAuth2TestServerBuilder::start`].
    pub async fn start() -> Result<Self, HarnessError> {
        Self::builder().start().await
    }

    /// Starts a server after `configure` adjusted the defaults.
    ///
    /// # Errors
    ///
    /// See [`OAuth2TestServerBuilder::start`].
    pub async fn start_with(
        configure: impl FnOnce(&mut OAuth2TestServerBuilder),
    ) -> Result<Self, HarnessError> {
        let mut builder = Self::builder();
        configure(&mut builder);
        builder.start().await
    }

    /// An unstarted server with the default options.
    pub fn builder() -> OAuth2TestServerBuilder {
        OAuth2TestServerBuilder::default()
    }

    /// The options the server runs with.
    pub fn options(&self) -> &AuthorizationServerOptions {
        &self.options
    }

    /// The client validation provider.
    pub fn provider(&self) -> &AuthorizationServerProvider {
        &self.options.provider
    }

    /// The controllable clock.
    pub fn clock(&self) -> &TestClock {
        &self.clock
    }

    /// The hooks, which can still change while the server runs.
    pub fn hooks(&self) -> &HookChain {
        &self.hooks
    }

    /// `http://127.0.0.1:<port>`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Prepares a request to `uri`, relative to [`Self::base_url`] or absolute.
    pub fn request(&self, uri: impl Into<String>) -> SendRequest<'_> {
        SendRequest::new(&self.client, &self.base_url, uri)
    }

    /// Sends a plain `GET` to `uri`.
    ///
    /// # Errors
    ///
    /// See [`SendRequest::send`].
    pub async fn send(&self, uri: impl Into<String>) -> Result<Transaction, HarnessError> {
        self.request(uri).send().await
    }
}

impl Drop for OAuth2TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
