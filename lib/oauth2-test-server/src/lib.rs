//! # OAuth2 Test Server
//!
//! An in-process OAuth2 authorization server for protocol tests.
//!
//! The server issues single-use authorization codes backed by an in-memory
//! [`ReferenceTokenProvider`], reads time from a controllable [`TestClock`], and lets
//! a test intercept requests with [`HookChain`] hooks. Tests drive it over loopback
//! HTTP and inspect each exchange as a decoded [`Transaction`].
//!
//! ## Authorization code flow
//!
//! ```rust,no_run
//! use oauth2_test_server::{
//!     Authorization, OAuth2TestServer, TEST_CLIENT_ID, TEST_CLIENT_SECRET, TEST_REDIRECT_URI,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = OAuth2TestServer::start().await?;
//!
//! let authorize = server
//!     .send(&format!(
//!         "/authorize?response_type=code&client_id={TEST_CLIENT_ID}&redirect_uri={TEST_REDIRECT_URI}"
//!     ))
//!     .await?;
//! let code = authorize
//!     .parse_redirect_query_string()?
//!     .get("code")
//!     .map(ToString::to_string)
//!     .unwrap_or_default();
//!
//! let token = server
//!     .request("/token")
//!     .form(&[
//!         ("grant_type", "authorization_code"),
//!         ("code", code.as_str()),
//!         ("redirect_uri", TEST_REDIRECT_URI),
//!     ])?
//!     .authorization(Authorization::basic(TEST_CLIENT_ID, TEST_CLIENT_SECRET))
//!     .await?;
//! assert!(token.status().is_success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Simulating expiry
//!
//! ```rust,no_run
//! # use std::time::Duration;
//! # use oauth2_test_server::OAuth2TestServer;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = OAuth2TestServer::start().await?;
//! // ... obtain a code ...
//! server.clock().advance(Duration::from_secs(10 * 60));
//! // ... redeeming the code now fails with `invalid_grant`
//! # Ok(())
//! # }
//! ```

mod clock;
pub use self::clock::{Clock, SystemClock, TestClock};

mod token_store;
pub use self::token_store::{InMemorySingleUseReferenceProvider, ReferenceTokenProvider};

mod ticket;
pub use self::ticket::AuthenticationTicket;

pub mod server;
pub use self::server::{
    AuthorizationServerOptions, AuthorizationServerProvider, ClientRegistration, OAuthError,
};

mod harness;
pub use self::harness::{
    EmbeddedServerConfig, HarnessError, HookChain, HookFuture, OAuth2TestServer,
    OAuth2TestServerBuilder, PathMatcher, TEST_CLIENT_ID, TEST_CLIENT_SECRET, TEST_REDIRECT_URI,
    TESTPATH, test_client_provider,
};

pub mod transaction;
pub use self::transaction::{
    Authorization, QueryParameters, SendRequest, TestAssertionError, Transaction, XmlElement,
};
