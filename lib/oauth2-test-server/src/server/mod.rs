//! The embedded OAuth2 authorization server.
//!
//! A deliberately small engine: the authorization code grant and, when a refresh token
//! provider is configured, the refresh token grant. Codes and refresh tokens are minted
//! and redeemed through the injected [`ReferenceTokenProvider`](crate::ReferenceTokenProvider),
//! every expiry check goes through the injected [`Clock`](crate::Clock).
//!
//! The authorize endpoint approves any valid request for a known client: there is no
//! resource owner login. Tests that need one install an authorize hook on the harness.

mod endpoints;
pub use self::endpoints::router;

mod error;
pub use self::error::OAuthError;

mod options;
pub use self::options::*;
