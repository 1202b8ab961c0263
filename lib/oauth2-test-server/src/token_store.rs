//! Single-use reference tokens.
//!
//! Authorization codes (and refresh tokens, when enabled) are opaque references to a
//! serialized ticket kept server side. A reference can be redeemed at most once.

use std::fmt;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

/// Mints and redeems opaque reference tokens bound to a serialized ticket.
///
/// Implementations must be safe to share between concurrent requests.
pub trait ReferenceTokenProvider: Send + Sync {
    /// Stores `serialized_ticket` and returns the freshly generated token referencing it.
    fn create(&self, serialized_ticket: String) -> String;

    /// Redeems `token`, returning the serialized ticket if the token is known.
    ///
    /// `None` is a normal outcome (unknown or already redeemed token), the caller decides
    /// how to answer.
    fn receive(&self, token: &str) -> Option<String>;
}

/// In-memory [`ReferenceTokenProvider`] where each token can be received exactly once.
///
/// Tokens are 128-bit random values rendered as 32 lowercase hexadecimal characters.
/// Entries that are never received stay in memory for the lifetime of the provider.
///
/// # Example
///
/// ```rust
/// use oauth2_test_server::{InMemorySingleUseReferenceProvider, ReferenceTokenProvider};
///
/// let store = InMemorySingleUseReferenceProvider::new();
/// let token = store.create("ticket".to_string());
///
/// assert_eq!(store.receive(&token).as_deref(), Some("ticket"));
/// assert_eq!(store.receive(&token), None);
/// ```
#[derive(Default)]
pub struct InMemorySingleUseReferenceProvider {
    database: DashMap<String, String>,
}

impl InMemorySingleUseReferenceProvider {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens created and not yet received.
    pub fn len(&self) -> usize {
        self.database.len()
    }

    /// Returns `true` when every created token has been received.
    pub fn is_empty(&self) -> bool {
        self.database.is_empty()
    }
}

impl ReferenceTokenProvider for InMemorySingleUseReferenceProvider {
    fn create(&self, serialized_ticket: String) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.database.insert(token.clone(), serialized_ticket);
        debug!(pending = self.database.len(), "reference token created");
        token
    }

    fn receive(&self, token: &str) -> Option<String> {
        // a single remove is the test-and-delete, never split it in get + remove
        self.database.remove(token).map(|(_, ticket)| ticket)
    }
}

impl fmt::Debug for InMemorySingleUseReferenceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySingleUseReferenceProvider")
            .field("pending", &self.database.len())
            .finish()
    }
}
