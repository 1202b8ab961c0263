use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::to_time_delta;

/// The grant remembered between the authorize step and the token step.
///
/// Reference token providers only ever see the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationTicket {
    /// Client the grant was issued to.
    pub client_id: String,
    /// Redirect URI explicitly sent with the authorization request, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// Granted scopes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// When the grant was issued.
    pub issued_utc: DateTime<Utc>,
    /// When the grant stops being redeemable.
    pub expires_utc: DateTime<Utc>,
}

impl AuthenticationTicket {
    /// Creates a ticket issued at `now` and valid for `lifetime`.
    pub fn issue(
        client_id: impl Into<String>,
        redirect_uri: Option<String>,
        scopes: Vec<String>,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        let expires_utc = now
            .checked_add_signed(to_time_delta(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            client_id: client_id.into(),
            redirect_uri,
            scopes,
            issued_utc: now,
            expires_utc,
        }
    }

    /// Returns `true` once `now` has reached the expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_utc <= now
    }

    /// Serializes the ticket into the opaque payload stored behind a reference token.
    ///
    /// # Errors
    ///
    /// Fails only if the ticket cannot be represented as JSON.
    pub fn serialize(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restores a ticket from its serialized form.
    ///
    /// # Errors
    ///
    /// Fails if the payload was not produced by [`AuthenticationTicket::serialize`].
    pub fn deserialize(serialized: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(serialized)
    }
}
