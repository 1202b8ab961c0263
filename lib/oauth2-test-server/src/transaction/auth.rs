use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderValue;

use crate::HarnessError;

/// Credential sent in the `Authorization` request header.
///
/// Secrets are redacted from the `Debug` output so requests can be logged.
#[derive(Clone, PartialEq, Eq)]
pub enum Authorization {
    /// `Authorization: Bearer <token>`.
    Bearer(String),

    /// `Authorization: Basic <base64(username:password)>`.
    Basic {
        /// The username, typically a client id.
        username: String,
        /// The password, typically a client secret.
        password: String,
    },

    /// `Authorization: <scheme> <parameter>`, sent as is.
    Raw {
        /// The authentication scheme.
        scheme: String,
        /// The scheme parameter.
        parameter: String,
    },
}

impl Authorization {
    /// Bearer credential.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// HTTP Basic credential.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Encodes the credential as a header value.
    ///
    /// # Errors
    ///
    /// Fails if a Basic username contains `:` or if the value has characters not
    /// allowed in a header.
    pub fn to_header_value(&self) -> Result<HeaderValue, HarnessError> {
        let value = match self {
            Self::Bearer(token) => format!("Bearer {token}"),
            Self::Basic { username, password } => {
                if username.contains(':') {
                    return Err(HarnessError::InvalidAuthorization {
                        reason: "Basic username cannot contain ':'".to_string(),
                    });
                }
                let credentials = STANDARD.encode(format!("{username}:{password}"));
                format!("Basic {credentials}")
            }
            Self::Raw { scheme, parameter } => format!("{scheme} {parameter}"),
        };
        let mut value = HeaderValue::from_str(&value)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::Raw { scheme, .. } => f
                .debug_struct("Raw")
                .field("scheme", scheme)
                .field("parameter", &"[REDACTED]")
                .finish(),
        }
    }
}
