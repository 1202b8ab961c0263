/// A transaction does not have the shape a test helper expected.
///
/// Unlike [`HarnessError`](crate::HarnessError) this is not a failure of the harness:
/// the exchange worked, but the response is not what the calling test asserted.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum TestAssertionError {
    /// The response status is not a redirect.
    #[display("expected a redirect, got status {status}")]
    NotARedirect {
        /// The actual status code.
        status: u16,
    },

    /// The redirect has no usable `Location` header.
    #[display("redirect without a valid Location header")]
    MissingLocation,

    /// The `Location` header cannot be resolved to a URL.
    #[display("invalid redirect location '{location}': {reason}")]
    InvalidLocation {
        /// The raw header value.
        location: String,
        /// Why it could not be resolved.
        reason: String,
    },

    /// The redirect location has no query string.
    #[display("redirect location '{location}' has no query string")]
    MissingQuery {
        /// The resolved location.
        location: String,
    },

    /// A query string segment cannot be unescaped.
    #[display("malformed query segment '{segment}': {reason}")]
    MalformedQuery {
        /// The offending `key=value` segment.
        segment: String,
        /// Why it could not be unescaped.
        reason: String,
    },
}
