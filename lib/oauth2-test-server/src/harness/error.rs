use std::time::Duration;

use crate::transaction::XmlError;

/// Errors raised by the harness itself.
///
/// Protocol rejections from the authorization server are not errors here: they come
/// back as regular transactions with an error status.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum HarnessError {
    /// I/O operation failed, typically binding the listener.
    #[display("I/O error: {_0}")]
    IoError(std::io::Error),

    /// The HTTP exchange with the embedded server failed.
    #[display("HTTP client error: {_0}")]
    ClientError(reqwest::Error),

    /// A request URI cannot be resolved against the server base URL.
    #[display("invalid URL: {_0}")]
    UrlError(url::ParseError),

    /// A caller supplied header value is not valid on the wire.
    #[display("invalid header value: {_0}")]
    InvalidHeaderValue(http::header::InvalidHeaderValue),

    /// A form body cannot be encoded.
    #[display("form encoding error: {_0}")]
    FormError(serde_urlencoded::ser::Error),

    /// The request credential cannot be encoded.
    #[from(skip)]
    #[display("invalid authorization: {reason}")]
    InvalidAuthorization {
        /// Why the credential was refused.
        reason: String,
    },

    /// The response body is not the JSON its content type announces.
    #[from(skip)]
    #[display("failed to decode JSON response: {error}\n{body}")]
    JsonDecode {
        /// The underlying parser error.
        error: serde_json::Error,
        /// The offending body.
        body: String,
    },

    /// The response body is not the XML its content type announces.
    #[from(skip)]
    #[display("failed to decode XML response: {error}\n{body}")]
    XmlDecode {
        /// The underlying parser error.
        error: XmlError,
        /// The offending body.
        body: String,
    },

    /// The response body cannot be deserialized into the requested XML type.
    #[from(skip)]
    #[display("failed to deserialize XML response: {error}\n{body}")]
    XmlDeserialize {
        /// The underlying deserializer error.
        error: serde_xml_rs::Error,
        /// The offending body.
        body: String,
    },

    /// The embedded server did not accept connections in time.
    #[from(skip)]
    #[display("server failed to become ready within {timeout:?}")]
    UnhealthyServer {
        /// The maximum backoff delay that was exceeded.
        timeout: Duration,
    },

    /// The server options cannot be served.
    #[from(skip)]
    #[display("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong.
        reason: String,
    },
}
