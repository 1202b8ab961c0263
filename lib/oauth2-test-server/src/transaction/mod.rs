//! One HTTP exchange with the embedded server, captured and decoded.
//!
//! A [`Transaction`] keeps the request as sent and the response as received, along
//! with the fields a test usually asserts on: the `Set-Cookie` value, the body as
//! text, and a structured view of JSON or XML bodies.
//!
//! Structured decoding keys on the response media type only:
//!
//! | Media type         | Field                                |
//! |--------------------|--------------------------------------|
//! | `application/json` | [`Transaction::response_token`]      |
//! | `text/xml`         | [`Transaction::response_element`]    |
//!
//! Any other media type leaves both fields empty. A body that does not decode as its
//! media type fails the whole exchange.

use bytes::Bytes;
use headers::{ContentType, HeaderMapExt};
use http::header::{LOCATION, SET_COOKIE};
use http::{HeaderMap, Method, StatusCode};
use mime::Mime;
use serde::de::DeserializeOwned;
use url::Url;

use crate::HarnessError;

mod auth;
pub use self::auth::Authorization;

mod error;
pub use self::error::TestAssertionError;

mod redirect;
pub use self::redirect::QueryParameters;

mod request;
pub use self::request::SendRequest;

mod xml;
pub use self::xml::{XmlElement, XmlError};

const TEXT_XML: &str = "text/xml";

/// The request as it went on the wire.
#[derive(Debug, Clone)]
pub struct SentRequest {
    /// `GET`, or `POST` when a form body was set.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers, including `Cookie` and `Authorization` when set.
    pub headers: HeaderMap,
    /// The form-urlencoded body, if any.
    pub body: Option<String>,
}

/// The response as received.
#[derive(Debug, Clone)]
pub struct ReceivedResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body.
    pub body: Bytes,
}

/// A completed and decoded exchange.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// The request as sent.
    pub request: SentRequest,
    /// The response as received.
    pub response: ReceivedResponse,
    /// The `Set-Cookie` value when the response has exactly one.
    ///
    /// Responses setting several cookies leave this empty, use the raw response
    /// headers to inspect them. Bytes outside UTF-8 are replaced, as in
    /// [`Self::response_text`].
    pub set_cookie: Option<String>,
    /// The `name=value` part of [`Self::set_cookie`].
    pub cookie_name_value: Option<String>,
    /// Body decoded as UTF-8, invalid sequences replaced.
    pub response_text: String,
    /// Element tree of a `text/xml` body.
    pub response_element: Option<XmlElement>,
    /// Value tree of an `application/json` body.
    pub response_token: Option<serde_json::Value>,
}

impl Transaction {
    /// Decodes a completed exchange.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::JsonDecode`] or [`HarnessError::XmlDecode`] when the
    /// body does not match its declared media type.
    pub fn from_exchange(
        request: SentRequest,
        response: ReceivedResponse,
    ) -> Result<Self, HarnessError> {
        let set_cookie = single_set_cookie(&response.headers);
        let cookie_name_value = set_cookie
            .as_deref()
            .filter(|cookie| !cookie.is_empty())
            .map(split_name_value);
        let response_text = String::from_utf8_lossy(&response.body).into_owned();

        let mut response_element = None;
        let mut response_token = None;
        if let Some(content_type) = response.headers.typed_get::<ContentType>() {
            let content_type = Mime::from(content_type);
            match content_type.essence_str() {
                TEXT_XML => {
                    let element = XmlElement::parse(&response_text).map_err(|error| {
                        HarnessError::XmlDecode {
                            error,
                            body: response_text.clone(),
                        }
                    })?;
                    response_element = Some(element);
                }
                essence if essence == mime::APPLICATION_JSON.essence_str() => {
                    let token = serde_json::from_str(&response_text).map_err(|error| {
                        HarnessError::JsonDecode {
                            error,
                            body: response_text.clone(),
                        }
                    })?;
                    response_token = Some(token);
                }
                _ => {}
            }
        }

        Ok(Self {
            request,
            response,
            set_cookie,
            cookie_name_value,
            response_text,
            response_element,
            response_token,
        })
    }

    /// Response status code.
    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    /// Raw `Location` response header.
    pub fn location(&self) -> Option<&str> {
        self.response
            .headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Deserializes the body as JSON, whatever the declared media type.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::JsonDecode`] if the body does not match `T`.
    pub fn response_json<T>(&self) -> Result<T, HarnessError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(&self.response_text).map_err(|error| HarnessError::JsonDecode {
            error,
            body: self.response_text.clone(),
        })
    }

    /// Deserializes the body as XML, whatever the declared media type.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::XmlDeserialize`] if the body does not match `T`.
    pub fn response_xml<T>(&self) -> Result<T, HarnessError>
    where
        T: DeserializeOwned,
    {
        serde_xml_rs::from_str(&self.response_text).map_err(|error| {
            HarnessError::XmlDeserialize {
                error,
                body: self.response_text.clone(),
            }
        })
    }

    /// Decodes the query string of a redirect target.
    ///
    /// Every redirect status but `304 Not Modified` qualifies. A relative `Location`
    /// is resolved against the request URL.
    ///
    /// # Errors
    ///
    /// Returns a [`TestAssertionError`] if the response is not a redirect, has no
    /// usable location, or if the location has no query string.
    pub fn parse_redirect_query_string(&self) -> Result<QueryParameters, TestAssertionError> {
        let status = self.status();
        if !status.is_redirection() || status == StatusCode::NOT_MODIFIED {
            return Err(TestAssertionError::NotARedirect {
                status: status.as_u16(),
            });
        }

        let location = self.location().ok_or(TestAssertionError::MissingLocation)?;
        let target = self.request.url.join(location).map_err(|err| {
            TestAssertionError::InvalidLocation {
                location: location.to_string(),
                reason: err.to_string(),
            }
        })?;
        let query = target
            .query()
            .filter(|query| !query.is_empty())
            .ok_or_else(|| TestAssertionError::MissingQuery {
                location: target.to_string(),
            })?;

        QueryParameters::parse(query)
    }
}

fn single_set_cookie(headers: &HeaderMap) -> Option<String> {
    let mut values = headers.get_all(SET_COOKIE).iter();
    let value = values.next()?;
    if values.next().is_some() {
        return None;
    }
    Some(String::from_utf8_lossy(value.as_bytes()).into_owned())
}

fn split_name_value(set_cookie: &str) -> String {
    set_cookie
        .split_once(';')
        .map_or(set_cookie, |(name_value, _)| name_value)
        .to_string()
}
