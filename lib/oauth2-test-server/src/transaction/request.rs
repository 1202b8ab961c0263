use std::future::{Future, IntoFuture};
use std::pin::Pin;

use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use http::{HeaderValue, Method};
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::{Authorization, ReceivedResponse, SentRequest, Transaction};
use crate::HarnessError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// A request to the embedded server, sent when awaited.
///
/// The request is a `GET` unless a form body is set, then it is a `POST`.
/// Empty cookie and body values are treated as absent.
///
/// ```rust,no_run
/// # use oauth2_test_server::{Authorization, OAuth2TestServer};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let server = OAuth2TestServer::start().await?;
/// let transaction = server
///     .request("/token")
///     .form_body("grant_type=authorization_code&code=abc")
///     .authorization(Authorization::basic("alpha", "beta"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
#[must_use = "a request does nothing until awaited"]
pub struct SendRequest<'a> {
    client: &'a reqwest::Client,
    base_url: &'a Url,
    uri: String,
    cookie: Option<String>,
    post_body: Option<String>,
    authorization: Option<Authorization>,
}

impl<'a> SendRequest<'a> {
    pub(crate) fn new(client: &'a reqwest::Client, base_url: &'a Url, uri: impl Into<String>) -> Self {
        Self {
            client,
            base_url,
            uri: uri.into(),
            cookie: None,
            post_body: None,
            authorization: None,
        }
    }

    /// Sets the raw `Cookie` request header.
    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into()).filter(|cookie| !cookie.is_empty());
        self
    }

    /// Sets an already encoded form body, turning the request into a `POST`.
    pub fn form_body(mut self, body: impl Into<String>) -> Self {
        self.post_body = Some(body.into()).filter(|body| !body.is_empty());
        self
    }

    /// Encodes `form` as the form body, turning the request into a `POST`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::FormError`] if the value cannot be form encoded.
    pub fn form<T>(self, form: &T) -> Result<Self, HarnessError>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_urlencoded::to_string(form)?;
        Ok(self.form_body(body))
    }

    /// Sets the `Authorization` request header.
    pub fn authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Sends the request and decodes the response.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or when a JSON or XML body does not decode.
    pub async fn send(self) -> Result<Transaction, HarnessError> {
        let Self {
            client,
            base_url,
            uri,
            cookie,
            post_body,
            authorization,
        } = self;

        let url = base_url.join(&uri)?;
        let method = if post_body.is_some() {
            Method::POST
        } else {
            Method::GET
        };

        let mut builder = client.request(method, url);
        if let Some(cookie) = &cookie {
            builder = builder.header(COOKIE, HeaderValue::from_str(cookie)?);
        }
        if let Some(authorization) = &authorization {
            builder = builder.header(AUTHORIZATION, authorization.to_header_value()?);
        }
        if let Some(body) = &post_body {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
                .body(body.clone());
        }
        let request = builder.build()?;

        let sent = SentRequest {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body: post_body,
        };
        debug!(?sent, "sending...");
        let response = client.execute(request).await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        let received = ReceivedResponse {
            status,
            headers,
            body,
        };
        debug!(?received, "...receiving");

        Transaction::from_exchange(sent, received)
    }
}

impl<'a> IntoFuture for SendRequest<'a> {
    type Output = Result<Transaction, HarnessError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.send())
    }
}
