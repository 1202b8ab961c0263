use std::sync::Arc;

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use axum::http::header::{CACHE_CONTROL, LOCATION, PRAGMA};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use headers::authorization::Basic;
use headers::{Authorization, HeaderMapExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::{AuthorizationServerOptions, OAuthError};
use crate::clock::Clock;
use crate::ticket::AuthenticationTicket;
use crate::token_store::ReferenceTokenProvider;

const BEARER: &str = "bearer";

/// Builds the authorization server routes for the given options.
///
/// Unknown paths answer `404 Not Found`.
pub fn router(options: Arc<AuthorizationServerOptions>) -> Router {
    let authorize_path = options.authorize_endpoint_path.clone();
    let token_path = options.token_endpoint_path.clone();

    Router::new()
        .route(&authorize_path, get(authorize).post(authorize))
        .route(&token_path, post(token))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(options)
}

#[derive(Debug, Default, Deserialize)]
struct AuthorizeParameters {
    response_type: Option<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
    scope: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenParameters {
    grant_type: Option<String>,
    code: Option<String>,
    redirect_uri: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

async fn authorize(
    State(options): State<Arc<AuthorizationServerOptions>>,
    params: Result<Query<AuthorizeParameters>, QueryRejection>,
) -> Result<Response, OAuthError> {
    let Query(params) = params.map_err(|rejection| rejection_error(&rejection.body_text()))?;
    let AuthorizeParameters {
        response_type,
        client_id,
        redirect_uri,
        scope,
        state,
    } = params;

    let client_id = non_empty(client_id).ok_or(OAuthError::InvalidClient)?;
    let registration = options
        .provider
        .validate_client(&client_id)
        .ok_or(OAuthError::InvalidClient)?;

    // the client is not trusted with a redirect until the URI matches its registration
    let requested_redirect_uri = non_empty(redirect_uri);
    if let Some(requested) = &requested_redirect_uri
        && *requested != registration.redirect_uri
    {
        return Err(OAuthError::invalid_request(
            "redirect_uri does not match the registered one",
        ));
    }
    let redirect_to = requested_redirect_uri
        .as_deref()
        .unwrap_or(&registration.redirect_uri);
    let redirect_to = Url::parse(redirect_to)
        .map_err(|_| OAuthError::invalid_request("redirect_uri is not an absolute URI"))?;

    let state = non_empty(state);
    match non_empty(response_type).as_deref() {
        Some("code") => {}
        Some(_) => {
            return Ok(redirect_with_error(
                redirect_to,
                &OAuthError::UnsupportedResponseType,
                state.as_deref(),
            ));
        }
        None => {
            return Ok(redirect_with_error(
                redirect_to,
                &OAuthError::invalid_request("response_type is missing"),
                state.as_deref(),
            ));
        }
    }

    let ticket = AuthenticationTicket::issue(
        client_id,
        requested_redirect_uri,
        split_scope(scope.as_deref()),
        options.system_clock.now(),
        options.authorization_code_expire_time_span,
    );
    let code = options
        .authorization_code_provider
        .create(serialize_ticket(&ticket)?);
    info!(client_id = %ticket.client_id, "authorization code issued");

    let mut location = redirect_to;
    {
        let mut pairs = location.query_pairs_mut();
        pairs.append_pair("code", &code);
        if let Some(state) = &state {
            pairs.append_pair("state", state);
        }
    }
    Ok(found(&location))
}

async fn token(
    State(options): State<Arc<AuthorizationServerOptions>>,
    headers: HeaderMap,
    params: Result<Form<TokenParameters>, FormRejection>,
) -> Result<Response, OAuthError> {
    let Form(params) = params.map_err(|rejection| rejection_error(&rejection.body_text()))?;
    let client_id = authenticate_client(&options, &headers, &params)?;
    let grant_type = non_empty(params.grant_type.clone())
        .ok_or_else(|| OAuthError::invalid_request("grant_type is missing"))?;
    debug!(%client_id, %grant_type, "token request");

    let ticket = match grant_type.as_str() {
        "authorization_code" => redeem_authorization_code(&options, &client_id, &params)?,
        "refresh_token" => {
            let Some(provider) = &options.refresh_token_provider else {
                return Err(OAuthError::UnsupportedGrantType);
            };
            redeem_refresh_token(&options, provider.as_ref(), &client_id, &params)?
        }
        _ => return Err(OAuthError::UnsupportedGrantType),
    };

    issue_tokens(&options, ticket)
}

/// Resolves the calling client, from HTTP Basic credentials first, then from the form.
fn authenticate_client(
    options: &AuthorizationServerOptions,
    headers: &HeaderMap,
    params: &TokenParameters,
) -> Result<String, OAuthError> {
    let form_client_id = non_empty(params.client_id.clone());
    let (client_id, client_secret) = match headers.typed_get::<Authorization<Basic>>() {
        Some(Authorization(basic)) => {
            if form_client_id
                .as_deref()
                .is_some_and(|form_id| form_id != basic.username())
            {
                return Err(OAuthError::invalid_request(
                    "client_id differs between Authorization header and body",
                ));
            }
            (
                non_empty(Some(basic.username().to_string())),
                Some(basic.password().to_string()),
            )
        }
        None => (form_client_id, non_empty(params.client_secret.clone())),
    };

    let client_id = client_id.ok_or(OAuthError::InvalidClient)?;
    let registration = options
        .provider
        .validate_client(&client_id)
        .ok_or(OAuthError::InvalidClient)?;
    if let Some(expected) = &registration.client_secret
        && client_secret.as_ref() != Some(expected)
    {
        return Err(OAuthError::InvalidClient);
    }

    Ok(client_id)
}

fn redeem_authorization_code(
    options: &AuthorizationServerOptions,
    client_id: &str,
    params: &TokenParameters,
) -> Result<AuthenticationTicket, OAuthError> {
    let code = non_empty(params.code.clone())
        .ok_or_else(|| OAuthError::invalid_request("code is missing"))?;
    let ticket = redeem(
        options.authorization_code_provider.as_ref(),
        &code,
        options,
        client_id,
    )?;

    if let Some(expected) = &ticket.redirect_uri
        && params.redirect_uri.as_ref() != Some(expected)
    {
        return Err(OAuthError::invalid_grant("redirect_uri mismatch"));
    }

    Ok(ticket)
}

fn redeem_refresh_token(
    options: &AuthorizationServerOptions,
    provider: &dyn ReferenceTokenProvider,
    client_id: &str,
    params: &TokenParameters,
) -> Result<AuthenticationTicket, OAuthError> {
    let refresh_token = non_empty(params.refresh_token.clone())
        .ok_or_else(|| OAuthError::invalid_request("refresh_token is missing"))?;
    redeem(provider, &refresh_token, options, client_id)
}

/// Consumes a reference token; the token is gone even if the checks below fail.
fn redeem(
    provider: &dyn ReferenceTokenProvider,
    token: &str,
    options: &AuthorizationServerOptions,
    client_id: &str,
) -> Result<AuthenticationTicket, OAuthError> {
    let serialized = provider
        .receive(token)
        .ok_or_else(|| OAuthError::invalid_grant("unknown or already redeemed grant"))?;
    let ticket = AuthenticationTicket::deserialize(&serialized)
        .map_err(|_| OAuthError::invalid_grant("unreadable grant"))?;

    if ticket.is_expired(options.system_clock.now()) {
        return Err(OAuthError::invalid_grant("grant expired"));
    }
    if ticket.client_id != client_id {
        return Err(OAuthError::invalid_grant("grant issued to another client"));
    }

    Ok(ticket)
}

fn issue_tokens(
    options: &AuthorizationServerOptions,
    ticket: AuthenticationTicket,
) -> Result<Response, OAuthError> {
    let refresh_token = match &options.refresh_token_provider {
        Some(provider) => {
            let refresh_ticket = AuthenticationTicket::issue(
                ticket.client_id.clone(),
                None,
                ticket.scopes.clone(),
                options.system_clock.now(),
                options.refresh_token_expire_time_span,
            );
            Some(provider.create(serialize_ticket(&refresh_ticket)?))
        }
        None => None,
    };

    let scope = (!ticket.scopes.is_empty()).then(|| ticket.scopes.join(" "));
    let body = TokenResponse {
        access_token: Uuid::new_v4().simple().to_string(),
        token_type: BEARER,
        expires_in: options.access_token_expire_time_span.as_secs(),
        refresh_token,
        scope,
    };
    info!(client_id = %ticket.client_id, "access token issued");

    Ok((
        [(CACHE_CONTROL, "no-store"), (PRAGMA, "no-cache")],
        Json(body),
    )
        .into_response())
}

fn serialize_ticket(ticket: &AuthenticationTicket) -> Result<String, OAuthError> {
    ticket.serialize().map_err(|err| OAuthError::ServerError {
        description: format!("cannot serialize ticket: {err}"),
    })
}

fn redirect_with_error(mut location: Url, error: &OAuthError, state: Option<&str>) -> Response {
    {
        let mut pairs = location.query_pairs_mut();
        pairs.append_pair("error", error.error_code());
        if let Some(description) = error.description() {
            pairs.append_pair("error_description", description);
        }
        if let Some(state) = state {
            pairs.append_pair("state", state);
        }
    }
    debug!(%location, "redirecting authorization error");
    found(&location)
}

fn found(location: &Url) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

/// Malformed or duplicated parameters answer `invalid_request`.
fn rejection_error(reason: &str) -> OAuthError {
    debug!(%reason, "request parameters rejected");
    OAuthError::invalid_request(reason)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn split_scope(scope: Option<&str>) -> Vec<String> {
    scope
        .map(|scope| scope.split_whitespace().map(ToString::to_string).collect())
        .unwrap_or_default()
}
