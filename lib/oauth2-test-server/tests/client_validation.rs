#![allow(missing_docs)]

use http::StatusCode;
use rstest::rstest;

use oauth2_test_server::{
    Authorization, ClientRegistration, OAuth2TestServer, TEST_CLIENT_ID, TEST_REDIRECT_URI,
};

mod common;
pub use self::common::*;

#[rstest]
#[case::unknown_client("/authorize?response_type=code&client_id=omega")]
#[case::missing_client("/authorize?response_type=code")]
#[case::empty_client("/authorize?response_type=code&client_id=")]
#[tokio::test]
async fn authorize_should_reject_unknown_client(
    #[future] server: OAuth2TestServer,
    #[case] uri: &str,
) -> anyhow::Result<()> {
    let server = server.await;

    let transaction = server.send(uri).await?;

    assert_eq!(transaction.status(), StatusCode::BAD_REQUEST);
    assert_eq!(oauth_error(&transaction), Some("invalid_client"));
    assert!(transaction.location().is_none());

    Ok(())
}

#[rstest]
#[tokio::test]
async fn authorize_should_not_redirect_to_unregistered_uri(
    #[future] server: OAuth2TestServer,
) -> anyhow::Result<()> {
    let server = server.await;

    let transaction = server
        .send(format!(
            "/authorize?response_type=code&client_id={TEST_CLIENT_ID}&redirect_uri=http://evil.com/steal"
        ))
        .await?;

    assert_eq!(transaction.status(), StatusCode::BAD_REQUEST);
    assert_eq!(oauth_error(&transaction), Some("invalid_request"));

    Ok(())
}

#[rstest]
#[tokio::test]
async fn authorize_should_reject_duplicated_parameter(
    #[future] server: OAuth2TestServer,
) -> anyhow::Result<()> {
    let server = server.await;

    let transaction = server
        .send(format!(
            "/authorize?response_type=code&client_id={TEST_CLIENT_ID}&client_id={TEST_CLIENT_ID}"
        ))
        .await?;

    assert_eq!(transaction.status(), StatusCode::BAD_REQUEST);
    assert!(transaction.response_token.is_some());
    assert_eq!(oauth_error(&transaction), Some("invalid_request"));
    assert!(transaction.location().is_none());

    Ok(())
}

#[rstest]
#[case::unsupported("&response_type=token", "unsupported_response_type")]
#[case::missing("", "invalid_request")]
#[tokio::test]
async fn authorize_should_redirect_response_type_errors(
    #[future] server: OAuth2TestServer,
    #[case] response_type: &str,
    #[case] expected_error: &str,
) -> anyhow::Result<()> {
    let server = server.await;

    let transaction = server
        .send(format!(
            "/authorize?client_id={TEST_CLIENT_ID}&redirect_uri={TEST_REDIRECT_URI}&state=s1{response_type}"
        ))
        .await?;

    assert_eq!(transaction.status(), StatusCode::FOUND);
    let query = transaction.parse_redirect_query_string()?;
    assert_eq!(query.get("error"), Some(expected_error));
    assert_eq!(query.get("state"), Some("s1"));
    assert!(!query.contains_key("code"));

    Ok(())
}

#[rstest]
#[case::wrong_secret(Authorization::basic(TEST_CLIENT_ID, "not-beta"))]
#[case::unknown_client(Authorization::basic("omega", "beta"))]
#[case::bearer_is_not_client_auth(Authorization::bearer("beta"))]
#[tokio::test]
async fn token_should_reject_bad_client_credentials(
    #[future] server: OAuth2TestServer,
    #[case] authorization: Authorization,
) -> anyhow::Result<()> {
    let server = server.await;
    let code = obtain_code(&server).await?;

    let transaction = server
        .request("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", TEST_REDIRECT_URI),
        ])?
        .authorization(authorization)
        .await?;

    assert_eq!(transaction.status(), StatusCode::BAD_REQUEST);
    assert_eq!(oauth_error(&transaction), Some("invalid_client"));

    // a rejected client does not consume the code
    let retry = redeem_code(&server, &code).await?;
    assert_eq!(retry.status(), StatusCode::OK);

    Ok(())
}

#[rstest]
#[tokio::test]
async fn token_should_reject_conflicting_client_ids(
    #[future] server: OAuth2TestServer,
) -> anyhow::Result<()> {
    let server = server.await;

    let transaction = server
        .request("/token")
        .form(&[("grant_type", "authorization_code"), ("code", "x"), ("client_id", "omega")])?
        .authorization(Authorization::basic(TEST_CLIENT_ID, "beta"))
        .await?;

    assert_eq!(oauth_error(&transaction), Some("invalid_request"));

    Ok(())
}

#[rstest]
#[tokio::test]
async fn token_should_reject_duplicated_parameter(
    #[future] server: OAuth2TestServer,
) -> anyhow::Result<()> {
    let server = server.await;

    let transaction = server
        .request("/token")
        .form_body("grant_type=authorization_code&grant_type=refresh_token&code=x")
        .authorization(Authorization::basic(TEST_CLIENT_ID, "beta"))
        .await?;

    assert_eq!(transaction.status(), StatusCode::BAD_REQUEST);
    assert!(transaction.response_token.is_some());
    assert_eq!(oauth_error(&transaction), Some("invalid_request"));

    Ok(())
}

#[rstest]
#[case::unknown_grant("password", "unsupported_grant_type")]
#[case::refresh_without_provider("refresh_token", "unsupported_grant_type")]
#[tokio::test]
async fn token_should_reject_unsupported_grant(
    #[future] server: OAuth2TestServer,
    #[case] grant_type: &str,
    #[case] expected_error: &str,
) -> anyhow::Result<()> {
    let server = server.await;

    let transaction = server
        .request("/token")
        .form(&[("grant_type", grant_type), ("refresh_token", "anything")])?
        .authorization(Authorization::basic(TEST_CLIENT_ID, "beta"))
        .await?;

    assert_eq!(transaction.status(), StatusCode::BAD_REQUEST);
    assert_eq!(oauth_error(&transaction), Some(expected_error));

    Ok(())
}

#[rstest]
#[tokio::test]
async fn token_should_reject_unknown_code(
    #[future] server: OAuth2TestServer,
) -> anyhow::Result<()> {
    let server = server.await;

    let transaction = redeem_code(&server, "0123456789abcdef0123456789abcdef").await?;

    assert_eq!(transaction.status(), StatusCode::BAD_REQUEST);
    assert_eq!(oauth_error(&transaction), Some("invalid_grant"));
    insta::assert_snapshot!(transaction.response_text, @r#"{"error":"invalid_grant","error_description":"unknown or already redeemed grant"}"#);

    Ok(())
}

#[tokio::test]
async fn should_accept_public_client_from_custom_provider() -> anyhow::Result<()> {
    init_tracing();
    let server = OAuth2TestServer::start_with(|builder| {
        builder.provider_mut().set_validate_client(|client_id| {
            (client_id == "public-app")
                .then(|| ClientRegistration::public("https://app.example/cb"))
        });
    })
    .await?;

    let authorize = server
        .send("/authorize?response_type=code&client_id=public-app")
        .await?;
    let code = authorize
        .parse_redirect_query_string()?
        .get("code")
        .unwrap_or_default()
        .to_string();
    assert!(server.provider().validate_client(TEST_CLIENT_ID).is_none());

    let token = server
        .request("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", "public-app"),
        ])?
        .await?;

    assert_eq!(token.status(), StatusCode::OK);

    Ok(())
}
