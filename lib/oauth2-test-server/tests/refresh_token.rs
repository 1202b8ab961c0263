#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;

use oauth2_test_server::{
    Authorization, InMemorySingleUseReferenceProvider, OAuth2TestServer, TEST_CLIENT_ID,
    TEST_CLIENT_SECRET, Transaction,
};

mod common;
pub use self::common::*;

async fn server_with_refresh_tokens() -> anyhow::Result<OAuth2TestServer> {
    init_tracing();
    let server = OAuth2TestServer::start_with(|builder| {
        builder.options_mut().refresh_token_provider =
            Some(Arc::new(InMemorySingleUseReferenceProvider::new()));
    })
    .await?;
    Ok(server)
}

fn refresh_token_of(transaction: &Transaction) -> anyhow::Result<String> {
    transaction
        .response_token
        .as_ref()
        .and_then(|token| token.get("refresh_token"))
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| anyhow::anyhow!("no refresh token in {}", transaction.response_text))
}

async fn refresh(server: &OAuth2TestServer, refresh_token: &str) -> anyhow::Result<Transaction> {
    let transaction = server
        .request("/token")
        .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])?
        .authorization(Authorization::basic(TEST_CLIENT_ID, TEST_CLIENT_SECRET))
        .await?;
    Ok(transaction)
}

#[tokio::test]
async fn should_rotate_single_use_refresh_tokens() -> anyhow::Result<()> {
    let server = server_with_refresh_tokens().await?;
    let code = obtain_code(&server).await?;
    let first = refresh_token_of(&redeem_code(&server, &code).await?)?;

    let refreshed = refresh(&server, &first).await?;
    assert_eq!(refreshed.status(), StatusCode::OK);
    let second = refresh_token_of(&refreshed)?;
    assert_ne!(first, second);

    let replayed = refresh(&server, &first).await?;
    assert_eq!(replayed.status(), StatusCode::BAD_REQUEST);
    assert_eq!(oauth_error(&replayed), Some("invalid_grant"));

    Ok(())
}

#[tokio::test]
async fn refresh_token_should_expire_after_a_day() -> anyhow::Result<()> {
    let server = server_with_refresh_tokens().await?;
    let code = obtain_code(&server).await?;
    let refresh_token = refresh_token_of(&redeem_code(&server, &code).await?)?;

    server.clock().advance(Duration::from_secs(25 * 60 * 60));
    let transaction = refresh(&server, &refresh_token).await?;

    assert_eq!(oauth_error(&transaction), Some("invalid_grant"));

    Ok(())
}

#[tokio::test]
async fn code_should_not_be_accepted_as_refresh_token() -> anyhow::Result<()> {
    let server = server_with_refresh_tokens().await?;
    let code = obtain_code(&server).await?;

    let transaction = refresh(&server, &code).await?;
    assert_eq!(oauth_error(&transaction), Some("invalid_grant"));

    // the code lives in another store and is still redeemable
    let redeemed = redeem_code(&server, &code).await?;
    assert_eq!(redeemed.status(), StatusCode::OK);

    Ok(())
}
