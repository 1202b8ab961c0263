#![allow(missing_docs)]

use std::time::Duration;

use http::StatusCode;
use rstest::rstest;

use oauth2_test_server::OAuth2TestServer;

mod common;
pub use self::common::*;

const CODE_LIFETIME: Duration = Duration::from_secs(5 * 60);

#[rstest]
#[case::fresh(Duration::ZERO, StatusCode::OK)]
#[case::just_before_expiry(CODE_LIFETIME - Duration::from_secs(1), StatusCode::OK)]
#[case::at_expiry(CODE_LIFETIME, StatusCode::BAD_REQUEST)]
#[case::long_after(Duration::from_secs(60 * 60), StatusCode::BAD_REQUEST)]
#[tokio::test]
async fn code_should_expire_with_simulated_time(
    #[future] server: OAuth2TestServer,
    #[case] elapsed: Duration,
    #[case] expected: StatusCode,
) -> anyhow::Result<()> {
    let server = server.await;
    let code = obtain_code(&server).await?;

    server.clock().advance(elapsed);
    let transaction = redeem_code(&server, &code).await?;

    assert_eq!(transaction.status(), expected);
    if expected == StatusCode::BAD_REQUEST {
        assert_eq!(oauth_error(&transaction), Some("invalid_grant"));
    }

    Ok(())
}

#[rstest]
#[tokio::test]
async fn expired_code_should_be_consumed(
    #[future] server: OAuth2TestServer,
) -> anyhow::Result<()> {
    let server = server.await;
    let code = obtain_code(&server).await?;

    server.clock().advance(CODE_LIFETIME * 2);
    let expired = redeem_code(&server, &code).await?;
    server.clock().rewind(CODE_LIFETIME * 2);
    let replayed = redeem_code(&server, &code).await?;

    assert_eq!(oauth_error(&expired), Some("invalid_grant"));
    assert_eq!(oauth_error(&replayed), Some("invalid_grant"));

    Ok(())
}

#[rstest]
#[tokio::test]
async fn code_issued_in_the_past_should_expire(
    #[future] server: OAuth2TestServer,
) -> anyhow::Result<()> {
    let server = server.await;

    server.clock().rewind(Duration::from_secs(60 * 60));
    let code = obtain_code(&server).await?;
    server.clock().advance(Duration::from_secs(60 * 60));

    let transaction = redeem_code(&server, &code).await?;

    assert_eq!(oauth_error(&transaction), Some("invalid_grant"));

    Ok(())
}

#[tokio::test]
async fn should_honor_custom_code_lifetime() -> anyhow::Result<()> {
    init_tracing();
    let server = OAuth2TestServer::start_with(|builder| {
        builder.options_mut().authorization_code_expire_time_span = Duration::from_secs(30);
    })
    .await?;
    let code = obtain_code(&server).await?;

    server.clock().advance(Duration::from_secs(31));
    let transaction = redeem_code(&server, &code).await?;

    assert_eq!(oauth_error(&transaction), Some("invalid_grant"));

    Ok(())
}
