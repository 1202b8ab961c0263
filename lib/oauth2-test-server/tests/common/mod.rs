use oauth2_test_server::{
    Authorization, HarnessError, OAuth2TestServer, TEST_CLIENT_ID, TEST_CLIENT_SECRET,
    TEST_REDIRECT_URI, Transaction,
};
use rstest::fixture;
use tracing::info;

pub fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

#[fixture]
pub async fn server() -> OAuth2TestServer {
    init_tracing();
    match OAuth2TestServer::start().await {
        Ok(server) => server,
        Err(error) => {
            panic!("fail to start test server: {error:?}");
        }
    }
}

/// Authorize URI for the test client with the given extra query.
pub fn authorize_uri(extra: &str) -> String {
    format!(
        "/authorize?response_type=code&client_id={TEST_CLIENT_ID}&redirect_uri={TEST_REDIRECT_URI}{extra}"
    )
}

/// Runs the authorize step and returns the issued code.
pub async fn obtain_code(server: &OAuth2TestServer) -> anyhow::Result<String> {
    let transaction = server.send(authorize_uri("")).await?;
    let query = transaction.parse_redirect_query_string()?;
    let code = query
        .get("code")
        .ok_or_else(|| anyhow::anyhow!("no code in {:?}", transaction.location()))?;
    Ok(code.to_string())
}

/// Exchanges `code` at the token endpoint with the test client credentials.
pub async fn redeem_code(
    server: &OAuth2TestServer,
    code: &str,
) -> Result<Transaction, HarnessError> {
    server
        .request("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", TEST_REDIRECT_URI),
        ])?
        .authorization(Authorization::basic(TEST_CLIENT_ID, TEST_CLIENT_SECRET))
        .await
}

/// The `error` member of a JSON error response.
pub fn oauth_error(transaction: &Transaction) -> Option<&str> {
    transaction
        .response_token
        .as_ref()
        .and_then(|token| token.get("error"))
        .and_then(serde_json::Value::as_str)
}
