use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::Router;
use backon::{ExponentialBuilder, Retryable};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::HarnessError;

const DEFAULT_MIN_BACKOFF_DELAY: Duration = Duration::from_millis(10);
const DEFAULT_MAX_BACKOFF_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_RETRY_ATTEMPTS: usize = 10;

/// How the embedded server is bound and probed for readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedServerConfig {
    /// Address to bind, the default is a random loopback port.
    pub bind_address: SocketAddr,
    /// First delay between readiness probes.
    pub min_backoff_delay: Duration,
    /// Longest delay between readiness probes.
    pub max_backoff_delay: Duration,
    /// Whether probe delays are randomized.
    pub backoff_jitter: bool,
    /// Probes attempted before giving up.
    pub max_retry_attempts: usize,
}

impl Default for EmbeddedServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            min_backoff_delay: DEFAULT_MIN_BACKOFF_DELAY,
            max_backoff_delay: DEFAULT_MAX_BACKOFF_DELAY,
            backoff_jitter: true,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
        }
    }
}

/// A running server task.
#[derive(Debug)]
pub(crate) struct EmbeddedServer {
    pub(crate) local_addr: SocketAddr,
    pub(crate) handle: JoinHandle<()>,
}

/// Binds the listener, serves `router` in a background task and waits until the
/// server accepts connections.
pub(crate) async fn launch(
    router: Router,
    config: &EmbeddedServerConfig,
) -> Result<EmbeddedServer, HarnessError> {
    let listener = TcpListener::bind(config.bind_address).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router).await {
            error!(?error, "embedded server failed");
        }
    });

    if !wait_until_ready(local_addr, config).await {
        handle.abort();
        return Err(HarnessError::UnhealthyServer {
            timeout: config.max_backoff_delay,
        });
    }

    info!(%local_addr, "authorization server started");
    Ok(EmbeddedServer { local_addr, handle })
}

async fn wait_until_ready(local_addr: SocketAddr, config: &EmbeddedServerConfig) -> bool {
    let mut backoff = ExponentialBuilder::default()
        .with_min_delay(config.min_backoff_delay)
        .with_max_delay(config.max_backoff_delay)
        .with_max_times(config.max_retry_attempts);
    if config.backoff_jitter {
        backoff = backoff.with_jitter();
    }

    let probe = || async move {
        debug!(%local_addr, "probing server");
        TcpStream::connect(local_addr).await.map(drop)
    };

    match probe
        .retry(backoff)
        .notify(|err, delay| debug!(?err, ?delay, "server not ready yet"))
        .await
    {
        Ok(()) => true,
        Err(err) => {
            error!(?err, %local_addr, "server never accepted a connection");
            false
        }
    }
}
