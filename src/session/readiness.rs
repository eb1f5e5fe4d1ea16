//! Readiness polling for a freshly spawned browser.
//!
//! Browser startup time is variable and cannot be predicted, so we poll the
//! debugging endpoint with a hard ceiling: a short-timeout TCP connect at a
//! fixed interval until it succeeds or the deadline elapses. This is a
//! liveness probe, not a protocol handshake; the connection is closed
//! immediately on success.

use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::utils::constants::{READINESS_DIAL_TIMEOUT, READINESS_POLL_INTERVAL};

/// Strip a `ws://` or `http://` scheme prefix, leaving `host:port`.
pub(crate) fn host_port(endpoint: &str) -> &str {
    endpoint
        .trim_start_matches("ws://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
}

/// Poll `endpoint` until it accepts a TCP connection or `max_wait` elapses.
///
/// Observes `cancel` at every suspend point and aborts promptly rather
/// than waiting out the full deadline.
pub async fn wait_for_endpoint(
    endpoint: &str,
    max_wait: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    let addr = host_port(endpoint).to_string();
    let deadline = Instant::now() + max_wait;

    loop {
        let probe = tokio::time::timeout(READINESS_DIAL_TIMEOUT, TcpStream::connect(&addr));
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                bail!("canceled while waiting for browser endpoint {addr}");
            }
            result = probe => matches!(result, Ok(Ok(_))),
        };

        if connected {
            debug!(%addr, "browser endpoint is ready");
            return Ok(());
        }

        if Instant::now() >= deadline {
            bail!("browser endpoint {addr} not ready after {max_wait:?}");
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                bail!("canceled while waiting for browser endpoint {addr}");
            }
            _ = tokio::time::sleep(READINESS_POLL_INTERVAL) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn host_port_strips_schemes() {
        assert_eq!(host_port("ws://127.0.0.1:9222"), "127.0.0.1:9222");
        assert_eq!(host_port("http://localhost:9222/"), "localhost:9222");
        assert_eq!(host_port("127.0.0.1:9222"), "127.0.0.1:9222");
    }

    #[tokio::test]
    async fn succeeds_once_endpoint_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let endpoint = format!("ws://{addr}");

        wait_for_endpoint(&endpoint, Duration::from_secs(2), &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn succeeds_shortly_after_endpoint_comes_up() {
        // Reserve a port, release it, then start listening after a delay.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let listener = TcpListener::bind(addr).await.unwrap();
            // Hold the listener long enough for the probe to connect.
            tokio::time::sleep(Duration::from_secs(3)).await;
            drop(listener);
        });

        let started = Instant::now();
        wait_for_endpoint(
            &format!("ws://{addr}"),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn times_out_when_endpoint_never_listens() {
        // Bind then drop to get a port that is very likely closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let max_wait = Duration::from_millis(500);
        let started = Instant::now();
        let err = wait_for_endpoint(
            &format!("ws://{addr}"),
            max_wait,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("not ready"));
        let elapsed = started.elapsed();
        assert!(elapsed >= max_wait);
        // Not substantially later than the deadline either.
        assert!(elapsed < max_wait + Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancellation_aborts_before_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = wait_for_endpoint(&format!("ws://{addr}"), Duration::from_secs(30), &cancel)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("canceled"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
