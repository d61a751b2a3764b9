//! TCP listener and upstream proxy.
//!
//! Accepts portal connections, runs each parsed request through the gate,
//! and either writes the gate's response back directly or proxies the
//! forwarded request to the upstream application server. Responses coming
//! back from the upstream are decorated with the security headers before
//! they reach the client.

use crate::config::ServerSection;
use crate::gate::{GateAction, RequestGate};
use crate::http::{HttpError, Request, Response};
use bytes::BytesMut;
use http::StatusCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Statistics for the portal server.
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Total requests received.
    pub requests_total: AtomicU64,
    /// Successful responses (2xx/3xx).
    pub responses_ok: AtomicU64,
    /// Client errors (4xx).
    pub responses_4xx: AtomicU64,
    /// Server errors (5xx).
    pub responses_5xx: AtomicU64,
    /// Active connections.
    pub active_connections: AtomicU64,
    /// Requests proxied to the upstream.
    pub proxied: AtomicU64,
}

impl ServerStats {
    /// Record a response by status code.
    pub fn record_response(&self, status: u16) {
        match status {
            200..=399 => self.responses_ok.fetch_add(1, Ordering::Relaxed),
            400..=499 => self.responses_4xx.fetch_add(1, Ordering::Relaxed),
            _ => self.responses_5xx.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Portal edge server: one gate shared across all connections.
pub struct PortalServer {
    /// Listener and upstream configuration.
    config: ServerSection,

    /// The request gate.
    gate: Arc<RequestGate>,

    /// Statistics.
    stats: Arc<ServerStats>,

    /// Shutdown sender.
    shutdown_tx: mpsc::Sender<()>,

    /// Shutdown receiver, consumed by `run`.
    shutdown_rx: Option<mpsc::Receiver<()>>,
}

impl std::fmt::Debug for PortalServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalServer")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}

impl PortalServer {
    /// Create a new server.
    #[must_use]
    pub fn new(config: ServerSection, gate: Arc<RequestGate>) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Self {
            config,
            gate,
            stats: Arc::new(ServerStats::default()),
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
        }
    }

    /// Get statistics.
    #[must_use]
    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Sender that stops a running server when signaled.
    #[must_use]
    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Bind the listener and serve until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server was
    /// already run.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let Some(mut shutdown_rx) = self.shutdown_rx.take() else {
            return Err(std::io::Error::other("server already started"));
        };

        let addr = (self.config.bind_address, self.config.bind_port);
        let listener = TcpListener::bind(addr).await?;
        info!(
            address = %self.config.bind_address,
            port = self.config.bind_port,
            upstream = %self.config.upstream,
            "Portal gate listening"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let gate = Arc::clone(&self.gate);
                            let stats = Arc::clone(&self.stats);
                            let config = self.config.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, peer.to_string(), gate, stats, config)
                                    .await;
                            });
                        },
                        Err(e) => {
                            warn!(error = %e, "Accept failed");
                        },
                    }
                },
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                },
            }
        }

        Ok(())
    }
}

/// Serve one client connection until close or keep-alive limit.
async fn handle_connection(
    mut stream: TcpStream,
    peer: String,
    gate: Arc<RequestGate>,
    stats: Arc<ServerStats>,
    config: ServerSection,
) {
    stats.active_connections.fetch_add(1, Ordering::Relaxed);
    let read_timeout = Duration::from_secs(config.read_timeout_secs);
    let mut requests_handled = 0u32;

    loop {
        if requests_handled >= config.max_keepalive_requests {
            debug!("Keep-alive request limit reached");
            break;
        }

        let mut request = match read_request(&mut stream, read_timeout).await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Failed to parse request");
                let response = Response::builder()
                    .status(StatusCode::BAD_REQUEST)
                    .body("Bad Request")
                    .build();
                let _ = stream.write_all(&response.serialize()).await;
                break;
            },
        };

        stats.requests_total.fetch_add(1, Ordering::Relaxed);
        requests_handled += 1;
        request.set_remote_addr(&peer);

        let keep_alive = request.is_keep_alive();
        let outcome = gate.evaluate(request).await;

        let response = match outcome.action {
            GateAction::Respond(response) => response,
            GateAction::Forward(request) => {
                stats.proxied.fetch_add(1, Ordering::Relaxed);
                match proxy_upstream(&config.upstream, &request, read_timeout).await {
                    Ok(mut response) => {
                        gate.decorate(&mut response);
                        response
                    },
                    Err(e) => {
                        error!(upstream = %config.upstream, error = %e, "Upstream failed");
                        let mut response = Response::bad_gateway().build();
                        gate.decorate(&mut response);
                        response
                    },
                }
            },
        };

        stats.record_response(response.status().as_u16());
        if let Err(e) = stream.write_all(&response.serialize()).await {
            debug!(error = %e, "Write error");
            break;
        }

        if !keep_alive {
            break;
        }
    }

    stats.active_connections.fetch_sub(1, Ordering::Relaxed);
}

/// Read one full request from the stream.
///
/// Returns `Ok(None)` on clean EOF before any bytes arrive.
async fn read_request(
    stream: &mut TcpStream,
    timeout: Duration,
) -> Result<Option<Request>, HttpError> {
    let mut buf = BytesMut::with_capacity(8192);
    let mut chunk = [0u8; 8192];

    loop {
        match tokio::time::timeout(timeout, stream.read(&mut chunk)).await {
            Ok(Ok(0)) => {
                if buf.is_empty() {
                    return Ok(None);
                }
                return Err(HttpError::Incomplete);
            },
            Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => {
                if buf.is_empty() {
                    return Ok(None);
                }
                return Err(HttpError::Io(e));
            },
            Err(_) => {
                debug!("Read timeout");
                return Ok(None);
            },
        }

        match Request::parse(&buf) {
            Ok((request, body_offset)) => {
                // Keep reading until the declared body is complete
                let expected = request.content_length().unwrap_or(0);
                if buf.len() - body_offset >= expected {
                    return Ok(Some(request));
                }
            },
            Err(HttpError::Incomplete) => {},
            Err(e) => return Err(e),
        }
    }
}

/// Forward a gated request to the upstream and read its response.
///
/// A response with `Content-Length` is returned as soon as that many body
/// bytes arrive. Without one (e.g. chunked transfer encoding) the body is
/// drained until the upstream closes the connection or the read times out,
/// so a keep-alive upstream that never closes delays the response by one
/// read timeout.
async fn proxy_upstream(
    upstream: &str,
    request: &Request,
    timeout: Duration,
) -> Result<Response, HttpError> {
    let mut conn = TcpStream::connect(upstream).await.map_err(HttpError::Io)?;

    conn.write_all(&request.serialize())
        .await
        .map_err(HttpError::Io)?;

    let mut buf = BytesMut::with_capacity(8192);
    let mut chunk = [0u8; 8192];

    loop {
        match tokio::time::timeout(timeout, conn.read(&mut chunk)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => return Err(HttpError::Io(e)),
            Err(_) => {
                // Return what we have if the headers already parsed
                if Response::parse(&buf).is_ok() {
                    break;
                }
                return Err(HttpError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "upstream read timeout",
                )));
            },
        }

        if let Ok((response, body_offset)) = Response::parse(&buf) {
            // Without a declared length, keep draining until close
            if let Some(expected) = response
                .header("content-length")
                .and_then(|v| v.parse::<usize>().ok())
            {
                if buf.len() - body_offset >= expected {
                    return Ok(response);
                }
            }
        }
    }

    let (response, _) = Response::parse(&buf)?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{PathRuleConfig, RoleAccessTable, TrustedHeaderSource};
    use crate::audit::{AuditSink, MemorySink};
    use crate::gate::GateConfig;
    use crate::rate_limit::RateLimiter;
    use std::net::SocketAddr;

    fn test_gate() -> Arc<RequestGate> {
        let table =
            RoleAccessTable::new(&[PathRuleConfig::new("/teacher", &["teacher", "admin"])])
                .unwrap();
        Arc::new(RequestGate::new(
            GateConfig::default(),
            Arc::new(RateLimiter::with_defaults()),
            table,
            Arc::new(TrustedHeaderSource::new()),
            Arc::new(MemorySink::new()) as Arc<dyn AuditSink>,
        ))
    }

    async fn closed_port() -> u16 {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        port
    }

    async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let config = ServerSection {
            bind_port: 0,
            upstream: format!("127.0.0.1:{}", closed_port().await),
            ..Default::default()
        };

        // Bind manually to learn the ephemeral port before serving
        let listener = TcpListener::bind((config.bind_address, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let gate = test_gate();
        let stats = Arc::new(ServerStats::default());
        let handle = tokio::spawn(async move {
            loop {
                let (stream, peer) = listener.accept().await.unwrap();
                let gate = Arc::clone(&gate);
                let stats = Arc::clone(&stats);
                let config = config.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer.to_string(), gate, stats, config).await;
                });
            }
        });

        (addr, handle)
    }

    async fn roundtrip(addr: SocketAddr, raw: &str) -> Response {
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(raw.as_bytes()).await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = client.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Ok((response, offset)) = Response::parse(&buf) {
                let expected: usize = response
                    .header("content-length")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                if buf.len() - offset >= expected {
                    break;
                }
            }
        }

        Response::parse(&buf).unwrap().0
    }

    #[tokio::test]
    async fn test_protected_page_redirects_over_the_wire() {
        let (addr, handle) = start_server().await;

        let response = roundtrip(
            addr,
            "GET /teacher HTTP/1.1\r\nHost: portal\r\nConnection: close\r\n\r\n",
        )
        .await;

        assert_eq!(response.status().as_u16(), 303);
        assert_eq!(response.header("location"), Some("/login"));
        assert_eq!(response.header("x-frame-options"), Some("DENY"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_bad_request_gets_400() {
        let (addr, handle) = start_server().await;

        let response = roundtrip(addr, "NOT A REQUEST\r\n\r\n").await;
        assert_eq!(response.status().as_u16(), 400);

        handle.abort();
    }

    #[tokio::test]
    async fn test_proxy_drains_unsized_body_until_close() {
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = upstream.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut conn, _) = upstream.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = conn.read(&mut buf).await;

            // Headers first, body in a later write, no Content-Length
            conn.write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            conn.write_all(b"streamed body").await.unwrap();
        });

        let request = Request::builder().path("/about").build();
        let response = proxy_upstream(&addr.to_string(), &request, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.body().as_ref(), b"streamed body");
    }

    #[tokio::test]
    async fn test_forwarded_page_gets_502_without_upstream() {
        // Default upstream points at a closed port, so an allowed request
        // surfaces as a bad gateway with headers still attached.
        let (addr, handle) = start_server().await;

        let response = roundtrip(
            addr,
            "GET /about HTTP/1.1\r\nHost: portal\r\nConnection: close\r\n\r\n",
        )
        .await;

        assert_eq!(response.status().as_u16(), 502);
        assert!(response.header("content-security-policy").is_some());

        handle.abort();
    }
}
