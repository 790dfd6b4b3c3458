//! Raw bidirectional TCP tunneling.
//!
//! # Responsibilities
//! - Expose the inbound connection surface: ids, SNI-derived host,
//!   scope-stripped addresses, TLS session handle, byte stream
//! - Wire the client→backend (upstream) and backend→client (downstream)
//!   pipes and complete only when both complete
//!
//! # Design Decisions
//! - Upstream is registered once and stored; it only starts when the
//!   backend side is ready and both pipes run together
//! - Pipes are joined with fail-fast semantics: either error fails the whole
//! - Backpressure comes from the pipe itself; a full client write buffer
//!   stalls backend reads
//! - The client write side has a single writer (the downstream pipe); there
//!   is no other path to it

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use uuid::Uuid;

/// A byte-pipe between two socket halves. Resolves to the number of bytes
/// moved once its source reaches end of stream.
pub type Pipe = Pin<Box<dyn Future<Output = std::io::Result<u64>> + Send>>;

/// Handle to the TLS session negotiated on the inbound connection.
#[derive(Debug, Clone)]
pub struct TlsSessionInfo {
    pub protocol: String,
    pub cipher_suite: String,
}

/// Inbound side of a raw TCP connection, as accepted by a TCP listener.
pub struct TcpClientConnection {
    id: String,
    transaction_id: String,
    sni_host: Option<String>,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    tls: Option<TlsSessionInfo>,
    io: Box<dyn ClientIo>,
}

/// Byte stream of the inbound connection.
pub trait ClientIo: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> ClientIo for T {}

impl TcpClientConnection {
    pub fn new(
        io: impl ClientIo + 'static,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
        sni_host: Option<String>,
        tls: Option<TlsSessionInfo>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            transaction_id: Uuid::new_v4().to_string(),
            sni_host,
            local_addr,
            remote_addr,
            tls,
            io: Box::new(io),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Host requested by the client. Derived from the SNI indicator when one
    /// was presented, which may differ from the remote-address host.
    pub fn host(&self) -> String {
        match &self.sni_host {
            Some(host) => host.clone(),
            None => strip_ipv6_scope(self.remote_addr).ip().to_string(),
        }
    }

    pub fn local_address(&self) -> SocketAddr {
        strip_ipv6_scope(self.local_addr)
    }

    pub fn remote_address(&self) -> SocketAddr {
        strip_ipv6_scope(self.remote_addr)
    }

    pub fn tls_session(&self) -> Option<&TlsSessionInfo> {
        self.tls.as_ref()
    }

    pub fn into_io(self) -> Box<dyn ClientIo> {
        self.io
    }
}

impl std::fmt::Debug for TcpClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpClientConnection")
            .field("id", &self.id)
            .field("remote", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

/// Drop the IPv6 scope suffix, e.g. `fe80::1%3` becomes `fe80::1`.
pub fn strip_ipv6_scope(addr: SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V6(v6) => {
            let mut stripped = v6;
            stripped.set_scope_id(0);
            SocketAddr::V6(stripped)
        }
        other => other,
    }
}

/// Bidirectional tunnel between the client connection and a backend socket.
pub struct TcpTunnel {
    upstream: Option<Pipe>,
    ended: Arc<AtomicBool>,
}

impl Default for TcpTunnel {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpTunnel {
    pub fn new() -> Self {
        Self {
            upstream: None,
            ended: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register the client→backend pipe. Stored, not started: nothing moves
    /// until the backend side is ready and [`TcpTunnel::run`] is called.
    pub fn pipe_upstream(&mut self, pipe: Pipe) {
        if self.upstream.is_some() {
            tracing::warn!("upstream pipe registered twice, keeping the first");
            return;
        }
        self.upstream = Some(pipe);
    }

    /// Observable end-of-connection flag, set in every completion path.
    pub fn ended_signal(&self) -> Arc<AtomicBool> {
        self.ended.clone()
    }

    /// Start the downstream pipe together with the stored upstream pipe.
    ///
    /// Completes when both pipes complete; fails as soon as either fails.
    pub async fn run(mut self, downstream: Pipe) -> std::io::Result<(u64, u64)> {
        let upstream = self.upstream.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "upstream pipe was never registered")
        })?;

        let result = futures_util::future::try_join(upstream, downstream).await;
        self.ended.store(true, Ordering::SeqCst);
        result
    }
}

/// Bytes moved through a completed tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnelStats {
    pub bytes_upstream: u64,
    pub bytes_downstream: u64,
}

/// Backend-facing TCP endpoint connector.
#[derive(Debug, Clone)]
pub struct TcpEndpointConnector {
    target: String,
}

impl TcpEndpointConnector {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }

    /// Dial the backend and tunnel the client connection through it.
    pub async fn connect(&self, client: TcpClientConnection) -> std::io::Result<TunnelStats> {
        let connection_id = client.id().to_string();
        tracing::debug!(connection_id = %connection_id, target = %self.target, "Opening TCP tunnel");

        let backend = TcpStream::connect(&self.target).await?;
        let (mut backend_read, mut backend_write) = backend.into_split();
        let (mut client_read, mut client_write) = tokio::io::split(client.into_io());

        let mut tunnel = TcpTunnel::new();
        tunnel.pipe_upstream(Box::pin(async move {
            let moved = tokio::io::copy(&mut client_read, &mut backend_write).await?;
            backend_write.shutdown().await?;
            Ok(moved)
        }));

        // Backend connected: downstream is ready to start.
        let downstream: Pipe = Box::pin(async move {
            let moved = tokio::io::copy(&mut backend_read, &mut client_write).await?;
            client_write.shutdown().await?;
            Ok(moved)
        });

        let ended = tunnel.ended_signal();
        let result = tunnel.run(downstream).await;
        debug_assert!(ended.load(Ordering::SeqCst));

        match result {
            Ok((bytes_upstream, bytes_downstream)) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    bytes_upstream,
                    bytes_downstream,
                    "TCP tunnel ended"
                );
                Ok(TunnelStats {
                    bytes_upstream,
                    bytes_downstream,
                })
            }
            Err(error) => {
                tracing::debug!(connection_id = %connection_id, error = %error, "TCP tunnel failed");
                Err(error)
            }
        }
    }
}
