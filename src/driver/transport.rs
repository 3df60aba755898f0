//! Byte-stream transport.
//!
//! Owns one TCP (optionally TLS) stream. Every read path shares a single
//! buffer, so bytes pulled in by a readiness check or an opportunistic read
//! are never lost to the framed receive path.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::{timeout, Instant};
use tokio_util::codec::Decoder;

use super::config::{ConnectionConfig, TlsMode};
use super::error::{DriverError, DriverResult};
use super::tls::TlsConnector;
use crate::bolt::{ChunkCodec, RawMessage};

/// Poll interval used by opportunistic reads
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Any stream a transport can own.
pub trait BoltStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> BoltStream for T {}

/// Connection to one server.
pub struct Transport {
    config: ConnectionConfig,
    stream: Option<Box<dyn BoltStream>>,
    read_buffer: BytesMut,
    idle_since: Instant,
}

impl Transport {
    /// Unconnected transport for `config`.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            stream: None,
            read_buffer: BytesMut::with_capacity(8192),
            idle_since: Instant::now(),
        }
    }

    /// Transport over an already connected stream.
    pub fn from_stream(config: ConnectionConfig, stream: impl BoltStream + 'static) -> Self {
        let mut transport = Self::new(config);
        transport.stream = Some(Box::new(stream));
        transport
    }

    /// Configuration in use.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// True while a stream is open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.read_buffer.len()
    }

    /// Time since the last read that produced data.
    pub fn idle_for(&self) -> Duration {
        self.idle_since.elapsed()
    }

    /// Open the stream, negotiating TLS first when required.
    pub async fn connect(&mut self) -> DriverResult<()> {
        if self.is_connected() {
            return Ok(());
        }

        let address = self.config.address();
        tracing::debug!(address = %address, tls = ?self.config.tls_mode, "connecting");

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(address.as_str())
            .await
            .map_err(|e| DriverError::connection(format!("Failed to resolve {}: {}", address, e)))?
            .collect();

        let mut last_error = None;
        let mut connected = None;
        for addr in addrs {
            match self.connect_addr(addr).await {
                Ok(tcp) => {
                    connected = Some(tcp);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }
        let tcp = connected.ok_or_else(|| {
            DriverError::connection(format!(
                "Failed to connect to {}: {}",
                address,
                last_error.map_or_else(|| "no addresses".to_string(), |e| e.to_string())
            ))
        })?;

        let stream: Box<dyn BoltStream> = match self.config.tls_mode {
            TlsMode::Disabled => Box::new(tcp),
            TlsMode::Required => {
                let connector = TlsConnector::new(&self.config.trust_strategy)?;
                let server_name = self.config.tls_server_name().to_string();
                let tls = timeout(self.config.connect_timeout, connector.connect(tcp, &server_name))
                    .await
                    .map_err(|_| DriverError::connection("TLS handshake timed out"))??;
                Box::new(tls)
            }
        };

        self.stream = Some(stream);
        self.read_buffer.clear();
        self.idle_since = Instant::now();
        tracing::debug!(address = %address, "connected");
        Ok(())
    }

    async fn connect_addr(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_keepalive(self.config.keep_alive)?;
        if let Some(local) = self.config.bind_to_interface {
            socket.bind(local)?;
        }
        let stream = timeout(self.config.connect_timeout, socket.connect(addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Release the stream. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::trace!(error = %e, "shutdown failed");
            }
            tracing::debug!("transport closed");
        }
        self.read_buffer.clear();
    }

    /// Close then connect.
    pub async fn reconnect(&mut self) -> DriverResult<()> {
        self.close().await;
        self.connect().await
    }

    /// Write every byte of `data`, then flush.
    pub async fn write(&mut self, data: &[u8]) -> DriverResult<()> {
        let stream = self.stream.as_mut().ok_or(DriverError::NotConnected)?;
        let mut written = 0;
        while written < data.len() {
            match stream.write(&data[written..]).await {
                Ok(0) => return Err(DriverError::broken_pipe("stream closed during write")),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io(e)),
            }
        }
        stream.flush().await.map_err(map_io)
    }

    /// Read exactly `n` bytes, waiting as long as needed.
    pub async fn read(&mut self, n: usize) -> DriverResult<Bytes> {
        while self.read_buffer.len() < n {
            self.fill().await?;
        }
        Ok(self.read_buffer.split_to(n).freeze())
    }

    /// Read one complete framed message.
    pub async fn read_message(&mut self, codec: &mut ChunkCodec) -> DriverResult<RawMessage> {
        loop {
            if let Some(message) = codec.decode(&mut self.read_buffer)? {
                return Ok(message);
            }
            self.fill().await?;
        }
    }

    /// Return up to `max_len` bytes if any are ready, or none.
    ///
    /// Fails with [`DriverError::Timeout`] once nothing has arrived for
    /// longer than the idle threshold.
    pub async fn read_chunk(&mut self, max_len: usize) -> DriverResult<Bytes> {
        if self.read_buffer.is_empty() && self.try_fill(POLL_INTERVAL).await?.is_none() {
            let idle = self.idle_since.elapsed();
            if idle > self.config.idle_timeout {
                return Err(DriverError::timeout(format!(
                    "no data received for {:?}",
                    idle
                )));
            }
            return Ok(Bytes::new());
        }
        let n = max_len.min(self.read_buffer.len());
        self.idle_since = Instant::now();
        Ok(self.read_buffer.split_to(n).freeze())
    }

    /// True if data can be read within `wait`.
    pub async fn select(&mut self, wait: Duration) -> DriverResult<bool> {
        if !self.read_buffer.is_empty() {
            return Ok(true);
        }
        Ok(self.try_fill(wait).await?.is_some())
    }

    /// Drain everything currently available.
    ///
    /// Polls every [`POLL_INTERVAL`] and stops at the first poll that
    /// yields nothing.
    pub async fn read_all(&mut self) -> DriverResult<Bytes> {
        while self.try_fill(POLL_INTERVAL).await?.is_some() {}
        Ok(self.read_buffer.split().freeze())
    }

    async fn fill(&mut self) -> DriverResult<usize> {
        let read_timeout = self.config.read_timeout;
        let stream = self.stream.as_mut().ok_or(DriverError::NotConnected)?;
        let read = stream.read_buf(&mut self.read_buffer);
        let n = match read_timeout {
            Some(limit) => timeout(limit, read)
                .await
                .map_err(|_| DriverError::timeout(format!("read timed out after {:?}", limit)))?,
            None => read.await,
        }
        .map_err(map_io)?;
        self.received(n)
    }

    async fn try_fill(&mut self, wait: Duration) -> DriverResult<Option<usize>> {
        let stream = self.stream.as_mut().ok_or(DriverError::NotConnected)?;
        let polled = timeout(wait, stream.read_buf(&mut self.read_buffer)).await;
        match polled {
            Err(_) => Ok(None),
            Ok(read) => self.received(read.map_err(map_io)?).map(Some),
        }
    }

    fn received(&mut self, n: usize) -> DriverResult<usize> {
        if n == 0 {
            return Err(DriverError::broken_pipe("stream closed by peer"));
        }
        self.idle_since = Instant::now();
        Ok(n)
    }
}

fn map_io(e: io::Error) -> DriverError {
    match e.kind() {
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::UnexpectedEof => DriverError::broken_pipe(e.to_string()),
        io::ErrorKind::TimedOut => DriverError::timeout(e.to_string()),
        _ => DriverError::Io(e),
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("address", &self.config.address())
            .field("connected", &self.is_connected())
            .field("buffered", &self.read_buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn transport() -> (Transport, tokio::io::DuplexStream) {
        let (client, server) = duplex(1024);
        (Transport::from_stream(ConnectionConfig::default(), client), server)
    }

    #[tokio::test]
    async fn test_unconnected_io_fails() {
        let mut transport = Transport::new(ConnectionConfig::default());
        assert!(!transport.is_connected());
        assert!(matches!(transport.write(b"x").await, Err(DriverError::NotConnected)));
        assert!(matches!(transport.read(1).await, Err(DriverError::NotConnected)));
        assert!(matches!(transport.read_all().await, Err(DriverError::NotConnected)));
    }

    #[tokio::test]
    async fn test_read_exact_across_writes() {
        let (mut transport, mut server) = transport();
        server.write_all(&[1, 2]).await.unwrap();
        server.write_all(&[3, 4, 5]).await.unwrap();
        assert_eq!(&transport.read(4).await.unwrap()[..], &[1, 2, 3, 4]);
        assert_eq!(transport.buffered(), 1);
        assert_eq!(&transport.read(1).await.unwrap()[..], &[5]);
    }

    #[tokio::test]
    async fn test_eof_is_broken_pipe() {
        let (mut transport, server) = transport();
        drop(server);
        assert!(matches!(transport.read(1).await, Err(DriverError::BrokenPipe(_))));
    }

    #[tokio::test]
    async fn test_write_reaches_peer() {
        let (mut transport, mut server) = transport();
        transport.write(&[9; 100]).await.unwrap();
        let mut buf = [0u8; 100];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [9; 100]);
    }

    #[tokio::test]
    async fn test_close_idempotent() {
        let (mut transport, _server) = transport();
        transport.close().await;
        transport.close().await;
        assert!(!transport.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let (client, _server) = duplex(64);
        let config = ConnectionConfig::builder()
            .with_read_timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let mut transport = Transport::from_stream(config, client);
        assert!(matches!(transport.read(1).await, Err(DriverError::Timeout(_))));
    }

    #[test]
    fn test_io_error_mapping() {
        let e = map_io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(matches!(e, DriverError::BrokenPipe(_)));
        let e = map_io(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(matches!(e, DriverError::Io(_)));
    }
}
