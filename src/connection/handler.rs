//! Connection Handler
//!
//! Serves one connected client: read a request buffer, decode it, dispatch,
//! write the reply if the dispatcher selected one, repeat until the client
//! goes away.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              per-connection loop             │
//! │                                              │
//! │   read buffer ─> decode ─> dispatch ─┬─> ok  │
//! │        ▲                             │       │
//! │        └──────── write reply <───────┘       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! One read is treated as one logical request: the buffer is decoded once
//! and then discarded, whether or not it parsed. A buffer the decoder
//! rejects, or a command the dispatcher declines, produces no reply and
//! leaves the connection open for the next request.

use crate::commands::Dispatcher;
use crate::protocol;
use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace};

/// Read buffer capacity per connection. One request is expected to fit in a
/// single read; anything larger is rejected by the decoder as malformed.
const READ_BUFFER_SIZE: usize = 4096;

/// Counters shared across all connection tasks.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Commands that produced a reply
    pub commands_processed: AtomicU64,
    /// Buffers dropped silently (decode failure or ignored command)
    pub commands_dropped: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_dropped(&self) {
        self.commands_dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Serves a single client connection.
pub struct ConnectionHandler {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,
    buffer: BytesMut,
    dispatcher: Dispatcher,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        dispatcher: Dispatcher,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            dispatcher,
            stats,
        }
    }

    /// Runs the read-dispatch-reply loop until the client disconnects.
    pub async fn run(mut self) -> io::Result<()> {
        info!(client = %self.addr, "Client connected");

        let result = self.serve().await;

        match &result {
            Ok(()) => debug!(client = %self.addr, "Client disconnected"),
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => debug!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn serve(&mut self) -> io::Result<()> {
        loop {
            self.buffer.clear();
            let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Ok(());
            }

            let tokens = protocol::decode(&self.buffer);
            if tokens.is_empty() {
                self.stats.command_dropped();
                trace!(client = %self.addr, bytes = n, "Dropped undecodable buffer");
                continue;
            }

            match self.dispatcher.dispatch(&tokens) {
                Some(reply) => {
                    let bytes = reply.serialize();
                    self.stream.write_all(&bytes).await?;
                    self.stream.flush().await?;
                    self.stats.command_processed();
                    trace!(client = %self.addr, bytes = bytes.len(), "Sent reply");
                }
                None => {
                    self.stats.command_dropped();
                    trace!(client = %self.addr, "Command ignored, no reply");
                }
            }
        }
    }
}

/// Creates a [`ConnectionHandler`] for the accepted stream and runs it to
/// completion. I/O failures are logged inside `run`; nothing propagates.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    dispatcher: Dispatcher,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, dispatcher, stats);
    let _ = handler.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::storage::Store;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::{timeout, Duration};

    async fn spawn_test_server() -> (SocketAddr, Arc<Store>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Store::new());
        let config = Arc::new(ServerConfig::default());
        let stats = Arc::new(ConnectionStats::new());

        let dispatcher = Dispatcher::new(Arc::clone(&store), config);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let dispatcher = dispatcher.clone();
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(stream, client_addr, dispatcher, stats));
            }
        });

        (addr, store, stats)
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (addr, _, _) = spawn_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (addr, _, _) = spawn_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$5\r\nember\r\n")
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"+OK\r\n");

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n")
            .await
            .unwrap();

        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"$5\r\nember\r\n");
    }

    #[tokio::test]
    async fn test_garbage_buffer_is_silently_dropped() {
        let (addr, _, stats) = spawn_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"not a protocol frame\r\n").await.unwrap();

        // No reply arrives for the garbage buffer
        let mut buf = [0u8; 64];
        let read = timeout(Duration::from_millis(100), client.read(&mut buf)).await;
        assert!(read.is_err(), "garbage buffer must not produce a reply");

        // The connection is still healthy and serves the next request
        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"+PONG\r\n");

        assert!(stats.commands_dropped.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn test_unknown_command_keeps_connection_open() {
        let (addr, _, _) = spawn_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"*1\r\n$8\r\nFLUSHALL\r\n")
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let read = timeout(Duration::from_millis(100), client.read(&mut buf)).await;
        assert!(read.is_err(), "unknown command must not produce a reply");

        client
            .write_all(b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n")
            .await
            .unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"$2\r\nhi\r\n");
    }

    #[tokio::test]
    async fn test_stats_track_connections() {
        let (addr, _, stats) = spawn_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        let mut buf = [0u8; 64];
        let _ = client.read(&mut buf).await.unwrap();

        assert!(stats.commands_processed.load(Ordering::Relaxed) >= 1);

        drop(client);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
