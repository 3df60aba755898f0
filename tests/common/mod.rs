//! Scripted in-memory Bolt server for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use bolt_v1_client::bolt::handshake::{parse_client_handshake, HANDSHAKE_SIZE};
use bolt_v1_client::bolt::packstream::unpack;
use bolt_v1_client::bolt::{
    BoltRequest, BoltResponse, ChunkCodec, FailureMessage, RecordMessage, SuccessMessage, Value,
};
use bolt_v1_client::{ConnectionConfig, Session};
use bytes::BytesMut;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio_util::codec::{Decoder, Encoder};

/// How long [`MockServer::assert_idle`] waits for an unexpected request.
pub const QUIET_PERIOD: Duration = Duration::from_millis(50);

/// Server end of an in-memory connection.
pub struct MockServer {
    stream: DuplexStream,
    codec: ChunkCodec,
    buffer: BytesMut,
}

impl MockServer {
    /// Answer the client preamble with version 1.
    pub async fn accept(mut stream: DuplexStream) -> Self {
        let mut preamble = [0u8; HANDSHAKE_SIZE];
        stream.read_exact(&mut preamble).await.unwrap();
        let versions = parse_client_handshake(&preamble).unwrap();
        assert_eq!(versions, [1, 0, 0, 0]);
        stream.write_all(&1u32.to_be_bytes()).await.unwrap();

        Self {
            stream,
            codec: ChunkCodec::new(),
            buffer: BytesMut::new(),
        }
    }

    /// Next request, or `None` once the client has closed the stream.
    pub async fn try_recv(&mut self) -> Option<BoltRequest> {
        loop {
            if let Some(raw) = self.codec.decode(&mut self.buffer).unwrap() {
                let structure = match unpack(raw.as_bytes()).unwrap() {
                    Value::Structure(s) => s,
                    other => panic!("expected a message structure, got {:?}", other),
                };
                return Some(BoltRequest::from_structure(&structure).unwrap());
            }
            let n = self.stream.read_buf(&mut self.buffer).await.unwrap();
            if n == 0 {
                return None;
            }
        }
    }

    /// Next request; panics if the client is gone.
    pub async fn recv(&mut self) -> BoltRequest {
        self.try_recv().await.expect("client closed the connection")
    }

    /// Names of the next `n` requests.
    pub async fn recv_names(&mut self, n: usize) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(n);
        for _ in 0..n {
            names.push(self.recv().await.name());
        }
        names
    }

    /// Names of every request until the client closes.
    pub async fn drain(&mut self) -> Vec<&'static str> {
        let mut names = Vec::new();
        while let Some(request) = self.try_recv().await {
            names.push(request.name());
        }
        names
    }

    /// Assert no request arrives for a short while.
    pub async fn assert_idle(&mut self) {
        let pending = tokio::time::timeout(QUIET_PERIOD, self.try_recv()).await;
        if let Ok(Some(request)) = pending {
            panic!("unexpected {}", request.name());
        }
    }

    /// Send responses back to back.
    pub async fn send(&mut self, responses: &[BoltResponse]) {
        let mut out = BytesMut::new();
        for response in responses {
            self.codec.encode(response, &mut out).unwrap();
        }
        self.stream.write_all(&out).await.unwrap();
    }

    /// Receive INIT and accept it.
    pub async fn expect_init(&mut self) -> BoltRequest {
        let init = self.recv().await;
        assert_eq!(init.name(), "INIT");
        self.send(&[success_with("server", "Neo4j/3.0.0")]).await;
        init
    }
}

/// Session and mock server joined by an in-memory stream.
pub async fn connect() -> (Session, MockServer) {
    connect_with(ConnectionConfig::default()).await
}

/// Same as [`connect`] with a custom configuration.
pub async fn connect_with(config: ConnectionConfig) -> (Session, MockServer) {
    let (client, server) = duplex(64 * 1024);
    let (session, server) = tokio::join!(Session::from_stream(config, client), MockServer::accept(server));
    (session.unwrap(), server)
}

/// Session that has already completed INIT.
pub async fn initialized() -> (Session, MockServer) {
    let (mut session, mut server) = connect().await;
    let (init, _) = tokio::join!(session.init(), server.expect_init());
    init.unwrap();
    (session, server)
}

// ============================================================================
// Responses
// ============================================================================

pub fn success() -> BoltResponse {
    BoltResponse::Success(SuccessMessage::new())
}

pub fn success_with(key: &str, value: impl Into<Value>) -> BoltResponse {
    BoltResponse::Success(SuccessMessage::new().with(key, value))
}

pub fn fields(names: &[&str]) -> BoltResponse {
    let names: Vec<Value> = names.iter().map(|n| Value::from(*n)).collect();
    success_with("fields", names)
}

pub fn summary(stats: &[(&str, i64)]) -> BoltResponse {
    let stats: HashMap<String, Value> = stats
        .iter()
        .map(|(k, v)| (k.to_string(), Value::Integer(*v)))
        .collect();
    BoltResponse::Success(SuccessMessage::new().with("stats", stats).with("type", "rw"))
}

pub fn record(values: Vec<Value>) -> BoltResponse {
    BoltResponse::Record(RecordMessage::new(values))
}

pub fn failure(code: &str, message: &str) -> BoltResponse {
    BoltResponse::Failure(FailureMessage::new(code, message))
}

pub fn ignored() -> BoltResponse {
    BoltResponse::Ignored
}

pub const SYNTAX_ERROR: &str = "Neo.ClientError.Statement.SyntaxError";
