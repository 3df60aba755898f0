//! Bolt V1 session.
//!
//! A [`Session`] owns one [`Transport`] and drives the strictly ordered
//! request/response exchange over it:
//!
//! - INIT is sent lazily before the first statement,
//! - every statement is a RUN followed immediately by PULL_ALL,
//! - a FAILURE is always cleared with ACK_FAILURE before it reaches the caller.
//!
//! The session counts requests that have not received their terminal
//! response yet. Recovery drains exactly that many IGNORED responses, so the
//! same procedure serves single statements, pipelines and hand-written
//! exchanges through [`Session::send_messages`] and
//! [`Session::receive_message`].

use std::collections::HashMap;

use bytes::BytesMut;
use tokio::time::timeout;
use tokio_util::codec::Encoder;

use super::config::ConnectionConfig;
use super::error::{DriverError, DriverResult};
use super::pipeline::Pipeline;
use super::recovery::{Recovery, RecoveryOutcome};
use super::result::{Outcome, QueryResult, Response, ResultCollection, Statement};
use super::transaction::Transaction;
use super::transport::{BoltStream, Transport};
use crate::bolt::handshake::{
    agreed_version, client_handshake, HANDSHAKE_RESPONSE_SIZE, PROPOSED_VERSIONS,
    PROTOCOL_VERSION,
};
use crate::bolt::{BoltRequest, BoltResponse, ChunkCodec, FailureMessage, InitMessage, Value};

// ============================================================================
// Session State
// ============================================================================

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No stream
    Unconnected,
    /// Stream open and version agreed; INIT not yet acknowledged
    Connected,
    /// Initialized and idle between requests
    Ready,
    /// Requests sent, responses being drained
    Streaming,
    /// FAILURE observed, recovery in progress
    Failed,
    /// Stream out of sync or broken; only close or reconnect are possible
    Defunct,
    /// Closed by the caller
    Closed,
}

impl SessionState {
    /// True once INIT has been acknowledged.
    pub fn is_initialized(self) -> bool {
        matches!(
            self,
            SessionState::Ready | SessionState::Streaming | SessionState::Failed
        )
    }
}

// ============================================================================
// Session
// ============================================================================

/// One Bolt V1 conversation over one connection.
///
/// All operations take `&mut self`; a session serves one caller at a time.
pub struct Session {
    transport: Transport,
    codec: ChunkCodec,
    state: SessionState,
    protocol_version: Option<u32>,
    server_agent: Option<String>,
    outstanding: usize,
    transaction_bound: bool,
}

impl Session {
    /// Unconnected session for `config`.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_transport(Transport::new(config))
    }

    fn with_transport(transport: Transport) -> Self {
        let config = transport.config();
        let codec = ChunkCodec::with_limits(config.max_chunk_size, config.max_message_size);
        Self {
            transport,
            codec,
            state: SessionState::Unconnected,
            protocol_version: None,
            server_agent: None,
            outstanding: 0,
            transaction_bound: false,
        }
    }

    /// Open a connection and agree on the protocol version.
    ///
    /// INIT is not sent yet; it happens on the first statement or through
    /// [`Session::init`].
    pub async fn connect(config: ConnectionConfig) -> DriverResult<Self> {
        config.validate()?;
        let mut session = Self::new(config);
        session.transport.connect().await?;
        session.handshake().await?;
        Ok(session)
    }

    /// Handshake over an already open stream.
    pub async fn from_stream(
        config: ConnectionConfig,
        stream: impl BoltStream + 'static,
    ) -> DriverResult<Self> {
        let mut session = Self::with_transport(Transport::from_stream(config, stream));
        session.handshake().await?;
        Ok(session)
    }

    async fn handshake(&mut self) -> DriverResult<()> {
        self.transport
            .write(&client_handshake(PROPOSED_VERSIONS))
            .await?;
        let limit = self.transport.config().connect_timeout;
        let response = timeout(limit, self.transport.read(HANDSHAKE_RESPONSE_SIZE))
            .await
            .map_err(|_| {
                DriverError::timeout(format!("no handshake response after {:?}", limit))
            })??;

        let mut answer = [0u8; HANDSHAKE_RESPONSE_SIZE];
        answer.copy_from_slice(&response);
        let version = agreed_version(answer)?;

        self.protocol_version = Some(version);
        self.state = SessionState::Connected;
        tracing::debug!(version, "handshake completed");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once INIT has been acknowledged.
    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    /// True while the transport holds a stream.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Negotiated protocol version.
    pub fn protocol_version(&self) -> u32 {
        self.protocol_version.unwrap_or(PROTOCOL_VERSION)
    }

    /// `server` entry of the INIT SUCCESS metadata.
    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    /// Requests still waiting for their terminal response.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// True while a [`Transaction`] is bound.
    pub fn has_transaction(&self) -> bool {
        self.transaction_bound
    }

    /// Connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        self.transport.config()
    }

    // ------------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------------

    /// Send INIT with the configured client identity and credentials.
    ///
    /// Anything but SUCCESS leaves the session [`SessionState::Defunct`].
    pub async fn init(&mut self) -> DriverResult<()> {
        self.ensure_open()?;
        if self.state != SessionState::Connected {
            return Err(DriverError::invalid_state(format!(
                "INIT requires a connected session, state is {:?}",
                self.state
            )));
        }

        let config = self.transport.config();
        let init = InitMessage::new(config.user_agent.clone(), config.auth.to_map());
        tracing::debug!(
            user_agent = %init.user_agent,
            scheme = config.auth.scheme(),
            "sending INIT"
        );

        self.send_messages(&[BoltRequest::Init(init)]).await?;
        match self.read_response().await? {
            BoltResponse::Success(success) => {
                self.server_agent = success.server().map(String::from);
                self.state = SessionState::Ready;
                tracing::debug!(server = ?self.server_agent, "session initialized");
                Ok(())
            }
            BoltResponse::Failure(failure) => Err(self.poison(DriverError::Initialization(
                format!("{}: {}", failure.code, failure.message),
            ))),
            other => Err(self.poison(DriverError::Initialization(format!(
                "unexpected {} in reply to INIT",
                other.name()
            )))),
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    /// Run one statement and collect its whole result.
    ///
    /// `tag` is copied onto the result's [`Statement`].
    pub async fn run(
        &mut self,
        query: impl Into<String>,
        parameters: HashMap<String, Value>,
        tag: Option<&str>,
    ) -> DriverResult<QueryResult> {
        let mut statement = Statement::new(query).with_params(parameters);
        statement.tag = tag.map(String::from);
        self.run_statement(statement).await
    }

    /// Run a prepared [`Statement`].
    pub async fn run_statement(&mut self, statement: Statement) -> DriverResult<QueryResult> {
        self.prepare().await?;
        self.send_messages(&statement.to_requests()).await?;
        self.state = SessionState::Streaming;

        let result = self.receive_result(statement).await?;
        self.state = SessionState::Ready;
        Ok(result)
    }

    /// Start a batch of statements sent together.
    pub fn pipeline(&mut self) -> Pipeline<'_> {
        Pipeline::new(self)
    }

    /// Send every statement in one write, then read the results in order.
    pub(crate) async fn run_batch(
        &mut self,
        statements: Vec<Statement>,
    ) -> DriverResult<ResultCollection> {
        let mut results = ResultCollection::new();
        if statements.is_empty() {
            return Ok(results);
        }

        self.prepare().await?;
        let requests: Vec<BoltRequest> = statements
            .iter()
            .flat_map(Statement::to_requests)
            .collect();
        tracing::debug!(statements = statements.len(), "running pipeline");
        self.send_messages(&requests).await?;
        self.state = SessionState::Streaming;

        for statement in statements {
            results.push(self.receive_result(statement).await?);
        }
        self.state = SessionState::Ready;
        Ok(results)
    }

    async fn prepare(&mut self) -> DriverResult<()> {
        self.ensure_open()?;
        if self.state == SessionState::Connected {
            self.init().await?;
        }
        match self.state {
            SessionState::Ready if self.outstanding > 0 => {
                Err(DriverError::invalid_state(format!(
                    "{} responses to earlier requests are still pending",
                    self.outstanding
                )))
            }
            SessionState::Ready => Ok(()),
            other => Err(DriverError::invalid_state(format!(
                "cannot run a statement while {:?}",
                other
            ))),
        }
    }

    /// Read the RUN and PULL_ALL responses of one statement.
    async fn receive_result(&mut self, statement: Statement) -> DriverResult<QueryResult> {
        let run = match self.read_response().await? {
            BoltResponse::Success(success) => success,
            BoltResponse::Failure(failure) => {
                return Err(self.recover(failure).await.into_error());
            }
            other => {
                return Err(self.poison(DriverError::desync("SUCCESS", other.name())));
            }
        };

        let mut pull = Response::new();
        loop {
            if pull.push(self.read_response().await?) {
                break;
            }
        }

        let (records, outcome) = pull.into_parts();
        match outcome {
            Some(Outcome::Success(summary)) => Ok(QueryResult::from_responses(
                statement, &run, records, &summary,
            )),
            Some(Outcome::Failure(failure)) => Err(self.recover(failure).await.into_error()),
            Some(Outcome::Ignored) => Err(self.poison(DriverError::desync("SUCCESS", "IGNORED"))),
            None => Err(self.poison(DriverError::protocol(
                "response ended without a terminal message",
            ))),
        }
    }

    // ------------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------------

    /// Send one request.
    pub async fn send_message(&mut self, request: BoltRequest) -> DriverResult<()> {
        self.send_messages(std::slice::from_ref(&request)).await
    }

    /// Send requests as one contiguous write, with no reads in between.
    ///
    /// Statements are refused until every response is read back through
    /// [`Session::receive_message`].
    pub async fn send_messages(&mut self, requests: &[BoltRequest]) -> DriverResult<()> {
        self.ensure_open()?;

        let mut buffer = BytesMut::new();
        for request in requests {
            self.codec.encode(request, &mut buffer)?;
            tracing::trace!(message = request.name(), "send");
        }

        if let Err(e) = self.transport.write(&buffer).await {
            return Err(self.poison(e));
        }
        self.outstanding += requests.len();
        Ok(())
    }

    /// Receive one response.
    ///
    /// A FAILURE is acknowledged before it is returned as
    /// [`DriverError::MessageFailure`], so the session stays usable even if
    /// the caller ignores the error.
    pub async fn receive_message(&mut self) -> DriverResult<BoltResponse> {
        self.ensure_open()?;
        match self.read_response().await? {
            BoltResponse::Failure(failure) => Err(self.recover(failure).await.into_error()),
            response => Ok(response),
        }
    }

    async fn read_response(&mut self) -> DriverResult<BoltResponse> {
        let received = match self.transport.read_message(&mut self.codec).await {
            Ok(raw) => raw
                .decode()
                .map_err(|e| DriverError::protocol(format!("undecodable response: {}", e))),
            Err(e) => Err(e),
        };
        let response = received.map_err(|e| self.poison(e))?;

        tracing::trace!(message = response.name(), "received");
        if response.is_terminal() {
            self.outstanding = self.outstanding.saturating_sub(1);
        }
        Ok(response)
    }

    // ------------------------------------------------------------------------
    // Failure recovery
    // ------------------------------------------------------------------------

    async fn recover(&mut self, failure: FailureMessage) -> RecoveryOutcome {
        let resume = match self.state {
            SessionState::Connected => SessionState::Connected,
            _ => SessionState::Ready,
        };
        self.state = SessionState::Failed;
        tracing::debug!(
            code = %failure.code,
            outstanding = self.outstanding,
            "acknowledging failure"
        );

        match self.acknowledge_failure().await {
            Ok(()) => {
                self.state = resume;
                tracing::debug!(code = %failure.code, "failure acknowledged");
                RecoveryOutcome::Recovered(failure)
            }
            Err(error) => RecoveryOutcome::Fatal(self.poison(error)),
        }
    }

    async fn acknowledge_failure(&mut self) -> DriverResult<()> {
        let mut recovery = Recovery::start(self.outstanding);
        while recovery != Recovery::Recovered {
            recovery = if recovery.awaits_response() {
                let response = self.read_response().await?;
                recovery.on_response(&response)?
            } else {
                self.send_message(BoltRequest::AckFailure).await?;
                recovery.ack_sent()?
            };
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    /// Bind a transaction to this session.
    ///
    /// Fails with [`DriverError::TransactionAlreadyBound`] while another one
    /// is bound. No I/O happens here.
    pub fn transaction(&mut self) -> DriverResult<Transaction<'_>> {
        self.ensure_open()?;
        if self.transaction_bound {
            return Err(DriverError::TransactionAlreadyBound);
        }
        self.transaction_bound = true;
        tracing::debug!("transaction bound");
        Ok(Transaction::new(self))
    }

    pub(crate) fn release_transaction(&mut self) {
        self.transaction_bound = false;
    }

    /// Not available at protocol version 1.
    pub fn begin(&self) -> DriverResult<()> {
        Err(self.unsupported("BEGIN"))
    }

    /// Not available at protocol version 1.
    pub fn commit(&self) -> DriverResult<()> {
        Err(self.unsupported("COMMIT"))
    }

    /// Not available at protocol version 1.
    pub fn rollback(&self) -> DriverResult<()> {
        Err(self.unsupported("ROLLBACK"))
    }

    fn unsupported(&self, operation: &'static str) -> DriverError {
        DriverError::UnsupportedOperation {
            operation,
            version: self.protocol_version(),
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Close the connection. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.transport.close().await;
        self.reset();
        self.state = SessionState::Closed;
        tracing::debug!("session closed");
    }

    /// Tear the connection down and open a fresh one.
    ///
    /// The new connection needs INIT again; any bound transaction is released.
    pub async fn reconnect(&mut self) -> DriverResult<()> {
        tracing::debug!(address = %self.transport.config().address(), "reconnecting");
        self.reset();
        self.state = SessionState::Unconnected;
        self.transport.reconnect().await?;
        if let Err(e) = self.handshake().await {
            return Err(self.poison(e));
        }
        Ok(())
    }

    fn reset(&mut self) {
        let config = self.transport.config();
        self.codec = ChunkCodec::with_limits(config.max_chunk_size, config.max_message_size);
        self.protocol_version = None;
        self.server_agent = None;
        self.outstanding = 0;
        self.transaction_bound = false;
    }

    fn ensure_open(&self) -> DriverResult<()> {
        match self.state {
            SessionState::Unconnected => Err(DriverError::NotConnected),
            SessionState::Defunct => Err(DriverError::invalid_state(
                "session is defunct; reconnect or discard it",
            )),
            SessionState::Closed => Err(DriverError::invalid_state("session is closed")),
            _ => Ok(()),
        }
    }

    /// Mark the session unusable after a fatal error.
    fn poison(&mut self, error: DriverError) -> DriverError {
        if error.is_fatal() && !matches!(self.state, SessionState::Defunct | SessionState::Closed) {
            tracing::warn!(error = %error, state = ?self.state, "session is now defunct");
            self.state = SessionState::Defunct;
        }
        error
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport)
            .field("state", &self.state)
            .field("protocol_version", &self.protocol_version)
            .field("server_agent", &self.server_agent)
            .field("outstanding", &self.outstanding)
            .field("transaction_bound", &self.transaction_bound)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_state_initialized() {
        assert!(!SessionState::Connected.is_initialized());
        assert!(SessionState::Ready.is_initialized());
        assert!(SessionState::Streaming.is_initialized());
        assert!(!SessionState::Defunct.is_initialized());
    }

    #[test]
    fn test_transactional_operations_unsupported() {
        let session = Session::new(ConnectionConfig::default());
        for result in [session.begin(), session.commit(), session.rollback()] {
            assert!(matches!(
                result,
                Err(DriverError::UnsupportedOperation { version: 1, .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_unconnected_session() {
        let mut session = Session::new(ConnectionConfig::default());
        assert_eq!(session.state(), SessionState::Unconnected);
        assert!(matches!(
            session.run("RETURN 1", HashMap::new(), None).await,
            Err(DriverError::NotConnected)
        ));
        assert!(matches!(session.transaction(), Err(DriverError::NotConnected)));
        assert!(matches!(session.init().await, Err(DriverError::NotConnected)));
    }

    #[tokio::test]
    async fn test_close_idempotent() {
        let mut session = Session::new(ConnectionConfig::default());
        session.close().await;
        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(
            session.send_message(BoltRequest::PullAll).await,
            Err(DriverError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_handshake_bytes_and_version() {
        let (client, mut server) = duplex(1024);
        let peer = tokio::spawn(async move {
            let mut preamble = [0u8; 20];
            server.read_exact(&mut preamble).await.unwrap();
            server.write_all(&[0, 0, 0, 1]).await.unwrap();
            (preamble, server)
        });

        let session = Session::from_stream(ConnectionConfig::default(), client)
            .await
            .unwrap();
        let (preamble, _server) = peer.await.unwrap();

        assert_eq!(preamble, client_handshake(PROPOSED_VERSIONS));
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.protocol_version(), 1);
        assert!(!session.is_initialized());
    }

    #[tokio::test]
    async fn test_handshake_rejected() {
        for answer in [[0u8, 0, 0, 0], [0, 0, 0, 2]] {
            let (client, mut server) = duplex(1024);
            let peer = tokio::spawn(async move {
                let mut preamble = [0u8; 20];
                server.read_exact(&mut preamble).await.unwrap();
                server.write_all(&answer).await.unwrap();
                server
            });
            let result = Session::from_stream(ConnectionConfig::default(), client).await;
            assert!(matches!(result, Err(DriverError::Protocol(_))));
            drop(peer.await.unwrap());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_times_out_on_silent_peer() {
        let config = ConnectionConfig::builder()
            .with_connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let (client, mut server) = duplex(1024);
        let peer = tokio::spawn(async move {
            let mut preamble = [0u8; 20];
            server.read_exact(&mut preamble).await.unwrap();
            server
        });

        let result = Session::from_stream(config, client).await;
        assert!(matches!(result, Err(DriverError::Timeout(_))));
        drop(peer.await.unwrap());
    }
}
