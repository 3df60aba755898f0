//! # Bolt V1 Client
//!
//! An async client for graph databases speaking Bolt protocol version 1.
//!
//! ## Features
//!
//! - **Handshake and framing** - Magic preamble, version proposal and chunked messages
//! - **PackStream** - Binary encoding of values, maps, lists and graph structures
//! - **Sessions** - Lazy INIT, RUN + PULL_ALL statements, fully materialized results
//! - **Failure recovery** - FAILURE is acknowledged with ACK_FAILURE before it is reported,
//!   so the connection stays usable
//! - **Pipelines** - Many statements in one write, results in submission order
//! - **TLS** - rustls with system roots, custom CAs or no verification
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use bolt_v1_client::{params, AuthToken, ConnectionConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = ConnectionConfig::from_uri("bolt://localhost:7687")?;
//!     config.auth = AuthToken::basic("neo4j", "password");
//!
//!     let mut session = Session::connect(config).await?;
//!     let result = session.run("CREATE (n:Node) RETURN n", params! {}, None).await?;
//!
//!     for record in &result {
//!         println!("{}", record);
//!     }
//!     println!("{:?}", result.summarize().update_statistics);
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Server failures come back as [`DriverError::MessageFailure`] after the
//! session has recovered. Everything [`DriverError::is_fatal`] reports means
//! the connection must be reconnected or discarded:
//!
//! ```rust,no_run
//! # use bolt_v1_client::{params, DriverError, Session};
//! # async fn example(session: &mut Session) {
//! match session.run("RETURN 1 +", params! {}, None).await {
//!     Ok(result) => println!("{} rows", result.len()),
//!     Err(DriverError::MessageFailure { code, message }) => {
//!         eprintln!("{}: {}", code, message);
//!     }
//!     Err(e) if e.is_fatal() => {
//!         eprintln!("connection lost: {}", e);
//!     }
//!     Err(e) => eprintln!("{}", e),
//! }
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Sessions, pipelines, transactions and configuration
//! - [`bolt`] - Low-level Bolt V1 protocol implementation

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod driver;

pub use driver::{
    AuthToken, ConnectionConfig, ConnectionConfigBuilder, Counters, DriverError, DriverResult,
    Pipeline, QueryResult, QueryType, Record, ResultCollection, ResultSummary, Session,
    SessionState, Statement, TlsMode, Transaction, TrustStrategy,
};

pub use bolt::{BoltError, Value};
