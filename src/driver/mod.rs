//! # Client driver
//!
//! Sessions, pipelines and transactions on top of the [`bolt`](crate::bolt)
//! wire layer.
//!
//! # Example
//!
//! ```no_run
//! use bolt_v1_client::driver::{AuthToken, ConnectionConfig, Session};
//! use bolt_v1_client::params;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectionConfig::builder()
//!     .with_host("localhost")
//!     .with_auth(AuthToken::basic("neo4j", "secret"))
//!     .build()?;
//! let mut session = Session::connect(config).await?;
//!
//! let result = session
//!     .run("CREATE (n:Person {name: $name}) RETURN n", params! {"name" => "Alice"}, None)
//!     .await?;
//! println!("{} row(s)", result.len());
//!
//! let mut pipeline = session.pipeline();
//! pipeline
//!     .push("MATCH (n) RETURN count(n)", params! {}, Some("count"))
//!     .push("MATCH (n) DETACH DELETE n", params! {}, None);
//! let results = pipeline.run().await?;
//! assert!(results.get_by_tag("count").is_some());
//!
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod recovery;
pub mod result;
pub mod session;
pub mod tls;
pub mod transaction;
pub mod transport;

pub use config::{AuthToken, ConnectionConfig, ConnectionConfigBuilder, TlsMode, TrustStrategy};
pub use error::{DriverError, DriverResult};
pub use pipeline::Pipeline;
pub use record::Record;
pub use recovery::{Recovery, RecoveryOutcome};
pub use result::{
    Counters, Outcome, QueryResult, QueryType, Response, ResultCollection, ResultSummary,
    Statement,
};
pub use session::{Session, SessionState};
pub use transaction::Transaction;
pub use transport::{BoltStream, Transport};

/// Build a parameter map.
///
/// ```
/// use bolt_v1_client::params;
/// use bolt_v1_client::Value;
///
/// let params = params! {"name" => "Alice", "age" => 42i64};
/// assert_eq!(params.get("age"), Some(&Value::Integer(42)));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        std::collections::HashMap::<String, $crate::bolt::Value>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = std::collections::HashMap::<String, $crate::bolt::Value>::new();
        $(
            map.insert(String::from($key), $crate::bolt::Value::from($value));
        )+
        map
    }};
}
