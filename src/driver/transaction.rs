//! Session-bound transactions.
//!
//! Protocol version 1 has no transaction messages. A [`Transaction`] only
//! claims the session so nothing else runs on it until [`Transaction::close`];
//! explicit BEGIN, COMMIT and ROLLBACK fail with
//! [`DriverError::UnsupportedOperation`](super::DriverError::UnsupportedOperation).

use std::collections::HashMap;

use super::error::DriverResult;
use super::result::{QueryResult, Statement};
use super::session::Session;
use crate::bolt::Value;

/// Exclusive use of a [`Session`].
///
/// Dropping a transaction without [`close`](Transaction::close) leaves the
/// session bound until [`Session::close`] or [`Session::reconnect`].
#[derive(Debug)]
pub struct Transaction<'s> {
    session: &'s mut Session,
    open: bool,
}

impl<'s> Transaction<'s> {
    pub(crate) fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            open: true,
        }
    }

    /// Run a statement on the bound session.
    pub async fn run(
        &mut self,
        query: impl Into<String>,
        parameters: HashMap<String, Value>,
        tag: Option<&str>,
    ) -> DriverResult<QueryResult> {
        self.session.run(query, parameters, tag).await
    }

    /// Run a prepared statement on the bound session.
    pub async fn run_statement(&mut self, statement: Statement) -> DriverResult<QueryResult> {
        self.session.run_statement(statement).await
    }

    /// Not available at protocol version 1.
    pub fn begin(&self) -> DriverResult<()> {
        self.session.begin()
    }

    /// Not available at protocol version 1.
    pub fn commit(&self) -> DriverResult<()> {
        self.session.commit()
    }

    /// Not available at protocol version 1.
    pub fn rollback(&self) -> DriverResult<()> {
        self.session.rollback()
    }

    /// The bound session.
    pub fn session(&self) -> &Session {
        self.session
    }

    /// Release the session.
    pub fn close(mut self) {
        self.session.release_transaction();
        self.open = false;
        tracing::debug!("transaction released");
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.open {
            tracing::warn!(
                "transaction dropped without close; session stays bound until it is closed or reconnected"
            );
        }
    }
}
