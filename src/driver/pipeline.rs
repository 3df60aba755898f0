//! Statement batches.

use std::collections::HashMap;

use super::error::DriverResult;
use super::result::{ResultCollection, Statement};
use super::session::Session;
use crate::bolt::{BoltRequest, Value};

/// Statements queued on a session and sent in one write.
///
/// Nothing goes on the wire until [`run`](Pipeline::run). Results come back
/// in the order the statements were pushed. A FAILURE anywhere in the batch
/// is acknowledged, every request queued behind it is drained, and the
/// failure is returned; results of earlier statements are discarded.
#[derive(Debug)]
pub struct Pipeline<'s> {
    session: &'s mut Session,
    statements: Vec<Statement>,
}

impl<'s> Pipeline<'s> {
    pub(crate) fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            statements: Vec::new(),
        }
    }

    /// Queue a statement.
    pub fn push(
        &mut self,
        query: impl Into<String>,
        parameters: HashMap<String, Value>,
        tag: Option<&str>,
    ) -> &mut Self {
        let mut statement = Statement::new(query).with_params(parameters);
        statement.tag = tag.map(String::from);
        self.push_statement(statement)
    }

    /// Queue a prepared statement.
    pub fn push_statement(&mut self, statement: Statement) -> &mut Self {
        self.statements.push(statement);
        self
    }

    /// Queued statements.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// The requests [`run`](Pipeline::run) will send: RUN and PULL_ALL per statement.
    pub fn messages(&self) -> Vec<BoltRequest> {
        self.statements
            .iter()
            .flat_map(Statement::to_requests)
            .collect()
    }

    /// Number of queued statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Send the batch and collect every result.
    ///
    /// An empty pipeline returns an empty collection without touching the
    /// connection.
    pub async fn run(self) -> DriverResult<ResultCollection> {
        self.session.run_batch(self.statements).await
    }
}
