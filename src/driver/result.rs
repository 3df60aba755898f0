//! Statements, per-request accumulators and materialized results.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::record::Record;
use crate::bolt::{BoltRequest, BoltResponse, FailureMessage, RunMessage, SuccessMessage, Value};

// ============================================================================
// Statement
// ============================================================================

/// Statement text, parameters and an optional client-side tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    /// Statement text
    pub text: String,
    /// Parameters
    pub parameters: HashMap<String, Value>,
    /// Correlation tag; never sent to the server
    pub tag: Option<String>,
}

impl Statement {
    /// Statement without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Add one parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Add several parameters.
    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.parameters.extend(params);
        self
    }

    /// Attach a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// The RUN and PULL_ALL pair that executes this statement.
    pub fn to_requests(&self) -> [BoltRequest; 2] {
        let mut run = RunMessage::new(self.text.clone(), self.parameters.clone());
        run.tag = self.tag.clone();
        [BoltRequest::Run(run), BoltRequest::PullAll]
    }
}

impl From<&str> for Statement {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Statement {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

// ============================================================================
// Response - accumulator for one request
// ============================================================================

/// How a response ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// SUCCESS with its metadata
    Success(SuccessMessage),
    /// FAILURE with code and message
    Failure(FailureMessage),
    /// IGNORED
    Ignored,
}

/// Messages received for one request: any RECORDs, then one terminal message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    records: Vec<Vec<Value>>,
    outcome: Option<Outcome>,
}

impl Response {
    /// Empty, incomplete response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one message. Returns true once the response is complete.
    pub fn push(&mut self, message: BoltResponse) -> bool {
        match message {
            BoltResponse::Record(record) => self.on_record(record.fields),
            BoltResponse::Success(success) => self.on_success(success),
            BoltResponse::Failure(failure) => self.on_failure(failure),
            BoltResponse::Ignored => self.on_ignored(),
        }
        self.is_completed()
    }

    /// Append a row.
    pub fn on_record(&mut self, values: Vec<Value>) {
        self.records.push(values);
    }

    /// Complete with SUCCESS.
    pub fn on_success(&mut self, success: SuccessMessage) {
        self.outcome = Some(Outcome::Success(success));
    }

    /// Complete with FAILURE.
    pub fn on_failure(&mut self, failure: FailureMessage) {
        self.outcome = Some(Outcome::Failure(failure));
    }

    /// Complete with IGNORED.
    pub fn on_ignored(&mut self) {
        self.outcome = Some(Outcome::Ignored);
    }

    /// True once a terminal message arrived.
    pub fn is_completed(&self) -> bool {
        self.outcome.is_some()
    }

    /// Terminal message, if any.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Rows received so far.
    pub fn records(&self) -> &[Vec<Value>] {
        &self.records
    }

    /// Split into rows and outcome.
    pub fn into_parts(self) -> (Vec<Vec<Value>>, Option<Outcome>) {
        (self.records, self.outcome)
    }
}

// ============================================================================
// QueryResult
// ============================================================================

/// Statement type reported with the PULL_ALL SUCCESS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// `r`
    ReadOnly,
    /// `rw`
    ReadWrite,
    /// `w`
    WriteOnly,
    /// `s`
    SchemaWrite,
}

impl QueryType {
    /// Parse the wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "r" => Some(Self::ReadOnly),
            "rw" => Some(Self::ReadWrite),
            "w" => Some(Self::WriteOnly),
            "s" => Some(Self::SchemaWrite),
            _ => None,
        }
    }
}

/// A fully drained RUN + PULL_ALL exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Statement that produced this result
    pub statement: Statement,
    /// Column names from the RUN SUCCESS
    pub fields: Arc<[String]>,
    /// Rows in arrival order
    pub records: Vec<Record>,
    /// Raw `stats` map from the PULL_ALL SUCCESS
    pub statistics: HashMap<String, Value>,
    /// Statement type, when reported
    pub query_type: Option<QueryType>,
    /// Time until the first row was available
    pub result_available_after: Option<Duration>,
    /// Time until the last row was consumed
    pub result_consumed_after: Option<Duration>,
}

impl QueryResult {
    /// Build from the RUN SUCCESS, the rows and the PULL_ALL SUCCESS.
    pub fn from_responses(
        statement: Statement,
        run: &SuccessMessage,
        records: Vec<Vec<Value>>,
        pull: &SuccessMessage,
    ) -> Self {
        let fields: Arc<[String]> = run.fields().unwrap_or_default().into();
        let records = records
            .into_iter()
            .map(|values| Record::new(fields.clone(), values))
            .collect();
        let millis = |v: Option<i64>| v.and_then(|ms| u64::try_from(ms).ok()).map(Duration::from_millis);

        Self {
            statement,
            fields,
            records,
            statistics: pull.stats().cloned().unwrap_or_default(),
            query_type: pull.query_type().and_then(QueryType::from_code),
            result_available_after: millis(run.result_available_after()),
            result_consumed_after: millis(pull.result_consumed_after()),
        }
    }

    /// Column names.
    pub fn keys(&self) -> &[String] {
        &self.fields
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no rows were returned.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First row.
    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    /// Row iterator.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Summary with typed counters.
    pub fn summarize(&self) -> ResultSummary {
        ResultSummary {
            statement: self.statement.clone(),
            update_statistics: Counters::from_stats(&self.statistics),
            query_type: self.query_type,
        }
    }
}

impl IntoIterator for QueryResult {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// ResultSummary
// ============================================================================

/// Update counters reported in `stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// `nodes-created`
    pub nodes_created: i64,
    /// `nodes-deleted`
    pub nodes_deleted: i64,
    /// `relationships-created`
    pub relationships_created: i64,
    /// `relationships-deleted`
    pub relationships_deleted: i64,
    /// `properties-set`
    pub properties_set: i64,
    /// `labels-added`
    pub labels_added: i64,
    /// `labels-removed`
    pub labels_removed: i64,
    /// `indexes-added`
    pub indexes_added: i64,
    /// `indexes-removed`
    pub indexes_removed: i64,
    /// `constraints-added`
    pub constraints_added: i64,
    /// `constraints-removed`
    pub constraints_removed: i64,
}

impl Counters {
    /// Read counters from a `stats` map; missing keys count as zero.
    pub fn from_stats(stats: &HashMap<String, Value>) -> Self {
        let get = |key: &str| stats.get(key).and_then(Value::as_int).unwrap_or(0);
        Self {
            nodes_created: get("nodes-created"),
            nodes_deleted: get("nodes-deleted"),
            relationships_created: get("relationships-created"),
            relationships_deleted: get("relationships-deleted"),
            properties_set: get("properties-set"),
            labels_added: get("labels-added"),
            labels_removed: get("labels-removed"),
            indexes_added: get("indexes-added"),
            indexes_removed: get("indexes-removed"),
            constraints_added: get("constraints-added"),
            constraints_removed: get("constraints-removed"),
        }
    }

    /// True if any data changed.
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0
            || self.nodes_deleted > 0
            || self.relationships_created > 0
            || self.relationships_deleted > 0
            || self.properties_set > 0
            || self.labels_added > 0
            || self.labels_removed > 0
    }

    /// True if the schema changed.
    pub fn contains_system_updates(&self) -> bool {
        self.indexes_added > 0
            || self.indexes_removed > 0
            || self.constraints_added > 0
            || self.constraints_removed > 0
    }
}

/// Statement plus what it changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    /// Statement
    pub statement: Statement,
    /// Update counters
    pub update_statistics: Counters,
    /// Statement type
    pub query_type: Option<QueryType>,
}

// ============================================================================
// ResultCollection
// ============================================================================

/// Pipeline results, one per statement, in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultCollection {
    results: Vec<QueryResult>,
}

impl ResultCollection {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result.
    pub fn push(&mut self, result: QueryResult) {
        self.results.push(result);
    }

    /// Number of results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Result at `index`.
    pub fn get(&self, index: usize) -> Option<&QueryResult> {
        self.results.get(index)
    }

    /// First result whose statement carries `tag`.
    pub fn get_by_tag(&self, tag: &str) -> Option<&QueryResult> {
        self.results
            .iter()
            .find(|r| r.statement.tag.as_deref() == Some(tag))
    }

    /// Iterate in submission order.
    pub fn iter(&self) -> std::slice::Iter<'_, QueryResult> {
        self.results.iter()
    }
}

impl IntoIterator for ResultCollection {
    type Item = QueryResult;
    type IntoIter = std::vec::IntoIter<QueryResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultCollection {
    type Item = &'a QueryResult;
    type IntoIter = std::slice::Iter<'a, QueryResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::RecordMessage;

    fn stats(pairs: &[(&str, i64)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Integer(*v)))
            .collect()
    }

    #[test]
    fn test_response_accumulates_until_terminal() {
        let mut response = Response::new();
        assert!(!response.push(BoltResponse::Record(RecordMessage::new(vec![Value::Integer(1)]))));
        assert!(!response.push(BoltResponse::Record(RecordMessage::new(vec![Value::Integer(2)]))));
        assert!(response.push(BoltResponse::Success(SuccessMessage::new())));
        assert_eq!(response.records().len(), 2);
        assert!(matches!(response.outcome(), Some(Outcome::Success(_))));

        let mut ignored = Response::new();
        assert!(ignored.push(BoltResponse::Ignored));
        assert_eq!(ignored.into_parts(), (vec![], Some(Outcome::Ignored)));
    }

    #[test]
    fn test_query_result_from_responses() {
        let run = SuccessMessage::new()
            .with("fields", vec![Value::from("n")])
            .with("result_available_after", 4i64);
        let pull = SuccessMessage::new()
            .with("stats", stats(&[("nodes-created", 2), ("labels-added", 2)]))
            .with("type", "w")
            .with("result_consumed_after", 7i64);
        let statement = Statement::new("CREATE (n:Node) RETURN n").with_tag("create");

        let result = QueryResult::from_responses(
            statement,
            &run,
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
            &pull,
        );

        assert_eq!(result.keys(), &["n".to_string()]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.records[1].get_int("n"), Some(2));
        assert_eq!(result.query_type, Some(QueryType::WriteOnly));
        assert_eq!(result.result_available_after, Some(Duration::from_millis(4)));
        assert_eq!(result.result_consumed_after, Some(Duration::from_millis(7)));

        let summary = result.summarize();
        assert_eq!(summary.update_statistics.nodes_created, 2);
        assert_eq!(summary.update_statistics.labels_added, 2);
        assert!(summary.update_statistics.contains_updates());
        assert!(!summary.update_statistics.contains_system_updates());
        assert_eq!(summary.statement.tag.as_deref(), Some("create"));
    }

    #[test]
    fn test_missing_metadata_defaults() {
        let result = QueryResult::from_responses(
            Statement::new("RETURN 1"),
            &SuccessMessage::new(),
            vec![],
            &SuccessMessage::new(),
        );
        assert!(result.keys().is_empty());
        assert!(result.is_empty());
        assert!(result.statistics.is_empty());
        assert_eq!(result.query_type, None);
        assert_eq!(result.summarize().update_statistics, Counters::default());
    }

    #[test]
    fn test_collection_lookup() {
        let make = |tag: &str| {
            QueryResult::from_responses(
                Statement::new("RETURN 1").with_tag(tag),
                &SuccessMessage::new(),
                vec![],
                &SuccessMessage::new(),
            )
        };
        let mut collection = ResultCollection::new();
        collection.push(make("a"));
        collection.push(make("b"));

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(1).and_then(|r| r.statement.tag.as_deref()), Some("b"));
        assert!(collection.get_by_tag("a").is_some());
        assert!(collection.get_by_tag("zzz").is_none());
        let tags: Vec<_> = collection
            .iter()
            .filter_map(|r| r.statement.tag.clone())
            .collect();
        assert_eq!(tags, ["a", "b"]);
    }

    #[test]
    fn test_statement_requests() {
        let statement = Statement::new("RETURN $x").with_param("x", 1i64).with_tag("t");
        let [run, pull] = statement.to_requests();
        match run {
            BoltRequest::Run(run) => {
                assert_eq!(run.statement, "RETURN $x");
                assert_eq!(run.parameters.get("x"), Some(&Value::Integer(1)));
                assert_eq!(run.tag.as_deref(), Some("t"));
            }
            other => panic!("expected RUN, got {}", other.name()),
        }
        assert_eq!(pull, BoltRequest::PullAll);
    }

    #[test]
    fn test_query_type_codes() {
        assert_eq!(QueryType::from_code("r"), Some(QueryType::ReadOnly));
        assert_eq!(QueryType::from_code("rw"), Some(QueryType::ReadWrite));
        assert_eq!(QueryType::from_code("s"), Some(QueryType::SchemaWrite));
        assert_eq!(QueryType::from_code("x"), None);
    }
}
