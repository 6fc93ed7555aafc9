//! Connection contracts the harness drives.
//!
//! The harness never talks to a driver directly. A backend (see the
//! `sqlite-bench` crate) implements [`Database`] for its pool and
//! [`Statement`] for its prepared statements. Both must be safe to share
//! between worker threads: concurrent benchmarks hand one prepared statement
//! to every worker.

use crate::dialect::Dialect;
use crate::error::{BenchError, BenchResult};

/// A single column value crossing the connection boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// One result row, columns in select-list order.
pub type Row = Vec<Value>;

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    fn mismatch(&self, expected: &'static str) -> BenchError {
        BenchError::ColumnType {
            expected,
            actual: self.type_name(),
        }
    }

    pub fn as_i64(&self) -> BenchResult<i64> {
        match self {
            Value::Integer(v) => Ok(*v),
            other => Err(other.mismatch("integer")),
        }
    }

    pub fn as_f64(&self) -> BenchResult<f64> {
        match self {
            Value::Real(v) => Ok(*v),
            Value::Integer(v) => Ok(*v as f64),
            other => Err(other.mismatch("real")),
        }
    }

    pub fn as_str(&self) -> BenchResult<&str> {
        match self {
            Value::Text(v) => Ok(v),
            other => Err(other.mismatch("text")),
        }
    }

    /// Raw bytes of a text or blob column.
    pub fn as_bytes(&self) -> BenchResult<&[u8]> {
        match self {
            Value::Text(v) => Ok(v.as_bytes()),
            Value::Blob(v) => Ok(v),
            other => Err(other.mismatch("blob")),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Fetch column `idx` of `row`.
pub fn column(row: &Row, idx: usize) -> BenchResult<&Value> {
    row.get(idx).ok_or_else(|| {
        BenchError::InvalidInput(format!("row has {} columns, wanted #{idx}", row.len()))
    })
}

/// A prepared statement that may be executed from several threads at once.
pub trait Statement: Send + Sync {
    /// Execute without reading rows; returns the affected row count.
    fn execute(&self, params: &[Value]) -> BenchResult<usize>;

    /// Return the first row, or [`BenchError::NoRows`].
    fn query_row(&self, params: &[Value]) -> BenchResult<Row>;

    /// Return every row.
    fn query(&self, params: &[Value]) -> BenchResult<Vec<Row>>;

    /// Release the statement.
    fn close(self: Box<Self>) -> BenchResult<()>;
}

/// A connection pool under test.
pub trait Database: Send + Sync {
    /// SQL dialect spoken by the underlying driver.
    fn dialect(&self) -> Dialect;

    fn execute(&self, sql: &str, params: &[Value]) -> BenchResult<usize>;

    fn query_row(&self, sql: &str, params: &[Value]) -> BenchResult<Row>;

    fn query(&self, sql: &str, params: &[Value]) -> BenchResult<Vec<Row>>;

    fn prepare(&self, sql: &str) -> BenchResult<Box<dyn Statement + '_>>;

    /// Number of idle connections the pool keeps around between calls.
    fn set_max_idle(&self, n: usize);
}
