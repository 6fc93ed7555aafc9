//! In-process stand-in for a connection pool, used by unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::db::{Database, Row, Statement, Value};
use crate::dialect::{Dialect, LARGE_STRING_LEN};
use crate::error::{BenchError, BenchResult};

/// Answers every statement without touching a database.
///
/// Queries echo their parameters back as the row (or `1` when there are
/// none), followed by a trailing `'literal'` select item if the statement
/// has one; the dialect's large-string query returns the full string. With
/// `fail_after` set, every call past that many fails.
pub struct NullDatabase {
    pub dialect: Dialect,
    pub fail_after: Option<usize>,
    pub calls: AtomicUsize,
    pub max_idle: AtomicUsize,
    pub statements: Mutex<Vec<String>>,
    pub closed: AtomicUsize,
}

impl Default for NullDatabase {
    fn default() -> Self {
        Self::with_dialect(Dialect::Sqlite)
    }
}

impl NullDatabase {
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            fail_after: None,
            calls: AtomicUsize::new(0),
            max_idle: AtomicUsize::new(0),
            statements: Mutex::new(Vec::new()),
            closed: AtomicUsize::new(0),
        }
    }

    pub fn failing_after(calls: usize) -> Self {
        Self {
            fail_after: Some(calls),
            ..Self::default()
        }
    }

    fn respond(&self, sql: &str, params: &[Value]) -> BenchResult<Row> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_after.is_some_and(|limit| call > limit) {
            return Err(BenchError::Database(format!("injected failure on call {call}")));
        }
        if sql == self.dialect.large_string_query() {
            return Ok(vec![Value::Text("A".repeat(LARGE_STRING_LEN))]);
        }
        if params.is_empty() {
            return Ok(vec![Value::Integer(1)]);
        }
        let mut row = params.to_vec();
        if let Some(last) = sql.rsplit(", ").next() {
            if last.len() >= 2 && last.starts_with('\'') && last.ends_with('\'') {
                row.push(Value::Text(last.trim_matches('\'').to_string()));
            }
        }
        Ok(row)
    }

    pub fn executed(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, sql: &str) {
        self.statements.lock().unwrap().push(sql.to_string());
    }
}

impl Database for NullDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&self, sql: &str, params: &[Value]) -> BenchResult<usize> {
        self.record(sql);
        self.respond(sql, params).map(|_| 1)
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> BenchResult<Row> {
        self.respond(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> BenchResult<Vec<Row>> {
        self.respond(sql, params).map(|row| vec![row])
    }

    fn prepare(&self, sql: &str) -> BenchResult<Box<dyn Statement + '_>> {
        Ok(Box::new(NullStatement {
            db: self,
            sql: sql.to_string(),
        }))
    }

    fn set_max_idle(&self, n: usize) {
        self.max_idle.store(n, Ordering::SeqCst);
    }
}

struct NullStatement<'a> {
    db: &'a NullDatabase,
    sql: String,
}

impl Statement for NullStatement<'_> {
    fn execute(&self, params: &[Value]) -> BenchResult<usize> {
        self.db.respond(&self.sql, params).map(|_| 1)
    }

    fn query_row(&self, params: &[Value]) -> BenchResult<Row> {
        self.db.respond(&self.sql, params)
    }

    fn query(&self, params: &[Value]) -> BenchResult<Vec<Row>> {
        self.db.respond(&self.sql, params).map(|row| vec![row])
    }

    fn close(self: Box<Self>) -> BenchResult<()> {
        self.db.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
