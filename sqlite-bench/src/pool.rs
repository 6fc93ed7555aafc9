//! SQLite connection pool implementing the harness's connection traits.
//!
//! Pooling is delegated to `r2d2` over `r2d2_sqlite`; every connection the
//! manager opens is configured by [`configure_connection`].
//! [`Database::set_max_idle`] rebuilds the pool with the new idle target.
//! In-memory databases are opened as named shared-cache databases so every
//! pooled connection sees the same tables; an anchor connection outside the
//! pool keeps that database alive across rebuilds.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use dbbench_core::db::{Database, Row, Statement, Value};
use dbbench_core::dialect::Dialect;
use dbbench_core::error::{BenchError, BenchResult};
use dbbench_core::wkb::read_header;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};

pub const MEMORY_DATABASE: &str = ":memory:";

const DRIVER_NAME: &str = "rusqlite";
const DEFAULT_MAX_IDLE: usize = 2;
/// Upper bound on open connections; above the widest worker count.
const MAX_CONNECTIONS: usize = 32;
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
const STATEMENT_CACHE_CAPACITY: usize = 64;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(0);

type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;
type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

pub struct SqlitePool {
    uri: String,
    dialect: Dialect,
    file_backed: bool,
    pool: RwLock<ConnectionPool>,
    max_idle: AtomicUsize,
    opened: Arc<AtomicUsize>,
    // Shared-cache in-memory databases vanish with their last connection.
    _anchor: Option<Mutex<Connection>>,
}

impl SqlitePool {
    /// Open a pool over `path`; `":memory:"` gives a fresh private database
    /// shared by the pool's connections.
    pub fn open(path: &str) -> BenchResult<Self> {
        let in_memory = path == MEMORY_DATABASE;
        let uri = if in_memory {
            let id = NEXT_MEMORY_ID.fetch_add(1, Ordering::Relaxed);
            format!(
                "file:dbbench_{}_{id}?mode=memory&cache=shared",
                std::process::id()
            )
        } else {
            path.to_string()
        };

        let anchor = if in_memory {
            let conn = Connection::open_with_flags(&uri, OpenFlags::default())
                .map_err(BenchError::database)?;
            Some(Mutex::new(conn))
        } else {
            None
        };

        let opened = Arc::new(AtomicUsize::new(0));
        let pool = build_pool(&uri, !in_memory, DEFAULT_MAX_IDLE, &opened)?;
        if !in_memory {
            pool.get()
                .map_err(BenchError::database)?
                .execute_batch("PRAGMA journal_mode = WAL;")
                .map_err(BenchError::database)?;
        }

        Ok(Self {
            uri,
            dialect: Dialect::from_driver_name(DRIVER_NAME),
            file_backed: !in_memory,
            pool: RwLock::new(pool),
            max_idle: AtomicUsize::new(DEFAULT_MAX_IDLE),
            opened,
            _anchor: anchor,
        })
    }

    pub fn open_in_memory() -> BenchResult<Self> {
        Self::open(MEMORY_DATABASE)
    }

    /// Connections opened through the pool over its lifetime.
    pub fn connections_opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    pub fn idle_connections(&self) -> usize {
        self.pool
            .read()
            .map(|pool| pool.state().idle_connections as usize)
            .unwrap_or(0)
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle.load(Ordering::Relaxed)
    }

    fn acquire(&self) -> BenchResult<PooledConnection> {
        self.pool
            .read()
            .map_err(|_| BenchError::Database("connection pool lock poisoned".to_string()))?
            .get()
            .map_err(BenchError::database)
    }

    fn run_execute(&self, sql: &str, params: &[Value]) -> BenchResult<usize> {
        let conn = self.acquire()?;
        execute_on(&conn, sql, params).map_err(BenchError::database)
    }

    fn run_query(&self, sql: &str, params: &[Value], limit: Option<usize>) -> BenchResult<Vec<Row>> {
        let conn = self.acquire()?;
        query_on(&conn, sql, params, limit).map_err(BenchError::database)
    }
}

fn build_pool(
    uri: &str,
    file_backed: bool,
    min_idle: usize,
    opened: &Arc<AtomicUsize>,
) -> BenchResult<ConnectionPool> {
    let opened = Arc::clone(opened);
    let target = uri.to_string();
    let manager = SqliteConnectionManager::file(uri)
        .with_flags(OpenFlags::default())
        .with_init(move |conn| {
            configure_connection(conn)?;
            if file_backed {
                conn.execute_batch("PRAGMA synchronous = OFF;")?;
            }
            let n = opened.fetch_add(1, Ordering::Relaxed) + 1;
            log::trace!("opened SQLite connection #{n} to {target}");
            Ok(())
        });

    r2d2::Pool::builder()
        .max_size(MAX_CONNECTIONS.max(min_idle) as u32)
        .min_idle(Some(min_idle as u32))
        .connection_timeout(CONNECTION_TIMEOUT)
        .build(manager)
        .map_err(BenchError::database)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
    conn.create_scalar_function(
        "ST_GeomFromWKB",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let wkb: Vec<u8> = ctx.get(0)?;
            let _srid: i64 = ctx.get(1)?;
            read_header(&wkb).map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
            Ok(wkb)
        },
    )?;
    Ok(())
}

fn bind(value: &Value) -> ToSqlOutput<'_> {
    ToSqlOutput::Borrowed(match value {
        Value::Null => ValueRef::Null,
        Value::Integer(i) => ValueRef::Integer(*i),
        Value::Real(f) => ValueRef::Real(*f),
        Value::Text(s) => ValueRef::Text(s.as_bytes()),
        Value::Blob(b) => ValueRef::Blob(b),
    })
}

fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Run `sql` to completion, discarding any rows it yields. Read-only
/// statements report zero affected rows.
fn execute_on(conn: &Connection, sql: &str, params: &[Value]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(sql)?;
    let readonly = stmt.readonly();
    let mut rows = stmt.query(params_from_iter(params.iter().map(bind)))?;
    while rows.next()?.is_some() {}
    if readonly {
        return Ok(0);
    }
    Ok(conn.changes() as usize)
}

fn query_on(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    limit: Option<usize>,
) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let columns = stmt.column_count();
    let mut rows = stmt.query(params_from_iter(params.iter().map(bind)))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns);
        for idx in 0..columns {
            values.push(to_value(row.get_ref(idx)?));
        }
        out.push(values);
        if limit.is_some_and(|limit| out.len() >= limit) {
            break;
        }
    }
    Ok(out)
}

impl Database for SqlitePool {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&self, sql: &str, params: &[Value]) -> BenchResult<usize> {
        self.run_execute(sql, params)
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> BenchResult<Row> {
        self.run_query(sql, params, Some(1))?
            .into_iter()
            .next()
            .ok_or(BenchError::NoRows)
    }

    fn query(&self, sql: &str, params: &[Value]) -> BenchResult<Vec<Row>> {
        self.run_query(sql, params, None)
    }

    fn prepare(&self, sql: &str) -> BenchResult<Box<dyn Statement + '_>> {
        // Compile once up front so syntax errors surface here rather than on
        // first use; later executions hit each connection's statement cache.
        let conn = self.acquire()?;
        conn.prepare_cached(sql).map_err(BenchError::database)?;
        Ok(Box::new(SqliteStatement {
            pool: self,
            sql: sql.to_string(),
        }))
    }

    fn set_max_idle(&self, n: usize) {
        self.max_idle.store(n, Ordering::Relaxed);
        match build_pool(&self.uri, self.file_backed, n, &self.opened) {
            Ok(rebuilt) => match self.pool.write() {
                Ok(mut pool) => *pool = rebuilt,
                Err(_) => log::warn!("connection pool lock poisoned; idle target not applied"),
            },
            Err(e) => log::warn!("Failed to resize SQLite pool to {n} idle connections: {e}"),
        }
    }
}

/// A prepared statement usable from any thread; each use runs on whichever
/// pooled connection is free, re-preparing there on first sight.
pub struct SqliteStatement<'p> {
    pool: &'p SqlitePool,
    sql: String,
}

impl Statement for SqliteStatement<'_> {
    fn execute(&self, params: &[Value]) -> BenchResult<usize> {
        self.pool.run_execute(&self.sql, params)
    }

    fn query_row(&self, params: &[Value]) -> BenchResult<Row> {
        self.pool
            .run_query(&self.sql, params, Some(1))?
            .into_iter()
            .next()
            .ok_or(BenchError::NoRows)
    }

    fn query(&self, params: &[Value]) -> BenchResult<Vec<Row>> {
        self.pool.run_query(&self.sql, params, None)
    }

    // The compiled statement lives in each connection's statement cache and
    // is finalized with the connection.
    fn close(self: Box<Self>) -> BenchResult<()> {
        Ok(())
    }
}
