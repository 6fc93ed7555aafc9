//! The standard statement shapes benchmarked by the suite.
//!
//! Every workload has the signature `fn(&dyn Database, n) -> BenchResult<()>`
//! and issues exactly `n` statements (plus prepare/close where applicable).
//! Statement text comes from the connection's dialect so the same catalog
//! runs against any backend.

use crate::benchmark::Benchmark;
use crate::db::{Database, Row, Statement, Value, column};
use crate::distributor::{FailurePolicy, SCALING_WORKERS, WorkDistributor};
use crate::error::{BenchError, BenchResult};
use crate::geometry::wkb_exec;

fn first_row(rows: Vec<Row>) -> BenchResult<Row> {
    rows.into_iter().next().ok_or(BenchError::NoRows)
}

fn finish(stmt: Box<dyn Statement + '_>, outcome: BenchResult<()>) -> BenchResult<()> {
    let closed = stmt.close();
    outcome.and(closed)
}

pub fn simple_exec(db: &dyn Database, n: usize) -> BenchResult<()> {
    let sql = db.dialect().noop_statement();
    for _ in 0..n {
        db.execute(sql, &[])?;
    }
    Ok(())
}

pub fn prepared_exec(db: &dyn Database, n: usize) -> BenchResult<()> {
    let stmt = db.prepare(db.dialect().noop_statement())?;
    let outcome = (0..n).try_for_each(|_| stmt.execute(&[]).map(|_| ()));
    finish(stmt, outcome)
}

pub fn simple_query_row(db: &dyn Database, n: usize) -> BenchResult<()> {
    for _ in 0..n {
        let row = db.query_row("SELECT 1", &[])?;
        column(&row, 0)?.as_i64()?;
    }
    Ok(())
}

pub fn prepared_query_row(db: &dyn Database, n: usize) -> BenchResult<()> {
    let stmt = db.prepare("SELECT 1")?;
    let outcome = (0..n).try_for_each(|_| {
        let row = stmt.query_row(&[])?;
        column(&row, 0)?.as_i64().map(|_| ())
    });
    finish(stmt, outcome)
}

pub fn prepared_query_row_param(db: &dyn Database, n: usize) -> BenchResult<()> {
    let sql = format!("SELECT {}", db.dialect().placeholder(1));
    let stmt = db.prepare(&sql)?;
    let outcome = (0..n).try_for_each(|i| {
        let row = stmt.query_row(&[Value::Integer(i as i64)])?;
        column(&row, 0)?.as_i64().map(|_| ())
    });
    finish(stmt, outcome)
}

/// Values of mixed types echoed through [`echo_mixed5`].
#[derive(Debug, Clone, PartialEq)]
pub struct EchoEntry {
    pub id: i64,
    pub name: String,
    pub ratio: f64,
    pub other: Option<Value>,
    pub hire: bool,
}

impl EchoEntry {
    fn params(&self) -> [Value; 5] {
        [
            Value::Integer(self.id),
            Value::Text(self.name.clone()),
            Value::Real(self.ratio),
            self.other.clone().unwrap_or(Value::Null),
            Value::from(self.hire),
        ]
    }

    fn scan(row: &Row) -> BenchResult<Self> {
        let other = column(row, 3)?;
        Ok(Self {
            id: column(row, 0)?.as_i64()?,
            name: column(row, 1)?.as_str()?.to_string(),
            ratio: column(row, 2)?.as_f64()?,
            other: (!other.is_null()).then(|| other.clone()),
            hire: column(row, 4)?.as_i64()? != 0,
        })
    }
}

pub fn echo_mixed5(db: &dyn Database, n: usize) -> BenchResult<()> {
    let sql = format!("SELECT {}", db.dialect().placeholders(5));
    let stmt = db.prepare(&sql)?;

    let input = EchoEntry {
        id: 42,
        name: "Ferris".to_string(),
        ratio: 1.618,
        other: None,
        hire: true,
    };
    let params = input.params();

    let outcome = (0..n).try_for_each(|_| {
        let row = stmt.query_row(&params)?;
        EchoEntry::scan(&row).map(|_| ())
    });
    finish(stmt, outcome)
}

pub fn select_large_string(db: &dyn Database, n: usize) -> BenchResult<()> {
    let sql = db.dialect().large_string_query();
    for _ in 0..n {
        let row = db.query_row(sql, &[])?;
        let _s: String = column(&row, 0)?.as_str()?.to_string();
    }
    Ok(())
}

pub fn select_prepared_large_string(db: &dyn Database, n: usize) -> BenchResult<()> {
    let stmt = db.prepare(db.dialect().large_string_query())?;
    let outcome = (0..n).try_for_each(|_| {
        let row = stmt.query_row(&[])?;
        let _s: String = column(&row, 0)?.as_str()?.to_string();
        Ok(())
    });
    finish(stmt, outcome)
}

pub fn select_large_bytes(db: &dyn Database, n: usize) -> BenchResult<()> {
    let sql = db.dialect().large_string_query();
    for _ in 0..n {
        let row = db.query_row(sql, &[])?;
        let _raw: Vec<u8> = column(&row, 0)?.as_bytes()?.to_vec();
    }
    Ok(())
}

pub fn select_prepared_large_bytes(db: &dyn Database, n: usize) -> BenchResult<()> {
    let stmt = db.prepare(db.dialect().large_string_query())?;
    let outcome = (0..n).try_for_each(|_| {
        let row = stmt.query_row(&[])?;
        let _raw: Vec<u8> = column(&row, 0)?.as_bytes()?.to_vec();
        Ok(())
    });
    finish(stmt, outcome)
}

/// Borrows the column bytes in place instead of copying them out.
pub fn select_large_raw(db: &dyn Database, n: usize) -> BenchResult<()> {
    let sql = db.dialect().large_string_query();
    for _ in 0..n {
        let row = first_row(db.query(sql, &[])?)?;
        let _raw: &[u8] = column(&row, 0)?.as_bytes()?;
    }
    Ok(())
}

pub fn select_prepared_large_raw(db: &dyn Database, n: usize) -> BenchResult<()> {
    let stmt = db.prepare(db.dialect().large_string_query())?;
    let outcome = (0..n).try_for_each(|_| {
        let row = first_row(stmt.query(&[])?)?;
        column(&row, 0)?.as_bytes().map(|_| ())
    });
    finish(stmt, outcome)
}

/// Share one prepared no-op statement between the distributor's workers.
pub fn prepared_exec_concurrent(
    db: &dyn Database,
    n: usize,
    distributor: WorkDistributor,
) -> BenchResult<()> {
    let stmt = db.prepare(db.dialect().noop_statement())?;
    let outcome = distributor.run(n, |_| stmt.execute(&[]).map(|_| ()));
    finish(stmt, outcome)
}

/// Share one prepared two-column query between the distributor's workers;
/// each worker binds its own index.
pub fn prepared_query_concurrent(
    db: &dyn Database,
    n: usize,
    distributor: WorkDistributor,
) -> BenchResult<()> {
    let sql = format!("SELECT {}, 'foobar'", db.dialect().placeholder(1));
    let stmt = db.prepare(&sql)?;
    let outcome = distributor.run(n, |worker| {
        let row = stmt.query_row(&[Value::Integer(worker as i64)])?;
        column(&row, 0)?.as_i64()?;
        column(&row, 1)?.as_str().map(|_| ())
    });
    finish(stmt, outcome)
}

/// The full suite in its canonical order.
///
/// `n` applies to every statement benchmark, `geometry_n` to the geometry
/// insert job (which creates `geometry_n + 1` rows and expects the table
/// from [`crate::geometry::setup_geometry_bench`] to exist and be empty).
pub fn default_benchmarks(n: usize, geometry_n: usize, policy: FailurePolicy) -> Vec<Benchmark> {
    let mut benches = vec![
        Benchmark::new("simple_exec", n, simple_exec),
        Benchmark::new("prepared_exec", n, prepared_exec),
        Benchmark::new("simple_query_row", n, simple_query_row),
        Benchmark::new("prepared_query_row", n, prepared_query_row),
        Benchmark::new("prepared_query_row_param", n, prepared_query_row_param),
        Benchmark::new("echo_mixed5", n, echo_mixed5),
        Benchmark::new("select_large_string", n, select_large_string),
        Benchmark::new("select_prepared_large_string", n, select_prepared_large_string),
        Benchmark::new("select_large_bytes", n, select_large_bytes),
        Benchmark::new("select_prepared_large_bytes", n, select_prepared_large_bytes),
        Benchmark::new("select_large_raw", n, select_large_raw),
        Benchmark::new("select_prepared_large_raw", n, select_prepared_large_raw),
    ];

    for workers in SCALING_WORKERS {
        let distributor = WorkDistributor::new(workers).with_policy(policy);
        benches.push(Benchmark::new(
            format!("prepared_exec_concurrent_{workers}"),
            n,
            move |db, n| prepared_exec_concurrent(db, n, distributor),
        ));
    }
    for workers in SCALING_WORKERS {
        let distributor = WorkDistributor::new(workers).with_policy(policy);
        benches.push(Benchmark::new(
            format!("prepared_query_concurrent_{workers}"),
            n,
            move |db, n| prepared_query_concurrent(db, n, distributor),
        ));
    }

    benches.push(Benchmark::new("wkb_exec", geometry_n, wkb_exec));
    benches
}
