//! Geometry insert workload: one WKB polygon INSERT per job task.

use std::sync::Arc;

use crate::db::Database;
use crate::dialect::Dialect;
use crate::error::{BenchError, BenchResult};
use crate::job::{Job, LogProgress, ProgressJob, TaskFailurePolicy, run_job};
use crate::wkb::{BENCH_POLYGON, ByteOrder, encode_polygon};

/// Table the geometry benchmark writes into.
pub const BENCH_TABLE: &str = "benchmark";

/// Constant second key column of every inserted row.
pub const GRID_REF: i64 = 99;

pub const SRID: u32 = 4236;

pub const GEOMETRY_JOB_NAME: &str = "Geometry Benchmark [BmWKB]";

/// `CREATE TABLE` for the benchmark table; `options` is appended verbatim
/// after the column list (e.g. `" ENGINE=InnoDB"`).
pub fn table_sql(table: &str, options: &str) -> String {
    const COLUMNS: [(&str, &str); 2] = [
        ("ID", "varchar(36) NOT NULL"),
        ("GRIDREF", "smallint NOT NULL"),
    ];

    let mut sql = format!("CREATE TABLE IF NOT EXISTS {table} (");
    for (name, ty) in COLUMNS {
        sql.push_str(&format!("{name} {ty}, "));
    }
    sql.push_str(&format!(
        "ogc_geom geometry DEFAULT NULL, PRIMARY KEY (ID, GRIDREF)){options}"
    ));
    sql
}

/// Drop and recreate the benchmark table.
pub fn setup_geometry_bench(db: &dyn Database, options: &str) -> BenchResult<()> {
    teardown_geometry_bench(db)?;
    db.execute(&table_sql(BENCH_TABLE, options), &[])?;
    Ok(())
}

pub fn teardown_geometry_bench(db: &dyn Database) -> BenchResult<()> {
    db.execute(&format!("DROP TABLE IF EXISTS {BENCH_TABLE}"), &[])?;
    Ok(())
}

/// INSERT text for one geometry row, with the payload literal rendered once
/// for the dialect in effect.
#[derive(Debug, Clone)]
pub struct InsertTemplate {
    table: String,
    payload: String,
}

impl InsertTemplate {
    pub fn new(table: &str, dialect: Dialect, wkb: &[u8]) -> Self {
        Self {
            table: table.to_string(),
            payload: dialect.format_binary_literal(wkb),
        }
    }

    pub fn statement(&self, id: &str) -> String {
        format!(
            "INSERT INTO {} (ID, GRIDREF, ogc_geom) VALUES ('{id}', {GRID_REF}, ST_GeomFromWKB({}, {SRID}))",
            self.table, self.payload
        )
    }
}

/// Inserts the benchmark polygon once per task, keyed by the task id.
#[derive(Debug, Clone)]
pub struct WkbInsertJob {
    pub table: String,
    pub order: ByteOrder,
    pub on_failure: TaskFailurePolicy,
}

impl Default for WkbInsertJob {
    fn default() -> Self {
        Self {
            table: BENCH_TABLE.to_string(),
            order: ByteOrder::Ndr,
            on_failure: TaskFailurePolicy::Abort,
        }
    }
}

impl<'d> ProgressJob<dyn Database + 'd> for WkbInsertJob {
    fn run(&self, job: &mut Job, db: &(dyn Database + 'd)) -> BenchResult<()> {
        let wkb = encode_polygon(&[&BENCH_POLYGON[..]], self.order);
        let template = InsertTemplate::new(&self.table, db.dialect(), &wkb);

        job.run_tasks(self.on_failure, |id| {
            db.execute(&template.statement(id), &[]).map(|_| ())
        })
    }
}

/// Benchmark entry point: insert `n + 1` polygons through a tracked job.
pub fn wkb_exec(db: &dyn Database, n: usize) -> BenchResult<()> {
    let count = i64::try_from(n)
        .map_err(|_| BenchError::InvalidInput(format!("task count {n} too large")))?;
    run_job(
        GEOMETRY_JOB_NAME,
        &WkbInsertJob::default(),
        count,
        db,
        Arc::new(LogProgress::default()),
    )
    .map(|_| ())
}
