//! SQLite Micro-Benchmark Suite
//!
//! Runs the standard statement catalog from `dbbench_core` against SQLite
//! through [`pool::SqlitePool`]: sequential statement shapes, prepared
//! statements shared by 1–16 concurrent workers, and a tracked bulk insert of
//! WKB polygons.
//!
//! Run the suite: `cargo run --release [name-filter]`
//! Run benchmarks: `cargo bench`
//! Run tests: `cargo test`

pub mod config;
pub mod pool;

use anyhow::{Context, Result};
use dbbench_core::catalog::default_benchmarks;
use dbbench_core::geometry::{setup_geometry_bench, teardown_geometry_bench};
use dbbench_core::suite::{BenchmarkSuite, SuiteEntry};
use dbbench_core::warmup::WarmupConfig;
use dbbench_core::Benchmark;

use crate::config::BenchConfig;
use crate::pool::SqlitePool;

/// The catalog for `config`, narrowed to names containing its filter.
pub fn selected_benchmarks(config: &BenchConfig) -> Vec<Benchmark> {
    let mut benches = default_benchmarks(
        config.operations,
        config.geometry_operations,
        config.failure_policy,
    );
    if let Some(filter) = &config.filter {
        benches.retain(|b| b.name.contains(filter.as_str()));
    }
    benches
}

/// Open the database, create the geometry table, run the selected
/// benchmarks and drop the table again.
pub fn run_suite(config: &BenchConfig) -> Result<Vec<SuiteEntry>> {
    let pool = SqlitePool::open(&config.database)
        .with_context(|| format!("opening database {}", config.database))?;
    run_suite_on(&pool, config)
}

pub fn run_suite_on(pool: &SqlitePool, config: &BenchConfig) -> Result<Vec<SuiteEntry>> {
    let benches = selected_benchmarks(config);
    if benches.is_empty() {
        log::warn!("No benchmarks match {:?}", config.filter);
        return Ok(Vec::new());
    }

    setup_geometry_bench(pool, &config.table_options).context("creating geometry table")?;

    let suite = BenchmarkSuite {
        warmup: config.warmup.then(WarmupConfig::default),
        print_stats: true,
    };
    let outcome = suite.run(pool, &benches);

    if let Err(e) = teardown_geometry_bench(pool) {
        log::warn!("Failed to drop geometry table: {e}");
    }

    outcome.context("warming up connection pool")
}
