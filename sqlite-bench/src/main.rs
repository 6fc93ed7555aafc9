//! Standalone runner that executes the suite and prints the formatted report.
//!
//! Settings come from `DBBENCH_*` environment variables (a `.env` file in the
//! working directory is loaded first). An optional argument restricts the run
//! to benchmarks whose name contains it.
//!
//! Usage:
//!   cargo run --release
//!   cargo run --release -- concurrent
//!   DBBENCH_DATABASE=/tmp/bench.db DBBENCH_OPERATIONS=1000 cargo run --release

use dbbench_core::alloc::CountingAllocator;
use dbbench_core::initialize_logger;
use dbbench_core::report::print_report;
use sqlite_bench::config::BenchConfig;
use sqlite_bench::run_suite;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

fn main() -> anyhow::Result<()> {
    let config = BenchConfig::from_env(std::env::args().skip(1))?;
    initialize_logger(config.log_level, config.log_file.as_deref())?;

    log::info!(
        "Running SQLite micro-benchmarks against {} (n={}, geometry n={})",
        config.database,
        config.operations,
        config.geometry_operations
    );

    match run_suite(&config) {
        Ok(entries) => {
            print_report(&entries);
            Ok(())
        }
        Err(e) => {
            log::error!("Benchmark run failed: {e:#}");
            Err(e)
        }
    }
}
