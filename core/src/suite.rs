//! Runs a list of benchmarks back to back against one connection pool.

use crate::benchmark::Benchmark;
use crate::db::Database;
use crate::error::BenchResult;
use crate::result::{BenchmarkResult, format_duration};
use crate::warmup::{WarmupConfig, warmup_with};

/// One benchmark's outcome within a suite run.
#[derive(Debug, Clone)]
pub struct SuiteEntry {
    pub name: String,
    pub result: BenchmarkResult,
}

#[derive(Debug, Clone)]
pub struct BenchmarkSuite {
    /// Warm the pool up before the first benchmark; `None` skips it.
    pub warmup: Option<WarmupConfig>,
    /// Log each result as soon as it is available.
    pub print_stats: bool,
}

impl Default for BenchmarkSuite {
    fn default() -> Self {
        Self {
            warmup: Some(WarmupConfig::default()),
            print_stats: true,
        }
    }
}

impl BenchmarkSuite {
    /// Run every benchmark in order. A failing benchmark does not stop the
    /// suite (its error is kept in its result); a failing warm-up does.
    pub fn run(&self, db: &dyn Database, benchmarks: &[Benchmark]) -> BenchResult<Vec<SuiteEntry>> {
        if let Some(config) = &self.warmup {
            log::info!("Warming up ({} round-trips)...", config.round_trips);
            warmup_with(db, config)?;
        }

        let mut entries = Vec::with_capacity(benchmarks.len());
        for bench in benchmarks {
            log::debug!("Running {} (n={})", bench.name, bench.operations);
            let result = bench.run(db);
            if self.print_stats {
                log::info!(
                    "{}: {} in {}{}",
                    bench.name,
                    result.operations,
                    format_duration(result.duration, 2),
                    if result.is_ok() { "" } else { " (failed)" }
                );
            }
            entries.push(SuiteEntry {
                name: bench.name.clone(),
                result,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::testing::NullDatabase;
    use std::sync::atomic::Ordering;

    fn quiet() -> BenchmarkSuite {
        BenchmarkSuite {
            warmup: Some(WarmupConfig {
                idle_connections: 2,
                round_trips: 5,
            }),
            print_stats: false,
        }
    }

    #[test]
    fn runs_every_benchmark_in_order() {
        let benches = vec![
            Benchmark::new("ok", 3, |_, _| Ok(())),
            Benchmark::new("fails", 3, |_, _| Err(BenchError::NoRows)),
            Benchmark::new("ok_again", 3, |_, _| Ok(())),
        ];
        let db = NullDatabase::default();
        let entries = quiet().run(&db, &benches).unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["ok", "fails", "ok_again"]);
        assert!(entries[0].result.is_ok());
        assert_eq!(entries[1].result.error, Some(BenchError::NoRows));
        assert!(entries[2].result.is_ok());
        assert_eq!(db.calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn warmup_failure_aborts_the_suite() {
        let db = NullDatabase::failing_after(0);
        let benches = vec![Benchmark::new("never", 1, |_, _| Ok(()))];
        assert!(quiet().run(&db, &benches).is_err());
    }

    #[test]
    fn warmup_can_be_skipped() {
        let db = NullDatabase::failing_after(0);
        let suite = BenchmarkSuite {
            warmup: None,
            print_stats: false,
        };
        let benches = vec![Benchmark::new("noop", 1, |_, _| Ok(()))];
        let entries = suite.run(&db, &benches).unwrap();
        assert_eq!(entries.len(), 1);
    }
}
