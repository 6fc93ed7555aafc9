//! Benchmark units and the sequential runner.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::alloc::AllocSnapshot;
use crate::db::Database;
use crate::error::BenchResult;
use crate::result::BenchmarkResult;

/// Workload signature: perform `n` operations against the connection.
pub type BenchFn = dyn Fn(&dyn Database, usize) -> BenchResult<()> + Send + Sync;

/// A named, parameterized unit of work. Stateless, so it can be run any
/// number of times.
#[derive(Clone)]
pub struct Benchmark {
    pub name: String,
    pub operations: usize,
    op: Arc<BenchFn>,
}

impl Benchmark {
    pub fn new<F>(name: impl Into<String>, operations: usize, op: F) -> Self
    where
        F: Fn(&dyn Database, usize) -> BenchResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            operations,
            op: Arc::new(op),
        }
    }

    /// Run the workload once with its full operation count.
    ///
    /// The allocation and clock snapshots bracket the call as tightly as
    /// possible. A failing workload does not abort the run: its error is
    /// stored in the result next to the partial measurements.
    pub fn run(&self, db: &dyn Database) -> BenchmarkResult {
        let start_allocs = AllocSnapshot::now();
        let start = Instant::now();

        let outcome = (self.op)(db, self.operations);

        let duration = start.elapsed();
        let allocs = AllocSnapshot::now().delta_since(&start_allocs);

        BenchmarkResult {
            duration,
            operations: self.operations,
            allocations: allocs.count,
            bytes: allocs.bytes,
            error: outcome.err(),
        }
    }
}

impl fmt::Debug for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Benchmark")
            .field("name", &self.name)
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}
