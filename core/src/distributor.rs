//! Concurrent work distribution.
//!
//! A fixed number of operations is shared between worker threads through a
//! single signed counter. Each worker decrements it before doing one unit of
//! work and only proceeds while the previous value was positive, so exactly
//! `total` claims succeed no matter how the threads interleave. The counter
//! and a set-once error cell are the only shared state; no lock is held
//! while an operation runs.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread;

use crate::error::{BenchError, BenchResult};

/// Worker counts used for throughput-vs-concurrency curves.
pub const SCALING_WORKERS: [usize; 5] = [1, 2, 4, 8, 16];

/// What the other workers do once one of them has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep claiming until the counter is exhausted.
    #[default]
    Drain,
    /// Stop claiming new work; operations already in flight still finish.
    FailFast,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkDistributor {
    workers: usize,
    policy: FailurePolicy,
}

impl WorkDistributor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Execute `op` `total` times across the configured workers and block
    /// until all of them have exited.
    ///
    /// `op` receives the index of the worker running it. A worker whose
    /// operation fails records the error (first one wins) and exits; the
    /// recorded error is returned once every worker has been joined.
    pub fn run<F>(&self, total: usize, op: F) -> BenchResult<()>
    where
        F: Fn(usize) -> BenchResult<()> + Sync,
    {
        if self.workers == 0 {
            return Err(BenchError::InvalidWorkerCount);
        }
        let total = i64::try_from(total)
            .map_err(|_| BenchError::InvalidInput(format!("operation count {total} too large")))?;

        let remaining = AtomicI64::new(total);
        let failed = AtomicBool::new(false);
        let first_error: OnceLock<BenchError> = OnceLock::new();
        let fail_fast = self.policy == FailurePolicy::FailFast;

        log::debug!(
            "distributing {total} operations over {} workers ({:?})",
            self.workers,
            self.policy
        );

        thread::scope(|s| {
            for worker in 0..self.workers {
                let remaining = &remaining;
                let failed = &failed;
                let first_error = &first_error;
                let op = &op;

                s.spawn(move || {
                    loop {
                        if fail_fast && failed.load(Ordering::Acquire) {
                            return;
                        }
                        // fetch_sub hands back the pre-decrement value.
                        if remaining.fetch_sub(1, Ordering::AcqRel) <= 0 {
                            return;
                        }
                        if let Err(e) = op(worker) {
                            let _ = first_error.set(e);
                            failed.store(true, Ordering::Release);
                            return;
                        }
                    }
                });
            }
        });

        match first_error.into_inner() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Shorthand for `WorkDistributor::new(workers).run(total, op)`.
pub fn run_concurrent<F>(total: usize, workers: usize, op: F) -> BenchResult<()>
where
    F: Fn(usize) -> BenchResult<()> + Sync,
{
    WorkDistributor::new(workers).run(total, op)
}
