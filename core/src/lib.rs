//! Database micro-benchmark harness.
//!
//! Measures throughput and allocation cost of statements issued against a
//! connection pool, sequentially ([`Benchmark::run`]) or spread across
//! concurrent workers ([`WorkDistributor`]). Bulk write workloads are driven
//! as tracked [`job::Job`]s.
//!
//! The harness only sees the [`Database`] / [`Statement`] traits; backends
//! live in their own crates.

use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::{Encode, pattern::PatternEncoder},
    filter::threshold::ThresholdFilter,
};
use std::{backtrace, env};

pub mod alloc;
pub mod benchmark;
pub mod catalog;
pub mod db;
pub mod dialect;
pub mod distributor;
pub mod error;
pub mod geometry;
pub mod job;
pub mod report;
pub mod result;
pub mod suite;
pub mod warmup;
pub mod wkb;

#[cfg(test)]
pub(crate) mod testing;

pub use benchmark::Benchmark;
pub use db::{Database, Row, Statement, Value};
pub use dialect::Dialect;
pub use distributor::{FailurePolicy, WorkDistributor, run_concurrent};
pub use error::{BenchError, BenchResult};
pub use result::BenchmarkResult;
pub use suite::{BenchmarkSuite, SuiteEntry};
pub use warmup::warmup;

#[derive(Debug)]
struct BacktracePatternEncoder {
    pattern_encoder: PatternEncoder,
    is_backtrace_enabled: bool,
}

impl BacktracePatternEncoder {
    fn new(pattern: &str) -> Self {
        BacktracePatternEncoder {
            pattern_encoder: PatternEncoder::new(pattern),
            is_backtrace_enabled: env::var("RUST_BACKTRACE").is_ok()
                || env::var("RUST_LIB_BACKTRACE").is_ok(),
        }
    }
}

impl Encode for BacktracePatternEncoder {
    fn encode(
        &self,
        w: &mut dyn log4rs::encode::Write,
        record: &log::Record<'_>,
    ) -> anyhow::Result<()> {
        if record.level() == log::Level::Error && self.is_backtrace_enabled {
            let args = format_args!(
                "{}\nBacktrace:\n{}",
                record.args(),
                backtrace::Backtrace::capture()
            );
            let new_record = log::Record::builder()
                .args(args)
                .level(record.level())
                .target(record.target())
                .module_path(record.module_path())
                .file(record.file())
                .line(record.line())
                .build();
            self.pattern_encoder.encode(w, &new_record)?;
        } else {
            self.pattern_encoder.encode(w, record)?;
        }
        Ok(())
    }
}

/// Install the global logger: stderr at `log_level`, plus an optional log
/// file receiving the same records.
pub fn initialize_logger(log_level: LevelFilter, file_path: Option<&str>) -> anyhow::Result<()> {
    const LOGGING_PATTERN: &str = "{d} {l} {f}:{L} - {m}\n";

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(BacktracePatternEncoder::new(LOGGING_PATTERN)))
        .build();

    let mut config_builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(log_level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root = Root::builder().appender("stderr");

    if let Some(path) = file_path {
        let logfile = FileAppender::builder()
            .encoder(Box::new(BacktracePatternEncoder::new(LOGGING_PATTERN)))
            .build(path)?;
        config_builder =
            config_builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root = root.appender("logfile");
    }

    let config = config_builder.build(root.build(log_level))?;
    log4rs::init_config(config)?;

    Ok(())
}
