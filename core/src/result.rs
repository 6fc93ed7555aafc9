//! Outcome of a single benchmark run.

use std::fmt;
use std::time::Duration;

use crate::error::{BenchError, BenchResult};

/// Immutable record produced once per run.
///
/// Duration and allocation figures are deltas between the snapshots taken
/// around the run. When `error` is set they cover only the work done before
/// the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub duration: Duration,
    pub operations: usize,
    pub allocations: u64,
    pub bytes: u64,
    pub error: Option<BenchError>,
}

impl BenchmarkResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn operations_per_second(&self) -> BenchResult<f64> {
        if self.operations == 0 {
            return Err(BenchError::ZeroOperations);
        }
        let secs = self.duration.as_secs_f64();
        if secs <= 0.0 {
            return Err(BenchError::ZeroDuration);
        }
        Ok(self.operations as f64 / secs)
    }

    /// Integer allocations per operation, rounded down.
    pub fn allocations_per_operation(&self) -> BenchResult<u64> {
        self.per_operation(self.allocations)
    }

    /// Integer bytes allocated per operation, rounded down.
    pub fn bytes_per_operation(&self) -> BenchResult<u64> {
        self.per_operation(self.bytes)
    }

    fn per_operation(&self, total: u64) -> BenchResult<u64> {
        if self.operations == 0 {
            return Err(BenchError::ZeroOperations);
        }
        Ok(total / self.operations as u64)
    }
}

impl fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\tDuration: {}", format_duration(self.duration, 2))?;
        writeln!(f, "\tOperations: {}", self.operations)?;
        writeln!(f, "\tAllocs: {}", self.allocations)?;
        writeln!(f, "\tBytes: {}", self.bytes)?;
        match &self.error {
            Some(e) => write!(f, "\tErr: {e}"),
            None => write!(f, "\tErr: <nil>"),
        }
    }
}

/// Render `d` in the largest unit that keeps the value at or above one,
/// with `precision` decimals.
pub fn format_duration(d: Duration, precision: usize) -> String {
    let nanos = d.as_nanos();
    if nanos < 1_000 {
        format!("{nanos}ns")
    } else if nanos < 1_000_000 {
        format!("{:.*}µs", precision, nanos as f64 / 1e3)
    } else if nanos < 1_000_000_000 {
        format!("{:.*}ms", precision, nanos as f64 / 1e6)
    } else if d.as_secs() < 60 {
        format!("{:.*}s", precision, d.as_secs_f64())
    } else {
        let mins = d.as_secs() / 60;
        let secs = d.as_secs_f64() - (mins * 60) as f64;
        format!("{mins}m{:.*}s", precision, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(operations: usize, millis: u64) -> BenchmarkResult {
        BenchmarkResult {
            duration: Duration::from_millis(millis),
            operations,
            allocations: 4_000,
            bytes: 64_000,
            error: None,
        }
    }

    #[test]
    fn derived_metrics() {
        let r = result(1_000, 500);
        assert_eq!(r.operations_per_second().unwrap(), 2_000.0);
        assert_eq!(r.allocations_per_operation().unwrap(), 4);
        assert_eq!(r.bytes_per_operation().unwrap(), 64);
    }

    #[test]
    fn zero_operations_is_a_defined_error() {
        let r = result(0, 500);
        assert_eq!(r.operations_per_second(), Err(BenchError::ZeroOperations));
        assert_eq!(
            r.allocations_per_operation(),
            Err(BenchError::ZeroOperations)
        );
        assert_eq!(r.bytes_per_operation(), Err(BenchError::ZeroOperations));
    }

    #[test]
    fn zero_duration_rate_is_a_defined_error() {
        let r = result(10, 0);
        assert_eq!(r.operations_per_second(), Err(BenchError::ZeroDuration));
        assert_eq!(r.allocations_per_operation().unwrap(), 400);
    }

    #[test]
    fn display_lists_every_field() {
        let mut r = result(10, 1_500);
        r.error = Some(BenchError::NoRows);
        let text = r.to_string();
        assert!(text.contains("Duration: 1.50s"));
        assert!(text.contains("Operations: 10"));
        assert!(text.contains("Allocs: 4000"));
        assert!(text.contains("Bytes: 64000"));
        assert!(text.contains("Err: query returned no rows"));
    }

    #[test]
    fn durations_pick_a_readable_unit() {
        assert_eq!(format_duration(Duration::from_nanos(999), 2), "999ns");
        assert_eq!(format_duration(Duration::from_micros(1_250), 2), "1.25ms");
        assert_eq!(format_duration(Duration::from_nanos(4_500), 1), "4.5µs");
        assert_eq!(format_duration(Duration::from_secs(75), 0), "1m15s");
    }
}
