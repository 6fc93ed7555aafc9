//! Report module: prints human-readable suite results.

use std::fmt;

use crate::result::format_duration;
use crate::suite::SuiteEntry;

/// Per-benchmark breakdown followed by a comparison table.
pub struct Report<'a>(pub &'a [SuiteEntry]);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.0;
        writeln!(f, "\n{}", "=".repeat(80))?;
        writeln!(f, "  Database Micro-Benchmark Report")?;
        writeln!(f, "{}", "=".repeat(80))?;

        for entry in entries {
            writeln!(f, "\n  {}", entry.name)?;
            writeln!(f, "  {}", "-".repeat(60))?;
            writeln!(f, "{}", entry.result)?;
        }

        writeln!(f, "\n{}", "=".repeat(80))?;

        if entries.is_empty() {
            return Ok(());
        }

        writeln!(f, "\n  Comparison Summary:")?;
        writeln!(
            f,
            "  {:32} {:>10} {:>12} {:>10} {:>10} {:>6}",
            "Benchmark", "Time", "Ops/s", "Allocs/op", "Bytes/op", "OK?"
        )?;
        writeln!(f, "  {}", "-".repeat(85))?;
        for entry in entries {
            let r = &entry.result;
            let ops = r
                .operations_per_second()
                .map(|v| format!("{v:.0}"))
                .unwrap_or_else(|_| "-".to_string());
            let allocs = r
                .allocations_per_operation()
                .map(|v| v.to_string())
                .unwrap_or_else(|_| "-".to_string());
            let bytes = r
                .bytes_per_operation()
                .map(|v| v.to_string())
                .unwrap_or_else(|_| "-".to_string());
            writeln!(
                f,
                "  {:32} {:>10} {:>12} {:>10} {:>10} {:>6}",
                entry.name,
                format_duration(r.duration, 2),
                ops,
                allocs,
                bytes,
                if r.is_ok() { "YES" } else { "NO" }
            )?;
        }
        writeln!(f)
    }
}

pub fn render_report(entries: &[SuiteEntry]) -> String {
    Report(entries).to_string()
}

pub fn print_report(entries: &[SuiteEntry]) {
    print!("{}", Report(entries));
}
