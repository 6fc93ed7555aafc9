//! Runtime settings, read from the environment (after loading `.env`).

use anyhow::{Context, Result};
use dbbench_core::distributor::FailurePolicy;
use log::LevelFilter;
use std::env;
use std::str::FromStr;

use crate::pool::MEMORY_DATABASE;

const DEFAULT_OPERATIONS: usize = 10_000;
const DEFAULT_GEOMETRY_OPERATIONS: usize = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// SQLite file path, or `:memory:`.
    pub database: String,
    pub operations: usize,
    pub geometry_operations: usize,
    /// Appended verbatim to the geometry table's CREATE TABLE.
    pub table_options: String,
    pub log_level: LevelFilter,
    pub log_file: Option<String>,
    pub failure_policy: FailurePolicy,
    pub warmup: bool,
    /// Only benchmarks whose name contains this run.
    pub filter: Option<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            database: MEMORY_DATABASE.to_string(),
            operations: DEFAULT_OPERATIONS,
            geometry_operations: DEFAULT_GEOMETRY_OPERATIONS,
            table_options: String::new(),
            log_level: LevelFilter::Info,
            log_file: None,
            failure_policy: FailurePolicy::Drain,
            warmup: true,
            filter: None,
        }
    }
}

impl BenchConfig {
    /// Load `.env` if present, then read `DBBENCH_*` variables over the
    /// defaults. `args` are the command-line arguments after the program name.
    pub fn from_env(args: impl IntoIterator<Item = String>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok(), args)
    }

    pub fn from_lookup<L>(lookup: L, args: impl IntoIterator<Item = String>) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let fail_fast: bool = parse_or(&lookup, "DBBENCH_FAIL_FAST", false)?;

        Ok(Self {
            database: lookup("DBBENCH_DATABASE").unwrap_or(defaults.database),
            operations: parse_or(&lookup, "DBBENCH_OPERATIONS", defaults.operations)?,
            geometry_operations: parse_or(
                &lookup,
                "DBBENCH_GEOMETRY_OPERATIONS",
                defaults.geometry_operations,
            )?,
            table_options: lookup("DBBENCH_TABLE_OPTIONS").unwrap_or(defaults.table_options),
            log_level: parse_or(&lookup, "DBBENCH_LOG_LEVEL", defaults.log_level)?,
            log_file: lookup("DBBENCH_LOG_FILE").filter(|path| !path.is_empty()),
            failure_policy: if fail_fast {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::Drain
            },
            warmup: parse_or(&lookup, "DBBENCH_WARMUP", defaults.warmup)?,
            filter: args.into_iter().next().filter(|f| !f.is_empty()),
        })
    }
}

fn parse_or<L, T>(lookup: &L, key: &str, default: T) -> Result<T>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)], args: &[&str]) -> Result<BenchConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BenchConfig::from_lookup(
            |key| vars.get(key).cloned(),
            args.iter().map(|a| a.to_string()),
        )
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[], &[]).unwrap(), BenchConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(
            &[
                ("DBBENCH_DATABASE", "/tmp/bench.db"),
                ("DBBENCH_OPERATIONS", "500"),
                ("DBBENCH_GEOMETRY_OPERATIONS", "20"),
                ("DBBENCH_LOG_LEVEL", "debug"),
                ("DBBENCH_FAIL_FAST", "true"),
                ("DBBENCH_WARMUP", "false"),
            ],
            &["concurrent"],
        )
        .unwrap();
        assert_eq!(cfg.database, "/tmp/bench.db");
        assert_eq!(cfg.operations, 500);
        assert_eq!(cfg.geometry_operations, 20);
        assert_eq!(cfg.log_level, LevelFilter::Debug);
        assert_eq!(cfg.failure_policy, FailurePolicy::FailFast);
        assert!(!cfg.warmup);
        assert_eq!(cfg.filter.as_deref(), Some("concurrent"));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = config(&[("DBBENCH_OPERATIONS", "lots")], &[]).unwrap_err();
        assert!(err.to_string().contains("DBBENCH_OPERATIONS"));
    }
}
