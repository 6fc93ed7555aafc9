//! Connection pool warm-up.

use crate::db::Database;
use crate::error::BenchResult;

/// Idle connections the pool is asked to keep before measuring.
pub const WARMUP_IDLE_CONNECTIONS: usize = 16;

/// Trivial round-trips issued by [`warmup`].
pub const WARMUP_ROUND_TRIPS: usize = 10_000;

pub const WARMUP_QUERY: &str = "SELECT 5 * 3";

/// Tunables for [`warmup_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupConfig {
    pub idle_connections: usize,
    pub round_trips: usize,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            idle_connections: WARMUP_IDLE_CONNECTIONS,
            round_trips: WARMUP_ROUND_TRIPS,
        }
    }
}

/// Prime `db` so connection establishment is excluded from measurements.
pub fn warmup(db: &dyn Database) -> BenchResult<()> {
    warmup_with(db, &WarmupConfig::default())
}

/// Set the pool's idle target, then run constant-expression queries.
/// Stops at the first failure; nothing is retried.
pub fn warmup_with(db: &dyn Database, config: &WarmupConfig) -> BenchResult<()> {
    db.set_max_idle(config.idle_connections);
    for _ in 0..config.round_trips {
        db.query(WARMUP_QUERY, &[])?;
    }
    log::debug!(
        "warm-up done: {} round-trips, {} idle connections",
        config.round_trips,
        config.idle_connections
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::testing::NullDatabase;
    use std::sync::atomic::Ordering;

    #[test]
    fn issues_round_trips_and_sets_idle_target() {
        let db = NullDatabase::default();
        warmup(&db).unwrap();
        assert_eq!(db.calls.load(Ordering::SeqCst), WARMUP_ROUND_TRIPS);
        assert_eq!(db.max_idle.load(Ordering::SeqCst), WARMUP_IDLE_CONNECTIONS);
    }

    #[test]
    fn repeated_warmups_succeed() {
        let db = NullDatabase::default();
        let config = WarmupConfig {
            idle_connections: 4,
            round_trips: 100,
        };
        warmup_with(&db, &config).unwrap();
        warmup_with(&db, &config).unwrap();
        assert_eq!(db.calls.load(Ordering::SeqCst), 200);
    }

    #[test]
    fn stops_at_first_failure() {
        let db = NullDatabase::failing_after(10);
        let err = warmup(&db).unwrap_err();
        assert!(matches!(err, BenchError::Database(_)));
        assert_eq!(db.calls.load(Ordering::SeqCst), 11);
    }
}
