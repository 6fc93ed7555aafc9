//! SQL dialect variants.
//!
//! A dialect is chosen once when a workload is set up and then supplies the
//! statement shapes that differ between targets: the binary literal syntax
//! used to embed WKB payloads, the bind placeholder, the cheapest no-op
//! statement and a large-string expression.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

/// Characters returned by [`Dialect::large_string_query`].
pub const LARGE_STRING_LEN: usize = 10_000;

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Map a driver name to its dialect. Anything not recognised as
    /// Postgres or SQLite speaks the MySQL syntax.
    pub fn from_driver_name(driver: &str) -> Dialect {
        match driver.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pq" | "pgx" => Dialect::Postgres,
            "sqlite" | "sqlite3" | "rusqlite" => Dialect::Sqlite,
            _ => Dialect::MySql,
        }
    }

    /// Embed `bytes` as a binary literal.
    ///
    /// Postgres takes a bytea escape string (`'\x0102'`); MySQL and SQLite
    /// take a hex blob literal (`X'0102'`).
    pub fn format_binary_literal(&self, bytes: &[u8]) -> String {
        let hex = hex::encode(bytes);
        match self {
            Dialect::Postgres => format!("'\\x{hex}'"),
            Dialect::MySql | Dialect::Sqlite => format!("X'{hex}'"),
        }
    }

    /// Bind placeholder for the 1-based parameter `n`.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${n}"),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Comma-separated placeholders `1..=count`.
    pub fn placeholders(&self, count: usize) -> String {
        (1..=count)
            .map(|n| self.placeholder(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Cheapest statement the server will execute without returning rows.
    pub fn noop_statement(&self) -> &'static str {
        match self {
            Dialect::MySql => "DO 1",
            Dialect::Postgres | Dialect::Sqlite => "SELECT 1",
        }
    }

    /// Query returning a single [`LARGE_STRING_LEN`]-character string of `A`s.
    pub fn large_string_query(&self) -> &'static str {
        match self {
            Dialect::MySql | Dialect::Postgres => "SELECT REPEAT('A', 10000)",
            // hex() of a 5000-byte zeroblob is 10000 zeros.
            Dialect::Sqlite => "SELECT replace(hex(zeroblob(5000)), '0', 'A')",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
