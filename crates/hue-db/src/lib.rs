//! persistence layer for hue.
//!
//! three independent sqlite stores derive from one base url:
//! - the **metadata store** ([`MetaDb`]) holds authoritative entity state:
//!   users, packages, nodes, services, managers, auth keys. Writes land
//!   immediately.
//! - the **active store** ([`ActiveDb`]) buffers raw usage rows in memory and
//!   flushes them in batches; on crash up to one flush interval of raw rows
//!   may be lost.
//! - the **history store** ([`HistoryDb`]) is append-only: events and
//!   aggregated usage history, read only by admin queries and audit.
//!
//! `sqlite://./hue.db` yields `./hue.db`, `./hue_active.db` and
//! `./hue_history.db`; the in-memory sentinel keeps all three in memory.

#![warn(missing_docs)]

mod active;
mod auth_keys;
mod entity;
mod error;
mod history;
mod manager;
mod meta;
mod migration;
mod topology;
mod users;

pub use active::ActiveDb;
pub use error::Error;
pub use history::{EventQuery, HistoryDb, UsageHistoryEntry};
pub use manager::{ManagerDelta, ManagerLimitCheck};
pub use meta::MetaDb;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

/// result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// url that keeps a store entirely in memory.
pub const MEMORY_URL: &str = "sqlite::memory:";

/// derive a sibling store url by suffixing the file name before `.db`.
///
/// the in-memory sentinel is returned unchanged: each store still gets its
/// own private in-memory database on connect.
fn derive_store_url(base: &str, suffix: &str) -> String {
    if base.contains(":memory:") {
        return base.to_string();
    }
    match base.strip_suffix(".db") {
        Some(stem) => format!("{stem}{suffix}.db"),
        None => format!("{base}{suffix}"),
    }
}

/// open a sqlite connection for one store.
///
/// file urls get `?mode=rwc` so missing files are created, and WAL mode is
/// enabled for concurrent reads alongside the single writer. In-memory
/// stores pin the pool to one connection: every pooled sqlite connection to
/// `:memory:` would otherwise be its own private database.
async fn connect(url: &str) -> Result<DatabaseConnection> {
    let in_memory = url.contains(":memory:");
    let url = if in_memory || url.contains('?') {
        url.to_string()
    } else {
        format!("{url}?mode=rwc")
    };

    let mut options = ConnectOptions::new(url);
    options.sqlx_logging(false);
    if in_memory {
        options.max_connections(1).min_connections(1);
    }

    let conn = Database::connect(options)
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    // foreign keys are on by default with sqlx's sqlite driver
    conn.execute_unprepared("PRAGMA journal_mode=WAL")
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    Ok(conn)
}
