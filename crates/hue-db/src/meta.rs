//! the metadata store: authoritative entity state with immediate writes.

use sea_orm::{ConnectionTrait, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::migration::Migrator;
use crate::{Error, Result, connect};

/// hot relational store for users, packages, nodes, services, managers and
/// auth keys.
///
/// cheap to clone; the underlying connection is reference-counted.
#[derive(Clone)]
pub struct MetaDb {
    pub(crate) conn: DatabaseConnection,
}

impl MetaDb {
    /// open the metadata store at the base url and run migrations.
    pub async fn new(db_url: &str) -> Result<Self> {
        let conn = connect(db_url).await?;
        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    /// create an in-memory metadata store for testing.
    pub async fn new_in_memory() -> Result<Self> {
        Self::new(crate::MEMORY_URL).await
    }

    /// run pending schema migrations. Idempotent; existing data is preserved.
    pub async fn migrate(&self) -> Result<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| Error::Migration(e.to_string()))
    }

    /// ping the store to verify connectivity.
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    /// close the metadata store.
    ///
    /// NOTE: sea-orm connections are reference-counted and cleaned up on
    /// drop; this exists for explicit shutdown ordering and logging.
    pub async fn close(&self) -> Result<()> {
        tracing::debug!("metadata store marked for close");
        Ok(())
    }
}
