//! the active buffer store: batched raw usage rows.
//!
//! reports are appended to an in-memory buffer and written in one
//! transaction when the buffer reaches `FLUSH_SIZE` or the periodic flush
//! fires. On crash, at most one flush interval of raw rows is lost; the
//! authoritative counters in the metadata store are unaffected.

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait};
use sea_orm::sea_query::Expr;
use tokio::sync::Mutex;
use tracing::debug;

use hue_types::UsageReport;

use crate::entity::usage_report;
use crate::migration::ActiveMigrator;
use crate::{Error, Result, connect, derive_store_url};
use sea_orm_migration::MigratorTrait;

/// rows buffered before a synchronous flush is forced.
const FLUSH_SIZE: usize = 100;

/// append-only buffer of raw usage rows, batched to disk.
pub struct ActiveDb {
    conn: DatabaseConnection,
    buffer: Mutex<Vec<UsageReport>>,
    flush_size: usize,
}

impl ActiveDb {
    /// open the active store derived from the base url and run migrations.
    pub async fn new(db_url: &str) -> Result<Self> {
        let url = derive_store_url(db_url, "_active");
        let conn = connect(&url).await?;
        ActiveMigrator::up(&conn, None)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;

        Ok(Self {
            conn,
            buffer: Mutex::new(Vec::with_capacity(FLUSH_SIZE)),
            flush_size: FLUSH_SIZE,
        })
    }

    /// create an in-memory active store for testing.
    pub async fn new_in_memory() -> Result<Self> {
        Self::new(crate::MEMORY_URL).await
    }

    /// append a report to the buffer, flushing synchronously once full.
    pub async fn buffer_usage(&self, mut report: UsageReport) -> Result<()> {
        report.ensure_id();
        // raw IPs never reach the buffer
        report.client_ip = String::new();

        let mut buffer = self.buffer.lock().await;
        buffer.push(report);
        if buffer.len() >= self.flush_size {
            self.flush_locked(&mut buffer).await?;
        }
        Ok(())
    }

    /// write all buffered rows in one transaction. Safe to call concurrently
    /// with `buffer_usage`; calls serialize on the buffer mutex. Flushing an
    /// empty buffer is a no-op.
    pub async fn flush(&self) -> Result<()> {
        let mut buffer = self.buffer.lock().await;
        self.flush_locked(&mut buffer).await
    }

    async fn flush_locked(&self, buffer: &mut Vec<UsageReport>) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }

        let txn = self.conn.begin().await?;
        for report in buffer.iter() {
            let model: usage_report::ActiveModel = report.into();
            usage_report::Entity::insert(model).exec(&txn).await?;
        }
        txn.commit().await?;

        debug!(rows = buffer.len(), "flushed usage buffer");
        buffer.clear();
        Ok(())
    }

    /// rows currently waiting in the buffer.
    pub async fn buffered_len(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// fetch up to `limit` unprocessed rows, oldest first.
    pub async fn unprocessed(&self, limit: u64) -> Result<Vec<UsageReport>> {
        let rows = usage_report::Entity::find()
            .filter(usage_report::Column::Processed.eq(false))
            .order_by_asc(usage_report::Column::Timestamp)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// mark rows as processed.
    pub async fn mark_processed(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        usage_report::Entity::update_many()
            .col_expr(usage_report::Column::Processed, Expr::value(true))
            .filter(usage_report::Column::Id.is_in(ids.iter().map(String::as_str)))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// delete processed rows older than `before` (retention).
    pub async fn delete_old_processed(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = usage_report::Entity::delete_many()
            .filter(usage_report::Column::Processed.eq(true))
            .filter(usage_report::Column::Timestamp.lt(before))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    /// aggregate (upload, download) for a user within a time range.
    ///
    /// only flushed rows count; the caller flushes first if it needs
    /// buffer-inclusive numbers.
    pub async fn aggregated_usage(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(i64, i64)> {
        let rows = usage_report::Entity::find()
            .filter(usage_report::Column::UserId.eq(user_id))
            .filter(usage_report::Column::Timestamp.gte(start))
            .filter(usage_report::Column::Timestamp.lte(end))
            .all(&self.conn)
            .await?;
        Ok(rows
            .iter()
            .fold((0, 0), |(up, down), r| (up + r.upload, down + r.download)))
    }

    /// close the active store. Callers flush first; the connection itself
    /// is reference-counted and cleaned up on drop.
    pub async fn close(&self) -> Result<()> {
        tracing::debug!("active store marked for close");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(user: &str, upload: i64, download: i64) -> UsageReport {
        UsageReport {
            id: String::new(),
            user_id: user.to_string(),
            node_id: "n1".to_string(),
            service_id: "s1".to_string(),
            upload,
            download,
            session_id: "sess-1".to_string(),
            client_ip: "203.0.113.9".to_string(),
            tags: vec!["tag-a".to_string()],
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn buffered_rows_persist_on_flush() {
        let db = ActiveDb::new_in_memory().await.unwrap();

        db.buffer_usage(report("u1", 10, 20)).await.unwrap();
        db.buffer_usage(report("u1", 5, 5)).await.unwrap();
        assert_eq!(db.buffered_len().await, 2);
        assert!(db.unprocessed(10).await.unwrap().is_empty());

        db.flush().await.unwrap();
        assert_eq!(db.buffered_len().await, 0);

        let rows = db.unprocessed(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        // raw IP never persisted
        assert!(rows.iter().all(|r| r.client_ip.is_empty()));
    }

    #[tokio::test]
    async fn double_flush_is_a_noop() {
        let db = ActiveDb::new_in_memory().await.unwrap();
        db.buffer_usage(report("u1", 1, 1)).await.unwrap();
        db.flush().await.unwrap();
        db.flush().await.unwrap();
        assert_eq!(db.unprocessed(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn buffer_auto_flushes_at_capacity() {
        let db = ActiveDb::new_in_memory().await.unwrap();
        for i in 0..FLUSH_SIZE {
            db.buffer_usage(report("u1", i as i64, 0)).await.unwrap();
        }
        // the hundredth append triggered a synchronous flush
        assert_eq!(db.buffered_len().await, 0);
        assert_eq!(db.unprocessed(1000).await.unwrap().len(), FLUSH_SIZE);
    }

    #[tokio::test]
    async fn processing_and_retention() {
        let db = ActiveDb::new_in_memory().await.unwrap();
        db.buffer_usage(report("u1", 10, 0)).await.unwrap();
        db.flush().await.unwrap();

        let rows = db.unprocessed(10).await.unwrap();
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        db.mark_processed(&ids).await.unwrap();
        assert!(db.unprocessed(10).await.unwrap().is_empty());

        let deleted = db
            .delete_old_processed(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn aggregates_by_user_and_range() {
        let db = ActiveDb::new_in_memory().await.unwrap();
        db.buffer_usage(report("u1", 10, 20)).await.unwrap();
        db.buffer_usage(report("u1", 1, 2)).await.unwrap();
        db.buffer_usage(report("u2", 100, 100)).await.unwrap();
        db.flush().await.unwrap();

        let start = Utc::now() - chrono::Duration::minutes(1);
        let end = Utc::now() + chrono::Duration::minutes(1);
        let (up, down) = db.aggregated_usage("u1", start, end).await.unwrap();
        assert_eq!((up, down), (11, 22));
    }
}
