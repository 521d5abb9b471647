//! the history store: append-only events and aggregated usage history.
//!
//! never read by the hot path; only admin queries and audit touch it.
//! consumers that need a total order across concurrent writers sort by
//! timestamp then id.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm_migration::MigratorTrait;

use hue_types::{Event, EventType, GeoData, UsageReport};

use crate::entity::{event, usage_history};
use crate::migration::HistoryMigrator;
use crate::{Error, Result, connect, derive_store_url};

/// filters for event range scans.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// restrict to one event type.
    pub event_type: Option<EventType>,
    /// restrict to one user.
    pub user_id: Option<String>,
    /// inclusive range start.
    pub start: Option<DateTime<Utc>>,
    /// inclusive range end.
    pub end: Option<DateTime<Utc>>,
    /// maximum rows (0 = unlimited).
    pub limit: u64,
}

/// one aggregated usage row with geo fields.
#[derive(Debug, Clone)]
pub struct UsageHistoryEntry {
    /// row id.
    pub id: String,
    /// the user the traffic belongs to.
    pub user_id: String,
    /// package charged, if known.
    pub package_id: String,
    /// reporting node.
    pub node_id: String,
    /// reporting service.
    pub service_id: String,
    /// bytes uploaded.
    pub upload: i64,
    /// bytes downloaded.
    pub download: i64,
    /// data-plane session id.
    pub session_id: String,
    /// derived geo: country.
    pub country: String,
    /// derived geo: city.
    pub city: String,
    /// derived geo: isp.
    pub isp: String,
    /// free-form labels.
    pub tags: Vec<String>,
    /// when the traffic was observed.
    pub timestamp: DateTime<Utc>,
}

impl From<usage_history::Model> for UsageHistoryEntry {
    fn from(model: usage_history::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            package_id: model.package_id.unwrap_or_default(),
            node_id: model.node_id,
            service_id: model.service_id,
            upload: model.upload,
            download: model.download,
            session_id: model.session_id.unwrap_or_default(),
            country: model.country.unwrap_or_default(),
            city: model.city.unwrap_or_default(),
            isp: model.isp.unwrap_or_default(),
            tags: model
                .tags
                .as_deref()
                .map(|t| serde_json::from_str(t).unwrap_or_default())
                .unwrap_or_default(),
            timestamp: model.timestamp,
        }
    }
}

/// append-only store of events and usage history.
#[derive(Clone, Debug)]
pub struct HistoryDb {
    conn: DatabaseConnection,
}

impl HistoryDb {
    /// open the history store derived from the base url and run migrations.
    pub async fn new(db_url: &str) -> Result<Self> {
        let url = derive_store_url(db_url, "_history");
        let conn = connect(&url).await?;
        HistoryMigrator::up(&conn, None)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(Self { conn })
    }

    /// create an in-memory history store for testing.
    pub async fn new_in_memory() -> Result<Self> {
        Self::new(crate::MEMORY_URL).await
    }

    /// append an event. Events are never updated.
    pub async fn store_event(&self, ev: &Event) -> Result<()> {
        let model: event::ActiveModel = ev.into();
        event::Entity::insert(model).exec(&self.conn).await?;
        Ok(())
    }

    /// range-scan events, descending by time.
    pub async fn events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        let mut find = event::Entity::find();

        if let Some(t) = query.event_type {
            find = find.filter(event::Column::EventType.eq(t.as_str()));
        }
        if let Some(user_id) = query.user_id.as_deref() {
            find = find.filter(event::Column::UserId.eq(user_id));
        }
        if let Some(start) = query.start {
            find = find.filter(event::Column::Timestamp.gte(start));
        }
        if let Some(end) = query.end {
            find = find.filter(event::Column::Timestamp.lte(end));
        }

        find = find.order_by_desc(event::Column::Timestamp);
        if query.limit > 0 {
            find = find.limit(query.limit);
        }

        let rows = find.all(&self.conn).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// append an aggregated usage row for an accepted report.
    pub async fn store_usage(
        &self,
        report: &UsageReport,
        package_id: &str,
        geo: &GeoData,
    ) -> Result<()> {
        let model = usage_history::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(report.user_id.clone()),
            package_id: Set(Some(package_id.to_string())),
            node_id: Set(report.node_id.clone()),
            service_id: Set(report.service_id.clone()),
            upload: Set(report.upload),
            download: Set(report.download),
            session_id: Set(Some(report.session_id.clone())),
            country: Set(Some(geo.country.clone())),
            city: Set(Some(geo.city.clone())),
            isp: Set(Some(geo.isp.clone())),
            tags: Set(Some(
                serde_json::to_string(&report.tags).unwrap_or_else(|_| "[]".to_string()),
            )),
            timestamp: Set(report.timestamp),
            created_at: Set(Utc::now()),
        };
        usage_history::Entity::insert(model).exec(&self.conn).await?;
        Ok(())
    }

    /// range-scan a user's usage history, descending by time.
    pub async fn usage_history(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<UsageHistoryEntry>> {
        let mut find = usage_history::Entity::find()
            .filter(usage_history::Column::UserId.eq(user_id))
            .filter(usage_history::Column::Timestamp.gte(start))
            .filter(usage_history::Column::Timestamp.lte(end))
            .order_by_desc(usage_history::Column::Timestamp);
        if limit > 0 {
            find = find.limit(limit);
        }
        let rows = find.all(&self.conn).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// delete events and usage rows older than `before` (retention).
    pub async fn delete_old(&self, before: DateTime<Utc>) -> Result<()> {
        event::Entity::delete_many()
            .filter(event::Column::Timestamp.lt(before))
            .exec(&self.conn)
            .await?;
        usage_history::Entity::delete_many()
            .filter(usage_history::Column::Timestamp.lt(before))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// close the history store; the connection is cleaned up on drop.
    pub async fn close(&self) -> Result<()> {
        tracing::debug!("history store marked for close");
        Ok(())
    }
}
