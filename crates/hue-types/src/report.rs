//! usage reports flowing in from data-plane services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// a per-session traffic report from a node/service.
///
/// `client_ip` exists only transiently: the pipeline derives geo data and an
/// ip hash from it, then the raw address is dropped. It is never persisted
/// and never logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReport {
    /// unique identifier (uuid string), assigned on ingest if empty.
    #[serde(default)]
    pub id: String,
    /// the user this traffic belongs to.
    pub user_id: String,
    /// the reporting node.
    pub node_id: String,
    /// the reporting service.
    pub service_id: String,
    /// bytes uploaded since the previous report.
    pub upload: i64,
    /// bytes downloaded since the previous report.
    pub download: i64,
    /// data-plane session identifier.
    #[serde(default)]
    pub session_id: String,
    /// client address; dropped after geo extraction.
    #[serde(default)]
    pub client_ip: String,
    /// free-form labels.
    #[serde(default)]
    pub tags: Vec<String>,
    /// when the traffic was observed.
    pub timestamp: DateTime<Utc>,
}

impl UsageReport {
    /// assign a fresh uuid if the report came in without one.
    pub fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = uuid::Uuid::new_v4().to_string();
        }
    }
}

/// outcome of processing one usage report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageReportResult {
    /// the user the report was for.
    pub user_id: String,
    /// the package charged, when the report was accepted.
    #[serde(default)]
    pub package_id: String,
    /// true if the usage was recorded.
    pub accepted: bool,
    /// true if a traffic quota (user or manager) was the cause of rejection.
    pub quota_exceeded: bool,
    /// true if the concurrent-session cap was hit.
    pub session_limit_hit: bool,
    /// true if this report caused a penalty to be applied.
    pub penalty_applied: bool,
    /// true if the data plane should terminate the session.
    pub should_disconnect: bool,
    /// human-readable rejection reason.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl UsageReportResult {
    /// a rejected result carrying only the user id.
    pub fn rejected(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }
}

/// geo attributes derived from a client address.
///
/// this is all that survives of the raw IP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoData {
    /// country name or iso code.
    #[serde(default)]
    pub country: String,
    /// city name.
    #[serde(default)]
    pub city: String,
    /// isp name.
    #[serde(default)]
    pub isp: String,
}
