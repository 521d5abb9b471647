//! subscription package with traffic limits and live counters.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// lifecycle state of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    /// counters accumulate, limits enforced.
    Active,
    /// wall-clock past `expires_at`.
    Expired,
    /// a traffic limit was reached.
    Finish,
    /// manually paused by an admin.
    Suspended,
}

impl PackageStatus {
    /// database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Active => "active",
            PackageStatus::Expired => "expired",
            PackageStatus::Finish => "finish",
            PackageStatus::Suspended => "suspended",
        }
    }

    /// parse a stored status string. Unknown values read as `suspended`.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => PackageStatus::Active,
            "expired" => PackageStatus::Expired,
            "finish" => PackageStatus::Finish,
            _ => PackageStatus::Suspended,
        }
    }
}

impl std::fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// how usage counters are reset over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResetMode {
    /// counters never reset.
    #[serde(rename = "no-reset")]
    NoReset,
    /// reset every hour.
    #[serde(rename = "hourly")]
    Hourly,
    /// reset every day.
    #[serde(rename = "daily")]
    Daily,
    /// reset every week.
    #[serde(rename = "weekly")]
    Weekly,
    /// reset every month (30 days).
    #[serde(rename = "monthly")]
    Monthly,
    /// reset every year (365 days).
    #[serde(rename = "yearly")]
    Yearly,
}

impl ResetMode {
    /// database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetMode::NoReset => "no-reset",
            ResetMode::Hourly => "hourly",
            ResetMode::Daily => "daily",
            ResetMode::Weekly => "weekly",
            ResetMode::Monthly => "monthly",
            ResetMode::Yearly => "yearly",
        }
    }

    /// parse a stored mode string. Unknown values read as `no-reset`.
    pub fn parse(s: &str) -> Self {
        match s {
            "hourly" => ResetMode::Hourly,
            "daily" => ResetMode::Daily,
            "weekly" => ResetMode::Weekly,
            "monthly" => ResetMode::Monthly,
            "yearly" => ResetMode::Yearly,
            _ => ResetMode::NoReset,
        }
    }

    /// the next reset instant after `now`, or `None` for `no-reset`.
    pub fn next_reset(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ResetMode::NoReset => None,
            ResetMode::Hourly => Some(now + Duration::hours(1)),
            ResetMode::Daily => Some(now + Duration::days(1)),
            ResetMode::Weekly => Some(now + Duration::days(7)),
            ResetMode::Monthly => Some(now + Duration::days(30)),
            ResetMode::Yearly => Some(now + Duration::days(365)),
        }
    }
}

impl std::fmt::Display for ResetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a subscription plan owned by exactly one user.
///
/// all byte limits use 0 to mean unlimited. `current_total` is maintained as
/// `current_upload + current_download` on every update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// unique identifier (uuid string).
    pub id: String,
    /// owning user.
    pub user_id: String,
    /// total traffic limit in bytes (0 = unlimited).
    pub total_traffic: i64,
    /// upload limit in bytes (0 = unlimited).
    pub upload_limit: i64,
    /// download limit in bytes (0 = unlimited).
    pub download_limit: i64,
    /// counter reset policy.
    pub reset_mode: ResetMode,
    /// validity window in seconds once started.
    pub duration: i64,
    /// when the package became active; `None` until first connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    /// maximum concurrent sessions (>= 1).
    pub max_concurrent: i32,
    /// current lifecycle state.
    pub status: PackageStatus,
    /// bytes uploaded so far.
    pub current_upload: i64,
    /// bytes downloaded so far.
    pub current_download: i64,
    /// total bytes so far.
    pub current_total: i64,
    /// wall-clock expiry, if the duration has been anchored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// when the package was created.
    pub created_at: DateTime<Utc>,
    /// when the package was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Package {
    /// true if the package is in `active` status.
    pub fn is_active(&self) -> bool {
        self.status == PackageStatus::Active
    }

    /// true if `expires_at` lies in the past.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            None => false,
            Some(at) => Utc::now() > at,
        }
    }

    /// true if there is total traffic quota remaining (or no limit).
    pub fn has_traffic_remaining(&self) -> bool {
        self.total_traffic == 0 || self.current_total < self.total_traffic
    }

    /// true if upload quota remains (or no limit).
    pub fn has_upload_remaining(&self) -> bool {
        self.upload_limit == 0 || self.current_upload < self.upload_limit
    }

    /// true if download quota remains (or no limit).
    pub fn has_download_remaining(&self) -> bool {
        self.download_limit == 0 || self.current_download < self.download_limit
    }

    /// true if the package is usable: active, not expired, quota remaining.
    pub fn can_use(&self) -> bool {
        self.is_active() && !self.is_expired() && self.has_traffic_remaining()
    }

    /// add usage to the in-memory counters, keeping the total invariant.
    pub fn add_usage(&mut self, upload: i64, download: i64) {
        self.current_upload += upload;
        self.current_download += download;
        self.current_total += upload + download;
        self.updated_at = Utc::now();
    }
}

/// input for creating a package.
///
/// the original wire format carried both `total_limit` and `total_traffic`
/// for the same concept; both are accepted and reconciled, preferring the
/// non-zero value.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageCreate {
    /// owning user.
    pub user_id: String,
    /// total traffic limit in bytes (0 = unlimited).
    #[serde(default)]
    pub total_traffic: i64,
    /// legacy alias for `total_traffic`.
    #[serde(default)]
    pub total_limit: i64,
    /// upload limit in bytes.
    #[serde(default)]
    pub upload_limit: i64,
    /// download limit in bytes.
    #[serde(default)]
    pub download_limit: i64,
    /// counter reset policy.
    pub reset_mode: ResetMode,
    /// validity window in seconds.
    pub duration: i64,
    /// explicit activation time; lazy activation on first connection if
    /// unset. Accepts RFC 3339 and the space-separated dialects.
    #[serde(default, deserialize_with = "crate::time::deserialize_flexible_opt")]
    pub start_at: Option<DateTime<Utc>>,
    /// maximum concurrent sessions.
    pub max_concurrent: i32,
}

impl PackageCreate {
    /// materialize a new package from the creation input.
    pub fn into_package(self) -> Package {
        let total = if self.total_traffic != 0 {
            self.total_traffic
        } else {
            self.total_limit
        };
        let now = Utc::now();
        let expires_at = self
            .start_at
            .map(|start| start + Duration::seconds(self.duration));
        Package {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: self.user_id,
            total_traffic: total,
            upload_limit: self.upload_limit,
            download_limit: self.download_limit,
            reset_mode: self.reset_mode,
            duration: self.duration,
            start_at: self.start_at,
            max_concurrent: self.max_concurrent.max(1),
            status: PackageStatus::Active,
            current_upload: 0,
            current_download: 0,
            current_total: 0,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }
}

/// partial update for a package; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageUpdate {
    /// new total traffic limit.
    pub total_traffic: Option<i64>,
    /// new upload limit.
    pub upload_limit: Option<i64>,
    /// new download limit.
    pub download_limit: Option<i64>,
    /// new reset policy.
    pub reset_mode: Option<ResetMode>,
    /// new duration in seconds.
    pub duration: Option<i64>,
    /// new concurrency cap.
    pub max_concurrent: Option<i32>,
    /// new status.
    pub status: Option<PackageStatus>,
}
