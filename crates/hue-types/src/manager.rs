//! manager (reseller) tree types.
//!
//! managers form a tree via an optional parent reference. Each manager
//! carries a [`ManagerPackage`] whose counters aggregate the usage of every
//! descendant user. Limits on a child must not exceed the same limit on any
//! ancestor at creation time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::package::ResetMode;

/// process-wide policy for manager-limit violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// report violations but never block on them.
    Soft,
    /// block on violations.
    Default,
    /// block on violations (alias kept for explicit configuration).
    Hard,
}

impl EnforcementMode {
    /// parse a configured mode string. Unknown values read as `default`.
    pub fn parse(s: &str) -> Self {
        match s {
            "soft" => EnforcementMode::Soft,
            "hard" => EnforcementMode::Hard,
            _ => EnforcementMode::Default,
        }
    }

    /// true if violations should block the report.
    pub fn blocks(&self) -> bool {
        !matches!(self, EnforcementMode::Soft)
    }
}

/// lifecycle state of a manager package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerPackageStatus {
    /// limits enforced, counters accumulate.
    Active,
    /// ignored by checks and delta application.
    Inactive,
}

impl ManagerPackageStatus {
    /// database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagerPackageStatus::Active => "active",
            ManagerPackageStatus::Inactive => "inactive",
        }
    }

    /// parse a stored status string. Unknown values read as `inactive`.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => ManagerPackageStatus::Active,
            _ => ManagerPackageStatus::Inactive,
        }
    }
}

/// limit violation raised when a child manager exceeds a parent limit.
#[derive(Debug, Error)]
pub enum ManagerLimitError {
    /// child total limit exceeds the parent's.
    #[error("child total_limit exceeds parent")]
    TotalLimit,
    /// child upload limit exceeds the parent's.
    #[error("child upload_limit exceeds parent")]
    UploadLimit,
    /// child download limit exceeds the parent's.
    #[error("child download_limit exceeds parent")]
    DownloadLimit,
    /// child session cap exceeds the parent's.
    #[error("child max_sessions exceeds parent")]
    MaxSessions,
    /// child online-user cap exceeds the parent's.
    #[error("child max_online_users exceeds parent")]
    MaxOnlineUsers,
    /// child active-user cap exceeds the parent's.
    #[error("child max_active_users exceeds parent")]
    MaxActiveUsers,
}

/// aggregated limits and counters attached to a manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerPackage {
    /// owning manager.
    pub manager_id: String,
    /// total traffic limit in bytes (0 = unlimited).
    pub total_limit: i64,
    /// upload limit in bytes (0 = unlimited).
    pub upload_limit: i64,
    /// download limit in bytes (0 = unlimited).
    pub download_limit: i64,
    /// counter reset policy.
    pub reset_mode: ResetMode,
    /// validity window in seconds.
    pub duration: i64,
    /// activation time, if anchored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    /// concurrent-session cap across all descendant users (0 = unlimited).
    pub max_sessions: i32,
    /// online-user cap (0 = unlimited).
    pub max_online_users: i32,
    /// active-user cap (0 = unlimited).
    pub max_active_users: i32,
    /// current lifecycle state.
    pub status: ManagerPackageStatus,
    /// aggregate bytes uploaded by descendants.
    pub current_upload: i64,
    /// aggregate bytes downloaded by descendants.
    pub current_download: i64,
    /// aggregate total bytes.
    pub current_total: i64,
    /// current descendant session count.
    pub current_sessions: i64,
    /// current descendant online-user count.
    pub current_online_users: i64,
    /// current descendant active-user count.
    pub current_active_users: i64,
    /// when the package was created.
    pub created_at: DateTime<Utc>,
    /// when the package was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ManagerPackage {
    /// true if the package participates in checks and delta application.
    pub fn is_active(&self) -> bool {
        self.status == ManagerPackageStatus::Active
    }

    /// validate that every positive limit on `self` stays within the
    /// same-named positive limit on `parent`.
    pub fn validate_against_parent(&self, parent: &ManagerPackage) -> Result<(), ManagerLimitError> {
        if parent.total_limit > 0 && self.total_limit > parent.total_limit {
            return Err(ManagerLimitError::TotalLimit);
        }
        if parent.upload_limit > 0 && self.upload_limit > parent.upload_limit {
            return Err(ManagerLimitError::UploadLimit);
        }
        if parent.download_limit > 0 && self.download_limit > parent.download_limit {
            return Err(ManagerLimitError::DownloadLimit);
        }
        if parent.max_sessions > 0 && self.max_sessions > parent.max_sessions {
            return Err(ManagerLimitError::MaxSessions);
        }
        if parent.max_online_users > 0 && self.max_online_users > parent.max_online_users {
            return Err(ManagerLimitError::MaxOnlineUsers);
        }
        if parent.max_active_users > 0 && self.max_active_users > parent.max_active_users {
            return Err(ManagerLimitError::MaxActiveUsers);
        }
        Ok(())
    }
}

/// a reseller-like entity forming a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manager {
    /// unique identifier (uuid string).
    pub id: String,
    /// human-readable name.
    pub name: String,
    /// parent manager, `None` for roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// opaque metadata blob.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// the limits package for this manager.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<ManagerPackage>,
    /// when the manager was created.
    pub created_at: DateTime<Utc>,
    /// when the manager was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Manager {
    /// true if this manager has a non-empty parent reference.
    pub fn has_parent(&self) -> bool {
        self.parent_id.as_deref().is_some_and(|p| !p.is_empty())
    }
}
