//! cached user data consulted on the hot path.

use chrono::{DateTime, Utc};
use hue_types::UserStatus;

/// cached status, package reference, and live counters for a user.
#[derive(Debug, Clone)]
pub struct UserCacheEntry {
    /// the user this entry caches.
    pub user_id: String,
    /// last known lifecycle state.
    pub status: UserStatus,
    /// last known active package.
    pub active_package_id: Option<String>,
    /// bytes uploaded since this entry was (re)primed.
    pub current_upload: i64,
    /// bytes downloaded since this entry was (re)primed.
    pub current_download: i64,
    /// total bytes since this entry was (re)primed.
    pub current_total: i64,
    /// concurrency cap copied from the package.
    pub max_concurrent: i32,
    /// when the entry was last written.
    pub last_updated: DateTime<Utc>,
}

impl UserCacheEntry {
    /// create a fresh entry with zeroed counters.
    pub fn new(
        user_id: &str,
        status: UserStatus,
        active_package_id: Option<String>,
        max_concurrent: i32,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            status,
            active_package_id,
            current_upload: 0,
            current_download: 0,
            current_total: 0,
            max_concurrent,
            last_updated: Utc::now(),
        }
    }

    /// add usage, keeping `current_total = upload + download`.
    pub fn add_usage(&mut self, upload: i64, download: i64) {
        self.current_upload += upload;
        self.current_download += download;
        self.current_total += upload + download;
        self.last_updated = Utc::now();
    }
}
