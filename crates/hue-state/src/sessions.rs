//! per-user session tables.
//!
//! each table carries its own reader-writer lock so session bookkeeping on
//! every report does not serialize with package updates held under the
//! user's registry lock.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use hue_types::GeoData;

/// hash a client address for storage.
///
/// SHA-256 over the address concatenated with the calendar date acts as a
/// daily rotating salt; the first 16 bytes are kept, hex-encoded. The raw
/// address is not retained anywhere.
pub fn hash_ip(ip: &str) -> String {
    if ip.is_empty() {
        return String::new();
    }
    let salted = format!("{}{}", ip, Utc::now().format("%Y-%m-%d"));
    let digest = Sha256::digest(salted.as_bytes());
    hex::encode(&digest[..16])
}

/// an active session within the sliding window.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    /// data-plane session identifier.
    pub session_id: String,
    /// hashed client address (see [`hash_ip`]).
    pub ip_hash: String,
    /// derived geo: country.
    pub country: String,
    /// derived geo: city.
    pub city: String,
    /// derived geo: isp.
    pub isp: String,
    /// when the session was first seen.
    pub started_at: DateTime<Utc>,
    /// when the session was last seen.
    pub last_seen_at: DateTime<Utc>,
}

impl SessionEntry {
    fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_seen_at).to_std().unwrap_or_default()
    }
}

/// the session set for one user.
pub struct SessionTable {
    user_id: String,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionTable {
    /// create an empty table for a user.
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// the owning user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// insert a session, hashing the client address and stamping both
    /// timestamps with now.
    pub fn add(&self, session_id: &str, client_ip: &str, geo: &GeoData) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                session_id: session_id.to_string(),
                ip_hash: hash_ip(client_ip),
                country: geo.country.clone(),
                city: geo.city.clone(),
                isp: geo.isp.clone(),
                started_at: now,
                last_seen_at: now,
            },
        );
    }

    /// true if a session with this id exists.
    pub fn has(&self, session_id: &str) -> bool {
        self.sessions.read().unwrap().contains_key(session_id)
    }

    /// refresh a session's last-seen time.
    pub fn touch(&self, session_id: &str) {
        let mut sessions = self.sessions.write().unwrap();
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_seen_at = Utc::now();
        }
    }

    /// remove a session.
    pub fn remove(&self, session_id: &str) {
        self.sessions.write().unwrap().remove(session_id);
    }

    /// count sessions seen within the window.
    pub fn active_count(&self, window: Duration) -> usize {
        let now = Utc::now();
        let sessions = self.sessions.read().unwrap();
        sessions.values().filter(|s| s.age(now) <= window).count()
    }

    /// snapshot of all entries.
    pub fn snapshot(&self) -> Vec<SessionEntry> {
        self.sessions.read().unwrap().values().cloned().collect()
    }

    /// drop sessions not seen within the window; returns how many.
    pub fn remove_stale(&self, window: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.age(now) <= window);
        before - sessions.len()
    }
}
