//! in-memory shared state for hue.
//!
//! this crate confines all shared mutable state of the enforcement engine:
//! - [`LockRegistry`]: lazy per-identifier read/write locks
//! - [`MemoryState`]: cached user status, per-user session tables, penalty
//!   entries, and the pending disconnect queue
//!
//! nothing here touches a database; persistence lives in `hue-db`.

#![warn(missing_docs)]

mod disconnect;
mod locks;
mod penalties;
mod sessions;
mod user_cache;

pub use disconnect::DisconnectCommand;
pub use locks::{KeyLock, LockRegistry};
pub use penalties::PenaltyEntry;
pub use sessions::{SessionEntry, SessionTable, hash_ip};
pub use user_cache::UserCacheEntry;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use hue_types::UserStatus;

/// the four concurrent maps backing the enforcement engine.
///
/// writes follow an insert-if-absent discipline: the map-level lock is held
/// only to look up or create an entry, payload mutation happens under the
/// caller's key-scoped lock from [`LockRegistry`].
#[derive(Default)]
pub struct MemoryState {
    users: RwLock<HashMap<String, UserCacheEntry>>,
    sessions: RwLock<HashMap<String, Arc<SessionTable>>>,
    penalties: RwLock<HashMap<String, PenaltyEntry>>,
    disconnects: Mutex<Vec<DisconnectCommand>>,
}

impl MemoryState {
    /// create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    // ─── user cache ──────────────────────────────────────────────────────

    /// cache a user's status, package reference, and concurrency cap.
    ///
    /// counters are reset; they re-accumulate from subsequent reports.
    pub fn set_user(
        &self,
        user_id: &str,
        status: UserStatus,
        active_package_id: Option<String>,
        max_concurrent: i32,
    ) {
        let mut users = self.users.write().unwrap();
        users.insert(
            user_id.to_string(),
            UserCacheEntry::new(user_id, status, active_package_id, max_concurrent),
        );
    }

    /// look up a cached user entry.
    pub fn get_user(&self, user_id: &str) -> Option<UserCacheEntry> {
        self.users.read().unwrap().get(user_id).cloned()
    }

    /// add usage to the cached counters, keeping the total invariant.
    pub fn update_user_usage(&self, user_id: &str, upload: i64, download: i64) {
        let mut users = self.users.write().unwrap();
        if let Some(entry) = users.get_mut(user_id) {
            entry.add_usage(upload, download);
        }
    }

    /// drop a user from cache, session table, and penalty table.
    pub fn delete_user(&self, user_id: &str) {
        self.users.write().unwrap().remove(user_id);
        self.sessions.write().unwrap().remove(user_id);
        self.penalties.write().unwrap().remove(user_id);
    }

    // ─── session tables ──────────────────────────────────────────────────

    /// get or create the session table for a user.
    ///
    /// the table carries its own lock so session work never serializes with
    /// package updates under the user's registry lock.
    pub fn session_table(&self, user_id: &str) -> Arc<SessionTable> {
        if let Some(table) = self.sessions.read().unwrap().get(user_id) {
            return Arc::clone(table);
        }
        let mut sessions = self.sessions.write().unwrap();
        Arc::clone(
            sessions
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(SessionTable::new(user_id))),
        )
    }

    /// run `f` over every user's session table.
    pub fn for_each_session_table(&self, mut f: impl FnMut(&str, &Arc<SessionTable>)) {
        let sessions = self.sessions.read().unwrap();
        for (user_id, table) in sessions.iter() {
            f(user_id, table);
        }
    }

    // ─── penalties ───────────────────────────────────────────────────────

    /// apply a penalty entry for a user, replacing any existing one.
    pub fn set_penalty(&self, entry: PenaltyEntry) {
        let mut penalties = self.penalties.write().unwrap();
        penalties.insert(entry.user_id.clone(), entry);
    }

    /// current penalty for a user, if still in force.
    ///
    /// a read that observes an expired entry deletes it and reports none.
    pub fn get_penalty(&self, user_id: &str) -> Option<PenaltyEntry> {
        {
            let penalties = self.penalties.read().unwrap();
            match penalties.get(user_id) {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.clone()),
                Some(_) => {}
            }
        }
        // expired: upgrade to a write lock and lazily delete
        let mut penalties = self.penalties.write().unwrap();
        if penalties.get(user_id).is_some_and(|e| e.is_expired()) {
            penalties.remove(user_id);
        }
        penalties.get(user_id).cloned()
    }

    /// remove a penalty outright.
    pub fn clear_penalty(&self, user_id: &str) {
        self.penalties.write().unwrap().remove(user_id);
    }

    /// drop every expired penalty; returns how many were removed.
    pub fn cleanup_expired_penalties(&self) -> usize {
        let mut penalties = self.penalties.write().unwrap();
        let before = penalties.len();
        penalties.retain(|_, entry| !entry.is_expired());
        before - penalties.len()
    }

    // ─── disconnect queue ────────────────────────────────────────────────

    /// append a disconnect command for data-plane pollers.
    pub fn queue_disconnect(&self, cmd: DisconnectCommand) {
        self.disconnects.lock().unwrap().push(cmd);
    }

    /// atomically take the queued commands, leaving the queue empty.
    pub fn drain_disconnects(&self) -> Vec<DisconnectCommand> {
        std::mem::take(&mut *self.disconnects.lock().unwrap())
    }
}
