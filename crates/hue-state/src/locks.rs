//! key-scoped lock registry.
//!
//! three logically separate maps hand out one reader-writer lock per
//! identifier, created on first use and retained for the process lifetime.
//! The same identifier always yields the same lock instance; callers rely on
//! that identity. There is no global lock.
//!
//! deadlock avoidance: call sites needing multiple locks acquire them in the
//! fixed order user → node → service, and within a kind in lexicographic
//! identifier order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;

/// a lock handle; guards are obtained with `.read().await` / `.write().await`.
pub type KeyLock = Arc<RwLock<()>>;

#[derive(Default)]
struct LockMap {
    locks: Mutex<HashMap<String, KeyLock>>,
}

impl LockMap {
    fn get(&self, id: &str) -> KeyLock {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(
            locks
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(()))),
        )
    }
}

/// lazy per-identifier locks for users, nodes, and services.
#[derive(Default)]
pub struct LockRegistry {
    users: LockMap,
    nodes: LockMap,
    services: LockMap,
}

impl LockRegistry {
    /// create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// the lock for a user id.
    pub fn user_lock(&self, user_id: &str) -> KeyLock {
        self.users.get(user_id)
    }

    /// the lock for a node id.
    pub fn node_lock(&self, node_id: &str) -> KeyLock {
        self.nodes.get(node_id)
    }

    /// the lock for a service id.
    pub fn service_lock(&self, service_id: &str) -> KeyLock {
        self.services.get(service_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_returns_same_lock() {
        let registry = LockRegistry::new();
        let a = registry.user_lock("u1");
        let b = registry.user_lock("u1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn kinds_are_separate_namespaces() {
        let registry = LockRegistry::new();
        let user = registry.user_lock("x");
        let node = registry.node_lock("x");
        let service = registry.service_lock("x");
        assert!(!Arc::ptr_eq(&user, &node));
        assert!(!Arc::ptr_eq(&node, &service));
    }

    #[tokio::test]
    async fn identity_stable_across_tasks() {
        let registry = Arc::new(LockRegistry::new());
        let first = registry.user_lock("u1");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move { registry.user_lock("u1") }));
        }
        for handle in handles {
            let lock = handle.await.unwrap();
            assert!(Arc::ptr_eq(&first, &lock));
        }
    }

    #[tokio::test]
    async fn readers_are_shared_writer_is_exclusive() {
        let registry = LockRegistry::new();
        let lock = registry.user_lock("u1");

        let r1 = lock.read().await;
        let r2 = lock.read().await;
        assert!(lock.try_write().is_err());
        drop(r1);
        drop(r2);
        assert!(lock.try_write().is_ok());
    }
}
