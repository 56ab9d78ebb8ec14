use crate::models::qr_session::QrSession;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

pub type SessionHandle = Arc<Mutex<QrSession>>;

/// In-memory store of QR attendance sessions.
///
/// The map lock is only held to look up or insert handles; each session has
/// its own mutex so marks in one session never wait on another session.
/// Expiry is decided by the timestamp on the session, the cleanup task only
/// reclaims memory once `retention` has passed after expiry.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    retention: Duration,
}

impl SessionStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Insert a session. Returns false, leaving the store untouched, if the id is taken.
    pub async fn insert(&self, session: QrSession) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return false;
        }
        sessions.insert(session.id.clone(), Arc::new(Mutex::new(session)));
        true
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions that expired more than `retention` ago.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let handles: Vec<(String, SessionHandle)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect();

        let mut stale = Vec::new();
        for (id, handle) in handles {
            let session = handle.lock().await;
            let purge_after = session.expires_at.checked_add_signed(self.retention);
            if purge_after.is_some_and(|purge_after| purge_after <= now) {
                stale.push(id);
            }
        }

        if stale.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        for id in &stale {
            sessions.remove(id);
        }
        stale.len()
    }

    pub fn spawn_cleanup_task(self: Arc<Self>, interval: std::time::Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let purged = self.purge_expired(Utc::now()).await;
                if purged > 0 {
                    info!(purged = purged, "purged expired attendance sessions");
                } else {
                    debug!("no expired attendance sessions to purge");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(id: &str, created_at: DateTime<Utc>) -> QrSession {
        QrSession::new(id.to_string(), "CS301".to_string(), "Distributed Systems".to_string(), created_at, Duration::seconds(300), None)
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = SessionStore::new(Duration::hours(1));
        let created = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        assert!(store.insert(session("a", created)).await);

        let handle = store.get("a").await.expect("session stored");
        assert_eq!(handle.lock().await.class_id, "CS301");
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn duplicate_ids_are_refused() {
        let store = SessionStore::new(Duration::hours(1));
        let created = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        assert!(store.insert(session("a", created)).await);
        assert!(!store.insert(session("a", created + Duration::seconds(5))).await);
        assert_eq!(store.get("a").await.unwrap().lock().await.created_at, created);
    }

    #[tokio::test]
    async fn purge_keeps_sessions_within_retention() {
        let store = SessionStore::new(Duration::hours(1));
        let created = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        store.insert(session("old", created)).await;
        store.insert(session("fresh", created + Duration::minutes(50))).await;

        // "old" expired at 09:05, "fresh" at 09:55.
        let now = created + Duration::minutes(65);
        assert_eq!(store.purge_expired(now).await, 1);
        assert!(store.get("old").await.is_none());
        assert!(store.get("fresh").await.is_some());
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn purge_survives_retention_overflow() {
        let store = SessionStore::new(Duration::MAX);
        let created = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        store.insert(session("a", created)).await;

        assert_eq!(store.purge_expired(created + Duration::days(365)).await, 0);
        assert_eq!(store.count().await, 1);
    }
}
