// src/services/session_manager.rs
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{sync::RwLock, task::JoinHandle};
use tracing::debug;

use crate::{services::flow::Step, trip::TripParameters};

/// Progress of one chat through the intake form.
#[derive(Clone, Debug)]
pub struct Session {
    pub chat_id: i64,
    pub step: Step,
    pub params: TripParameters,
    pub message_ids: Vec<i64>,
    pub last_active: Instant,
}

impl Session {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            step: Step::FIRST,
            params: TripParameters::default(),
            message_ids: Vec::new(),
            last_active: Instant::now(),
        }
    }
}

/// In-memory sessions keyed by chat id, expired after `ttl` of inactivity.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<i64, Session>>>,
    ttl: Duration,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a fresh session, discarding any previous one for the chat.
    /// Returns whether a previous session was replaced.
    pub async fn start(&self, chat_id: i64) -> bool {
        let mut guard = self.inner.write().await;
        guard.insert(chat_id, Session::new(chat_id)).is_some()
    }

    /// Copy of the live session, if any. Sessions past their ttl count as gone.
    pub async fn get(&self, chat_id: i64) -> Option<Session> {
        let guard = self.inner.read().await;
        guard
            .get(&chat_id)
            .filter(|s| s.last_active.elapsed() < self.ttl)
            .cloned()
    }

    pub async fn get_or_create(&self, chat_id: i64) -> Session {
        if let Some(session) = self.get(chat_id).await {
            return session;
        }
        let session = Session::new(chat_id);
        let mut guard = self.inner.write().await;
        guard.insert(chat_id, session.clone());
        session
    }

    /// Store `session` and touch `last_active`.
    pub async fn save(&self, mut session: Session) {
        session.last_active = Instant::now();
        let mut guard = self.inner.write().await;
        guard.insert(session.chat_id, session);
    }

    /// Mutate the stored session in place and touch `last_active`.
    /// Returns `None` when the chat has no session.
    pub async fn update<R>(&self, chat_id: i64, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(&chat_id)?;
        let result = f(session);
        session.last_active = Instant::now();
        Some(result)
    }

    /// Remember an outgoing message id. No-op when the session is gone.
    pub async fn record_message(&self, chat_id: i64, message_id: i64) {
        self.update(chat_id, |session| session.message_ids.push(message_id))
            .await;
    }

    pub async fn remove(&self, chat_id: i64) -> Option<Session> {
        let mut guard = self.inner.write().await;
        guard.remove(&chat_id)
    }

    /// Remove sessions idle longer than ttl. Returns number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, s| s.last_active.elapsed() < self.ttl);
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Purge expired sessions every `interval` until the runtime shuts down.
    pub fn spawn_purge_task(&self, interval: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = manager.purge_expired().await;
                if removed > 0 {
                    debug!(removed, "purged idle sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn basic_session_flow() {
        let mgr = SessionManager::new(Duration::from_secs(60));
        assert!(!mgr.start(7).await);
        let mut session = mgr.get(7).await.unwrap();
        assert_eq!(session.step, Step::FIRST);

        session.step = Step::Duration;
        mgr.save(session).await;
        mgr.record_message(7, 100).await;

        let session = mgr.get(7).await.unwrap();
        assert_eq!(session.step, Step::Duration);
        assert_eq!(session.message_ids, vec![100]);
        assert!(mgr.remove(7).await.is_some());
        assert!(mgr.is_empty().await);
    }
}
