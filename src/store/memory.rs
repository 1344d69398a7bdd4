use crate::error::StoreError;
use crate::session::{NewSession, Session, SessionPatch, UserId};
use crate::store::{SessionStore, sort_newest_first};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// In-process [`SessionStore`] with switchable read and write faults.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<UserId, Vec<Session>>>,
    next_id: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing documents, keeping their ids.
    pub fn with_sessions(user: &UserId, sessions: Vec<Session>) -> Self {
        let store = Self::new();
        store.lock().insert(user.clone(), sessions);
        store
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Vec<Session>>> {
        // A panicked writer cannot leave a half-applied session behind.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn list(&self, user: &UserId) -> Result<Vec<Session>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read rejected".to_string()));
        }
        let mut sessions = self.lock().get(user).cloned().unwrap_or_default();
        sort_newest_first(&mut sessions);
        Ok(sessions)
    }

    fn create(&self, user: &UserId, session: &NewSession) -> Result<String, StoreError> {
        self.check_write()?;
        let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.lock()
            .entry(user.clone())
            .or_default()
            .push(session.clone().into_session(id.clone()));
        Ok(id)
    }

    fn update(&self, user: &UserId, id: &str, patch: &SessionPatch) -> Result<(), StoreError> {
        self.check_write()?;
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(user)
            .and_then(|list| list.iter_mut().find(|s| s.id == id))
            .ok_or_else(|| StoreError::Unavailable(format!("no session {}", id)))?;
        patch.apply(session);
        Ok(())
    }

    fn remove(&self, user: &UserId, id: &str) -> Result<(), StoreError> {
        self.check_write()?;
        if let Some(list) = self.lock().get_mut(user) {
            list.retain(|s| s.id != id);
        }
        Ok(())
    }
}
