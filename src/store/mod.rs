//! Persistence seam for sessions.
//!
//! The core only talks to the document store through [`SessionStore`]. The
//! REST client in [`client`] is the production backend, [`memory`] keeps
//! everything in process, and [`feed`] turns any store into a cancellable
//! stream of full snapshots.

pub mod client;
pub mod feed;
pub mod memory;

use crate::error::StoreError;
use crate::session::{NewSession, Session, SessionPatch, UserId};
use std::sync::Arc;

pub trait SessionStore {
    /// All sessions of `user`, most recent `start_time` first.
    fn list(&self, user: &UserId) -> Result<Vec<Session>, StoreError>;

    /// Persist a new session and return the id the store assigned to it.
    fn create(&self, user: &UserId, session: &NewSession) -> Result<String, StoreError>;

    fn update(&self, user: &UserId, id: &str, patch: &SessionPatch) -> Result<(), StoreError>;

    fn remove(&self, user: &UserId, id: &str) -> Result<(), StoreError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn list(&self, user: &UserId) -> Result<Vec<Session>, StoreError> {
        (**self).list(user)
    }

    fn create(&self, user: &UserId, session: &NewSession) -> Result<String, StoreError> {
        (**self).create(user, session)
    }

    fn update(&self, user: &UserId, id: &str, patch: &SessionPatch) -> Result<(), StoreError> {
        (**self).update(user, id, patch)
    }

    fn remove(&self, user: &UserId, id: &str) -> Result<(), StoreError> {
        (**self).remove(user, id)
    }
}

/// Order a snapshot the way the feed promises: newest start first.
pub fn sort_newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
}
