//! Cancellable snapshot feed over any [`SessionStore`].
//!
//! A background thread polls the store and hands every changed snapshot to
//! the consumer in full. Consumers never diff snapshots; each one replaces
//! whatever they derived from the previous one.

use crate::error::TrackerError;
use crate::session::{Session, UserId};
use crate::store::SessionStore;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Live feed handle. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop polling and wait for the worker to exit.
    pub fn unsubscribe(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Disconnecting the channel wakes the worker out of its wait.
        self.cancel.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("session feed worker panicked");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start delivering snapshots of `user`'s sessions.
///
/// The first successful poll is always delivered; later polls only when the
/// snapshot changed. A failing poll reports one `Subscription` error per
/// outage and the feed keeps polling. Rejected credentials are reported as
/// `Authentication` instead.
pub fn subscribe<S, F, E>(
    store: S,
    user: UserId,
    interval: Duration,
    mut on_change: F,
    mut on_error: E,
) -> Subscription
where
    S: SessionStore + Send + 'static,
    F: FnMut(Vec<Session>) + Send + 'static,
    E: FnMut(TrackerError) + Send + 'static,
{
    let (cancel_tx, cancel_rx) = mpsc::channel::<()>();

    let worker = thread::spawn(move || {
        let mut last: Option<Vec<Session>> = None;
        let mut failing = false;

        loop {
            match store.list(&user) {
                Ok(snapshot) => {
                    if failing {
                        debug!(%user, "session feed recovered");
                        failing = false;
                        last = None;
                    }
                    if last.as_ref() != Some(&snapshot) {
                        on_change(snapshot.clone());
                        last = Some(snapshot);
                    }
                }
                Err(e) => {
                    if !failing {
                        warn!(%user, error = %e, "session feed poll failed");
                        on_error(TrackerError::read(e));
                        failing = true;
                    }
                }
            }

            match cancel_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(%user, "session feed stopped");
    });

    Subscription {
        cancel: Some(cancel_tx),
        worker: Some(worker),
    }
}
