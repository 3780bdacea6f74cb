//! Session store: single source of truth for who is signed in.
//!
//! Readers get immutable snapshots through a watch channel. The only ways
//! to change the snapshot are [`initialize`](SessionStore::initialize),
//! [`on_auth_event`](SessionStore::on_auth_event) and
//! [`sign_out`](SessionStore::sign_out); each replaces it wholesale.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;

use staybook_auth::{AuthEvent, Session};

use crate::backend::IdentityBackend;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    /// `initialize` has not been called.
    Uninitialized,
    /// Restore in flight; snapshot has `loading = true`.
    Loading,
    Settled,
}

pub struct SessionStore {
    identity: Arc<dyn IdentityBackend>,
    snapshot: watch::Sender<Session>,
    /// Bumped on every replacement; lets a slow restore detect that an auth
    /// event overtook it.
    generation: Mutex<u64>,
    started: AtomicBool,
    shutdown: Notify,
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.snapshot.borrow())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

impl SessionStore {
    pub fn new(identity: Arc<dyn IdentityBackend>) -> Self {
        let (snapshot, _) = watch::channel(Session::loading());
        Self {
            identity,
            snapshot,
            generation: Mutex::new(0),
            started: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.snapshot.subscribe()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.snapshot.borrow().is_settled() {
            Lifecycle::Settled
        } else if self.started.load(Ordering::SeqCst) {
            Lifecycle::Loading
        } else {
            Lifecycle::Uninitialized
        }
    }

    /// Restore the persisted session, settling `loading` exactly once.
    ///
    /// Backend failures settle to signed out. Later calls wait for the first
    /// one to settle and return the current snapshot.
    pub async fn initialize(&self) -> Session {
        if self.started.swap(true, Ordering::SeqCst) {
            let mut rx = self.subscribe();
            return match rx.wait_for(Session::is_settled).await {
                Ok(session) => session.clone(),
                Err(_) => self.snapshot(),
            };
        }

        let generation = self.current_generation();
        tracing::debug!("restoring session");

        let restored = match self.identity.get_session().await {
            Ok(Some(user)) => Session::signed_in(user),
            Ok(None) => Session::signed_out(),
            Err(e) => {
                tracing::warn!(error = %e, "session restore failed; continuing signed out");
                Session::signed_out()
            }
        };

        self.replace_if(Some(generation), restored, "restore")
    }

    /// Apply a backend notification. The event fully replaces the snapshot.
    pub fn on_auth_event(&self, event: AuthEvent) -> Session {
        let cause = event.name();
        self.replace_if(None, event.into_session(), cause)
    }

    /// Sign out locally first, then invalidate remotely.
    ///
    /// The local snapshot is cleared before the remote call suspends, and it
    /// is not restored if the remote call fails.
    pub async fn sign_out(&self) {
        self.replace_if(None, Session::signed_out(), "sign_out");
        if let Err(e) = self.identity.sign_out().await {
            tracing::warn!(error = %e, "remote sign-out failed; local session already cleared");
        }
    }

    /// Forward the backend's auth-state notifications into this store until
    /// [`shutdown`](Self::shutdown) or the stream closes.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut events = self.identity.on_auth_state_change();

        tokio::spawn(async move {
            tracing::info!("auth listener started");
            loop {
                tokio::select! {
                    _ = store.shutdown.notified() => break,
                    received = events.recv() => match received {
                        Ok(event) => {
                            store.on_auth_event(event);
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(missed, "auth listener lagged; re-reading session");
                            store.resync().await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::info!("auth listener stopped");
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    async fn resync(&self) {
        let generation = self.current_generation();
        match self.identity.get_session().await {
            Ok(user) => {
                let session = user.map(Session::signed_in).unwrap_or_else(Session::signed_out);
                self.replace_if(Some(generation), session, "resync");
            }
            Err(e) => tracing::warn!(error = %e, "session resync failed; keeping current snapshot"),
        }
    }

    fn current_generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the snapshot, unless `expected` is set and something else
    /// replaced it since that generation was read.
    fn replace_if(&self, expected: Option<u64>, next: Session, cause: &'static str) -> Session {
        let mut generation = self
            .generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if expected.is_some_and(|g| g != *generation) {
            tracing::debug!(cause, "discarding stale session result");
            return self.snapshot();
        }
        *generation += 1;

        let previous = self.snapshot.send_replace(next.clone());
        if previous.user_id() != next.user_id() || previous.loading != next.loading {
            tracing::info!(
                cause,
                user_id = ?next.user_id(),
                authenticated = next.is_authenticated(),
                "session changed"
            );
        }
        next
    }
}
