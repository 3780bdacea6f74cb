//! Profile loader: one fetch per signed-in user, bounded by a timeout.
//!
//! Each fetch runs as an *attempt* scoped to a user id and a generation
//! number. An attempt owns two tasks, the fetch itself and the timeout
//! timer; both are aborted when the attempt is superseded (new user, sign
//! out, explicit refresh) or the loader is dropped. Tasks re-check their
//! generation under the attempt lock before writing, so a stale task can
//! never touch state that belongs to someone else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use staybook_auth::{Profile, Session};
use staybook_core::UserId;

use crate::backend::{ProfileStore, ProfileStoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileFailure {
    #[error("no profile exists for this account")]
    NotFound,

    #[error(transparent)]
    Store(#[from] ProfileStoreError),
}

/// Published loader state. Replaced wholesale on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileState {
    /// User the state belongs to; `None` when nobody is signed in.
    pub user_id: Option<UserId>,
    pub profile: Option<Arc<Profile>>,
    /// A fetch is in flight.
    pub loading: bool,
    /// The wait bound expired (or the fetch failed) with no profile.
    pub timed_out: bool,
    /// Hard failure; guards surface this instead of falling back.
    pub failure: Option<ProfileFailure>,
}

impl ProfileState {
    fn pending(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            loading: true,
            ..Self::default()
        }
    }

    pub fn belongs_to(&self, user_id: Option<UserId>) -> bool {
        user_id.is_some() && self.user_id == user_id
    }

    /// Either a profile arrived or the fetch definitively failed.
    pub fn is_settled(&self) -> bool {
        self.profile.is_some() || self.failure.is_some()
    }
}

struct Attempt {
    user_id: UserId,
    generation: u64,
    fetch: JoinHandle<()>,
    timer: Option<JoinHandle<()>>,
}

impl Attempt {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        self.fetch.abort();
        self.cancel_timer();
    }
}

struct Inner {
    store: Arc<dyn ProfileStore>,
    timeout: Duration,
    state: watch::Sender<ProfileState>,
    attempt: Mutex<Option<Attempt>>,
    generation: AtomicU64,
}

impl Inner {
    fn attempt(&self) -> MutexGuard<'_, Option<Attempt>> {
        // A panic while holding the lock cannot leave the slot half-written.
        self.attempt.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Process-wide profile loader. Clones share the same state.
#[derive(Clone)]
pub struct ProfileLoader {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for ProfileLoader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProfileLoader")
            .field("timeout", &self.inner.timeout)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl ProfileLoader {
    pub fn new(store: Arc<dyn ProfileStore>, timeout: Duration) -> Self {
        let (state, _) = watch::channel(ProfileState::default());
        Self {
            inner: Arc::new(Inner {
                store,
                timeout,
                state,
                attempt: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> ProfileState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileState> {
        self.inner.state.subscribe()
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Follow a session snapshot: fetch iff authenticated, once per user.
    pub fn track(&self, session: &Session) {
        if session.loading {
            return;
        }
        match session.user_id() {
            None => self.reset(),
            Some(user_id) => {
                let current = self.inner.attempt().as_ref().map(|a| a.user_id);
                if current != Some(user_id) {
                    self.load(user_id);
                }
            }
        }
    }

    /// Start a fresh attempt for `user_id`, superseding any other attempt.
    pub fn load(&self, user_id: UserId) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut slot = self.inner.attempt();

        // Dropping the previous attempt aborts its fetch and its timer.
        slot.take();
        self.inner.state.send_replace(ProfileState::pending(user_id));
        tracing::info!(%user_id, generation, "loading profile");

        let weak = Arc::downgrade(&self.inner);
        let fetch = tokio::spawn(fetch_profile(weak.clone(), user_id, generation));
        let timer = tokio::spawn(expire_wait(weak, generation, self.inner.timeout));

        *slot = Some(Attempt {
            user_id,
            generation,
            fetch,
            timer: Some(timer),
        });
    }

    /// Refetch the current user's profile; no-op when nobody is tracked.
    pub fn refresh(&self) {
        let current = self.inner.attempt().as_ref().map(|a| a.user_id);
        if let Some(user_id) = current {
            self.load(user_id);
        }
    }

    /// Forget everything and cancel all work (sign-out).
    pub fn reset(&self) {
        let mut slot = self.inner.attempt();
        if slot.take().is_some() {
            tracing::debug!("profile attempt cancelled");
        }
        self.inner.state.send_if_modified(|state| {
            if *state == ProfileState::default() {
                false
            } else {
                *state = ProfileState::default();
                true
            }
        });
    }

    /// Drive [`track`](Self::track) from a session subscription until the
    /// session store goes away.
    pub fn bind(&self, mut sessions: watch::Receiver<Session>) -> JoinHandle<()> {
        let loader = self.clone();
        tokio::spawn(async move {
            loop {
                let session = sessions.borrow_and_update().clone();
                loader.track(&session);
                if sessions.changed().await.is_err() {
                    break;
                }
            }
            tracing::debug!("session binding closed");
        })
    }
}

async fn fetch_profile(inner: Weak<Inner>, user_id: UserId, generation: u64) {
    let Some(store) = inner.upgrade().map(|i| Arc::clone(&i.store)) else {
        return;
    };
    let result = store.get_profile(user_id).await;

    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut slot = inner.attempt();
    let Some(attempt) = slot.as_mut().filter(|a| a.generation == generation) else {
        tracing::debug!(%user_id, generation, "discarding superseded profile result");
        return;
    };
    attempt.cancel_timer();

    match result {
        Ok(Some(profile)) => {
            tracing::info!(
                %user_id,
                role = ?profile.role,
                tenant_state = ?profile.tenant_state(),
                "profile loaded"
            );
            let profile = Arc::new(profile);
            inner.state.send_modify(|state| {
                state.profile = Some(profile);
                state.loading = false;
                state.failure = None;
            });
        }
        Ok(None) => fail(&inner, user_id, ProfileFailure::NotFound),
        Err(e) => fail(&inner, user_id, ProfileFailure::Store(e)),
    }
}

fn fail(inner: &Inner, user_id: UserId, failure: ProfileFailure) {
    tracing::error!(%user_id, error = %failure, "profile unavailable");
    inner.state.send_modify(|state| {
        state.profile = None;
        state.loading = false;
        state.timed_out = true;
        state.failure = Some(failure);
    });
}

async fn expire_wait(inner: Weak<Inner>, generation: u64, timeout: Duration) {
    tokio::time::sleep(timeout).await;

    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut slot = inner.attempt();
    let Some(attempt) = slot.as_mut().filter(|a| a.generation == generation) else {
        return;
    };
    // The handle points at this very task; forget it rather than abort it.
    attempt.timer = None;

    inner.state.send_if_modified(|state| {
        if state.profile.is_some() || state.timed_out {
            return false;
        }
        tracing::warn!(
            user_id = ?state.user_id,
            timeout_ms = timeout.as_millis() as u64,
            "profile still loading after timeout; falling back"
        );
        state.timed_out = true;
        true
    });
}
