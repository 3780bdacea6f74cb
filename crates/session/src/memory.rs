//! In-memory identity backend and profile store for tests/dev.
//!
//! - No IO
//! - Optional artificial latency (tokio timers, so paused-clock tests work)
//! - Failure injection for every call

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use staybook_auth::{AuthEvent, AuthUser, Profile};
use staybook_core::UserId;

use crate::backend::{
    IdentityBackend, IdentityError, ProfileStore, ProfileStoreError, SignUpMetadata, SignUpOutcome,
};

const EVENT_CAPACITY: usize = 32;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn delay(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
    confirmed: bool,
    metadata: SignUpMetadata,
}

/// Identity backend kept entirely in process memory.
///
/// The "persisted token" is the `current` slot: it survives store restarts
/// the way a browser's stored session does, and `get_session` reads it.
#[derive(Debug)]
pub struct InMemoryIdentity {
    accounts: RwLock<HashMap<String, Account>>,
    current: Mutex<Option<AuthUser>>,
    events: broadcast::Sender<AuthEvent>,
    latency: Mutex<Duration>,
    failure: Mutex<Option<IdentityError>>,
    confirm_sign_ups: bool,
    reset_requests: Mutex<Vec<String>>,
    session_reads: AtomicUsize,
}

impl Default for InMemoryIdentity {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: Mutex::new(None),
            events,
            latency: Mutex::new(Duration::ZERO),
            failure: Mutex::new(None),
            confirm_sign_ups: false,
            reset_requests: Mutex::new(Vec::new()),
            session_reads: AtomicUsize::new(0),
        }
    }
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// New sign-ups must confirm their email before they can sign in.
    pub fn requiring_email_confirmation(mut self) -> Self {
        self.confirm_sign_ups = true;
        self
    }

    /// Register a confirmed account.
    pub fn add_account(&self, email: &str, password: &str) -> AuthUser {
        self.add_account_with_id(UserId::random(), email, password)
    }

    pub fn add_account_with_id(&self, user_id: UserId, email: &str, password: &str) -> AuthUser {
        let user = AuthUser {
            user_id,
            email: email.trim().to_string(),
        };
        let account = Account {
            user: user.clone(),
            password: password.to_string(),
            confirmed: true,
            metadata: SignUpMetadata::default(),
        };
        self.accounts
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(normalize(email), account);
        user
    }

    /// Pretend a token for `user` was persisted by an earlier visit.
    pub fn persist_session(&self, user: Option<AuthUser>) {
        *lock(&self.current) = user;
    }

    /// Number of `get_session` calls so far.
    pub fn session_read_count(&self) -> usize {
        self.session_reads.load(Ordering::SeqCst)
    }

    /// Push an auth event to subscribers, as the hosted service would.
    pub fn emit(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// Make every call fail with `error` until cleared with `None`.
    pub fn fail_with(&self, error: Option<IdentityError>) {
        *lock(&self.failure) = error;
    }

    pub fn reset_requests(&self) -> Vec<String> {
        lock(&self.reset_requests).clone()
    }

    pub fn sign_up_metadata(&self, email: &str) -> Option<SignUpMetadata> {
        self.accounts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&normalize(email))
            .map(|a| a.metadata.clone())
    }

    async fn enter(&self) -> Result<(), IdentityError> {
        let latency = *lock(&self.latency);
        delay(latency).await;
        match lock(&self.failure).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn account(&self, email: &str) -> Option<Account> {
        self.accounts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&normalize(email))
            .cloned()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[async_trait]
impl IdentityBackend for InMemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        self.enter().await?;
        let account = self
            .account(email)
            .filter(|a| a.password == password)
            .ok_or(IdentityError::InvalidCredentials)?;
        if !account.confirmed {
            return Err(IdentityError::EmailNotConfirmed);
        }

        *lock(&self.current) = Some(account.user.clone());
        self.emit(AuthEvent::SignedIn(account.user.clone()));
        Ok(account.user)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome, IdentityError> {
        self.enter().await?;
        let key = normalize(email);
        let user = {
            let mut accounts = self
                .accounts
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if accounts.contains_key(&key) {
                return Err(IdentityError::UserExists);
            }
            let user = AuthUser {
                user_id: UserId::random(),
                email: email.trim().to_string(),
            };
            accounts.insert(
                key,
                Account {
                    user: user.clone(),
                    password: password.to_string(),
                    confirmed: !self.confirm_sign_ups,
                    metadata: metadata.clone(),
                },
            );
            user
        };

        if self.confirm_sign_ups {
            return Ok(SignUpOutcome::PendingConfirmation);
        }
        *lock(&self.current) = Some(user.clone());
        self.emit(AuthEvent::SignedIn(user.clone()));
        Ok(SignUpOutcome::SignedIn(user))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.enter().await?;
        if lock(&self.current).take().is_some() {
            self.emit(AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<AuthUser>, IdentityError> {
        self.session_reads.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        Ok(lock(&self.current).clone())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        self.enter().await?;
        if self.account(email).is_some() {
            lock(&self.reset_requests).push(normalize(email));
        }
        Ok(())
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// Profile table kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryProfiles {
    profiles: RwLock<HashMap<UserId, Profile>>,
    latency: Mutex<Duration>,
    failure: Mutex<Option<ProfileStoreError>>,
    stalled: Mutex<bool>,
    fetches: AtomicUsize,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: Profile) {
        self.profiles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(profile.user_id, profile);
    }

    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    pub fn fail_with(&self, error: Option<ProfileStoreError>) {
        *lock(&self.failure) = error;
    }

    /// Fetches never complete while stalled.
    pub fn stall(&self, stalled: bool) {
        *lock(&self.stalled) = stalled;
    }

    /// Number of `get_profile` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, ProfileStoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let stalled = *lock(&self.stalled);
        if stalled {
            std::future::pending::<()>().await;
        }
        let latency = *lock(&self.latency);
        delay(latency).await;

        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }
        Ok(self
            .profiles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&user_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_checks_password_and_persists_session() {
        let identity = InMemoryIdentity::new();
        let user = identity.add_account("Ana@Example.com", "s3cret");
        let mut events = identity.on_auth_state_change();

        assert_eq!(
            identity.sign_in("ana@example.com", "wrong").await,
            Err(IdentityError::InvalidCredentials)
        );
        assert_eq!(
            identity.sign_in("nobody@example.com", "s3cret").await,
            Err(IdentityError::InvalidCredentials)
        );

        let signed_in = identity.sign_in(" ana@example.com ", "s3cret").await.unwrap();
        assert_eq!(signed_in, user);
        assert_eq!(identity.get_session().await.unwrap(), Some(user.clone()));
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn(user));
    }

    #[tokio::test]
    async fn sign_up_with_confirmation_blocks_sign_in() {
        let identity = InMemoryIdentity::new().requiring_email_confirmation();
        let outcome = identity
            .sign_up("new@example.com", "pw", &SignUpMetadata::default())
            .await
            .unwrap();
        assert_eq!(outcome, SignUpOutcome::PendingConfirmation);
        assert_eq!(
            identity.sign_in("new@example.com", "pw").await,
            Err(IdentityError::EmailNotConfirmed)
        );
        assert_eq!(
            identity
                .sign_up("NEW@example.com", "pw", &SignUpMetadata::default())
                .await,
            Err(IdentityError::UserExists)
        );
    }

    #[tokio::test]
    async fn password_reset_only_records_known_accounts() {
        let identity = InMemoryIdentity::new();
        identity.add_account("ana@example.com", "pw");

        identity.request_password_reset("ana@example.com").await.unwrap();
        identity.request_password_reset("ghost@example.com").await.unwrap();

        assert_eq!(identity.reset_requests(), vec!["ana@example.com".to_string()]);
    }

    #[tokio::test]
    async fn injected_failure_applies_to_every_call() {
        let identity = InMemoryIdentity::new();
        identity.fail_with(Some(IdentityError::Transport("offline".to_string())));
        assert!(identity.get_session().await.unwrap_err().is_transport());
        identity.fail_with(None);
        assert_eq!(identity.get_session().await, Ok(None));
    }
}
