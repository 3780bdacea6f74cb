//! Login form controller shared by all four portals.
//!
//! The controller knows nothing about where the visitor goes next: a
//! successful submit hands the user to `on_success` and the session store
//! picks up the change from the backend's auth event. Error text is generic
//! so the form never reveals whether an account exists.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use staybook_auth::AuthUser;

use crate::backend::{IdentityBackend, IdentityError, SignUpMetadata, SignUpOutcome};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("Enter your email and password.")]
    MissingCredentials,

    #[error("Enter your email address.")]
    MissingEmail,

    #[error("A request is already in progress.")]
    Busy,

    #[error("Email or password is incorrect.")]
    InvalidCredentials,

    #[error("Confirm your email address before signing in.")]
    EmailNotConfirmed,

    #[error("Too many attempts. Try again in a few minutes.")]
    RateLimited,

    #[error("We could not reach the server. Check your connection and try again.")]
    Unreachable,

    #[error("Something went wrong. Please try again.")]
    Failed,
}

impl From<IdentityError> for LoginError {
    fn from(e: IdentityError) -> Self {
        match e {
            // Sign-up conflicts are reported like bad credentials.
            IdentityError::InvalidCredentials | IdentityError::UserExists => LoginError::InvalidCredentials,
            IdentityError::EmailNotConfirmed => LoginError::EmailNotConfirmed,
            IdentityError::RateLimited => LoginError::RateLimited,
            IdentityError::Transport(_) => LoginError::Unreachable,
            IdentityError::Rejected { .. } => LoginError::Failed,
        }
    }
}

/// Password-reset sub-form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetRequestState {
    pub open: bool,
    pub email: String,
    pub busy: bool,
    pub sent: bool,
    pub error: Option<LoginError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginFormState {
    pub busy: bool,
    pub error: Option<LoginError>,
    pub reset: ResetRequestState,
}

/// The two independent requests the form can have in flight.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Slot {
    Credentials,
    Reset,
}

impl Slot {
    fn busy(self, state: &mut LoginFormState) -> &mut bool {
        match self {
            Slot::Credentials => &mut state.busy,
            Slot::Reset => &mut state.reset.busy,
        }
    }

    fn error(self, state: &mut LoginFormState) -> &mut Option<LoginError> {
        match self {
            Slot::Credentials => &mut state.error,
            Slot::Reset => &mut state.reset.error,
        }
    }
}

/// Clears a busy flag when the request finishes, however it finishes
/// (including the submitting future being dropped).
struct BusyGuard<'a> {
    state: &'a watch::Sender<LoginFormState>,
    slot: Slot,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let slot = self.slot;
        self.state.send_modify(|state| *slot.busy(state) = false);
    }
}

pub struct LoginForm {
    identity: Arc<dyn IdentityBackend>,
    state: watch::Sender<LoginFormState>,
}

impl core::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginForm").field("state", &*self.state.borrow()).finish()
    }
}

impl LoginForm {
    pub fn new(identity: Arc<dyn IdentityBackend>) -> Self {
        let (state, _) = watch::channel(LoginFormState::default());
        Self { identity, state }
    }

    pub fn state(&self) -> LoginFormState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoginFormState> {
        self.state.subscribe()
    }

    /// Sign in with email and password.
    ///
    /// Blank input fails without calling the backend. A second submit while
    /// one is running fails with [`LoginError::Busy`] and leaves the running
    /// one alone.
    pub async fn submit<F>(&self, email: &str, password: &str, on_success: F) -> Result<AuthUser, LoginError>
    where
        F: FnOnce(&AuthUser),
    {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(self.set_error(Slot::Credentials, LoginError::MissingCredentials));
        }
        let _busy = self.claim(Slot::Credentials).ok_or(LoginError::Busy)?;

        match self.identity.sign_in(email, password).await {
            Ok(user) => {
                tracing::info!(user_id = %user.user_id, "signed in");
                on_success(&user);
                Ok(user)
            }
            Err(e) => {
                tracing::debug!(error = %e, "sign-in rejected");
                Err(self.set_error(Slot::Credentials, e.into()))
            }
        }
    }

    /// Create an account from the commercial portal.
    ///
    /// An email that is already registered reports
    /// [`SignUpOutcome::PendingConfirmation`], exactly like a fresh sign-up
    /// that needs confirming.
    pub async fn register<F>(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
        on_success: F,
    ) -> Result<SignUpOutcome, LoginError>
    where
        F: FnOnce(&SignUpOutcome),
    {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(self.set_error(Slot::Credentials, LoginError::MissingCredentials));
        }
        let _busy = self.claim(Slot::Credentials).ok_or(LoginError::Busy)?;

        let outcome = match self.identity.sign_up(email, password, metadata).await {
            Ok(outcome) => outcome,
            Err(IdentityError::UserExists) => SignUpOutcome::PendingConfirmation,
            Err(e) => {
                tracing::debug!(error = %e, "sign-up rejected");
                return Err(self.set_error(Slot::Credentials, e.into()));
            }
        };

        if let SignUpOutcome::SignedIn(user) = &outcome {
            tracing::info!(user_id = %user.user_id, plan = ?metadata.plan, "registered");
        }
        on_success(&outcome);
        Ok(outcome)
    }

    /// Show the reset sub-form, prefilled with whatever the visitor typed.
    pub fn open_password_reset(&self, email: &str) {
        self.state.send_modify(|state| {
            state.reset = ResetRequestState {
                open: true,
                email: email.trim().to_string(),
                ..ResetRequestState::default()
            };
        });
    }

    pub fn close_password_reset(&self) {
        self.state.send_modify(|state| state.reset = ResetRequestState::default());
    }

    /// Ask for a reset email.
    ///
    /// Reports "sent" for every outcome except an unreachable backend, so the
    /// response is the same for registered and unknown addresses.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), LoginError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(self.set_error(Slot::Reset, LoginError::MissingEmail));
        }
        let _busy = self.claim(Slot::Reset).ok_or(LoginError::Busy)?;

        match self.identity.request_password_reset(email).await {
            Err(e) if e.is_transport() => {
                tracing::warn!(error = %e, "password reset request failed");
                Err(self.set_error(Slot::Reset, LoginError::Unreachable))
            }
            result => {
                if let Err(e) = result {
                    tracing::debug!(error = %e, "password reset rejected; reporting sent");
                }
                self.state.send_modify(|state| {
                    state.reset.email = email.to_string();
                    state.reset.sent = true;
                    state.reset.error = None;
                });
                Ok(())
            }
        }
    }

    /// Atomically flip `slot` from idle to busy and clear its last error;
    /// `None` if it already was busy.
    fn claim(&self, slot: Slot) -> Option<BusyGuard<'_>> {
        let claimed = self.state.send_if_modified(|state| {
            if *slot.busy(state) {
                return false;
            }
            *slot.busy(state) = true;
            *slot.error(state) = None;
            true
        });
        claimed.then(|| BusyGuard {
            state: &self.state,
            slot,
        })
    }

    fn set_error(&self, slot: Slot, error: LoginError) -> LoginError {
        self.state.send_modify(|state| *slot.error(state) = Some(error.clone()));
        error
    }
}
