//! Identity session snapshot and the events that replace it.

use serde::{Deserialize, Serialize};

use staybook_core::UserId;

/// The signed-in identity as reported by the identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: String,
}

/// Who is logged in, if anyone.
///
/// `loading` is true only before the first restore attempt settles. Values
/// are replaced wholesale by the session store; nobody patches fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<AuthUser>,
    pub loading: bool,
}

impl Session {
    /// Initial snapshot, before any restore attempt settled.
    pub fn loading() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: None,
            loading: false,
        }
    }

    pub fn signed_in(user: AuthUser) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_settled(&self) -> bool {
        !self.loading
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.user_id)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::loading()
    }
}

/// Notification from the identity backend's auth-state subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "user", rename_all = "snake_case")]
pub enum AuthEvent {
    InitialSession(Option<AuthUser>),
    SignedIn(AuthUser),
    SignedOut,
    TokenRefreshed(AuthUser),
    UserUpdated(AuthUser),
}

impl AuthEvent {
    /// The settled snapshot this event stands for.
    pub fn into_session(self) -> Session {
        match self {
            AuthEvent::InitialSession(None) | AuthEvent::SignedOut => Session::signed_out(),
            AuthEvent::InitialSession(Some(user))
            | AuthEvent::SignedIn(user)
            | AuthEvent::TokenRefreshed(user)
            | AuthEvent::UserUpdated(user) => Session::signed_in(user),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::InitialSession(_) => "initial_session",
            AuthEvent::SignedIn(_) => "signed_in",
            AuthEvent::SignedOut => "signed_out",
            AuthEvent::TokenRefreshed(_) => "token_refreshed",
            AuthEvent::UserUpdated(_) => "user_updated",
        }
    }
}
