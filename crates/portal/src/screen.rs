//! Portal-branded login screens.
//!
//! Every portal renders the same form; only the branding and the role
//! allow-list differ. A screen resolves on first render too, so a visitor
//! who is already signed in never sees the form.

use std::sync::Arc;

use tokio::sync::watch;

use staybook_auth::{AuthEvent, AuthUser, Portal};
use staybook_session::{
    IdentityBackend, LoginError, LoginForm, NavigationQuery, ProfileState, Resolution, Resolver,
    SessionStore, SignUpMetadata, SignUpOutcome, resolve_when_ready,
};

pub struct LoginScreen {
    portal: Portal,
    form: LoginForm,
    resolver: Resolver,
    store: Arc<SessionStore>,
    profiles: watch::Receiver<ProfileState>,
}

impl core::fmt::Debug for LoginScreen {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginScreen")
            .field("portal", &self.portal)
            .field("form", &self.form)
            .finish()
    }
}

impl LoginScreen {
    pub fn new(
        portal: Portal,
        identity: Arc<dyn IdentityBackend>,
        resolver: Resolver,
        store: Arc<SessionStore>,
        profiles: watch::Receiver<ProfileState>,
    ) -> Self {
        Self {
            portal,
            form: LoginForm::new(identity),
            resolver,
            store,
            profiles,
        }
    }

    pub fn portal(&self) -> Portal {
        self.portal
    }

    pub fn title(&self) -> &'static str {
        match self.portal {
            Portal::Commercial => "Staybook",
            Portal::Manager => "Staybook for property managers",
            Portal::Lodger => "Staybook guest area",
            Portal::Superadmin => "Staybook administration",
        }
    }

    pub fn form(&self) -> &LoginForm {
        &self.form
    }

    /// First render: where an already signed-in visitor should go, or
    /// [`Resolution::SignedOut`] to show the form.
    pub async fn enter(&self, query: &NavigationQuery) -> Resolution {
        self.resolve(query).await
    }

    /// Submit the form and resolve the destination for the new session.
    pub async fn sign_in(&self, email: &str, password: &str, query: &NavigationQuery) -> Result<Resolution, LoginError> {
        let user = self.form.submit(email, password, |_| {}).await?;
        self.signed_in(user);
        Ok(self.resolve(query).await)
    }

    /// Commercial sign-up. `None` means the account waits for email
    /// confirmation and there is nowhere to go yet.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        query: &NavigationQuery,
    ) -> Result<Option<Resolution>, LoginError> {
        let metadata = SignUpMetadata {
            full_name: full_name.trim().to_string(),
            plan: query.plan.clone(),
            billing: query.billing,
        };
        let user = match self.form.register(email, password, &metadata, |_| {}).await? {
            SignUpOutcome::PendingConfirmation => return Ok(None),
            SignUpOutcome::SignedIn(user) => user,
        };

        self.signed_in(user);
        Ok(Some(self.resolve(query).await))
    }

    /// Apply the sign-in to the store without waiting for the backend's auth
    /// event; the listener may be lagging or stopped. The event replays the
    /// same snapshot when it does arrive.
    fn signed_in(&self, user: AuthUser) {
        if self.store.snapshot().user_id() != Some(user.user_id) {
            self.store.on_auth_event(AuthEvent::SignedIn(user));
        }
    }

    async fn resolve(&self, query: &NavigationQuery) -> Resolution {
        let mut sessions = self.store.subscribe();
        let mut profiles = self.profiles.clone();
        let resolution = resolve_when_ready(
            &self.resolver,
            &mut sessions,
            &mut profiles,
            query,
            self.portal.allowed_roles(),
        )
        .await;
        tracing::debug!(portal = %self.portal, ?resolution, "login screen resolved");
        resolution
    }
}
