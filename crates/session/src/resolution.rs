//! Live resolution: re-run the pure resolver (or a guard) on every store
//! change until it produces something other than "keep waiting".
//!
//! Both functions are plain futures over watch receivers. Dropping the
//! future (the screen went away) cancels the wait; nothing is left running.

use tokio::sync::watch;

use staybook_auth::{Role, Session};

use crate::guards::{GuardInput, GuardOutcome, GuardStack, RouteGuard};
use crate::navigation::NavigationQuery;
use crate::profile_loader::ProfileState;
use crate::resolver::{Resolution, ResolutionContext, Resolver};

/// Evaluate `decide` over the latest snapshots until it returns `Some`.
///
/// If either store is dropped the last snapshots are evaluated once more
/// and `fallback` is used if that is still undecided.
async fn watch_until<T>(
    sessions: &mut watch::Receiver<Session>,
    profiles: &mut watch::Receiver<ProfileState>,
    mut decide: impl FnMut(&Session, &ProfileState) -> Option<T>,
    fallback: impl FnOnce(&Session, &ProfileState) -> T,
) -> T {
    loop {
        let session = sessions.borrow_and_update().clone();
        let profile = profiles.borrow_and_update().clone();
        if let Some(decided) = decide(&session, &profile) {
            return decided;
        }

        let open = tokio::select! {
            changed = sessions.changed() => changed.is_ok(),
            changed = profiles.changed() => changed.is_ok(),
        };
        if !open {
            let session = sessions.borrow().clone();
            let profile = profiles.borrow().clone();
            return decide(&session, &profile).unwrap_or_else(|| fallback(&session, &profile));
        }
    }
}

/// Wait until the resolver has a destination (or the visitor is signed out).
pub async fn resolve_when_ready(
    resolver: &Resolver,
    sessions: &mut watch::Receiver<Session>,
    profiles: &mut watch::Receiver<ProfileState>,
    query: &NavigationQuery,
    allowed_roles: &[Role],
) -> Resolution {
    let context = |session: &Session, profile: &ProfileState| {
        ResolutionContext::from_sources(session.clone(), profile, query.clone(), allowed_roles.to_vec())
    };

    watch_until(
        sessions,
        profiles,
        |session, profile| {
            let ctx = context(session, profile);
            let resolution = resolver.resolve(&ctx);
            tracing::debug!(state = ?ctx.state(), ?resolution, "resolver evaluated");
            (!resolution.is_waiting()).then_some(resolution)
        },
        |session, profile| resolver.resolve(&context(session, profile)),
    )
    .await
}

/// Wait until `guards` stop reporting [`GuardOutcome::Loading`] for `location`.
pub async fn settle_guards(
    guards: &GuardStack,
    sessions: &mut watch::Receiver<Session>,
    profiles: &mut watch::Receiver<ProfileState>,
    location: &str,
) -> GuardOutcome {
    let check = |session: &Session, profile: &ProfileState| {
        guards.check(&GuardInput::new(session, profile, location))
    };

    watch_until(
        sessions,
        profiles,
        |session, profile| {
            let outcome = check(session, profile);
            (!outcome.is_pending()).then_some(outcome)
        },
        check,
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use staybook_auth::{AccountStatus, AuthEvent, OnboardingStatus, Portal, Profile};
    use staybook_core::TenantId;

    use super::*;
    use crate::memory::{InMemoryIdentity, InMemoryProfiles};
    use crate::profile_loader::ProfileLoader;
    use crate::resolver::{Destination, Terminal};
    use crate::store::SessionStore;

    const TIMEOUT: Duration = Duration::from_secs(8);

    struct Harness {
        identity: Arc<InMemoryIdentity>,
        profiles: Arc<InMemoryProfiles>,
        store: Arc<SessionStore>,
        loader: ProfileLoader,
    }

    impl Harness {
        fn new() -> Self {
            let identity = Arc::new(InMemoryIdentity::new());
            let profiles = Arc::new(InMemoryProfiles::new());
            let store = Arc::new(SessionStore::new(identity.clone()));
            let loader = ProfileLoader::new(profiles.clone(), TIMEOUT);
            loader.bind(store.subscribe());
            Self {
                identity,
                profiles,
                store,
                loader,
            }
        }

        fn account(&self, email: &str, role: Option<Role>, tenant: bool) -> staybook_auth::AuthUser {
            let user = self.identity.add_account(email, "pw");
            self.profiles.insert(Profile {
                user_id: user.user_id,
                role,
                tenant_id: tenant.then(TenantId::random),
                onboarding_status: OnboardingStatus::Active,
                account_status: AccountStatus::Active,
                full_name: String::new(),
                email: email.to_string(),
            });
            user
        }

        async fn resolve(&self, portal: Portal, query: &NavigationQuery) -> Resolution {
            resolve_when_ready(
                &Resolver::default(),
                &mut self.store.subscribe(),
                &mut self.loader.subscribe(),
                query,
                portal.allowed_roles(),
            )
            .await
        }
    }

    #[tokio::test]
    async fn manager_with_active_tenant_lands_on_dashboard() {
        let h = Harness::new();
        let user = h.account("admin@example.com", Some(Role::Admin), true);
        h.store.on_auth_event(AuthEvent::SignedIn(user));

        let resolution = h.resolve(Portal::Manager, &NavigationQuery::default()).await;
        assert_eq!(resolution, Resolution::Ready(Destination::navigate("/manager/dashboard")));
    }

    #[tokio::test]
    async fn return_url_wins_after_profile_arrives() {
        let h = Harness::new();
        let user = h.account("lodger@example.com", Some(Role::Lodger), true);
        h.store.on_auth_event(AuthEvent::SignedIn(user));

        let query = NavigationQuery::parse("returnUrl=%2Flodger%2Fconsumo");
        let resolution = h.resolve(Portal::Lodger, &query).await;
        assert_eq!(resolution, Resolution::Ready(Destination::navigate("/lodger/consumo")));
    }

    #[tokio::test]
    async fn lodger_on_manager_portal_gets_wrong_portal() {
        let h = Harness::new();
        let user = h.account("lodger@example.com", Some(Role::Lodger), true);
        h.store.on_auth_event(AuthEvent::SignedIn(user));

        let resolution = h.resolve(Portal::Manager, &NavigationQuery::default()).await;
        assert_eq!(
            resolution,
            Resolution::Ready(Destination::RenderTerminal(Terminal::WrongPortal {
                portal: Portal::Lodger
            }))
        );
    }

    #[tokio::test]
    async fn signed_out_visitor_resolves_to_signed_out() {
        let h = Harness::new();
        h.store.initialize().await;
        let resolution = h.resolve(Portal::Commercial, &NavigationQuery::default()).await;
        assert_eq!(resolution, Resolution::SignedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_profile_falls_back_to_plans_after_timeout() {
        let h = Harness::new();
        let user = h.account("admin@example.com", Some(Role::Admin), true);
        h.profiles.stall(true);
        h.store.on_auth_event(AuthEvent::SignedIn(user));

        let pending = tokio::spawn({
            let mut sessions = h.store.subscribe();
            let mut profiles = h.loader.subscribe();
            async move {
                resolve_when_ready(
                    &Resolver::default(),
                    &mut sessions,
                    &mut profiles,
                    &NavigationQuery::default(),
                    Portal::Manager.allowed_roles(),
                )
                .await
            }
        });

        tokio::time::sleep(TIMEOUT - Duration::from_millis(1)).await;
        assert!(!pending.is_finished());

        let resolution = pending.await.unwrap();
        assert_eq!(resolution, Resolution::Ready(Destination::navigate("/plans")));
    }

    #[tokio::test]
    async fn guards_settle_to_redirect_for_anonymous_visitor() {
        let h = Harness::new();
        h.store.initialize().await;

        let outcome = settle_guards(
            &GuardStack::for_portal(Portal::Manager),
            &mut h.store.subscribe(),
            &mut h.loader.subscribe(),
            "/manager/rooms",
        )
        .await;
        assert_eq!(
            outcome,
            GuardOutcome::Redirect("/manager/login?returnUrl=%2Fmanager%2Frooms".to_string())
        );
    }

    #[tokio::test]
    async fn guards_render_once_profile_loads() {
        let h = Harness::new();
        let user = h.account("viewer@example.com", Some(Role::Viewer), true);
        h.store.on_auth_event(AuthEvent::SignedIn(user));

        let outcome = settle_guards(
            &GuardStack::for_portal(Portal::Manager),
            &mut h.store.subscribe(),
            &mut h.loader.subscribe(),
            "/manager/dashboard",
        )
        .await;
        assert_eq!(outcome, GuardOutcome::Render);
    }

    #[tokio::test]
    async fn dropped_stores_stop_the_wait() {
        let (session_tx, mut sessions) = watch::channel(Session::loading());
        let (profile_tx, mut profiles) = watch::channel(ProfileState::default());
        drop(session_tx);
        drop(profile_tx);

        let resolution = resolve_when_ready(
            &Resolver::default(),
            &mut sessions,
            &mut profiles,
            &NavigationQuery::default(),
            Portal::Manager.allowed_roles(),
        )
        .await;
        assert!(resolution.is_waiting());
    }
}
