use std::sync::Arc;
use std::time::Duration;

use staybook_auth::{AccountStatus, OnboardingStatus, Portal, Profile, Role};
use staybook_core::TenantId;
use staybook_portal::{PortalApp, PortalConfig, Visit};
use staybook_session::memory::{InMemoryIdentity, InMemoryProfiles};
use staybook_session::{
    Destination, GuardOutcome, LoginError, NavigationQuery, Resolution, SessionConfig, Terminal,
};

const PROFILE_TIMEOUT: Duration = Duration::from_secs(8);

struct TestPortal {
    identity: Arc<InMemoryIdentity>,
    profiles: Arc<InMemoryProfiles>,
    app: PortalApp,
}

impl TestPortal {
    async fn start() -> Self {
        Self::start_with(Arc::new(InMemoryIdentity::new())).await
    }

    async fn start_with(identity: Arc<InMemoryIdentity>) -> Self {
        let profiles = Arc::new(InMemoryProfiles::new());
        let config = PortalConfig {
            session: SessionConfig::default().with_profile_timeout(PROFILE_TIMEOUT),
            seed_file: None,
        };
        let app = PortalApp::start(config, identity.clone(), profiles.clone()).await;
        Self {
            identity,
            profiles,
            app,
        }
    }

    fn account(&self, email: &str, role: Option<Role>, tenant: Option<TenantId>, status: OnboardingStatus) {
        let user = self.identity.add_account(email, "pw");
        self.profiles.insert(Profile {
            user_id: user.user_id,
            role,
            tenant_id: tenant,
            onboarding_status: status,
            account_status: AccountStatus::Active,
            full_name: String::new(),
            email: email.to_string(),
        });
    }

    async fn sign_in(&self, portal: Portal, email: &str, query: &str) -> Resolution {
        self.app
            .login_screen(portal)
            .sign_in(email, "pw", &NavigationQuery::parse(query))
            .await
            .expect("sign-in should succeed")
    }
}

fn navigate(path: &str) -> Resolution {
    Resolution::Ready(Destination::navigate(path))
}

#[tokio::test]
async fn manager_lands_on_dashboard() {
    let portal = TestPortal::start().await;
    portal.account("admin@example.com", Some(Role::Admin), Some(TenantId::random()), OnboardingStatus::Active);

    let resolution = portal.sign_in(Portal::Manager, "admin@example.com", "").await;
    assert_eq!(resolution, navigate("/manager/dashboard"));
    assert_eq!(portal.app.visit("/manager/dashboard").await, Visit::Page(GuardOutcome::Render));
}

#[tokio::test]
async fn plan_selected_before_login_goes_to_contract() {
    let portal = TestPortal::start().await;
    portal.account("admin@example.com", Some(Role::Admin), None, OnboardingStatus::PendingPlan);

    let resolution = portal
        .sign_in(Portal::Commercial, "admin@example.com", "plan=pro&billing=annual")
        .await;
    assert_eq!(resolution, navigate("/plans/contract?plan=pro&billing=annual"));
}

#[tokio::test]
async fn manager_without_tenant_goes_to_plans_and_sees_no_tenant_screen() {
    let portal = TestPortal::start().await;
    portal.account("new@example.com", Some(Role::Agent), None, OnboardingStatus::PendingPlan);

    let resolution = portal.sign_in(Portal::Manager, "new@example.com", "").await;
    assert_eq!(resolution, navigate("/plans"));
    assert_eq!(
        portal.app.visit("/manager/dashboard").await,
        Visit::Page(GuardOutcome::Terminal(Terminal::NoTenant))
    );
}

#[tokio::test]
async fn lodger_on_manager_login_is_pointed_to_lodger_portal() {
    let portal = TestPortal::start().await;
    portal.account("lodger@example.com", Some(Role::Lodger), Some(TenantId::random()), OnboardingStatus::Active);

    let resolution = portal.sign_in(Portal::Manager, "lodger@example.com", "").await;
    assert_eq!(
        resolution,
        Resolution::Ready(Destination::RenderTerminal(Terminal::WrongPortal {
            portal: Portal::Lodger
        }))
    );
    assert_eq!(
        portal.app.visit("/manager/bookings").await,
        Visit::Page(GuardOutcome::Redirect("/lodger/login".to_string()))
    );
}

#[tokio::test]
async fn superadmin_goes_home_from_any_portal() {
    let portal = TestPortal::start().await;
    portal.account("root@example.com", Some(Role::Superadmin), None, OnboardingStatus::Active);

    let resolution = portal.sign_in(Portal::Lodger, "root@example.com", "").await;
    assert_eq!(resolution, navigate("/superadmin/dashboard"));
}

#[tokio::test]
async fn deep_link_survives_login_round_trip() {
    let portal = TestPortal::start().await;
    portal.account("lodger@example.com", Some(Role::Lodger), Some(TenantId::random()), OnboardingStatus::Active);

    let Visit::Page(GuardOutcome::Redirect(login)) = portal.app.visit("/lodger/consumo?month=3").await else {
        panic!("anonymous visit should redirect");
    };
    let (path, query) = login.split_once('?').expect("redirect carries returnUrl");
    assert_eq!(path, "/lodger/login");

    let resolution = portal.sign_in(Portal::Lodger, "lodger@example.com", query).await;
    assert_eq!(resolution, navigate("/lodger/consumo?month=3"));
}

#[tokio::test]
async fn off_site_return_url_is_ignored() {
    let portal = TestPortal::start().await;
    portal.account("admin@example.com", Some(Role::Admin), Some(TenantId::random()), OnboardingStatus::Active);

    let resolution = portal
        .sign_in(Portal::Manager, "admin@example.com", "returnUrl=https%3A%2F%2Fevil.example")
        .await;
    assert_eq!(resolution, navigate("/manager/dashboard"));
}

#[tokio::test(start_paused = true)]
async fn stalled_profile_degrades_to_plans_but_guards_keep_waiting() {
    let portal = TestPortal::start().await;
    portal.account("admin@example.com", Some(Role::Admin), Some(TenantId::random()), OnboardingStatus::Active);
    portal.profiles.stall(true);

    let resolution = portal.sign_in(Portal::Manager, "admin@example.com", "").await;
    assert_eq!(resolution, navigate("/plans"));
    assert!(portal.app.profile().timed_out);

    let check = portal
        .app
        .routes()
        .check(&portal.app.session(), &portal.app.profile(), "/manager/dashboard");
    assert_eq!(check, Visit::Page(GuardOutcome::Loading));
}

#[tokio::test]
async fn missing_profile_is_a_hard_error_for_guards() {
    let portal = TestPortal::start().await;
    portal.identity.add_account("orphan@example.com", "pw");

    let resolution = portal.sign_in(Portal::Manager, "orphan@example.com", "").await;
    assert_eq!(resolution, navigate("/plans"));
    assert_eq!(
        portal.app.visit("/manager/dashboard").await,
        Visit::Page(GuardOutcome::ProfileUnavailable)
    );
}

#[tokio::test]
async fn persisted_session_resolves_on_first_render() {
    let identity = Arc::new(InMemoryIdentity::new());
    let user = identity.add_account("lodger@example.com", "pw");
    identity.persist_session(Some(user.clone()));
    let portal = TestPortal::start_with(identity).await;
    portal.profiles.insert(Profile {
        user_id: user.user_id,
        role: Some(Role::Lodger),
        tenant_id: Some(TenantId::random()),
        onboarding_status: OnboardingStatus::Active,
        account_status: AccountStatus::Active,
        full_name: String::new(),
        email: user.email.clone(),
    });
    portal.app.loader().refresh();

    let screen = portal.app.login_screen(Portal::Lodger);
    assert_eq!(screen.enter(&NavigationQuery::default()).await, navigate("/lodger/dashboard"));
}

#[tokio::test]
async fn sign_out_returns_everyone_to_login() {
    let portal = TestPortal::start().await;
    portal.account("admin@example.com", Some(Role::Admin), Some(TenantId::random()), OnboardingStatus::Active);
    portal.sign_in(Portal::Manager, "admin@example.com", "").await;

    portal.app.sign_out().await;
    assert!(!portal.app.session().is_authenticated());
    assert_eq!(
        portal.app.visit("/manager/dashboard").await,
        Visit::Page(GuardOutcome::Redirect(
            "/manager/login?returnUrl=%2Fmanager%2Fdashboard".to_string()
        ))
    );
    let screen = portal.app.login_screen(Portal::Manager);
    assert_eq!(screen.enter(&NavigationQuery::default()).await, Resolution::SignedOut);
}

#[tokio::test]
async fn wrong_password_is_reported_generically() {
    let portal = TestPortal::start().await;
    portal.account("admin@example.com", Some(Role::Admin), None, OnboardingStatus::Active);

    let err = portal
        .app
        .login_screen(Portal::Manager)
        .sign_in("admin@example.com", "nope", &NavigationQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err, LoginError::InvalidCredentials);
}

#[tokio::test]
async fn commercial_sign_up_carries_plan_into_contract() {
    let portal = TestPortal::start().await;
    let screen = portal.app.login_screen(Portal::Commercial);
    let query = NavigationQuery::parse("plan=basic&billing=monthly");

    let resolution = screen
        .register("new@example.com", "pw", "Nora", &query)
        .await
        .unwrap();
    assert_eq!(resolution, Some(navigate("/plans/contract?plan=basic&billing=monthly")));
    let metadata = portal.identity.sign_up_metadata("new@example.com").unwrap();
    assert_eq!(metadata.plan.as_deref(), Some("basic"));

    portal.app.shutdown().await;
}

#[tokio::test]
async fn sign_in_completes_without_the_auth_listener() {
    let portal = TestPortal::start().await;
    portal.account("admin@example.com", Some(Role::Admin), Some(TenantId::random()), OnboardingStatus::Active);

    portal.app.store().shutdown();
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    let resolution = tokio::time::timeout(
        Duration::from_secs(5),
        portal.sign_in(Portal::Manager, "admin@example.com", ""),
    )
    .await
    .expect("sign-in must not wait on the stopped listener");
    assert_eq!(resolution, navigate("/manager/dashboard"));
    assert!(portal.app.session().is_authenticated());
}
