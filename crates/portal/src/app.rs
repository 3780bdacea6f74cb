//! Application state shared by every screen of the process.

use std::sync::Arc;

use tokio::task::JoinHandle;

use staybook_auth::{Portal, Session};
use staybook_session::memory::{InMemoryIdentity, InMemoryProfiles};
use staybook_session::{
    IdentityBackend, ProfileLoader, ProfileState, ProfileStore, Resolver, SessionStore, resolution,
};

use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::routes::{RouteTable, Visit};
use crate::screen::LoginScreen;
use crate::seed::SeedFile;

/// One session store, one profile loader, one auth listener.
pub struct PortalApp {
    config: PortalConfig,
    identity: Arc<dyn IdentityBackend>,
    store: Arc<SessionStore>,
    loader: ProfileLoader,
    resolver: Resolver,
    routes: RouteTable,
    listener: Option<JoinHandle<()>>,
    binding: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for PortalApp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PortalApp")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("loader", &self.loader)
            .finish()
    }
}

impl PortalApp {
    /// Wire the stores and restore any persisted session.
    ///
    /// The auth listener is running before the restore starts, so an event
    /// that races the restore is never lost.
    pub async fn start(
        config: PortalConfig,
        identity: Arc<dyn IdentityBackend>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let store = Arc::new(SessionStore::new(Arc::clone(&identity)));
        let loader = ProfileLoader::new(profiles, config.session.profile_timeout());
        let listener = store.spawn_listener();
        let binding = loader.bind(store.subscribe());

        let session = store.initialize().await;
        tracing::info!(
            authenticated = session.is_authenticated(),
            profile_timeout_ms = config.session.profile_timeout_ms,
            "portal started"
        );

        Self {
            resolver: Resolver::new(config.session.contract_path.clone()),
            routes: RouteTable::standard(&config.session.contract_path),
            config,
            identity,
            store,
            loader,
            listener: Some(listener),
            binding: Some(binding),
        }
    }

    /// Start against in-memory backends seeded from the configured fixture,
    /// or the built-in demo accounts.
    pub async fn in_memory(config: PortalConfig) -> Result<Self, PortalError> {
        let seed = match &config.seed_file {
            Some(path) => SeedFile::load(path)?,
            None => SeedFile::demo(),
        };
        let identity = Arc::new(InMemoryIdentity::new());
        let profiles = Arc::new(InMemoryProfiles::new());
        seed.apply(&identity, &profiles);

        Ok(Self::start(config, identity, profiles).await)
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn session(&self) -> Session {
        self.store.snapshot()
    }

    pub fn profile(&self) -> ProfileState {
        self.loader.state()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn loader(&self) -> &ProfileLoader {
        &self.loader
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn login_screen(&self, portal: Portal) -> LoginScreen {
        LoginScreen::new(
            portal,
            Arc::clone(&self.identity),
            self.resolver.clone(),
            Arc::clone(&self.store),
            self.loader.subscribe(),
        )
    }

    /// Open `location` and wait until its guards settle.
    pub async fn visit(&self, location: &str) -> Visit {
        let Some(route) = self.routes.lookup(location) else {
            tracing::debug!(location, "no route");
            return Visit::NotFound;
        };
        let outcome = resolution::settle_guards(
            &route.guards,
            &mut self.store.subscribe(),
            &mut self.loader.subscribe(),
            location,
        )
        .await;
        tracing::debug!(location, route = %route.path, ?outcome, "visited");
        Visit::Page(outcome)
    }

    pub async fn sign_out(&self) {
        self.store.sign_out().await;
    }

    /// Stop the background tasks and wait for the listener to finish.
    pub async fn shutdown(mut self) {
        self.store.shutdown();
        if let Some(listener) = self.listener.take() {
            if let Err(e) = listener.await {
                tracing::warn!(error = %e, "auth listener ended abnormally");
            }
        }
        if let Some(binding) = self.binding.take() {
            binding.abort();
        }
        self.loader.reset();
        tracing::info!("portal stopped");
    }
}

impl Drop for PortalApp {
    fn drop(&mut self) {
        for task in [self.listener.take(), self.binding.take()].into_iter().flatten() {
            task.abort();
        }
    }
}
