//! Wiring of settings, storage and the REST backends into one application
//! context.

use std::sync::Arc;

use tracing::info;

use firedb_core::{
    CredentialStore, DatabaseClient, FirebaseSettings, RefreshMode, Result, ScopedStorage,
    SessionManager, SettingsProvider,
};

use crate::identity::{IdentityEndpoints, RestIdentityProvider};
use crate::transport::RestTransport;

/// Options for [`FirebaseApp::initialize_with`].
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub refresh_mode: RefreshMode,
    pub identity_endpoints: IdentityEndpoints,
}

/// One Firebase project: its settings, the session manager and a database
/// client sharing the same credential store.
#[derive(Debug, Clone)]
pub struct FirebaseApp {
    settings: FirebaseSettings,
    identity: Arc<RestIdentityProvider>,
    sessions: SessionManager,
    database: DatabaseClient,
}

impl FirebaseApp {
    pub fn initialize(settings: &dyn SettingsProvider, storage: Arc<dyn ScopedStorage>) -> Result<Self> {
        Self::initialize_with(settings, storage, AppOptions::default())
    }

    pub fn initialize_with(
        settings_provider: &dyn SettingsProvider,
        storage: Arc<dyn ScopedStorage>,
        options: AppOptions,
    ) -> Result<Self> {
        let settings = settings_provider.settings()?;

        let identity = Arc::new(RestIdentityProvider::with_endpoints(
            settings.api_key.clone(),
            options.identity_endpoints,
        )?);
        let sessions = SessionManager::with_refresh_mode(
            identity.clone(),
            CredentialStore::new(storage.clone(), &settings.api_key),
            options.refresh_mode,
        );
        let database = DatabaseClient::new(
            settings_provider,
            storage,
            Arc::new(sessions.clone()),
            Arc::new(RestTransport::new()?),
        );

        info!(database = %settings.database_url, "Firebase app initialized");
        Ok(Self {
            settings,
            identity,
            sessions,
            database,
        })
    }

    pub fn settings(&self) -> &FirebaseSettings {
        &self.settings
    }

    pub fn identity(&self) -> &Arc<RestIdentityProvider> {
        &self.identity
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn database(&self) -> &DatabaseClient {
        &self.database
    }
}
