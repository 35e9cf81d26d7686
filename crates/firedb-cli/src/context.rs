//! Per-invocation application context backed by the file storage.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::debug;

use firedb_core::{Environment, EnvironmentSettings, ScopedStorage};
use firedb_rest::{AppOptions, FirebaseApp, IdentityEndpoints, PersistedProviderSession};

use crate::cli::GlobalArgs;
use crate::storage::FileStorage;

/// Alternative to `--auth-emulator`.
const ENV_AUTH_EMULATOR: &str = "FIREDB_AUTH_EMULATOR";

const PROVIDER_SESSION_PREFIX: &str = "FirebaseProviderSession";

/// The Firebase app plus the storage its state is persisted in.
pub struct AppContext {
    app: FirebaseApp,
    storage: Arc<FileStorage>,
    session_key: String,
}

fn settings(global: &GlobalArgs) -> Result<EnvironmentSettings> {
    let mut settings = EnvironmentSettings::from_env().context("Invalid FIREDB_* environment")?;

    if let Some(name) = &global.env {
        let environment: Environment = name.parse().context("Invalid --env")?;
        settings = settings.with_environment(environment);
    }
    if let Some(path) = &global.settings {
        settings = settings.with_file(path);
    }

    Ok(settings)
}

fn identity_endpoints(global: &GlobalArgs) -> Result<IdentityEndpoints> {
    let emulator = global
        .auth_emulator
        .clone()
        .or_else(|| std::env::var(ENV_AUTH_EMULATOR).ok());

    match emulator {
        Some(base) => Ok(IdentityEndpoints::emulator(&base)?),
        None => Ok(IdentityEndpoints::default()),
    }
}

impl AppContext {
    pub fn open(global: &GlobalArgs) -> Result<Self> {
        let settings = settings(global)?;
        let storage = Arc::new(FileStorage::open_default()?);
        let options = AppOptions {
            identity_endpoints: identity_endpoints(global)?,
            ..AppOptions::default()
        };

        let app = FirebaseApp::initialize_with(&settings, storage.clone(), options).context(
            "Failed to load Firebase settings. Pass --settings <file> or set FIREDB_API_KEY and FIREDB_DATABASE_URL.",
        )?;
        let session_key = format!("{}-{}", PROVIDER_SESSION_PREFIX, app.settings().api_key);

        Ok(Self {
            app,
            storage,
            session_key,
        })
    }

    pub fn app(&self) -> &FirebaseApp {
        &self.app
    }

    /// Hand a persisted user back to the identity provider.
    ///
    /// The session manager is not told; the stored credential token keeps
    /// being used until the database reports it expired.
    pub fn restore_provider(&self) -> Result<bool> {
        let Some(json) = self.storage.get_item(&self.session_key)? else {
            return Ok(false);
        };
        let record: PersistedProviderSession =
            serde_json::from_str(&json).context("Invalid stored session")?;

        debug!(uid = %record.uid, "Restored persisted provider session");
        self.app.identity().restore(record);
        Ok(true)
    }

    /// Restore the persisted user and let the session manager pick it up,
    /// minting a fresh credential token.
    pub async fn resume_session(&self) -> Result<bool> {
        if !self.restore_provider()? {
            return Ok(false);
        }
        self.app.sessions().process_user_state_changes().await;
        Ok(true)
    }

    /// Write the provider's current user back to storage, or forget it.
    pub fn persist(&self) -> Result<()> {
        match self.app.identity().session_record() {
            Some(record) => {
                let json = serde_json::to_string(&record)?;
                self.storage
                    .set_item(&self.session_key, &json)
                    .context("Failed to save session")?;
            }
            None => self
                .storage
                .remove_item(&self.session_key)
                .context("Failed to remove session")?,
        }
        Ok(())
    }
}
