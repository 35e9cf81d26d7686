//! Connection settings and the providers that supply them.
//!
//! A [`SettingsProvider`] must be able to produce settings before any
//! session or database operation is attempted. [`EnvironmentSettings`]
//! resolves them per deployment environment from a JSON file and
//! environment-variable overrides.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ConfigError;
use crate::types::{ApiKey, DatabaseUrl};
use crate::Result;

/// Selects the deployment environment: `development` or `live`.
pub const ENV_ENVIRONMENT: &str = "FIREDB_ENV";
/// Path of the JSON settings file.
pub const ENV_SETTINGS_FILE: &str = "FIREDB_SETTINGS";
/// Overrides `apiKey`.
pub const ENV_API_KEY: &str = "FIREDB_API_KEY";
/// Overrides `databaseURL`.
pub const ENV_DATABASE_URL: &str = "FIREDB_DATABASE_URL";

/// Firebase project connection settings, as emitted by the Firebase console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseSettings {
    /// Web API key; also scopes local credential storage.
    pub api_key: ApiKey,

    /// Realtime Database base URL.
    #[serde(rename = "databaseURL")]
    pub database_url: DatabaseUrl,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
}

impl FirebaseSettings {
    /// Create settings with only the required fields.
    pub fn new(api_key: ApiKey, database_url: DatabaseUrl) -> Self {
        Self {
            api_key,
            database_url,
            auth_domain: None,
            project_id: None,
            storage_bucket: None,
            messaging_sender_id: None,
        }
    }
}

/// A source of connection settings.
pub trait SettingsProvider: Send + Sync {
    /// Resolve the current settings.
    fn settings(&self) -> Result<FirebaseSettings>;
}

/// Settings fixed at construction.
#[derive(Debug, Clone)]
pub struct StaticSettings(FirebaseSettings);

impl StaticSettings {
    pub fn new(settings: FirebaseSettings) -> Self {
        Self(settings)
    }
}

impl SettingsProvider for StaticSettings {
    fn settings(&self) -> Result<FirebaseSettings> {
        Ok(self.0.clone())
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Live,
}

impl Environment {
    /// Name used as the section key in settings files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Live => "live",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "live" | "production" | "prod" => Ok(Environment::Live),
            _ => Err(ConfigError::UnknownEnvironment {
                name: s.to_string(),
            }),
        }
    }
}

/// Settings resolved per environment from a JSON file plus overrides.
///
/// The file holds either a single settings object or one settings object per
/// environment:
///
/// ```json
/// {
///   "development": { "apiKey": "dev-key", "databaseURL": "https://dev.firebaseio.com" },
///   "live": { "apiKey": "live-key", "databaseURL": "https://live.firebaseio.com" }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSettings {
    environment: Environment,
    file: Option<PathBuf>,
    api_key: Option<String>,
    database_url: Option<String>,
}

impl EnvironmentSettings {
    /// Create an empty provider for the given environment.
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    /// Build a provider from the `FIREDB_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let environment = match std::env::var(ENV_ENVIRONMENT) {
            Ok(name) => name.parse()?,
            Err(_) => Environment::default(),
        };

        Ok(Self {
            environment,
            file: std::env::var_os(ENV_SETTINGS_FILE).map(PathBuf::from),
            api_key: std::env::var(ENV_API_KEY).ok(),
            database_url: std::env::var(ENV_DATABASE_URL).ok(),
        })
    }

    /// Read settings from the given JSON file.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Select the deployment environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Override the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the database URL.
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = Some(database_url.into());
        self
    }

    /// Returns the selected environment.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    fn load_file(&self, path: &Path) -> Result<Map<String, Value>> {
        let source_name = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Source {
            source_name: source_name.clone(),
            message: e.to_string(),
        })?;

        let value: Value = serde_json::from_str(&contents).map_err(|e| ConfigError::Source {
            source_name,
            message: e.to_string(),
        })?;

        let Value::Object(mut root) = value else {
            return Err(ConfigError::Parse {
                message: "settings file must contain a JSON object".to_string(),
            }
            .into());
        };

        match root.remove(self.environment.as_str()) {
            Some(Value::Object(section)) => Ok(section),
            Some(_) => Err(ConfigError::Parse {
                message: format!("'{}' section must be an object", self.environment),
            }
            .into()),
            None => Ok(root),
        }
    }
}

impl SettingsProvider for EnvironmentSettings {
    fn settings(&self) -> Result<FirebaseSettings> {
        if self.file.is_none() && self.api_key.is_none() && self.database_url.is_none() {
            return Err(ConfigError::Missing.into());
        }

        let mut fields = match &self.file {
            Some(path) => self.load_file(path)?,
            None => Map::new(),
        };

        if let Some(api_key) = &self.api_key {
            fields.insert("apiKey".to_string(), Value::String(api_key.clone()));
        }
        if let Some(database_url) = &self.database_url {
            fields.insert(
                "databaseURL".to_string(),
                Value::String(database_url.clone()),
            );
        }

        let settings: FirebaseSettings =
            serde_json::from_value(Value::Object(fields)).map_err(|e| ConfigError::Parse {
                message: e.to_string(),
            })?;

        debug!(environment = %self.environment, database = %settings.database_url, "Resolved settings");
        Ok(settings)
    }
}
