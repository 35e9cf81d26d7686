//! Token-aware database client.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::Result;
use crate::config::SettingsProvider;
use crate::error::{Error, InitializationError, InvalidInputError, TokenRefreshError};
use crate::storage::{CredentialStore, ScopedStorage};
use crate::tokens::IdToken;
use crate::traits::{TokenRefresher, Transport};
use crate::types::{DatabaseUrl, DbPath};

use super::request::{GetOptions, PendingRequest, RequestLifecycle, RequestState};

/// Client for the Realtime Database that survives token expiry.
///
/// Every operation sends with the token currently in the credential store.
/// When the store answers with the expiry signal, the client asks the
/// [`TokenRefresher`] for a new token, re-reads it and resends the same
/// request once. A second failure is final.
///
/// A client whose collaborators were unavailable at construction stays in a
/// failed state: every operation returns
/// [`Error::Initialization`](crate::Error::Initialization) without any I/O.
///
/// Clients are cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct DatabaseClient {
    inner: Arc<std::result::Result<Ready, InitializationError>>,
}

struct Ready {
    database: DatabaseUrl,
    credentials: CredentialStore,
    refresher: Arc<dyn TokenRefresher>,
    transport: Arc<dyn Transport>,
}

impl DatabaseClient {
    /// Create a client.
    ///
    /// Construction never fails; problems are logged and turn the client
    /// into its failed state.
    pub fn new(
        settings: &dyn SettingsProvider,
        storage: Arc<dyn ScopedStorage>,
        refresher: Arc<dyn TokenRefresher>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let ready = Self::initialize(settings, storage, refresher, transport);
        if let Err(ref err) = ready {
            error!(error = %err, "Database client failed to initialize");
        }
        Self {
            inner: Arc::new(ready),
        }
    }

    fn initialize(
        settings: &dyn SettingsProvider,
        storage: Arc<dyn ScopedStorage>,
        refresher: Arc<dyn TokenRefresher>,
        transport: Arc<dyn Transport>,
    ) -> std::result::Result<Ready, InitializationError> {
        let settings = settings
            .settings()
            .map_err(|e| InitializationError::Configuration(e.to_string()))?;

        let credentials = CredentialStore::new(storage, &settings.api_key);
        credentials
            .read()
            .map_err(|e| InitializationError::Storage(e.to_string()))?;

        debug!(database = %settings.database_url, "Database client ready");

        Ok(Ready {
            database: settings.database_url,
            credentials,
            refresher,
            transport,
        })
    }

    /// Returns the initialization failure, if any.
    pub fn initialization_error(&self) -> Option<&InitializationError> {
        self.inner.as_ref().as_ref().err()
    }

    /// Read the data at `path`.
    ///
    /// A location without data reads as `{}`. With
    /// [`GetOptions::shallow`], each immediate child comes back as `{}`.
    #[instrument(skip(self, options), fields(shallow = options.is_shallow()))]
    pub async fn get(&self, path: &DbPath, options: GetOptions) -> Result<Value> {
        let shallow = options.is_shallow();
        let data = self
            .execute(PendingRequest::get(path.clone(), options))
            .await?;

        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        Ok(if shallow { mask_children(data) } else { data })
    }

    /// Replace the data at `path`. Returns the data as written.
    #[instrument(skip(self, data))]
    pub async fn put(&self, path: &DbPath, data: &Value) -> Result<Value> {
        self.execute(PendingRequest::put(path.clone(), data.clone()))
            .await
    }

    /// Append a child with a generated key under `path`.
    ///
    /// Returns the store's response, `{"name": "<generated key>"}`.
    #[instrument(skip(self, data))]
    pub async fn post(&self, path: &DbPath, data: &Value) -> Result<Value> {
        self.execute(PendingRequest::post(path.clone(), data.clone()))
            .await
    }

    /// Remove the data at `path`.
    #[instrument(skip(self))]
    pub async fn delete(&self, path: &DbPath) -> Result<()> {
        self.execute(PendingRequest::delete(path.clone()))
            .await
            .map(|_| ())
    }

    /// Write several locations in one atomic operation.
    ///
    /// Either every location is written or none is. The map must be
    /// non-empty, must not target the root, and no location may contain
    /// another.
    #[instrument(skip(self, updates), fields(locations = updates.len()))]
    pub async fn update(&self, updates: &BTreeMap<DbPath, Value>) -> Result<()> {
        self.ready()?;
        let payload = update_payload(updates)?;
        self.execute(PendingRequest::update(payload))
            .await
            .map(|_| ())
    }

    fn ready(&self) -> Result<&Ready> {
        self.inner
            .as_ref()
            .as_ref()
            .map_err(|e| Error::Initialization(e.clone()))
    }

    /// Run one request through the token-check / send / refresh / resend
    /// protocol.
    async fn execute(&self, request: PendingRequest) -> Result<Value> {
        let ready = self.ready()?;
        let mut lifecycle = RequestLifecycle::new(&request);

        let result = self.run(ready, &request, &mut lifecycle).await;
        lifecycle.finish(&result);
        if let Err(ref err) = result {
            warn!(method = %request.method(), path = %request.path(), error = %err, "Request failed");
        }
        result
    }

    async fn run(
        &self,
        ready: &Ready,
        request: &PendingRequest,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<Value> {
        let token = match ready.credentials.read()? {
            Some(token) => token,
            None => {
                lifecycle.advance(RequestState::TokenCheck);
                self.refresh_and_read(ready).await?
            }
        };

        lifecycle.advance(RequestState::Sending);
        let mut outcome = ready
            .transport
            .execute(&request.build(&ready.database, token))
            .await;

        while let Err(ref err) = outcome {
            if !err.is_token_expired() {
                break;
            }

            lifecycle.advance(RequestState::TokenExpired);
            info!(method = %request.method(), path = %request.path(), "Token expired, refreshing");
            lifecycle.begin_retry()?;

            let fresh = self.refresh_and_read(ready).await?;

            lifecycle.advance(RequestState::Resending);
            outcome = ready
                .transport
                .execute(&request.build(&ready.database, fresh))
                .await;
        }

        outcome
    }

    /// Refresh through the session manager and read the stored result.
    async fn refresh_and_read(&self, ready: &Ready) -> Result<IdToken> {
        ready
            .refresher
            .refresh_token()
            .await
            .map_err(|err| match err {
                Error::TokenRefresh(_) => err,
                other => Error::TokenRefresh(TokenRefreshError::new(None, other.to_string())),
            })?;

        ready.credentials.read()?.ok_or_else(|| {
            Error::TokenRefresh(TokenRefreshError::new(
                None,
                "no credential token stored after refresh",
            ))
        })
    }
}

impl std::fmt::Debug for DatabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.as_ref() {
            Ok(ready) => f
                .debug_struct("DatabaseClient")
                .field("database", &ready.database)
                .field("credentials", &ready.credentials)
                .finish(),
            Err(err) => f
                .debug_struct("DatabaseClient")
                .field("initialization_error", err)
                .finish(),
        }
    }
}

/// Replace every immediate child value with `{}`.
fn mask_children(data: Value) -> Value {
    match data {
        Value::Object(children) => Value::Object(
            children
                .into_iter()
                .map(|(key, _)| (key, Value::Object(Map::new())))
                .collect(),
        ),
        Value::Array(children) => Value::Array(
            children
                .into_iter()
                .map(|_| Value::Object(Map::new()))
                .collect(),
        ),
        other => other,
    }
}

/// Validate a multi-location update and build the request body.
fn update_payload(updates: &BTreeMap<DbPath, Value>) -> Result<Value> {
    let invalid = |reason: String| -> Error { InvalidInputError::Update { reason }.into() };

    if updates.is_empty() {
        return Err(invalid("no locations to update".to_string()));
    }
    if updates.contains_key(&DbPath::root()) {
        return Err(invalid("the root location cannot be part of a multi-location update".to_string()));
    }

    let paths: Vec<&DbPath> = updates.keys().collect();
    for (i, a) in paths.iter().enumerate() {
        for b in &paths[i + 1..] {
            if a.overlaps(b) {
                return Err(invalid(format!("locations {} and {} overlap", a, b)));
            }
        }
    }

    Ok(Value::Object(
        updates
            .iter()
            .map(|(path, value)| (path.relative().to_string(), value.clone()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FirebaseSettings, StaticSettings};
    use crate::error::{ConfigError, RemoteError, TOKEN_EXPIRED_SENTINEL};
    use crate::storage::MemoryStorage;
    use crate::testing::{ScriptedTransport, StaticRefresher};
    use crate::types::ApiKey;
    use serde_json::json;

    const API_KEY: &str = "test-key";

    fn settings() -> StaticSettings {
        StaticSettings::new(FirebaseSettings::new(
            ApiKey::new(API_KEY).unwrap(),
            DatabaseUrl::new("https://demo.firebaseio.com").unwrap(),
        ))
    }

    fn token_key() -> String {
        CredentialStore::key_for(&ApiKey::new(API_KEY).unwrap())
    }

    struct Harness {
        storage: Arc<MemoryStorage>,
        refresher: Arc<StaticRefresher>,
        transport: Arc<ScriptedTransport>,
        client: DatabaseClient,
    }

    fn harness(initial_token: Option<&str>) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        if let Some(token) = initial_token {
            storage.set_item(&token_key(), token).unwrap();
        }
        let refresher = Arc::new(StaticRefresher::new(storage.clone(), token_key()));
        let transport = Arc::new(ScriptedTransport::new());
        let client = DatabaseClient::new(
            &settings(),
            storage.clone(),
            refresher.clone(),
            transport.clone(),
        );
        Harness {
            storage,
            refresher,
            transport,
            client,
        }
    }

    fn expired() -> Error {
        RemoteError::new(401, Some(TOKEN_EXPIRED_SENTINEL.to_string())).into()
    }

    fn path(s: &str) -> DbPath {
        DbPath::new(s).unwrap()
    }

    #[tokio::test]
    async fn get_sends_with_stored_token() {
        let h = harness(Some("tok-1"));
        h.transport.respond(Ok(json!({"title": "Home"})));

        let data = h.client.get(&path("pages/home"), GetOptions::new()).await.unwrap();

        assert_eq!(data, json!({"title": "Home"}));
        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].authorized_url().as_str(),
            "https://demo.firebaseio.com/pages/home.json?auth=tok-1"
        );
        assert_eq!(h.refresher.calls(), 0);
    }

    #[tokio::test]
    async fn get_missing_data_is_empty_object() {
        let h = harness(Some("tok"));
        h.transport.respond(Ok(Value::Null));

        let data = h.client.get(&path("nothing/here"), GetOptions::new()).await.unwrap();
        assert_eq!(data, json!({}));
    }

    #[tokio::test]
    async fn shallow_get_masks_children() {
        let h = harness(Some("tok"));
        h.transport.respond(Ok(json!({"a": 1, "b": 2})));
        h.transport.respond(Ok(json!({"a": 1, "b": 2})));

        let shallow = h.client.get(&path("root"), GetOptions::new().shallow()).await.unwrap();
        assert_eq!(shallow, json!({"a": {}, "b": {}}));

        let deep = h.client.get(&path("root"), GetOptions::new()).await.unwrap();
        assert_eq!(deep, json!({"a": 1, "b": 2}));

        assert!(h.transport.sent()[0].url().as_str().ends_with("shallow=true"));
    }

    #[tokio::test]
    async fn shallow_get_masks_array_children() {
        let h = harness(Some("tok"));
        h.transport.respond(Ok(json!([1, {"deep": true}])));

        let data = h.client.get(&path("list"), GetOptions::new().shallow()).await.unwrap();
        assert_eq!(data, json!([{}, {}]));
    }

    #[tokio::test]
    async fn shallow_get_leaves_primitives_alone() {
        let h = harness(Some("tok"));
        h.transport.respond(Ok(json!(42)));
        let data = h.client.get(&path("count"), GetOptions::new().shallow()).await.unwrap();
        assert_eq!(data, json!(42));
    }

    #[tokio::test]
    async fn missing_token_triggers_token_check_before_sending() {
        let h = harness(None);
        h.refresher.set_next_token("fresh");
        h.transport.respond(Ok(json!({"ok": true})));

        h.client.put(&path("a"), &json!({"ok": true})).await.unwrap();

        assert_eq!(h.refresher.calls(), 1);
        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token().as_str(), "fresh");
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_request_resent_once() {
        let h = harness(Some("stale"));
        h.refresher.set_next_token("fresh");
        h.transport.respond(Err(expired()));
        h.transport.respond(Ok(json!({"name": "-Nkey"})));

        let result = h.client.post(&path("messages"), &json!({"text": "hi"})).await.unwrap();

        assert_eq!(result, json!({"name": "-Nkey"}));
        assert_eq!(h.refresher.calls(), 1);
        let sent = h.transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].token().as_str(), "stale");
        assert_eq!(sent[1].token().as_str(), "fresh");
        assert_eq!(sent[0].method(), sent[1].method());
        assert_eq!(sent[0].url(), sent[1].url());
        assert_eq!(sent[0].body(), sent[1].body());
    }

    #[tokio::test]
    async fn second_expiry_is_final() {
        let h = harness(Some("stale"));
        h.refresher.set_next_token("still-stale");
        h.transport.respond(Err(expired()));
        h.transport.respond(Err(expired()));
        h.transport.respond(Ok(json!("never reached")));

        let err = h.client.delete(&path("a")).await.unwrap_err();

        assert!(matches!(err, Error::TokenExpiredRetryExhausted { method: "DELETE", .. }));
        assert_eq!(h.transport.sent().len(), 2);
        assert_eq!(h.refresher.calls(), 1);
    }

    #[tokio::test]
    async fn other_failure_after_retry_is_a_remote_failure() {
        let h = harness(Some("stale"));
        h.refresher.set_next_token("fresh");
        h.transport.respond(Err(expired()));
        h.transport.respond(Err(RemoteError::new(401, Some("Permission denied".to_string())).into()));

        let err = h.client.put(&path("a"), &json!(1)).await.unwrap_err();
        assert!(matches!(err, Error::Remote(ref r) if r.status == 401 && !r.is_token_expired()));
        assert_eq!(h.transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn non_expiry_failure_is_not_retried() {
        let h = harness(Some("tok"));
        h.transport.respond(Err(RemoteError::new(400, Some("Invalid data".to_string())).into()));

        let err = h.client.put(&path("a"), &json!(1)).await.unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
        assert_eq!(h.transport.sent().len(), 1);
        assert_eq!(h.refresher.calls(), 0);
    }

    #[tokio::test]
    async fn refresh_failure_fails_the_call_without_resending() {
        let h = harness(Some("stale"));
        h.refresher.fail_next("auth/user-token-expired");
        h.transport.respond(Err(expired()));

        let err = h.client.put(&path("a"), &json!(1)).await.unwrap_err();
        assert!(matches!(err, Error::TokenRefresh(ref e) if e.code.as_deref() == Some("auth/user-token-expired")));
        assert_eq!(h.transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn refresh_that_stores_nothing_fails_without_sending() {
        let h = harness(None);
        h.refresher.store_nothing();

        let err = h.client.get(&path("a"), GetOptions::new()).await.unwrap_err();
        assert!(matches!(err, Error::TokenRefresh(_)));
        assert!(h.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn retry_reads_the_store_not_a_captured_copy() {
        let h = harness(Some("stale"));
        // The refresher writes "fresh", but another writer replaces it before
        // the resend; the resend must use what the store holds.
        h.refresher.set_next_token("fresh");
        h.refresher.after_refresh_store(h.storage.clone(), token_key(), "newest");
        h.transport.respond(Err(expired()));
        h.transport.respond(Ok(json!(true)));

        h.client.put(&path("a"), &json!(true)).await.unwrap();
        assert_eq!(h.transport.sent()[1].token().as_str(), "newest");
    }

    #[tokio::test]
    async fn update_sends_one_atomic_patch() {
        let h = harness(Some("tok"));
        h.transport.respond(Ok(json!({"x": 1, "y/z": 2})));

        let mut updates = BTreeMap::new();
        updates.insert(path("/x"), json!(1));
        updates.insert(path("/y/z"), json!(2));
        h.client.update(&updates).await.unwrap();

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method(), crate::database::Method::Patch);
        assert_eq!(sent[0].url().as_str(), "https://demo.firebaseio.com/.json");
        assert_eq!(sent[0].body(), Some(&json!({"x": 1, "y/z": 2})));
    }

    #[tokio::test]
    async fn update_failure_is_reported_once() {
        let h = harness(Some("tok"));
        h.transport.respond(Err(RemoteError::new(400, Some("Invalid data".to_string())).into()));

        let mut updates = BTreeMap::new();
        updates.insert(path("/x"), json!(1));
        updates.insert(path("/y/z"), json!(2));
        let err = h.client.update(&updates).await.unwrap_err();

        assert!(matches!(err, Error::Remote(_)));
        assert_eq!(h.transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn update_rejects_overlapping_empty_and_root_maps() {
        let h = harness(Some("tok"));

        let mut overlapping = BTreeMap::new();
        overlapping.insert(path("/y"), json!({}));
        overlapping.insert(path("/y/z"), json!(2));
        assert!(matches!(
            h.client.update(&overlapping).await,
            Err(Error::InvalidInput(InvalidInputError::Update { .. }))
        ));

        assert!(h.client.update(&BTreeMap::new()).await.is_err());

        let mut root = BTreeMap::new();
        root.insert(DbPath::root(), json!({}));
        assert!(h.client.update(&root).await.is_err());

        assert!(h.transport.sent().is_empty());
    }

    struct Unreachable;

    impl SettingsProvider for Unreachable {
        fn settings(&self) -> Result<FirebaseSettings> {
            Err(ConfigError::Missing.into())
        }
    }

    #[tokio::test]
    async fn failed_initialization_short_circuits_every_operation() {
        let storage = Arc::new(MemoryStorage::new());
        let refresher = Arc::new(StaticRefresher::new(storage.clone(), token_key()));
        let transport = Arc::new(ScriptedTransport::new());
        let client = DatabaseClient::new(&Unreachable, storage, refresher.clone(), transport.clone());

        assert!(client.initialization_error().is_some());

        let p = path("a");
        let mut updates = BTreeMap::new();
        updates.insert(path("x"), json!(1));

        assert!(matches!(client.get(&p, GetOptions::new()).await, Err(Error::Initialization(_))));
        assert!(matches!(client.put(&p, &json!(1)).await, Err(Error::Initialization(_))));
        assert!(matches!(client.post(&p, &json!(1)).await, Err(Error::Initialization(_))));
        assert!(matches!(client.delete(&p).await, Err(Error::Initialization(_))));
        assert!(matches!(client.update(&updates).await, Err(Error::Initialization(_))));

        assert!(transport.sent().is_empty());
        assert_eq!(refresher.calls(), 0);
    }

    struct BrokenStorage;

    impl ScopedStorage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Err(crate::error::StorageError::Io {
                message: "denied".to_string(),
            }
            .into())
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Ok(())
        }
        fn remove_item(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unreadable_storage_fails_initialization() {
        let storage = Arc::new(MemoryStorage::new());
        let refresher = Arc::new(StaticRefresher::new(storage, token_key()));
        let transport = Arc::new(ScriptedTransport::new());
        let client = DatabaseClient::new(&settings(), Arc::new(BrokenStorage), refresher, transport.clone());

        assert!(matches!(
            client.initialization_error(),
            Some(InitializationError::Storage(_))
        ));
        assert!(client.get(&path("a"), GetOptions::new()).await.is_err());
        assert!(transport.sent().is_empty());
    }
}
