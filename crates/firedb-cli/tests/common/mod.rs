//! Helpers for running the `firedb` binary against a mock Firebase backend.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Output;

use serde_json::json;
use tempfile::TempDir;
use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-key";
pub const TOKEN_KEY: &str = "FirebaseUserToken-test-key";
pub const SESSION_KEY: &str = "FirebaseProviderSession-test-key";

pub const SIGN_IN_PATH: &str = "/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
pub const TOKEN_PATH: &str = "/securetoken.googleapis.com/v1/token";

/// An isolated home directory plus a mock server standing in for both the
/// identity services and the database.
pub struct TestEnv {
    pub home: TempDir,
    pub server: MockServer,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self {
            home: TempDir::new().expect("Failed to create temp home"),
            server: MockServer::start().await,
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_firedb"));
        cmd.args(args)
            .env("HOME", self.home.path())
            .env("XDG_DATA_HOME", self.home.path().join("data"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("FIREDB_ENV")
            .env_remove("FIREDB_SETTINGS");
        cmd
    }

    /// Run with the project pointed at the mock server.
    pub async fn run(&self, args: &[&str]) -> Output {
        let mut cmd = self.command(args);
        cmd.env("FIREDB_API_KEY", API_KEY)
            .env("FIREDB_DATABASE_URL", self.server.uri())
            .env("FIREDB_AUTH_EMULATOR", self.server.uri());
        cmd.output().await.expect("Failed to execute CLI")
    }

    /// Run with no project settings at all.
    pub async fn run_unconfigured(&self, args: &[&str]) -> Output {
        let mut cmd = self.command(args);
        cmd.env_remove("FIREDB_API_KEY")
            .env_remove("FIREDB_DATABASE_URL")
            .env_remove("FIREDB_AUTH_EMULATOR");
        cmd.output().await.expect("Failed to execute CLI")
    }

    pub async fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args).await;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub async fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args).await;
        if output.status.success() {
            panic!("CLI command should have failed: {:?}", args);
        }
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn storage_path(&self) -> PathBuf {
        self.home.path().join("data").join("firedb").join("storage.json")
    }

    /// Contents of the CLI's storage file.
    pub fn stored(&self) -> BTreeMap<String, String> {
        match std::fs::read_to_string(self.storage_path()) {
            Ok(raw) => serde_json::from_str(&raw).expect("storage file is not a JSON map"),
            Err(_) => BTreeMap::new(),
        }
    }

    /// Sign-in succeeds for uid-1; the first token exchange mints id-1,
    /// every later one id-2.
    pub async fn mount_auth(&self) {
        Mock::given(method("POST"))
            .and(path(SIGN_IN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "uid-1",
                "email": "editor@example.com",
                "idToken": "id-0",
                "refreshToken": "refresh-1"
            })))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "id-1",
                "refresh_token": "refresh-2",
                "user_id": "uid-1"
            })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "id-2",
                "refresh_token": "refresh-3",
                "user_id": "uid-1"
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn login(&self) -> String {
        self.run_success(&[
            "auth",
            "login",
            "--email",
            "editor@example.com",
            "--password",
            "hunter2",
        ])
        .await
    }
}
