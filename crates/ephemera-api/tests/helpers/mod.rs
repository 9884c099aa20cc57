use axum_test::TestServer;
use ephemera_api::setup::{routes::setup_routes, setup_files};
use ephemera_api::AppState;
use ephemera_core::Config;
use std::collections::HashMap;
use std::sync::Arc;

/// Returns the versioned API path.
/// Usage: `api_path("/files")` -> `/api/v0/files`.
pub fn api_path(path: &str) -> String {
    format!("{}{}", ephemera_api::constants::API_PREFIX, path)
}

/// Test application over in-memory storage.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

/// Build the app from the memory backend defaults plus `overrides`.
pub async fn setup_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let mut vars: HashMap<String, String> = [
        ("STORAGE_BACKEND", "memory"),
        ("PASSWORD_SCHEME", "plaintext"),
        ("FILE_EXPIRE_SECONDS", "60"),
    ]
    .into_iter()
    .chain(overrides.iter().copied())
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    vars.entry("ENVIRONMENT".to_string())
        .or_insert_with(|| "test".to_string());

    let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("Invalid test config");
    let files = setup_files(&config)
        .await
        .expect("Failed to set up file service");
    let state = Arc::new(AppState::new(files, config.clone()));
    let router = setup_routes(&config, state.clone()).expect("Failed to set up routes");

    TestApp {
        server: TestServer::new(router).expect("Failed to start test server"),
        state,
    }
}
